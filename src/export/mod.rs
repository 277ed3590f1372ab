//! Server-generated exports saved on the client
//!
//! An export endpoint returns the whole file as a byte array inside the usual
//! envelope. [`Exporter`] fetches it, then [`materialize_download`] hands the
//! bytes to a [`DownloadTrigger`] which saves them.

pub mod download;
pub mod payload;

pub use download::{materialize_download, mime_for, Blob, Download, DownloadTrigger, FileDownloadTrigger};
pub use payload::{fetch_export, ExportPayload};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, Transport};
use crate::models::QueryFilters;
use crate::resources::Resource;
use crate::validation::{FilterSchema, ValidationError};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export returned no data")]
    EmptyBuffer,

    #[error("Export returned no filename")]
    MissingFilename,

    #[error("An export is already running")]
    InProgress,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn user_message(&self) -> String {
        match self {
            ExportError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Fetches exports and saves them, one at a time
pub struct Exporter {
    transport: Arc<dyn Transport>,
    trigger: Arc<dyn DownloadTrigger>,
    busy: AtomicBool,
}

impl Exporter {
    pub fn new(transport: Arc<dyn Transport>, trigger: Arc<dyn DownloadTrigger>) -> Self {
        Self {
            transport,
            trigger,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Fetch `endpoint` with `filters` and save the returned file.
    /// A second call while one is running fails with [`ExportError::InProgress`].
    pub async fn export(&self, endpoint: &str, filters: &QueryFilters) -> Result<Download, ExportError> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        info!("Requesting export from {}", endpoint);
        let payload = fetch_export(self.transport.as_ref(), endpoint, filters).await?;
        let mime_type = mime_for(&payload.filename);

        materialize_download(payload.buffer, &payload.filename, mime_type, self.trigger.as_ref())
    }

    /// Export a resource after checking its filters
    pub async fn export_resource(
        &self,
        resource: Resource,
        filters: &QueryFilters,
    ) -> Result<Download, ExportError> {
        resource.validate(filters)?;
        self.export(&resource.export_endpoint(), filters).await
    }
}

/// Holds the busy flag for the duration of one export
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExportError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Export requested while another is running");
            return Err(ExportError::InProgress);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

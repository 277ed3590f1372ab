//! Export response decoding

use serde::Deserialize;
use tracing::debug;

use crate::api::{ApiError, Envelope, Transport};
use crate::models::QueryFilters;

/// File contents and name produced by an export endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    pub buffer: Vec<u8>,
    pub filename: String,
}

/// `{ buffer: { data: [..] }, filename }` as sent by the server
#[derive(Debug, Deserialize)]
struct WirePayload {
    buffer: WireBuffer,
    filename: String,
}

/// A serialized Node `Buffer`: bytes as a plain JSON number array
#[derive(Debug, Deserialize)]
struct WireBuffer {
    data: Vec<u8>,
}

impl From<WirePayload> for ExportPayload {
    fn from(wire: WirePayload) -> Self {
        Self {
            buffer: wire.buffer.data,
            filename: wire.filename,
        }
    }
}

impl ExportPayload {
    /// Decode an export envelope. Byte values outside 0-255 are rejected.
    pub fn decode(raw: serde_json::Value) -> Result<Self, ApiError> {
        let wire: WirePayload = Envelope::decode(raw)?;
        Ok(wire.into())
    }
}

/// `GET <endpoint>?<filters>`; exports are never paged
pub async fn fetch_export(
    transport: &dyn Transport,
    endpoint: &str,
    filters: &QueryFilters,
) -> Result<ExportPayload, ApiError> {
    let raw = transport.get(endpoint, &filters.filter_query()).await?;
    let payload = ExportPayload::decode(raw)?;
    debug!(
        "Export {} returned {} byte(s) as '{}'",
        endpoint,
        payload.buffer.len(),
        payload.filename
    );
    Ok(payload)
}

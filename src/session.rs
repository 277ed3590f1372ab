//! Authentication session shared by HTTP clients
//!
//! The token lives in an explicit `Session` handed to the client at
//! construction. `login` and `logout` are the only ways it changes; when a
//! store path is configured the token is mirrored to disk so separate CLI
//! invocations share it.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    store: Option<PathBuf>,
}

impl Session {
    /// In-memory session with no token
    pub fn new() -> Self {
        Self::default()
    }

    /// Session mirrored to `path`, loading any token already stored there
    pub fn with_store(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                (!token.is_empty()).then_some(token)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        debug!(
            "Session store {} loaded (authenticated: {})",
            path.display(),
            token.is_some()
        );

        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            store: Some(path),
        })
    }

    pub fn login(&self, token: impl Into<String>) -> io::Result<()> {
        let token = token.into();
        if let Some(path) = &self.store {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            write_private(path, &token)?;
        }
        self.replace(Some(token))?;
        info!("Session started");
        Ok(())
    }

    pub fn logout(&self) -> io::Result<()> {
        if let Some(path) = &self.store {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        self.replace(None)?;
        info!("Session ended");
        Ok(())
    }

    /// Swap in a token the server rotated, keeping the store in sync
    pub(crate) fn rotate(&self, token: &str) {
        if self.token().as_deref() == Some(token) {
            return;
        }
        if let Err(e) = self.login(token) {
            error!("Failed to store rotated token: {}", e);
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                error!("Failed to acquire read lock for token: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn replace(&self, token: Option<String>) -> io::Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| io::Error::other(format!("session lock poisoned: {}", e)))?;
        *guard = token;
        Ok(())
    }
}

/// Write `contents` to `path`, readable by the owner only
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten a file left by an older run
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

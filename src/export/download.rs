//! Turning an in-memory byte buffer into a saved file

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::export::ExportError;

/// Bytes tagged with a MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Where a materialized download ended up
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub path: PathBuf,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

/// The save step. Implementations must not leave partial output behind on error.
pub trait DownloadTrigger: Send + Sync {
    fn trigger(&self, blob: &Blob, filename: &str) -> Result<PathBuf, ExportError>;
}

/// Saves downloads into a directory
#[derive(Debug, Clone)]
pub struct FileDownloadTrigger {
    dir: PathBuf,
}

impl FileDownloadTrigger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadTrigger for FileDownloadTrigger {
    fn trigger(&self, blob: &Blob, filename: &str) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;

        // Staged next to the target so the final rename stays on one filesystem.
        // Dropping `staged` on any early return deletes it.
        let mut staged = tempfile::Builder::new()
            .prefix(".ledgerdesk-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        staged.write_all(blob.bytes())?;
        staged.flush()?;
        debug!("Staged {} byte(s) at {}", blob.len(), staged.path().display());

        // Earlier exports with the same name are kept; later ones get a numbered name
        let mut target = self.dir.join(filename);
        let mut copy = 0;
        loop {
            match staged.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists && copy < MAX_NUMBERED_COPIES => {
                    staged = e.file;
                    copy += 1;
                    target = self.dir.join(numbered_filename(filename, copy));
                }
                Err(e) => return Err(ExportError::Io(e.error)),
            }
        }
    }
}

const MAX_NUMBERED_COPIES: u32 = 999;

/// `report.xlsx` becomes `report (2).xlsx`
fn numbered_filename(filename: &str, copy: u32) -> String {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    match path.extension().and_then(|e| e.to_str()) {
        Some(extension) => format!("{} ({}).{}", stem, copy, extension),
        None => format!("{} ({})", stem, copy),
    }
}

/// Wrap `bytes` in a blob and hand it to `trigger` under `filename`.
///
/// Fails without calling the trigger if there are no bytes or no usable name.
pub fn materialize_download(
    bytes: Vec<u8>,
    filename: &str,
    mime_type: &str,
    trigger: &dyn DownloadTrigger,
) -> Result<Download, ExportError> {
    if bytes.is_empty() {
        return Err(ExportError::EmptyBuffer);
    }
    let filename = sanitize_filename(filename).ok_or(ExportError::MissingFilename)?;

    let blob = Blob::new(bytes, mime_type);
    let path = trigger.trigger(&blob, &filename)?;

    info!("✓ Saved {} ({} bytes, {})", path.display(), blob.len(), blob.mime_type());

    // The trigger may have picked a different name to avoid overwriting
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or(filename);

    Ok(Download {
        path,
        filename,
        mime_type: blob.mime_type,
        size: blob.bytes.len(),
    })
}

/// Final path component of a server-supplied name, or `None` if nothing usable is left
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.trim().rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// MIME type for a filename, by extension
pub fn mime_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records what would have been saved
    #[derive(Default)]
    pub(crate) struct RecordingTrigger {
        pub saved: Mutex<Vec<(usize, String, String)>>,
    }

    impl DownloadTrigger for RecordingTrigger {
        fn trigger(&self, blob: &Blob, filename: &str) -> Result<PathBuf, ExportError> {
            self.saved.lock().unwrap().push((
                blob.len(),
                filename.to_string(),
                blob.mime_type().to_string(),
            ));
            Ok(PathBuf::from(filename))
        }
    }

    struct FailingTrigger;

    impl DownloadTrigger for FailingTrigger {
        fn trigger(&self, _blob: &Blob, _filename: &str) -> Result<PathBuf, ExportError> {
            Err(ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_hello_export() {
        let trigger = RecordingTrigger::default();
        let download = materialize_download(
            vec![72, 101, 108, 108, 111],
            "test.xlsx",
            mime_for("test.xlsx"),
            &trigger,
        )
        .unwrap();

        assert_eq!(download.size, 5);
        assert_eq!(download.filename, "test.xlsx");
        let saved = trigger.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, 5);
        assert_eq!(saved[0].1, "test.xlsx");
        assert_eq!(
            saved[0].2,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_empty_buffer_never_triggers() {
        let trigger = RecordingTrigger::default();
        let result = materialize_download(Vec::new(), "test.xlsx", "text/csv", &trigger);
        assert!(matches!(result, Err(ExportError::EmptyBuffer)));
        assert!(trigger.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_filename_never_triggers() {
        let trigger = RecordingTrigger::default();
        for name in ["", "   ", "reports/", ".."] {
            let result = materialize_download(vec![1], name, "text/csv", &trigger);
            assert!(matches!(result, Err(ExportError::MissingFilename)), "{name:?}");
        }
        assert!(trigger.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_trigger_error_propagates() {
        let result = materialize_download(vec![1, 2], "a.csv", "text/csv", &FailingTrigger);
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[test]
    fn test_file_trigger_writes_only_final_file() {
        let temp_dir = TempDir::new().unwrap();
        let trigger = FileDownloadTrigger::new(temp_dir.path().join("exports"));

        let download =
            materialize_download(b"id,amount\n1,100\n".to_vec(), "tally.csv", "text/csv", &trigger)
                .unwrap();

        assert_eq!(download.path, temp_dir.path().join("exports").join("tally.csv"));
        assert_eq!(std::fs::read(&download.path).unwrap(), b"id,amount\n1,100\n");

        let entries: Vec<_> = std::fs::read_dir(trigger.dir()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_trigger_keeps_earlier_exports() {
        let temp_dir = TempDir::new().unwrap();
        let trigger = FileDownloadTrigger::new(temp_dir.path());

        let first = materialize_download(b"march".to_vec(), "payouts.csv", "text/csv", &trigger).unwrap();
        let second = materialize_download(b"april".to_vec(), "payouts.csv", "text/csv", &trigger).unwrap();
        let third = materialize_download(b"may".to_vec(), "payouts.csv", "text/csv", &trigger).unwrap();

        assert_eq!(first.path, temp_dir.path().join("payouts.csv"));
        assert_eq!(second.path, temp_dir.path().join("payouts (1).csv"));
        assert_eq!(second.filename, "payouts (1).csv");
        assert_eq!(third.path, temp_dir.path().join("payouts (2).csv"));

        assert_eq!(std::fs::read(&first.path).unwrap(), b"march");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"april");
        assert_eq!(std::fs::read(&third.path).unwrap(), b"may");

        let entries: Vec<_> = std::fs::read_dir(trigger.dir()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_numbered_filename() {
        assert_eq!(numbered_filename("report.xlsx", 2), "report (2).xlsx");
        assert_eq!(numbered_filename("README", 1), "README (1)");
        assert_eq!(numbered_filename("tally.2024.csv", 1), "tally.2024 (1).csv");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\reports\\q1.xlsx").as_deref(), Some("q1.xlsx"));
        assert_eq!(sanitize_filename(" payouts.csv ").as_deref(), Some("payouts.csv"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("A.CSV"), "text/csv");
        assert_eq!(mime_for("report.pdf"), "application/pdf");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}

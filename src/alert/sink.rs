use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::alert::AlertRecord;
use crate::error::WatchError;

/// Durable, append-only destination for alert records.
pub trait AlertSink: Send {
    fn append(&mut self, record: &AlertRecord) -> Result<(), WatchError>;
}

/// Text log with one `[timestamp] ALERT: message` line per record.
///
/// The file is opened in append mode for every record, so external readers
/// and log rotation never see a held handle or a partially written line.
pub struct FileAlertLog {
    path: PathBuf,
}

impl FileAlertLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for FileAlertLog {
    fn append(&mut self, record: &AlertRecord) -> Result<(), WatchError> {
        let line = format!("{}\n", record.log_line());
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| WatchError::LogWrite {
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory sink; clones share the same line buffer.
#[derive(Clone, Default)]
pub struct InMemoryAlertLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl InMemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AlertSink for InMemoryAlertLog {
    fn append(&mut self, record: &AlertRecord) -> Result<(), WatchError> {
        let mut lines = self.lines.lock().map_err(|_| WatchError::LogWrite {
            path: PathBuf::from("<memory>"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "alert buffer lock poisoned"),
        })?;
        lines.push(record.log_line());
        Ok(())
    }
}

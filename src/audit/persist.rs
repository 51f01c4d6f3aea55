//! Session persistence of the audit log as a JSON array.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::audit::log::{AuditEntry, AuditLog};
use crate::observability::metrics;

impl AuditLog {
    /// Restore from `path`, keeping at most the newest `capacity` entries.
    ///
    /// A missing, unreadable or corrupt file yields an empty log that is still
    /// persisted to `path`.
    pub fn load_from_file(path: &str, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        log.persist_path = Some(path.to_string());

        match read_entries(Path::new(path)) {
            Ok(Some(stored)) => {
                let skip = stored.len().saturating_sub(capacity);
                let entries: VecDeque<AuditEntry> = stored.into_iter().skip(skip).collect();

                let len = entries.len();
                *log.entries.get_mut().expect("audit log mutex poisoned") = entries;
                metrics::record_audit_size(len);
                tracing::info!(path = %path, entries = len, "Loaded audit log");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(
                path = %path,
                error = %e,
                "Ignoring unreadable audit log, starting empty"
            ),
        }
        log
    }

    /// Write every retained entry to the persistence path, if one is set.
    ///
    /// The file is replaced by rename, so readers never see a partial write.
    pub fn save_to_file(&self) -> io::Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let entries = self.read_all();
        write_replacing(Path::new(path), &entries)?;
        tracing::debug!(path = %path, entries = entries.len(), "Saved audit log");
        Ok(())
    }

    pub fn persist_path(&self) -> Option<&str> {
        self.persist_path.as_deref()
    }
}

fn read_entries(path: &Path) -> io::Result<Option<Vec<AuditEntry>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let stored = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(stored))
}

/// Sibling temp file, unique per save so concurrent saves never share one.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audit.json");
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

fn write_replacing(path: &Path, entries: &[AuditEntry]) -> io::Result<()> {
    let tmp = temp_path_for(path);
    let written = (|| {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    })()
    .and_then(|()| fs::rename(&tmp, path));

    if written.is_err() {
        fs::remove_file(&tmp).ok();
    }
    written
}

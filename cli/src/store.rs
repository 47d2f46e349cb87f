//! File-backed session store.
//!
//! The two session slots are kept as a small JSON file so a login survives
//! across CLI invocations:
//!
//! ```json
//! { "session_id": "4b0c…", "is_admin": "1" }
//! ```
//!
//! Every read goes back to disk; there is no in-memory cache to go stale
//! between processes. On Unix the file is written with mode 0600.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use session::store::PersistedSlots;
use session::{SessionError, SessionRecord, SessionStore};

const FILE_NAME: &str = "session.json";

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config dir>/ticketing/session.json`, falling back to the working
    /// directory when no config dir is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from(".ticketing").join(FILE_NAME),
            |dir| dir.join("ticketing").join(FILE_NAME),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<PersistedSlots, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, &e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PersistedSlots::default()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }

    fn write_slots(&self, slots: &PersistedSlots) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let raw = serde_json::to_string_pretty(slots).map_err(|e| storage_error(&self.path, &e))?;
        fs::write(&self.path, raw).map_err(|e| storage_error(&self.path, &e))?;
        restrict_permissions(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| storage_error(path, &e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}

fn storage_error(path: &Path, err: &dyn std::fmt::Display) -> SessionError {
    SessionError::Storage(format!("{}: {err}", path.display()))
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> SessionRecord {
        match self.read_slots() {
            Ok(slots) => slots.into(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable session file, treating as signed out");
                SessionRecord::anonymous()
            }
        }
    }

    fn set(&self, credential: Option<&str>, is_privileged: bool) -> Result<(), SessionError> {
        let record = SessionRecord::new(credential, is_privileged)?;
        self.write_slots(&record.to_slots())?;
        tracing::debug!(path = %self.path.display(), privileged = record.is_privileged(), "session stored");
        Ok(())
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "session cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "could not remove session file"),
        }
    }
}

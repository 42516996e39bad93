use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PlatformError;
use crate::platform::models::Session;

/// Local persistence for the current session
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, PlatformError>;
    fn save(&self, session: &Session) -> Result<(), PlatformError>;
    fn clear(&self) -> Result<(), PlatformError>;
}

/// Session kept as pretty JSON in a single file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, PlatformError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), PlatformError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PlatformError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, PlatformError> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &Session) -> Result<(), PlatformError> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), PlatformError> {
        *self.slot() = None;
        Ok(())
    }
}

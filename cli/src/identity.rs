//! Anonymous identity bootstrap.
//!
//! A client votes and creates polls under one `anon_<12 hex>` id, generated
//! on first use and persisted so later runs keep the same identity (and so
//! remain the creator of polls they opened).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::info;
use uuid::Uuid;

const IDENTITY_DIR: &str = "anonpoll";
const IDENTITY_FILE: &str = "anon_id";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to read identity file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write identity file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("no data directory available; pass --identity-file")]
    NoDataDir,
}

/// Holds a single persisted identity string.
pub trait IdentityStore {
    /// Stored id, or `None` if nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<String>, IdentityError>;

    /// Replace the stored id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, anon_id: &str) -> Result<(), IdentityError>;
}

/// Identity persisted as a one-line text file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/anonpoll/anon_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NoDataDir`] when the platform has no data directory.
    pub fn default_location() -> Result<Self, IdentityError> {
        let dir = dirs::data_dir().ok_or(IdentityError::NoDataDir)?;
        Ok(Self::new(dir.join(IDENTITY_DIR).join(IDENTITY_FILE)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IdentityError::Read { path: self.path.clone(), source }),
        }
    }

    fn save(&self, anon_id: &str) -> Result<(), IdentityError> {
        let write_err = |source| IdentityError::Write { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.path, format!("{anon_id}\n")).map_err(write_err)
    }
}

/// Identity kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        let value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(value.clone().filter(|id| !id.trim().is_empty()))
    }

    fn save(&self, anon_id: &str) -> Result<(), IdentityError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(anon_id.to_owned());
        Ok(())
    }
}

/// Fresh `anon_` + 12 lowercase hex characters.
#[must_use]
pub fn generate_anon_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("anon_{}", &hex[..12])
}

/// Return the stored identity, generating and persisting one on first use.
///
/// # Errors
///
/// Propagates store read/write failures.
pub fn load_or_create(store: &impl IdentityStore) -> Result<String, IdentityError> {
    if let Some(existing) = store.load()? {
        return Ok(existing);
    }
    let anon_id = generate_anon_id();
    store.save(&anon_id)?;
    info!(%anon_id, "generated anonymous identity");
    Ok(anon_id)
}

/// Replace the stored identity with a fresh one.
///
/// # Errors
///
/// Propagates store write failures.
pub fn reset(store: &impl IdentityStore) -> Result<String, IdentityError> {
    let anon_id = generate_anon_id();
    store.save(&anon_id)?;
    info!(%anon_id, "reset anonymous identity");
    Ok(anon_id)
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

use std::sync::{MutexGuard, PoisonError};

use thiserror::Error;

/// Failure of a single generation run.
///
/// `E` is the oracle's own error type. It is carried verbatim so callers can
/// tell infrastructure failures apart from generation dead ends.
#[derive(Error, Debug)]
pub enum GenerationError<E: std::error::Error + 'static> {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Oracle(E),

    #[error("Generation exhausted for '{base}' after {checks} checks")]
    Exhausted { base: String, checks: usize },
}

impl<E: std::error::Error + 'static> GenerationError<E> {
    /// Returns the oracle error if this failure came from the oracle.
    pub fn into_oracle_error(self) -> Option<E> {
        match self {
            GenerationError::Oracle(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, GenerationError::Exhausted { .. })
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("RocksDB error: {0}")]
    RocksDb(String),

    #[error("Address already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError<DirectoryError>),

    #[error("Directory error: {0}")]
    Directory(DirectoryError),

    #[error("Address claim contended after {attempts} attempts")]
    Contended { attempts: usize },

    #[error("Dependent step failed, claim rolled back: {0}")]
    Dependent(String),
}

impl From<DirectoryError> for ProvisionError {
    fn from(e: DirectoryError) -> Self {
        ProvisionError::Directory(e)
    }
}

/// Extension trait for converting lock errors to DirectoryError.
pub trait LockResultExt<T> {
    /// Converts a lock error to a DirectoryError.
    fn map_lock_err(self) -> Result<T, DirectoryError>;
}

impl<'a, T> LockResultExt<MutexGuard<'a, T>>
    for Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<MutexGuard<'a, T>, DirectoryError> {
        self.map_err(|e| DirectoryError::LockPoisoned(e.to_string()))
    }
}

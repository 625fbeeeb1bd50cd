use std::future::Future;
use std::sync::Arc;

use crate::contracts::{AddressDirectory, DirectoryError, ExistenceOracle};

/// Existence oracle reading straight from an [`AddressDirectory`].
pub struct DirectoryOracle<D> {
    directory: Arc<D>,
}

impl<D: AddressDirectory> DirectoryOracle<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }
}

impl<D> Clone for DirectoryOracle<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<D: AddressDirectory> ExistenceOracle for DirectoryOracle<D> {
    type Error = DirectoryError;

    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, DirectoryError>> + Send {
        std::future::ready(self.directory.contains(address))
    }
}

pub mod directory;
pub mod error;
pub mod oracle;

pub use directory::{canonical_address, current_timestamp_ms, AddressDirectory, AddressRecord};
pub use error::{DirectoryError, GenerationError, LockResultExt, ProvisionError};
pub use oracle::{ExistenceOracle, FnOracle};

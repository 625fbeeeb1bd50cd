mod memory;
mod oracle;
mod retry;
mod rocksdb;

pub use memory::InMemoryDirectory;
pub use oracle::DirectoryOracle;
pub use retry::{is_transient_error, RetryConfig, RetryingOracle};
pub use rocksdb::RocksDbDirectory;

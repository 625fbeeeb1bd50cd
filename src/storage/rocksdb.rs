use std::path::Path;
use std::sync::Mutex;

use rocksdb::{Direction, IteratorMode, Options, ReadOptions, WriteOptions, DB};

use crate::contracts::{
    canonical_address, current_timestamp_ms, AddressDirectory, AddressRecord, DirectoryError,
    LockResultExt,
};

/// Key prefix for claimed addresses
const ADDRESS_PREFIX: &str = "addr";

/// RocksDB-backed address directory.
///
/// Claims survive restarts. A claim is a read followed by a write, so claims
/// are serialized through `claim_lock`; reads never take it.
pub struct RocksDbDirectory {
    db: DB,
    claim_lock: Mutex<()>,
}

impl RocksDbDirectory {
    /// Opens or creates a directory at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_dir(path.join("wal"));

        let db = DB::open(&opts, path).map_err(|e| DirectoryError::RocksDb(e.to_string()))?;
        tracing::info!(path = %path.display(), "Opened address directory");

        Ok(Self {
            db,
            claim_lock: Mutex::new(()),
        })
    }

    /// Key format: addr:{address}
    fn address_key(address: &str) -> String {
        format!("{}:{}", ADDRESS_PREFIX, address)
    }

    /// Claims must hit the WAL before they are acknowledged.
    fn write_options() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }

    fn serialize_record(record: &AddressRecord) -> Result<Vec<u8>, DirectoryError> {
        bincode::serialize(record).map_err(|e| DirectoryError::Serialization(e.to_string()))
    }

    fn deserialize_record(bytes: &[u8]) -> Result<AddressRecord, DirectoryError> {
        bincode::deserialize(bytes).map_err(|e| DirectoryError::Serialization(e.to_string()))
    }

    fn load(&self, key: &str) -> Result<Option<AddressRecord>, DirectoryError> {
        match self.db.get(key.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_record(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DirectoryError::RocksDb(e.to_string())),
        }
    }
}

impl AddressDirectory for RocksDbDirectory {
    fn claim(&self, address: &str, owner: &str) -> Result<AddressRecord, DirectoryError> {
        let address = canonical_address(address)?;
        let key = Self::address_key(&address);

        let _guard = self.claim_lock.lock().map_lock_err()?;
        if self.load(&key)?.is_some() {
            return Err(DirectoryError::AlreadyClaimed(address));
        }

        let record = AddressRecord {
            address,
            owner: owner.to_string(),
            claimed_at_ms: current_timestamp_ms(),
        };
        self.db
            .put_opt(
                key.as_bytes(),
                Self::serialize_record(&record)?,
                &Self::write_options(),
            )
            .map_err(|e| DirectoryError::RocksDb(e.to_string()))?;

        Ok(record)
    }

    fn release(&self, address: &str) -> Result<bool, DirectoryError> {
        let address = canonical_address(address)?;
        let key = Self::address_key(&address);

        let _guard = self.claim_lock.lock().map_lock_err()?;
        if self.load(&key)?.is_none() {
            return Ok(false);
        }
        self.db
            .delete_opt(key.as_bytes(), &Self::write_options())
            .map_err(|e| DirectoryError::RocksDb(e.to_string()))?;
        Ok(true)
    }

    fn get(&self, address: &str) -> Result<Option<AddressRecord>, DirectoryError> {
        let address = canonical_address(address)?;
        self.load(&Self::address_key(&address))
    }

    fn list(&self, domain: Option<&str>) -> Result<Vec<AddressRecord>, DirectoryError> {
        let prefix = format!("{}:", ADDRESS_PREFIX);
        let domain = domain.map(|d| d.trim().to_lowercase());

        let mut read_opts = ReadOptions::default();
        read_opts.fill_cache(false);
        let iter = self.db.iterator_opt(
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
            read_opts,
        );

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| DirectoryError::RocksDb(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let record = Self::deserialize_record(&value)?;
            if domain.as_deref().is_none_or(|d| record.domain() == Some(d)) {
                records.push(record);
            }
        }

        Ok(records)
    }
}

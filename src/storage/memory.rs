use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::contracts::{
    canonical_address, current_timestamp_ms, AddressDirectory, AddressRecord, DirectoryError,
};

/// In-process address directory.
///
/// Claims go through the DashMap entry API, which holds the shard lock for
/// the check and the insert.
#[derive(Default)]
pub struct InMemoryDirectory {
    records: DashMap<String, AddressRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory with `addresses` already claimed by `owner`.
    pub fn with_claimed<'a>(
        addresses: impl IntoIterator<Item = &'a str>,
        owner: &str,
    ) -> Result<Self, DirectoryError> {
        let directory = Self::new();
        for address in addresses {
            directory.claim(address, owner)?;
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AddressDirectory for InMemoryDirectory {
    fn claim(&self, address: &str, owner: &str) -> Result<AddressRecord, DirectoryError> {
        let address = canonical_address(address)?;
        match self.records.entry(address.clone()) {
            Entry::Occupied(_) => Err(DirectoryError::AlreadyClaimed(address)),
            Entry::Vacant(slot) => {
                let record = AddressRecord {
                    address,
                    owner: owner.to_string(),
                    claimed_at_ms: current_timestamp_ms(),
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    fn release(&self, address: &str) -> Result<bool, DirectoryError> {
        let address = canonical_address(address)?;
        Ok(self.records.remove(&address).is_some())
    }

    fn get(&self, address: &str) -> Result<Option<AddressRecord>, DirectoryError> {
        let address = canonical_address(address)?;
        Ok(self.records.get(&address).map(|r| r.value().clone()))
    }

    fn list(&self, domain: Option<&str>) -> Result<Vec<AddressRecord>, DirectoryError> {
        let domain = domain.map(|d| d.trim().to_lowercase());
        let mut records: Vec<AddressRecord> = self
            .records
            .iter()
            .filter(|r| domain.as_deref().is_none_or(|d| r.domain() == Some(d)))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(records)
    }
}

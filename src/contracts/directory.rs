use serde::{Deserialize, Serialize};

use crate::contracts::error::DirectoryError;

/// Store of issued mailbox addresses.
///
/// # Invariants
/// - At most one record per address; `claim` is the uniqueness constraint
/// - Addresses are compared lowercased
/// - `release` of an unknown address is not an error
pub trait AddressDirectory: Send + Sync {
    /// Atomically records `address` as owned by `owner`.
    /// Fails with `AlreadyClaimed` if the address is already present.
    fn claim(&self, address: &str, owner: &str) -> Result<AddressRecord, DirectoryError>;

    /// Removes a claim. Returns true if a record was removed.
    fn release(&self, address: &str) -> Result<bool, DirectoryError>;

    /// Looks up a claimed address.
    fn get(&self, address: &str) -> Result<Option<AddressRecord>, DirectoryError>;

    /// Returns true if the address is claimed.
    fn contains(&self, address: &str) -> Result<bool, DirectoryError> {
        Ok(self.get(address)?.is_some())
    }

    /// Lists claimed addresses sorted by address, optionally restricted to a domain.
    fn list(&self, domain: Option<&str>) -> Result<Vec<AddressRecord>, DirectoryError>;
}

/// A claimed address with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    pub owner: String,
    pub claimed_at_ms: i64,
}

impl AddressRecord {
    /// Domain part of the address, if it has one.
    pub fn domain(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(_, d)| d)
    }
}

/// Lowercases and validates an address for use as a directory key.
pub fn canonical_address(address: &str) -> Result<String, DirectoryError> {
    let trimmed = address.trim();
    match trimmed.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(trimmed.to_lowercase())
        }
        _ => Err(DirectoryError::InvalidAddress(address.to_string())),
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_address_lowercases() {
        assert_eq!(
            canonical_address(" JPerez@Example.org ").unwrap(),
            "jperez@example.org"
        );
    }

    #[test]
    fn canonical_address_rejects_malformed() {
        for bad in ["", "jperez", "@example.org", "jperez@", "a@b@c"] {
            assert!(
                matches!(canonical_address(bad), Err(DirectoryError::InvalidAddress(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn record_domain() {
        let record = AddressRecord {
            address: "asoto@example.org".into(),
            owner: "staff-1".into(),
            claimed_at_ms: 0,
        };
        assert_eq!(record.domain(), Some("example.org"));
    }
}

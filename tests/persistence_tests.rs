//! Restart tests for the RocksDB address directory.
//!
//! Claims must survive a reopen, otherwise a restarted service would hand out
//! addresses that are already in use.
//! Run with: cargo test --test persistence_tests

use std::sync::Arc;

use tempfile::TempDir;

use staffmail::contracts::{AddressDirectory, DirectoryError};
use staffmail::generator::AddressGenerator;
use staffmail::provisioning::{ProvisionConfig, Provisioner};
use staffmail::storage::RocksDbDirectory;
use staffmail::PersonName;

fn open_at(dir: &std::path::Path) -> RocksDbDirectory {
    RocksDbDirectory::open(dir).expect("Failed to open directory")
}

fn provisioner_at(dir: &std::path::Path) -> Provisioner<RocksDbDirectory> {
    Provisioner::new(
        Arc::new(open_at(dir)),
        AddressGenerator::new("example.org"),
        ProvisionConfig::default(),
    )
}

#[test]
fn claims_survive_clean_restart() {
    let dir = TempDir::new().unwrap();

    {
        let directory = open_at(dir.path());
        for i in 0..50 {
            directory
                .claim(&format!("user{}@example.org", i), &format!("staff-{}", i))
                .expect("claim should succeed");
        }
    }

    let directory = open_at(dir.path());
    let records = directory.list(None).unwrap();
    assert_eq!(records.len(), 50);
    assert_eq!(
        directory.get("user7@example.org").unwrap().unwrap().owner,
        "staff-7"
    );
    assert!(matches!(
        directory.claim("user7@example.org", "intruder"),
        Err(DirectoryError::AlreadyClaimed(_))
    ));
}

#[test]
fn releases_survive_restart() {
    let dir = TempDir::new().unwrap();

    {
        let directory = open_at(dir.path());
        directory.claim("asoto@example.org", "staff-1").unwrap();
        directory.claim("ansoto@example.org", "staff-2").unwrap();
        assert!(directory.release("asoto@example.org").unwrap());
    }

    let directory = open_at(dir.path());
    assert!(!directory.contains("asoto@example.org").unwrap());
    assert!(directory.contains("ansoto@example.org").unwrap());
}

#[tokio::test]
async fn generation_after_restart_continues_escalation() {
    let dir = TempDir::new().unwrap();
    let name = PersonName::new("Luis", "Rojas");

    {
        let p = provisioner_at(dir.path());
        for owner in ["a", "b", "c"] {
            p.provision(&name, owner).await.unwrap();
        }
    }

    let p = provisioner_at(dir.path());
    let record = p.provision(&name, "d").await.unwrap();
    assert_eq!(record.address, "lurojas3@example.org");
}

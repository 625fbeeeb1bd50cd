//! Unique corporate mailbox provisioning for municipal staff.
//!
//! [`generator`] derives an address from a person's name and escalates
//! through fixed fallbacks until an [`contracts::ExistenceOracle`] reports one
//! as free. [`provisioning`] claims the result in an
//! [`contracts::AddressDirectory`], and [`api`] serves both over HTTP.

pub mod api;
pub mod contracts;
pub mod generator;
pub mod metrics;
pub mod naming;
pub mod provisioning;
pub mod storage;

pub use generator::{generate_unique_local_part, AddressGenerator, GeneratedAddress};
pub use naming::PersonName;

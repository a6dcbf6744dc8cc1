//! Infrastructure layer: the state store, remote sync, CSV export, config.

pub mod config;
pub mod export;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod sync;

mod integration_tests;

pub use snapshot::{Snapshot, Table};
pub use store::{ActivityBus, BranchPatch, BranchRemoval, NewBranch, ReceiptStore};

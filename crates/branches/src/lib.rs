//! Branch accounts domain module.
//!
//! Every branch is a user account with the `Branch` role; the administrator is a
//! single account with the `Admin` role and no branch. This crate holds the
//! account aggregate and the in-memory directory used for lookups by id and
//! username (no IO, no HTTP, no storage).

pub mod directory;
pub mod user;

pub use directory::UserDirectory;
pub use user::{
    BranchRemoved, BranchUpdated, RegisterUser, RemoveBranch, UpdateBranch, User, UserCommand,
    UserEvent, UserRecord, UserRegistered, UserRole,
};

//! # StayNest Shared Library
//!
//! This crate contains shared types, storage abstractions, and business logic
//! used across the StayNest API server and the cascade watcher.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `store`: The record store abstraction (Postgres and in-memory)
//! - `db`: Connection pool and migration helpers
//! - `reconcile`: Identity/membership consistency repair
//! - `enroll`: Membership enrollment
//! - `sweep`: Orphaned-membership sweep
//! - `payments`: Polymorphic payment join resolver
//! - `error`: Common error types

pub mod db;
pub mod enroll;
pub mod error;
pub mod models;
pub mod payments;
pub mod reconcile;
pub mod store;
pub mod sweep;

pub use error::{CoreError, StoreError};

/// Current version of the StayNest shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

//! # StayNest Watcher Library
//!
//! This library provides the cascade-delete watcher that keeps Memberships
//! consistent with Identity deletions, plus the periodic sweep scheduler
//! used when the store has no change feed.
//!
//! ## Modules
//!
//! - `watcher`: Delete-feed subscription, cascade deletes, degraded mode
//! - `scheduler`: Fixed-interval orphan sweeps
//! - `config`: Environment configuration

pub mod config;
pub mod scheduler;
pub mod watcher;

//! # StayNest API Library
//!
//! This library provides the HTTP surface for StayNest: account sign-up
//! and deletion, membership purchase and status, reconciled profiles, the
//! resolved payment listing, and the on-demand orphan sweep.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `routes`: Route handlers by resource
//! - `config`: Environment configuration
//! - `error`: HTTP error mapping

pub mod app;
pub mod config;
pub mod error;
pub mod routes;

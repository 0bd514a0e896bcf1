//! Client-side data-synchronization layer for the MakerLink marketplace.
//!
//! MakerLink connects workers, startups and manufacturers around gigs (jobs)
//! and machines (equipment rentals). This crate is the layer between a UI
//! and the REST backend: per-domain entity caches with race-safe fetch
//! reconciliation, pure derived-view selectors, a persisted session state
//! machine and a capped notification log. It renders nothing and owns no
//! process surface; build a [`client::MakerLink`] and hand its stores to
//! whatever front end is driving.

pub mod api;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod persist;

pub use client::MakerLink;
pub use config::ClientConfig;
pub use error::ApiError;

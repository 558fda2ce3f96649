//! Shared tracing setup for binaries and tests.
//!
//! The libraries only emit `tracing` events; installing a subscriber is left
//! to whoever owns the process.

pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, init, init_for_tests};

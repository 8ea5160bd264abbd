//! Integration test suite.
//!
//! 1. Dirty tracking through the public API
//! 2. Persistence through a repository and the in-memory store

pub mod dirty_tracking_tests;
pub mod helpers;
pub mod persistence_tests;

//! Integration tests - listing and sync end to end
//!
//! The Gremlin server is replaced by a mocked executor for listings and by the
//! in-memory graph store for imports, so nothing here needs a running server.

mod common;
mod listing_tests;
mod sync_tests;

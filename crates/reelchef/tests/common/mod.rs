//! Shared test utilities for reelchef integration tests.
//!
//! This module provides:
//! - `TestApp`, a fully wired service over an in-memory database
//! - Scriptable fetcher and extractor doubles with call counters
//! - Builders for recipe drafts and fetched videos

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;

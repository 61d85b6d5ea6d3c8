//! Shared test utilities for contentforge integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temp data directory, an in-memory database and
//!   the managers wired around a scripted AI processor
//! - Builders for content items and attempts

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{Reply, ScriptedProcessor, TestHarness};

//! Integration tests for rust-sqlscope
//!
//! This file serves as the entry point for all integration tests.

#[path = "common/mod.rs"]
mod common;

#[path = "integration/analyze_tests.rs"]
mod analyze_tests;

#[path = "integration/offload_tests.rs"]
mod offload_tests;

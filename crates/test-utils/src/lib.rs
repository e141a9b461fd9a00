//! Shared test utilities for the sar-tiles workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Workspace path helpers
//! - Synthetic Sentinel-1 archives
//! - Fake tiling tools that stand in for `gdal2tiles`
//! - Scratch workspaces laid out like a real deployment
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{sentinel_archive, write_fake_tool, FakeTool, TestWorkspace};
//! ```

pub mod archives;
pub mod fixtures;
pub mod paths;
pub mod tools;

// Re-export commonly used items at the crate root
pub use archives::*;
pub use fixtures::*;
pub use paths::*;
pub use tools::*;

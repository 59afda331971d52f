//! # GitHub Provider
//!
//! Implements `RemoteSnapshotStore` on top of the GitHub repository
//! contents API.
//!
//! ## Overview
//!
//! The snapshot is one JSON file in a user-owned repository. Each revision
//! is identified by its blob SHA, which doubles as the optimistic-concurrency
//! token: uploads send the SHA they expect to replace and GitHub rejects the
//! write if the file moved on.
//!
//! This module provides:
//! - Fetch with base64 decoding and a raw-download fallback for large files
//! - Conditional upload keyed on the previous blob SHA
//! - Status code mapping onto the remote store failure classes
//! - Exponential backoff for rate limiting and server errors

pub mod error;
pub mod store;
pub mod types;

pub use error::{GitHubError, Result};
pub use store::{GitHubSnapshotStore, DEFAULT_API_BASE};

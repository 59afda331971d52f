//! Workspace umbrella crate.
//!
//! Re-exports the `core-service` façade behind the `desktop-shims` feature so
//! host applications can depend on `tunesync-workspace` alone.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the sync crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! the validated [`config::CoreConfig`] and the [`events::EventBus`] used to
//! report sync progress to the host UI.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

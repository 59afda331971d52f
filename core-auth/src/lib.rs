//! # Authentication Module
//!
//! Storage of the credential used to read and write the remote snapshot.
//!
//! ## Overview
//!
//! The sync engine needs exactly one secret: an access token for the remote
//! store. This crate keeps it in the platform secure store, redacts it from
//! every `Debug` output, and offers the idempotent `clear` the sync engine
//! calls when the remote rejects the token.

pub mod credential_store;
pub mod error;
pub mod types;

pub use credential_store::{CredentialStore, DEFAULT_CREDENTIAL_KEY};
pub use error::{AuthError, Result};
pub use types::SyncCredential;

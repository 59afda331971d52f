use serde::{Deserialize, Serialize};
use std::fmt;

/// Access credential for the remote snapshot store.
///
/// For GitHub this is a personal access token with `contents` write
/// permission on the sync repository.
///
/// # Security
///
/// `Debug` never prints the token.
///
/// # Examples
///
/// ```
/// use core_auth::SyncCredential;
///
/// let credential = SyncCredential::new("ghp_example", 1_700_000_000_000)
///     .with_account("octocat");
/// assert!(!format!("{:?}", credential).contains("ghp_example"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCredential {
    token: String,
    #[serde(default)]
    account: Option<String>,
    /// Epoch millis when the credential was stored.
    #[serde(default)]
    stored_at: i64,
}

impl SyncCredential {
    pub fn new(token: impl Into<String>, stored_at: i64) -> Self {
        Self {
            token: token.into(),
            account: None,
            stored_at,
        }
    }

    /// Attach the account login the token belongs to (informational).
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn stored_at(&self) -> i64 {
        self.stored_at
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err("token is empty".to_string());
        }
        if token.chars().any(char::is_whitespace) {
            return Err("token contains whitespace".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for SyncCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCredential")
            .field("token", &"[REDACTED]")
            .field("account", &self.account)
            .field("stored_at", &self.stored_at)
            .finish()
    }
}

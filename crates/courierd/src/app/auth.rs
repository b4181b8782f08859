//! Caller authentication.

use courier_core::ProcedureError;
use serde::Serialize;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Display name.
    pub name: String,
}

impl User {
    /// Builds a user with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Resolves the caller from an authorisation token.
pub trait Authenticator: Send + Sync {
    /// Returns the user the token identifies, or `None` for an unknown token.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup itself fails. The call is then
    /// rejected before any procedure runs.
    fn authenticate(&self, token: &str) -> Result<Option<User>, ProcedureError>;
}

/// Authenticator accepting one fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    token: String,
    user: User,
}

impl StaticTokenAuthenticator {
    /// Accepts `token` as identifying `user`.
    #[must_use]
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

impl Default for StaticTokenAuthenticator {
    fn default() -> Self {
        Self::new("secret", User::new("alex"))
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Option<User>, ProcedureError> {
        Ok((token == self.token).then(|| self.user.clone()))
    }
}

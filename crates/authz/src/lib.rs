//! Bearer-token authentication and scope checks.
//!
//! Tokens come from configuration and stand in for an external identity
//! provider. Authentication resolves a token to a [`Caller`]; authorization is
//! a pure function of the caller and the scope an operation demands.

use std::collections::HashMap;

use thiserror::Error;

use biblio_kernel::settings::AuthSettings;

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject: String,
    pub scopes: Vec<String>,
}

impl Caller {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|held| held == scope)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("missing or invalid bearer credential")]
    Unauthenticated,

    #[error("credential lacks required scope '{0}'")]
    MissingScope(&'static str),
}

/// Validates presented bearer tokens against the configured token table.
pub struct TokenAuthenticator {
    tokens: HashMap<String, Caller>,
}

impl TokenAuthenticator {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        let tokens = settings
            .tokens
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    Caller {
                        subject: entry.subject.clone(),
                        scopes: entry.scopes.clone(),
                    },
                )
            })
            .collect();

        Self { tokens }
    }

    /// Resolve a presented token to its caller, if the token is known.
    pub fn authenticate(&self, token: &str) -> Option<Caller> {
        let caller = self.tokens.get(token).cloned();
        if caller.is_none() {
            tracing::debug!("rejected unknown bearer token");
        }
        caller
    }
}

/// Require that the caller holds `scope`.
pub fn require_scope(caller: &Caller, scope: &'static str) -> Result<(), AuthzError> {
    if caller.has_scope(scope) {
        Ok(())
    } else {
        Err(AuthzError::MissingScope(scope))
    }
}

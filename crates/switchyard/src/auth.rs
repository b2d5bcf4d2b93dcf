//! Caller authentication as seen by the guard stage.
//!
//! The guard asks an [`Auth`] provider for the caller's rank and identity.
//! Providers read whatever they need from the request; session storage and
//! credential verification live outside the kernel.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http::Request;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable caller identifier.
    pub id: String,
    /// Access rank granted to the caller.
    pub rank: u32,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub fn new(id: impl Into<String>, rank: u32) -> Self {
        Self {
            id: id.into(),
            rank,
        }
    }
}

/// Authentication provider consulted by the guard stage.
pub trait Auth: Send + Sync {
    /// Access rank of the caller; `0` for anonymous callers.
    fn rank(&self, request: &Request) -> u32;

    /// Returns `true` when the caller is authenticated.
    fn valid(&self, request: &Request) -> bool;

    /// Identity of an authenticated caller.
    fn user(&self, request: &Request) -> Option<Identity>;
}

impl<T: Auth + ?Sized> Auth for Arc<T> {
    fn rank(&self, request: &Request) -> u32 {
        (**self).rank(request)
    }

    fn valid(&self, request: &Request) -> bool {
        (**self).valid(request)
    }

    fn user(&self, request: &Request) -> Option<Identity> {
        (**self).user(request)
    }
}

/// Treats every caller as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Auth for Anonymous {
    fn rank(&self, _request: &Request) -> u32 {
        0
    }

    fn valid(&self, _request: &Request) -> bool {
        false
    }

    fn user(&self, _request: &Request) -> Option<Identity> {
        None
    }
}

/// Maps bearer tokens from the `authorization` header to identities.
#[derive(Clone, Default)]
pub struct TokenAuth {
    tokens: HashMap<String, Identity>,
}

impl TokenAuth {
    /// Creates a provider with no known tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `identity` to callers presenting `token`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    fn lookup(&self, request: &Request) -> Option<&Identity> {
        let header = request.header("authorization")?;
        let token = header.strip_prefix("Bearer ")?.trim();
        self.tokens.get(token)
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenAuth")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl Auth for TokenAuth {
    fn rank(&self, request: &Request) -> u32 {
        self.lookup(request).map_or(0, |identity| identity.rank)
    }

    fn valid(&self, request: &Request) -> bool {
        self.lookup(request).is_some()
    }

    fn user(&self, request: &Request) -> Option<Identity> {
        self.lookup(request).cloned()
    }
}

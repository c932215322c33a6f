//! Protocol traits for search sources and authentication.
//!
//! The pipeline only sees these traits, so the code search backend and the
//! login strategy can be swapped without touching extraction or filtering.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::errors::Result;
use crate::models::SearchResultRecord;

/// An authenticated session with the search system.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
    authorization: Option<String>,
}

impl Session {
    /// A session that sends no credentials.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session using HTTP basic authentication.
    #[must_use]
    pub fn basic(username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{username}:{password}"));
        Self {
            user: Some(username.to_string()),
            authorization: Some(format!("Basic {token}")),
        }
    }

    /// A session using a bearer token (personal access token).
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self {
            user: None,
            authorization: Some(format!("Bearer {token}")),
        }
    }

    /// The `Authorization` header value, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// The user name the session was opened for, if known.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Strategy for obtaining a session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Opens a session. May block on user interaction.
    async fn authenticate(&self) -> Result<Session>;
}

/// Authenticator that never sends credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self) -> Result<Session> {
        Ok(Session::anonymous())
    }
}

/// Username/password authenticator using HTTP basic auth.
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    /// Creates a basic authenticator.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn authenticate(&self) -> Result<Session> {
        if self.username.is_empty() {
            return Err(crate::errors::DeplinksError::Authentication(
                "username is empty".to_string(),
            ));
        }
        Ok(Session::basic(&self.username, &self.password))
    }
}

/// A source of code search results for project keys.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetches every search result for a project key.
    ///
    /// An unknown key with no results is `Ok(vec![])`, not an error.
    async fn fetch_search_results(&self, project_key: &str) -> Result<Vec<SearchResultRecord>>;
}

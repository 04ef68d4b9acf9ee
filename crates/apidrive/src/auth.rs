//! Per-client credential store.

use std::collections::HashMap;
use std::fmt;

/// Credentials supplied for one security scheme.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key, bearer token or OAuth2/OpenID Connect access token.
    Token(String),
    /// Username and password for `http` basic or digest schemes.
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::Basic { .. } => "username/password",
        }
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

impl From<&str> for Credentials {
    fn from(token: &str) -> Self {
        Credentials::Token(token.to_string())
    }
}

impl From<String> for Credentials {
    fn from(token: String) -> Self {
        Credentials::Token(token)
    }
}

impl<U: Into<String>, P: Into<String>> From<(U, P)> for Credentials {
    fn from((username, password): (U, P)) -> Self {
        Credentials::basic(username, password)
    }
}

/// Credentials by security scheme name. Owned by one client instance.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    credentials: HashMap<String, Credentials>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials for `scheme`, replacing any previous ones.
    pub fn set(&mut self, scheme: impl Into<String>, credentials: Credentials) {
        self.credentials.insert(scheme.into(), credentials);
    }

    pub fn get(&self, scheme: &str) -> Option<&Credentials> {
        self.credentials.get(scheme)
    }

    pub fn remove(&mut self, scheme: &str) -> Option<Credentials> {
        self.credentials.remove(scheme)
    }

    pub fn clear(&mut self) {
        self.credentials.clear();
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.credentials.contains_key(scheme)
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

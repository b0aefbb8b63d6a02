//! HTTP Basic authentication for the console.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::context::ConsoleUser;

const AUTH_PREFIX: &str = "Basic ";

/// Realm announced in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "Job Lifecycle Console";

/// A console login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Administrator login
    #[serde(default = "default_root")]
    pub root: Account,
    /// Read-mostly login
    #[serde(default = "default_guest")]
    pub guest: Account,
    /// Extra tenant logins
    #[serde(default)]
    pub accounts: Vec<Account>,
}

fn default_root() -> Account {
    Account::new("root", "root")
}

fn default_guest() -> Account {
    Account::new("guest", "guest")
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            guest: default_guest(),
            accounts: Vec::new(),
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or not a Basic one
    Unauthenticated,
    /// The Basic payload is not base64 `username:password`
    MalformedCredentials,
    /// No account matches
    InvalidCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Authentication required"),
            Self::MalformedCredentials => write!(f, "Malformed credentials"),
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Hex SHA-256 digest of `username:password`.
pub fn credential_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves `Authorization` headers into console users.
pub struct AuthExtractor {
    // credential digest -> username
    accounts: HashMap<String, String>,
}

impl AuthExtractor {
    pub fn new(config: &AuthConfig) -> Self {
        let mut accounts = HashMap::new();
        let all = [&config.root, &config.guest]
            .into_iter()
            .chain(config.accounts.iter());
        for account in all {
            // Accounts with neither a name nor a password are placeholders.
            if account.username.is_empty() && account.password.is_empty() {
                continue;
            }
            accounts.insert(
                credential_digest(&account.username, &account.password),
                account.username.clone(),
            );
        }
        Self { accounts }
    }

    /// Number of usable logins.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Check a raw `Authorization` header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<ConsoleUser, AuthError> {
        let encoded = authorization
            .and_then(|header| header.strip_prefix(AUTH_PREFIX))
            .filter(|encoded| !encoded.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::MalformedCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;

        match self.accounts.get(&credential_digest(username, password)) {
            Some(name) => {
                debug!("Authenticated console user {}", name);
                Ok(ConsoleUser::new(name.clone()))
            }
            None => Err(AuthError::InvalidCredentials),
        }
    }
}

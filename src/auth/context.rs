//! Identity of an authenticated console caller.

use serde::{Deserialize, Serialize};

/// Caller resolved from request credentials.
///
/// The username is passed through as the tenant of every lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleUser {
    username: String,
}

impl ConsoleUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Tenant to scope registry paths by, `None` for an empty username.
    pub fn tenant(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_is_username() {
        let user = ConsoleUser::new("alice");
        assert_eq!(user.username(), "alice");
        assert_eq!(user.tenant(), Some("alice"));
    }

    #[test]
    fn test_empty_username_has_no_tenant() {
        assert_eq!(ConsoleUser::new("").tenant(), None);
    }
}

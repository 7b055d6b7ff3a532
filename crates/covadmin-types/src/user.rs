use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ============================================================================
// Users
// ============================================================================

/// Read-only projection of an account as the server reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub super_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Exact match after Unicode lowercasing of both sides.
    pub fn has_email(&self, email: &str) -> bool {
        let wanted = email.trim().to_lowercase();
        self.email
            .as_deref()
            .is_some_and(|e| e.trim().to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchResult {
    pub total_count: u64,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// Payload for the remote `createUser` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub username: String,
    pub domain: String,
    pub group_names: Vec<String>,
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSearchResult {
    pub total_count: u64,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_email_ignores_case() {
        let mut user = UserRecord::new("jdoe");
        user.email = Some("JDoe@Example.com".to_string());
        assert!(user.has_email("jdoe@example.com"));
        assert!(!user.has_email("jdoe@example.org"));
        assert!(!UserRecord::new("nobody").has_email("jdoe@example.com"));
    }

    #[test]
    fn test_has_email_folds_non_ascii_case() {
        let mut user = UserRecord::new("jorg");
        user.email = Some("JÖRG@Example.de".to_string());
        assert!(user.has_email("jörg@example.de"));
        assert!(user.has_email(" JÖRG@EXAMPLE.DE "));
        assert!(!user.has_email("jorg@example.de"));
    }

    #[test]
    fn test_json_skips_absent_fields() {
        let user = UserRecord::new("jdoe");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "jdoe");
        assert!(json.get("email").is_none());
        assert_eq!(json["groups"], serde_json::json!([]));
    }
}

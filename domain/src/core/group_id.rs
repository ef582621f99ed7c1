//! Group identifier value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Sanitized identifier of one distortion group (Value Object)
///
/// Raw identifiers such as `dir-AP` are sanitized to `dir_AP` so they can be
/// used as a prefix in slot names (`dir_AP_image`, `dir_AP_bval`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Sanitize and validate a raw group identifier
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = raw.as_ref();
        let sanitized = Self::sanitize(raw);
        if sanitized.is_empty() {
            return Err(DomainError::validation(
                "<groups>",
                "group identifier cannot be empty",
            ));
        }
        if sanitized.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                raw,
                "group identifier cannot contain whitespace",
            ));
        }
        Ok(Self(sanitized))
    }

    /// Apply the identifier sanitization rule without validating
    pub fn sanitize(raw: &str) -> String {
        raw.trim().replace('-', "_")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GroupId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        GroupId::new(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitizes_dashes() {
        let id = GroupId::new("dir-AP").unwrap();
        assert_eq!(id.as_str(), "dir_AP");
        assert_eq!(id.to_string(), "dir_AP");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(GroupId::new("   ").unwrap_err().is_validation());
    }

    #[test]
    fn test_rejects_inner_whitespace() {
        assert!(GroupId::new("run 1").is_err());
    }

    #[test]
    fn test_serde_roundtrip_sanitizes() {
        let id: GroupId = serde_json::from_str("\"run-02\"").unwrap();
        assert_eq!(id.as_str(), "run_02");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"run_02\"");
    }
}

//! Identifiers for declared objects and their type descriptor

use crate::spec::SpecValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest namespace or name accepted
pub const MAX_NAME_LEN: usize = 63;

/// Whether `value` is a lowercase RFC 1123 label
///
/// Lowercase alphanumerics and `-`, starting and ending with an
/// alphanumeric, at most [`MAX_NAME_LEN`] characters.
pub fn is_dns_label(value: &str) -> bool {
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) => {
            bytes.len() <= MAX_NAME_LEN
                && alnum(first)
                && alnum(last)
                && bytes.iter().all(|&b| alnum(b) || b == b'-')
        }
        _ => false,
    }
}

/// Namespaced name of a declared object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Check that both parts are DNS labels
    ///
    /// Keys name files and directories in status mirrors, so anything
    /// else is rejected.
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        for (field, value) in [("namespace", &self.namespace), ("name", &self.name)] {
            if !is_dns_label(value) {
                return Err(SpecValidationError::InvalidName {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Type descriptor of a declared object
///
/// Passed explicitly to whatever needs to recognise the object type instead
/// of being registered in process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ObjectKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// `group/version`, as written in an object's `apiVersion`
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Whether an object's `apiVersion`/`kind` pair names this type
    pub fn matches(&self, api_version: &str, kind: &str) -> bool {
        self.kind == kind && self.api_version() == api_version
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::new("default", "frontend");
        assert_eq!(key.to_string(), "default/frontend");
    }

    #[test]
    fn test_dns_labels() {
        let longest = "x".repeat(MAX_NAME_LEN);
        let too_long = "x".repeat(MAX_NAME_LEN + 1);
        for valid in ["ci", "shop", "team-a", "a", "0day", longest.as_str()] {
            assert!(is_dns_label(valid), "{valid:?} should be accepted");
        }
        for invalid in [
            "",
            "..",
            ".",
            "../../escaped",
            "a/b",
            "a\\b",
            "-shop",
            "shop-",
            "Shop",
            "shop.v2",
            "shop_v2",
            too_long.as_str(),
        ] {
            assert!(!is_dns_label(invalid), "{invalid:?} should be rejected");
        }
    }

    #[test]
    fn test_key_validation() {
        assert!(ObjectKey::new("ci", "shop").validate().is_ok());
        assert_eq!(
            ObjectKey::new("ci", "../../escaped").validate(),
            Err(SpecValidationError::InvalidName {
                field: "name",
                value: "../../escaped".into(),
            })
        );
        assert!(matches!(
            ObjectKey::new("..", "shop").validate(),
            Err(SpecValidationError::InvalidName { field: "namespace", .. })
        ));
    }

    #[test]
    fn test_kind_matches_api_version() {
        let kind = ObjectKind::new("templates.deploylist.dev", "v1alpha1", "ListGithubDeployments");
        assert_eq!(kind.api_version(), "templates.deploylist.dev/v1alpha1");
        assert!(kind.matches("templates.deploylist.dev/v1alpha1", "ListGithubDeployments"));
        assert!(!kind.matches("templates.deploylist.dev/v1", "ListGithubDeployments"));
        assert!(!kind.matches("templates.deploylist.dev/v1alpha1", "ListGithubPullRequests"));
    }

    #[test]
    fn test_core_group_api_version() {
        let kind = ObjectKind::new("", "v1", "Secret");
        assert_eq!(kind.api_version(), "v1");
    }
}

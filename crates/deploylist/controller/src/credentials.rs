//! Resolution of secret references into bearer tokens

use async_trait::async_trait;
use deploylist_types::{is_path_segment, SecretRef};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised while resolving a token
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("key {key} not found in secret {namespace}/{name}")]
    KeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("secret reference {namespace}/{name}[{key}] does not name an entry in its namespace")]
    InvalidReference {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("failed to read secret {namespace}/{name}: {source}")]
    Io {
        namespace: String,
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for credential resolution
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Resolves a secret reference in a namespace to a token string
///
/// An empty token is a valid answer and means anonymous access.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn secret_token(&self, namespace: &str, secret: &SecretRef) -> CredentialResult<String>;
}

/// Secrets held in memory, keyed by namespace and name
#[derive(Debug, Default)]
pub struct InMemorySecrets {
    secrets: RwLock<HashMap<(String, String), HashMap<String, String>>>,
}

impl InMemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one key of a secret
    pub fn insert(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        secrets
            .entry((namespace.into(), name.into()))
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Remove a whole secret
    pub fn remove(&self, namespace: &str, name: &str) -> bool {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        secrets
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some()
    }
}

#[async_trait]
impl CredentialResolver for InMemorySecrets {
    async fn secret_token(&self, namespace: &str, secret: &SecretRef) -> CredentialResult<String> {
        let secrets = self.secrets.read().unwrap_or_else(|e| e.into_inner());
        let data = secrets
            .get(&(namespace.to_string(), secret.secret_name.clone()))
            .ok_or_else(|| CredentialError::SecretNotFound {
                namespace: namespace.to_string(),
                name: secret.secret_name.clone(),
            })?;

        data.get(&secret.key)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| CredentialError::KeyNotFound {
                namespace: namespace.to_string(),
                name: secret.secret_name.clone(),
                key: secret.key.clone(),
            })
    }
}

/// Secrets mounted as files under `<root>/<namespace>/<name>/<key>`
#[derive(Debug, Clone)]
pub struct DirectorySecrets {
    root: PathBuf,
}

impl DirectorySecrets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CredentialResolver for DirectorySecrets {
    async fn secret_token(&self, namespace: &str, secret: &SecretRef) -> CredentialResult<String> {
        if ![namespace, secret.secret_name.as_str(), secret.key.as_str()]
            .into_iter()
            .all(is_path_segment)
        {
            return Err(CredentialError::InvalidReference {
                namespace: namespace.to_string(),
                name: secret.secret_name.clone(),
                key: secret.key.clone(),
            });
        }

        let secret_dir = self.root.join(namespace).join(&secret.secret_name);
        let io_error = |source| CredentialError::Io {
            namespace: namespace.to_string(),
            name: secret.secret_name.clone(),
            source,
        };

        match tokio::fs::metadata(&secret_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CredentialError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: secret.secret_name.clone(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CredentialError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: secret.secret_name.clone(),
                })
            }
            Err(e) => return Err(io_error(e)),
        }

        match tokio::fs::read_to_string(secret_dir.join(&secret.key)).await {
            Ok(token) => Ok(token.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CredentialError::KeyNotFound {
                namespace: namespace.to_string(),
                name: secret.secret_name.clone(),
                key: secret.key.clone(),
            }),
            Err(e) => Err(io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_resolves_key() {
        let secrets = InMemorySecrets::new();
        secrets.insert("ci", "github", "token", "abc123\n");

        let token = secrets
            .secret_token("ci", &SecretRef::new("github"))
            .await
            .unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn test_in_memory_missing_secret_and_key() {
        let secrets = InMemorySecrets::new();
        secrets.insert("ci", "github", "token", "abc123");

        let err = secrets
            .secret_token("other", &SecretRef::new("github"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::SecretNotFound { .. }));
        assert_eq!(err.to_string(), "secret other/github not found");

        let err = secrets
            .secret_token("ci", &SecretRef::new("github").with_key("password"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::KeyNotFound { .. }));

        assert!(secrets.remove("ci", "github"));
        assert!(secrets
            .secret_token("ci", &SecretRef::new("github"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_directory_secrets() {
        let root = tempfile::tempdir().unwrap();
        let secret_dir = root.path().join("ci").join("github");
        std::fs::create_dir_all(&secret_dir).unwrap();
        std::fs::write(secret_dir.join("token"), "ghp_example\n").unwrap();

        let resolver = DirectorySecrets::new(root.path());
        let token = resolver
            .secret_token("ci", &SecretRef::new("github"))
            .await
            .unwrap();
        assert_eq!(token, "ghp_example");

        let err = resolver
            .secret_token("ci", &SecretRef::new("gitlab"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::SecretNotFound { .. }));

        let err = resolver
            .secret_token("ci", &SecretRef::new("github").with_key("other"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::KeyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_directory_secrets_stay_in_namespace() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("team-a").join("own")).unwrap();
        let foreign = root.path().join("team-b").join("prod-token");
        std::fs::create_dir_all(&foreign).unwrap();
        std::fs::write(foreign.join("token"), "ghp_team_b_secret").unwrap();

        let resolver = DirectorySecrets::new(root.path());
        let escaping = [
            SecretRef::new("../team-b/prod-token"),
            SecretRef::new("own").with_key("../../team-b/prod-token/token"),
            SecretRef::new(".."),
        ];
        for secret in escaping {
            let err = resolver.secret_token("team-a", &secret).await.unwrap_err();
            assert!(
                matches!(err, CredentialError::InvalidReference { .. }),
                "{secret} resolved outside team-a: {err}"
            );
        }

        let err = resolver
            .secret_token("..", &SecretRef::new("team-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidReference { .. }));

        // The same secret is still reachable from its own namespace
        let token = resolver
            .secret_token("team-b", &SecretRef::new("prod-token"))
            .await
            .unwrap();
        assert_eq!(token, "ghp_team_b_secret");
    }
}

//! The declared `ListGithubDeployments` object

use crate::ids::{ObjectKey, ObjectKind};
use crate::spec::{ListDeploymentsSpec, SpecValidationError};
use crate::status::ListDeploymentsStatus;
use serde::{Deserialize, Serialize};

/// API group of deploylist objects
pub const GROUP: &str = "templates.deploylist.dev";

/// API version of deploylist objects
pub const VERSION: &str = "v1alpha1";

/// Kind name of the deployment listing object
pub const KIND: &str = "ListGithubDeployments";

/// Object metadata maintained by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Incremented by the store whenever the spec changes
    #[serde(default)]
    pub generation: i64,

    /// Incremented by the store on every write
    #[serde(default)]
    pub resource_version: u64,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            generation: 0,
            resource_version: 0,
        }
    }
}

/// Mirrors the deployments of a GitHub repository into its status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGithubDeployments {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    pub metadata: ObjectMeta,

    pub spec: ListDeploymentsSpec,

    #[serde(default)]
    pub status: ListDeploymentsStatus,
}

fn default_api_version() -> String {
    format!("{}/{}", GROUP, VERSION)
}

fn default_kind() -> String {
    KIND.to_string()
}

impl ListGithubDeployments {
    /// Type descriptor of this object
    pub fn object_kind() -> ObjectKind {
        ObjectKind::new(GROUP, VERSION, KIND)
    }

    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: ListDeploymentsSpec,
    ) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: ListDeploymentsStatus::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Validate the object's key and spec
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        self.key().validate()?;
        self.spec.validate()
    }

    pub fn generation(&self) -> i64 {
        self.metadata.generation
    }

    /// Whether the `Ready` condition reflects the current spec
    pub fn is_observed(&self) -> bool {
        self.status
            .ready()
            .is_some_and(|c| c.observed_generation == self.metadata.generation)
    }
}

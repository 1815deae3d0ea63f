use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod plan;
mod value;

pub use plan::{OrderedPlan, PlanRecord, ProviderRecord};
pub use value::{AttributeName, Config, ConfigValue, ContentDigest, OutputReference, TemplatePart};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainValidationError {
    #[error("node name must not be empty")]
    EmptyNodeName,
    #[error("node name \"{name}\" may only contain ASCII letters, digits, '-' and '_'")]
    InvalidNodeName { name: String },
    #[error("content digest must be 64 lowercase hex characters, got \"{value}\"")]
    InvalidDigest { value: String },
}

/// Identifies the stack a node or reference belongs to.
///
/// Scope ids are unique per process. `StackId::DETACHED` is used for
/// references that were deserialized rather than minted by a live stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct StackId(u64);

impl StackId {
    pub const DETACHED: Self = Self(0);

    #[must_use]
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "stack#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeName(String);

impl NodeName {
    /// Create a node name, rejecting blank names and characters outside
    /// `[A-Za-z0-9_-]`.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is blank or contains other characters.
    pub fn new(name: String) -> Result<Self, DomainValidationError> {
        if name.trim().is_empty() {
            return Err(DomainValidationError::EmptyNodeName);
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(DomainValidationError::InvalidNodeName { name });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeName {
    type Error = DomainValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NodeName {
    type Error = DomainValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for NodeName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

impl From<NodeName> for String {
    fn from(value: NodeName) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Upstash,
    Aws,
    Docker,
}

impl ProviderKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Upstash => "upstash",
            Self::Aws => "aws",
            Self::Docker => "docker",
        }
    }

    /// Registry address of the provider plugin.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::Upstash => "upstash/upstash",
            Self::Aws => "hashicorp/aws",
            Self::Docker => "kreuzwerker/docker",
        }
    }

    #[must_use]
    pub const fn version(self) -> &'static str {
        match self {
            Self::Upstash => "~> 1.5.2",
            Self::Aws => "~> 5.37.0",
            Self::Docker => "~> 3.0.2",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    CacheDatabase,
    RegistryAuthorization,
    ContainerRepository,
    ImageBuild,
    RegistryPublish,
    ComputeFunction,
    PublicInvokeEndpoint,
    AccessRole,
    RolePolicyBinding,
}

/// Options a resource kind accepts and the attributes it is known to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

impl ResourceSchema {
    #[must_use]
    pub fn recognizes(&self, option: &str) -> bool {
        self.required.contains(&option) || self.optional.contains(&option)
    }

    #[must_use]
    pub fn exposes(&self, attribute: &str) -> bool {
        self.outputs.contains(&attribute)
    }
}

impl ResourceKind {
    pub const ALL: [Self; 9] = [
        Self::CacheDatabase,
        Self::RegistryAuthorization,
        Self::ContainerRepository,
        Self::ImageBuild,
        Self::RegistryPublish,
        Self::ComputeFunction,
        Self::PublicInvokeEndpoint,
        Self::AccessRole,
        Self::RolePolicyBinding,
    ];

    /// The provider that must be configured on a stack before nodes of this
    /// kind can be declared.
    #[must_use]
    pub const fn provider(self) -> ProviderKind {
        match self {
            Self::CacheDatabase => ProviderKind::Upstash,
            Self::ImageBuild | Self::RegistryPublish => ProviderKind::Docker,
            Self::RegistryAuthorization
            | Self::ContainerRepository
            | Self::ComputeFunction
            | Self::PublicInvokeEndpoint
            | Self::AccessRole
            | Self::RolePolicyBinding => ProviderKind::Aws,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CacheDatabase => "cache database",
            Self::RegistryAuthorization => "registry token",
            Self::ContainerRepository => "repository",
            Self::ImageBuild => "image build",
            Self::RegistryPublish => "image publish",
            Self::ComputeFunction => "function",
            Self::PublicInvokeEndpoint => "function url",
            Self::AccessRole => "role",
            Self::RolePolicyBinding => "role policy",
        }
    }

    #[must_use]
    pub const fn schema(self) -> ResourceSchema {
        match self {
            Self::CacheDatabase => ResourceSchema {
                required: &["database_name", "region"],
                optional: &["tls", "multizone", "eviction"],
                outputs: &["endpoint", "port", "password", "database_id"],
            },
            Self::RegistryAuthorization => ResourceSchema {
                required: &[],
                optional: &["registry_id"],
                outputs: &["proxy_endpoint", "user_name", "password"],
            },
            Self::ContainerRepository => ResourceSchema {
                required: &["name"],
                optional: &["image_tag_mutability", "force_delete"],
                outputs: &["repository_url", "arn", "name"],
            },
            Self::ImageBuild => ResourceSchema {
                required: &["name", "build"],
                optional: &["triggers", "keep_locally"],
                outputs: &["name", "image_id"],
            },
            Self::RegistryPublish => ResourceSchema {
                required: &["name"],
                optional: &["triggers", "keep_remotely"],
                outputs: &["name", "sha256_digest"],
            },
            Self::ComputeFunction => ResourceSchema {
                required: &["function_name", "role", "package_type"],
                optional: &[
                    "image_uri",
                    "architectures",
                    "memory_size",
                    "timeout",
                    "logging_config",
                    "environment",
                ],
                outputs: &["function_name", "arn", "invoke_arn"],
            },
            Self::PublicInvokeEndpoint => ResourceSchema {
                required: &["function_name", "authorization_type"],
                optional: &[],
                outputs: &["function_url", "url_id"],
            },
            Self::AccessRole => ResourceSchema {
                required: &["name", "assume_role_policy"],
                optional: &[],
                outputs: &["name", "arn"],
            },
            Self::RolePolicyBinding => ResourceSchema {
                required: &["role", "policy_arn"],
                optional: &[],
                outputs: &["id"],
            },
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Lifecycle of a node. The core only moves nodes from `Declared` to
/// `Ordered`; the remaining states are reported by the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    #[default]
    Declared,
    Ordered,
    Provisioning,
    Provisioned,
    Failed,
}

use std::io;
use std::path::PathBuf;

use lambdalith_domain::{
    AttributeName, DomainValidationError, NodeName, OutputReference, ProviderKind, ResourceKind,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error(transparent)]
    InvalidName(#[from] DomainValidationError),
    #[error("node \"{name}\" is already declared in this stack")]
    DuplicateIdentity { name: NodeName },
    #[error("{kind} \"{name}\" requires the {provider} provider, which is not configured")]
    MissingProvider {
        name: NodeName,
        kind: ResourceKind,
        provider: ProviderKind,
    },
    #[error("provider {provider} references {reference}, which is not declared in this stack")]
    DanglingProviderReference {
        provider: ProviderKind,
        reference: OutputReference,
    },
    #[error("node \"{name}\" references {reference}, which is not declared in this stack")]
    DanglingReference {
        name: NodeName,
        reference: OutputReference,
    },
    #[error("invalid configuration for \"{name}\": {message}")]
    InvalidConfiguration { name: NodeName, message: String },
    #[error("provider {provider} is already configured")]
    DuplicateProvider { provider: ProviderKind },
    #[error("node \"{name}\" is already configured")]
    AlreadyConfigured { name: NodeName },
    #[error("node \"{name}\" does not belong to this stack")]
    UnknownNode { name: NodeName },
    #[error("outputs of \"{name}\" are already attached")]
    OutputsAlreadyAttached { name: NodeName },
    #[error("{kind} \"{name}\" does not expose output \"{attribute}\"")]
    UnexposedOutput {
        name: NodeName,
        kind: ResourceKind,
        attribute: AttributeName,
    },
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("build context file is unavailable: {path}")]
    ContentUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("content trigger of {path} is not a valid digest")]
    InvalidDigest {
        path: PathBuf,
        #[source]
        source: DomainValidationError,
    },
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node \"{name}\" was forward-declared but never configured")]
    IncompleteNode { name: NodeName },
    #[error("{message}")]
    Invariant { message: String },
    #[error("dependency cycle detected among: {}", display_names(.nodes))]
    CyclicDependency { nodes: Vec<NodeName> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("required environment variables are missing or empty: {}", .names.join(", "))]
    MissingCredential { names: Vec<&'static str> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{reference} has no resolved value")]
    Unresolved { reference: OutputReference },
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    Trigger(#[from] TriggerError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn display_names(names: &[NodeName]) -> String {
    names
        .iter()
        .map(NodeName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

mod credentials;
mod error;
mod fs_util;
mod graph;
mod pipeline;
mod plan;
mod providers;
mod resolve;
mod settings;
mod stack;
mod topology;
mod trigger;

pub use credentials::{Credentials, UPSTASH_API_KEY, UPSTASH_EMAIL};
pub use error::{
    CredentialError, DeclarationError, GraphError, ResolutionError, SynthesisError, TriggerError,
};
pub use graph::{GraphNode, build_provisioning_order};
pub use pipeline::{synthesize_from_env, synthesize_lambdalith};
pub use plan::synthesize;
pub use providers::{ProviderDeclaration, ProviderRegistry};
pub use resolve::{OutputResolver, ResolvedEnvironment, resolve, resolve_config, resolve_value};
pub use settings::{DEFAULT_REGION, DEFAULT_STACK_NAME, StackSettings};
pub use stack::{NodeHandle, ResolvedOutputs, ResourceNode, Stack};
pub use topology::build_lambdalith_stack;
pub use trigger::{digest_file, digest_files};

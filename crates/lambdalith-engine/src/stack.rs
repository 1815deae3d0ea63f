use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use lambdalith_domain::{
    AttributeName, Config, ConfigValue, ContentDigest, DomainValidationError, NodeName,
    NodeState, OutputReference, ProviderKind, ResourceKind, StackId,
};
use tracing::debug;

use crate::error::{DeclarationError, TriggerError};
use crate::fs_util::resolve_in_root;
use crate::providers::{ProviderDeclaration, ProviderRegistry};
use crate::trigger::{digest_file, digest_files};

pub type ResolvedOutputs = BTreeMap<AttributeName, String>;

/// Handle to a node declared in a [`Stack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    scope: StackId,
    index: usize,
    name: NodeName,
    kind: ResourceKind,
}

impl NodeHandle {
    #[must_use]
    pub const fn name(&self) -> &NodeName {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Lazy reference to one of this node's output attributes.
    ///
    /// Never fails: the attribute only has to exist once the provisioning
    /// engine resolves it.
    #[must_use]
    pub fn output(&self, attribute: &str) -> OutputReference {
        OutputReference::new(
            self.scope,
            self.name.clone(),
            AttributeName::from(attribute),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResourceNode {
    name: NodeName,
    kind: ResourceKind,
    config: Option<Config>,
    dependencies: Vec<usize>,
    trigger: Option<ContentDigest>,
    outputs: Option<ResolvedOutputs>,
    state: NodeState,
}

impl ResourceNode {
    #[must_use]
    pub const fn name(&self) -> &NodeName {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[must_use]
    pub const fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Declaration indices of the nodes referenced by this node's configuration.
    #[must_use]
    pub fn dependencies(&self) -> &[usize] {
        &self.dependencies
    }

    #[must_use]
    pub const fn trigger(&self) -> Option<&ContentDigest> {
        self.trigger.as_ref()
    }

    #[must_use]
    pub const fn outputs(&self) -> Option<&ResolvedOutputs> {
        self.outputs.as_ref()
    }

    #[must_use]
    pub const fn state(&self) -> NodeState {
        self.state
    }
}

struct ScannedConfig {
    dependencies: Vec<usize>,
    trigger: Option<ContentDigest>,
}

/// Registry owning every provider and node declared for one deployment.
///
/// Declarations are sequential; each one validates its configuration and
/// records its dependency edges right away, so synthesis never has to walk
/// configuration values again.
#[derive(Debug)]
pub struct Stack {
    id: StackId,
    name: String,
    project_root: PathBuf,
    providers: ProviderRegistry,
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeName, usize>,
    sensitive: BTreeSet<String>,
}

impl Stack {
    #[must_use]
    pub fn new(name: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            id: StackId::allocate(),
            name: name.into(),
            project_root: project_root.into(),
            providers: ProviderRegistry::default(),
            nodes: Vec::new(),
            index: HashMap::new(),
            sensitive: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> StackId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        let index = self.index_of(name)?;
        self.nodes.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Literal secrets seen in provider or node configuration.
    #[must_use]
    pub const fn sensitive_values(&self) -> &BTreeSet<String> {
        &self.sensitive
    }

    /// Configure a provider. Its configuration may reference nodes that are
    /// already declared; every node served by this provider then depends on them.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider is configured twice or references a
    /// node that is not in this stack.
    pub fn configure_provider(
        &mut self,
        kind: ProviderKind,
        config: Config,
    ) -> std::result::Result<(), DeclarationError> {
        if self.providers.is_configured(kind) {
            return Err(DeclarationError::DuplicateProvider { provider: kind });
        }

        let mut dependencies = BTreeSet::new();
        for reference in config.references() {
            let Some(index) = self.index_for(reference) else {
                return Err(DeclarationError::DanglingProviderReference {
                    provider: kind,
                    reference: reference.clone(),
                });
            };
            dependencies.insert(index);
        }

        self.remember_sensitive(&config);
        debug!(
            provider = %kind,
            dependencies = dependencies.len(),
            "configured provider"
        );
        self.providers.push(ProviderDeclaration {
            kind,
            config,
            dependencies: dependencies.into_iter().collect(),
        });
        Ok(())
    }

    /// Declare a node with its full configuration.
    ///
    /// Every reference embedded in `config` must point at a node already in
    /// this stack; use [`Stack::forward`] to reserve identities that are
    /// referenced before they can be configured.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid or duplicate names, a missing provider,
    /// dangling references, or configuration that does not match the kind's
    /// schema. Nothing is registered when an error is returned.
    pub fn declare(
        &mut self,
        kind: ResourceKind,
        name: &str,
        config: Config,
    ) -> std::result::Result<NodeHandle, DeclarationError> {
        let name = self.admit(kind, name)?;
        let scanned = self.scan_node_config(&name, kind, &config)?;
        let handle = self.register(kind, name);
        self.apply_config(&handle, config, scanned);
        Ok(handle)
    }

    /// Reserve a node identity without configuring it yet.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid or duplicate names or a missing provider.
    pub fn forward(
        &mut self,
        kind: ResourceKind,
        name: &str,
    ) -> std::result::Result<NodeHandle, DeclarationError> {
        let name = self.admit(kind, name)?;
        Ok(self.register(kind, name))
    }

    /// Supply the configuration of a forward-declared node.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle belongs to another stack, the node is
    /// already configured, or the configuration is invalid.
    pub fn configure(
        &mut self,
        handle: &NodeHandle,
        config: Config,
    ) -> std::result::Result<(), DeclarationError> {
        let node = self.owned_node(handle)?;
        if node.is_configured() {
            return Err(DeclarationError::AlreadyConfigured {
                name: handle.name.clone(),
            });
        }

        let scanned = self.scan_node_config(&handle.name, handle.kind, &config)?;
        if handle.kind == ResourceKind::ImageBuild {
            self.check_waiting_publishes(handle, scanned.trigger.as_ref())?;
        }
        self.apply_config(handle, config, scanned);
        Ok(())
    }

    /// Lazy reference to an attribute of `handle`.
    #[must_use]
    pub fn read(&self, handle: &NodeHandle, attribute: &str) -> OutputReference {
        handle.output(attribute)
    }

    /// Build a reference by node name. Whether the node exists is checked when
    /// the reference is used in a declaration.
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a valid node name.
    pub fn reference(
        &self,
        node: &str,
        attribute: &str,
    ) -> std::result::Result<OutputReference, DomainValidationError> {
        Ok(OutputReference::new(
            self.id,
            NodeName::try_from(node)?,
            AttributeName::from(attribute),
        ))
    }

    /// Content trigger of a file, relative to the project root.
    ///
    /// # Errors
    ///
    /// Returns `ContentUnavailable` when the file cannot be read.
    pub fn content_trigger(
        &self,
        path: impl AsRef<Path>,
    ) -> std::result::Result<ContentDigest, TriggerError> {
        digest_file(&resolve_in_root(&self.project_root, path.as_ref()))
    }

    /// Content triggers of independent files, computed in parallel.
    ///
    /// # Errors
    ///
    /// Returns `ContentUnavailable` for the first unreadable file.
    pub fn content_triggers(
        &self,
        paths: &[PathBuf],
    ) -> std::result::Result<Vec<ContentDigest>, TriggerError> {
        let resolved: Vec<PathBuf> = paths
            .iter()
            .map(|path| resolve_in_root(&self.project_root, path))
            .collect();
        digest_files(&resolved)
    }

    /// Record the outputs the provisioning engine reported for a node.
    ///
    /// # Errors
    ///
    /// Returns an error when the node is unknown, already has outputs, or an
    /// attribute is not one its kind exposes.
    pub fn attach_outputs(
        &mut self,
        name: &str,
        outputs: ResolvedOutputs,
    ) -> std::result::Result<(), DeclarationError> {
        let node_name = NodeName::try_from(name)?;
        let Some(node) = self
            .index
            .get(&node_name)
            .copied()
            .and_then(|index| self.nodes.get_mut(index))
        else {
            return Err(DeclarationError::UnknownNode { name: node_name });
        };
        if node.outputs.is_some() {
            return Err(DeclarationError::OutputsAlreadyAttached { name: node_name });
        }
        let schema = node.kind.schema();
        if let Some(attribute) = outputs.keys().find(|key| !schema.exposes(key.as_str())) {
            return Err(DeclarationError::UnexposedOutput {
                name: node_name,
                kind: node.kind,
                attribute: attribute.clone(),
            });
        }

        node.outputs = Some(outputs);
        node.state = NodeState::Provisioned;
        Ok(())
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        let name = NodeName::try_from(name).ok()?;
        self.index.get(&name).copied()
    }

    fn index_for(&self, reference: &OutputReference) -> Option<usize> {
        if reference.scope() != self.id {
            return None;
        }
        self.index.get(reference.node()).copied()
    }

    fn admit(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> std::result::Result<NodeName, DeclarationError> {
        let name = NodeName::try_from(name)?;
        if self.index.contains_key(&name) {
            return Err(DeclarationError::DuplicateIdentity { name });
        }

        let provider = kind.provider();
        if !self.providers.is_configured(provider) {
            return Err(DeclarationError::MissingProvider {
                name,
                kind,
                provider,
            });
        }

        Ok(name)
    }

    fn register(&mut self, kind: ResourceKind, name: NodeName) -> NodeHandle {
        let index = self.nodes.len();
        self.index.insert(name.clone(), index);
        self.nodes.push(ResourceNode {
            name: name.clone(),
            kind,
            config: None,
            dependencies: Vec::new(),
            trigger: None,
            outputs: None,
            state: NodeState::Declared,
        });

        NodeHandle {
            scope: self.id,
            index,
            name,
            kind,
        }
    }

    fn owned_node(
        &self,
        handle: &NodeHandle,
    ) -> std::result::Result<&ResourceNode, DeclarationError> {
        if handle.scope != self.id {
            return Err(DeclarationError::UnknownNode {
                name: handle.name.clone(),
            });
        }
        self.nodes
            .get(handle.index)
            .ok_or_else(|| DeclarationError::UnknownNode {
                name: handle.name.clone(),
            })
    }

    fn scan_node_config(
        &self,
        name: &NodeName,
        kind: ResourceKind,
        config: &Config,
    ) -> std::result::Result<ScannedConfig, DeclarationError> {
        validate_schema(name, kind, config)?;

        let mut dependencies = BTreeSet::new();
        for reference in config.references() {
            let Some(index) = self.index_for(reference) else {
                return Err(DeclarationError::DanglingReference {
                    name: name.clone(),
                    reference: reference.clone(),
                });
            };
            dependencies.insert(index);
        }

        let trigger = config.trigger().cloned();
        if kind == ResourceKind::RegistryPublish {
            self.check_publish_trigger(name, config, trigger.as_ref())?;
        }

        Ok(ScannedConfig {
            dependencies: dependencies.into_iter().collect(),
            trigger,
        })
    }

    fn check_publish_trigger(
        &self,
        name: &NodeName,
        config: &Config,
        trigger: Option<&ContentDigest>,
    ) -> std::result::Result<(), DeclarationError> {
        let Some(build) = self
            .published_build(config)
            .and_then(|index| self.nodes.get(index))
        else {
            return Ok(());
        };
        if build.kind != ResourceKind::ImageBuild || !build.is_configured() {
            return Ok(());
        }

        if build.trigger.as_ref() == trigger {
            Ok(())
        } else {
            Err(DeclarationError::InvalidConfiguration {
                name: name.clone(),
                message: format!(
                    "publish trigger {} differs from the trigger of image build \"{}\" ({})",
                    display_trigger(trigger),
                    build.name,
                    display_trigger(build.trigger.as_ref())
                ),
            })
        }
    }

    /// A build configured after its publishes were declared must carry the
    /// trigger they already recorded.
    fn check_waiting_publishes(
        &self,
        build: &NodeHandle,
        trigger: Option<&ContentDigest>,
    ) -> std::result::Result<(), DeclarationError> {
        let mismatch = self.nodes.iter().find(|node| {
            node.kind == ResourceKind::RegistryPublish
                && node
                    .config
                    .as_ref()
                    .and_then(|config| self.published_build(config))
                    == Some(build.index)
                && node.trigger.as_ref() != trigger
        });

        match mismatch {
            None => Ok(()),
            Some(publish) => Err(DeclarationError::InvalidConfiguration {
                name: build.name.clone(),
                message: format!(
                    "build trigger {} differs from the trigger of image publish \"{}\" ({})",
                    display_trigger(trigger),
                    publish.name,
                    display_trigger(publish.trigger.as_ref())
                ),
            }),
        }
    }

    /// Index of the node a publish configuration names as its image.
    fn published_build(&self, config: &Config) -> Option<usize> {
        config
            .get("name")
            .and_then(ConfigValue::as_reference)
            .and_then(|reference| self.index_for(reference))
    }

    fn apply_config(&mut self, handle: &NodeHandle, config: Config, scanned: ScannedConfig) {
        self.remember_sensitive(&config);
        debug!(
            node = %handle.name,
            kind = %handle.kind,
            dependencies = scanned.dependencies.len(),
            "declared node"
        );

        if let Some(node) = self.nodes.get_mut(handle.index) {
            node.config = Some(config);
            node.dependencies = scanned.dependencies;
            node.trigger = scanned.trigger;
        }
    }

    fn remember_sensitive(&mut self, config: &Config) {
        self.sensitive.extend(
            config
                .sensitive_values()
                .into_iter()
                .map(str::to_string),
        );
    }
}

fn validate_schema(
    name: &NodeName,
    kind: ResourceKind,
    config: &Config,
) -> std::result::Result<(), DeclarationError> {
    let schema = kind.schema();

    let unknown: Vec<&str> = config
        .keys()
        .filter(|key| !schema.recognizes(key))
        .collect();
    if !unknown.is_empty() {
        return Err(DeclarationError::InvalidConfiguration {
            name: name.clone(),
            message: format!(
                "unknown option(s) for {kind}: {} (recognized: {})",
                unknown.join(", "),
                schema
                    .required
                    .iter()
                    .chain(schema.optional)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    let missing: Vec<&str> = schema
        .required
        .iter()
        .copied()
        .filter(|option| config.get(option).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(DeclarationError::InvalidConfiguration {
            name: name.clone(),
            message: format!("missing required option(s) for {kind}: {}", missing.join(", ")),
        });
    }

    Ok(())
}

fn display_trigger(trigger: Option<&ContentDigest>) -> String {
    trigger.map_or_else(|| "<none>".to_string(), |digest| digest.short().to_string())
}

#[cfg(test)]
mod tests;

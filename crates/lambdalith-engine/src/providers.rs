use lambdalith_domain::{Config, NodeName, ProviderKind, ProviderRecord};

/// A provider configured on a stack.
///
/// `dependencies` holds declaration indices of the nodes the provider
/// configuration references; they are recorded once when the provider is
/// configured.
#[derive(Debug, Clone)]
pub struct ProviderDeclaration {
    pub kind: ProviderKind,
    pub config: Config,
    pub(crate) dependencies: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDeclaration>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.providers.iter().any(|provider| provider.kind == kind)
    }

    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderDeclaration> {
        self.providers.iter().find(|provider| provider.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDeclaration> {
        self.providers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Node indices every node served by `kind` implicitly depends on.
    #[must_use]
    pub(crate) fn dependencies_of(&self, kind: ProviderKind) -> &[usize] {
        self.get(kind)
            .map_or(&[], |provider| provider.dependencies.as_slice())
    }

    pub(crate) fn push(&mut self, declaration: ProviderDeclaration) {
        self.providers.push(declaration);
    }

    pub(crate) fn records<F, E>(&self, name_of: F) -> std::result::Result<Vec<ProviderRecord>, E>
    where
        F: Fn(usize) -> std::result::Result<NodeName, E>,
    {
        self.providers
            .iter()
            .map(|provider| {
                Ok(ProviderRecord {
                    kind: provider.kind,
                    source: provider.kind.source().to_string(),
                    version: provider.kind.version().to_string(),
                    depends_on: provider
                        .dependencies
                        .iter()
                        .map(|index| name_of(*index))
                        .collect::<std::result::Result<Vec<_>, E>>()?,
                    config: provider.config.clone(),
                })
            })
            .collect()
    }
}

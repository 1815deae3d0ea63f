use serde::{Deserialize, Serialize};

use crate::{Config, ContentDigest, NodeName, NodeState, ProviderKind, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub kind: ProviderKind,
    pub source: String,
    pub version: String,
    pub depends_on: Vec<NodeName>,
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub position: usize,
    pub name: NodeName,
    pub kind: ResourceKind,
    pub provider: ProviderKind,
    pub state: NodeState,
    pub depends_on: Vec<NodeName>,
    pub trigger: Option<ContentDigest>,
    pub config: Config,
}

impl PlanRecord {
    #[must_use]
    pub fn pending_references(&self) -> usize {
        self.config.references().len()
    }
}

/// Provisioning order handed to the external engine: every node appears after
/// all nodes it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedPlan {
    pub stack: String,
    pub providers: Vec<ProviderRecord>,
    pub nodes: Vec<PlanRecord>,
}

impl OrderedPlan {
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .find(|record| record.name.as_str() == name)
            .map(|record| record.position)
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&PlanRecord> {
        self.nodes.iter().find(|record| record.name.as_str() == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|record| record.name.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

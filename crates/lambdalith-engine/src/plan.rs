use std::collections::BTreeSet;

use lambdalith_domain::{NodeName, NodeState, OrderedPlan, PlanRecord};
use tracing::info;

use crate::error::{GraphError, SynthesisError};
use crate::graph::{GraphNode, build_provisioning_order};
use crate::stack::Stack;

/// Linearize the stack's dependency graph into an ordered plan.
///
/// Node edges come from the references embedded in node configuration; every
/// node additionally depends on whatever its provider's configuration
/// references.
///
/// # Errors
///
/// Returns an error when a forward-declared node was never configured or the
/// graph contains a cycle. No partial plan is produced.
pub fn synthesize(stack: &Stack) -> std::result::Result<OrderedPlan, SynthesisError> {
    let nodes = stack.nodes();

    let mut graph = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !node.is_configured() {
            return Err(GraphError::IncompleteNode {
                name: node.name().clone(),
            }
            .into());
        }

        let dependencies: BTreeSet<usize> = node
            .dependencies()
            .iter()
            .chain(stack.providers().dependencies_of(node.kind().provider()))
            .copied()
            .collect();
        graph.push(GraphNode {
            name: node.name(),
            dependencies: dependencies.into_iter().collect(),
        });
    }

    let order = build_provisioning_order(&graph)?;

    let name_of = |index: usize| -> std::result::Result<NodeName, GraphError> {
        nodes
            .get(index)
            .map(|node| node.name().clone())
            .ok_or_else(|| GraphError::Invariant {
                message: format!("internal graph error: no node at index {index}"),
            })
    };

    let mut records = Vec::with_capacity(order.len());
    for (position, index) in order.into_iter().enumerate() {
        let (Some(node), Some(entry)) = (nodes.get(index), graph.get(index)) else {
            return Err(GraphError::Invariant {
                message: format!("internal graph error: no node at index {index}"),
            }
            .into());
        };

        let depends_on = entry
            .dependencies
            .iter()
            .map(|dependency| name_of(*dependency))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        records.push(PlanRecord {
            position,
            name: node.name().clone(),
            kind: node.kind(),
            provider: node.kind().provider(),
            state: NodeState::Ordered,
            depends_on,
            trigger: node.trigger().cloned(),
            config: node.config().cloned().unwrap_or_default(),
        });
    }

    let providers = stack.providers().records(&name_of)?;

    info!(
        stack = stack.name(),
        nodes = records.len(),
        providers = providers.len(),
        "synthesized provisioning plan"
    );

    Ok(OrderedPlan {
        stack: stack.name().to_string(),
        providers,
        nodes: records,
    })
}

use std::collections::BTreeSet;

use lambdalith_domain::NodeName;

use crate::error::GraphError;

/// A node as seen by the sorter: its identity and the declaration indices of
/// the nodes it depends on.
#[derive(Debug, Clone)]
pub struct GraphNode<'a> {
    pub name: &'a NodeName,
    pub dependencies: Vec<usize>,
}

/// Build a dependency-respecting provisioning order using topological sorting.
///
/// Nodes are identified by their declaration index. Whenever several nodes are
/// ready at once, the one declared first goes first, so the same declarations
/// always produce the same order.
///
/// # Errors
///
/// Returns an error when a dependency index is out of range or when a
/// dependency cycle is detected. No partial order is returned in either case.
pub fn build_provisioning_order(
    nodes: &[GraphNode<'_>],
) -> std::result::Result<Vec<usize>, GraphError> {
    if nodes.is_empty() {
        return Ok(Vec::new());
    }

    let mut indegree = vec![0usize; nodes.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (index, node) in nodes.iter().enumerate() {
        for &dependency in &node.dependencies {
            let Some(dependents) = adjacency.get_mut(dependency) else {
                return Err(GraphError::Invariant {
                    message: format!(
                        "internal graph error: {} depends on unknown node #{dependency}",
                        node.name
                    ),
                });
            };
            dependents.push(index);
            indegree[index] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(index, count)| (*count == 0).then_some(index))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);

        for &neighbor in &adjacency[next] {
            let entry = &mut indegree[neighbor];
            if *entry == 0 {
                continue;
            }

            *entry -= 1;
            if *entry == 0 {
                ready.insert(neighbor);
            }
        }
    }

    if order.len() != nodes.len() {
        let members = cycle_members(&indegree, &adjacency);
        return Err(GraphError::CyclicDependency {
            nodes: members
                .into_iter()
                .map(|index| nodes[index].name.clone())
                .collect(),
        });
    }

    Ok(order)
}

/// Narrow the nodes left over by the sort down to those on a cycle.
///
/// Leftovers also hold nodes that only sit between cycles or downstream of
/// one. A leftover is on a cycle exactly when it can reach itself through
/// other leftovers.
fn cycle_members(indegree: &[usize], adjacency: &[Vec<usize>]) -> BTreeSet<usize> {
    let remaining: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(index, count)| (*count > 0).then_some(index))
        .collect();

    remaining
        .iter()
        .copied()
        .filter(|start| reaches_itself(*start, &remaining, adjacency))
        .collect()
}

fn reaches_itself(start: usize, remaining: &BTreeSet<usize>, adjacency: &[Vec<usize>]) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        for &next in &adjacency[current] {
            if next == start {
                return true;
            }
            if remaining.contains(&next) && visited.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Topological ordering over a dependency graph
///
/// Used for sub-chip feedback detection inside one definition and for ordering
/// definitions so that every chip is compiled after the chips it contains.
pub struct ExecutionOrderBuilder;

impl ExecutionOrderBuilder {
    /// Build a topologically sorted order organised into stages.
    /// Nodes in the same stage have no dependencies on each other.
    /// Uses Kahn's algorithm with sorted stages for deterministic results.
    ///
    /// `edges` maps a node to the nodes that depend on it. Edges naming nodes
    /// outside `nodes` are ignored.
    pub fn build_stages<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> Result<Vec<Vec<N>>, String>
    where
        N: Clone + Ord + Hash + Debug,
    {
        let mut in_degree: HashMap<N, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();

        for (source, targets) in edges {
            if !in_degree.contains_key(source) {
                continue;
            }
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree += 1;
                }
            }
        }

        let mut stages = Vec::new();

        while !in_degree.is_empty() {
            // All nodes with zero in-degree form the current stage
            let mut current_stage: Vec<N> = in_degree
                .iter()
                .filter(|(_, &degree)| degree == 0)
                .map(|(id, _)| id.clone())
                .collect();

            if current_stage.is_empty() {
                let mut remaining: Vec<N> = in_degree.into_keys().collect();
                remaining.sort();
                return Err(format!("Cycle detected in dependencies between {:?}", remaining));
            }

            current_stage.sort();

            for node in &current_stage {
                in_degree.remove(node);

                if let Some(neighbors) = edges.get(node) {
                    for neighbor in neighbors {
                        if let Some(degree) = in_degree.get_mut(neighbor) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
            }

            stages.push(current_stage);
        }

        Ok(stages)
    }

    /// Flattened topological order
    pub fn build_order<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> Result<Vec<N>, String>
    where
        N: Clone + Ord + Hash + Debug,
    {
        let stages = Self::build_stages(nodes, edges)?;
        Ok(stages.into_iter().flatten().collect())
    }

    /// Whether the graph contains a cycle (including self-loops)
    pub fn has_cycle<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> bool
    where
        N: Clone + Ord + Hash + Debug,
    {
        Self::build_stages(nodes, edges).is_err()
    }
}

use std::collections::BTreeMap;

use crate::node::NodeKey;

/// Forward and reverse dependency edges between nodes.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: BTreeMap<NodeKey, Vec<NodeKey>>,
    dependants: BTreeMap<NodeKey, Vec<NodeKey>>,
}

impl DependencyGraph {
    /// Records `node` as depending on each of `dependencies`.
    pub fn register(&mut self, node: NodeKey, dependencies: Vec<NodeKey>) {
        let mut unique: Vec<NodeKey> = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if dependency != node && !unique.contains(&dependency) {
                unique.push(dependency);
            }
        }
        for dependency in &unique {
            let entry = self.dependants.entry(*dependency).or_default();
            if !entry.contains(&node) {
                entry.push(node);
            }
        }
        self.dependencies.insert(node, unique);
    }

    /// Drops every edge touching `node`.
    pub fn deregister(&mut self, node: NodeKey) {
        if let Some(dependencies) = self.dependencies.remove(&node) {
            for dependency in dependencies {
                if let Some(entry) = self.dependants.get_mut(&dependency) {
                    entry.retain(|key| *key != node);
                    if entry.is_empty() {
                        self.dependants.remove(&dependency);
                    }
                }
            }
        }
        if let Some(dependants) = self.dependants.remove(&node) {
            for dependant in dependants {
                if let Some(entry) = self.dependencies.get_mut(&dependant) {
                    entry.retain(|key| *key != node);
                }
            }
        }
    }

    pub fn dependants(&self, node: NodeKey) -> &[NodeKey] {
        self.dependants.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependencies(&self, node: NodeKey) -> &[NodeKey] {
        self.dependencies.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_registered(&self, node: NodeKey) -> bool {
        self.dependencies.contains_key(&node)
    }

    /// True when every forward edge has its reverse and vice versa.
    pub fn is_consistent(&self) -> bool {
        let forward = self.dependencies.iter().all(|(node, deps)| {
            deps.iter()
                .all(|dep| self.dependants(*dep).contains(node))
        });
        let reverse = self.dependants.iter().all(|(dep, nodes)| {
            !nodes.is_empty() && nodes.iter().all(|node| self.dependencies(*node).contains(dep))
        });
        forward && reverse
    }
}

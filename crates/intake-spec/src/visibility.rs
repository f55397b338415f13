use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::engine::Engine;
use crate::node::{NodeKey, Visibility};

/// Flips a single node may make within one propagation pass.
const MAX_FLIPS_PER_PASS: u32 = 4;

#[derive(Default)]
struct Pass {
    in_flight: BTreeSet<NodeKey>,
    flips: BTreeMap<NodeKey, u32>,
}

impl Engine {
    fn condition_holds(&self, key: NodeKey) -> bool {
        self.tree
            .arena
            .get(key)
            .and_then(|node| node.condition.as_ref())
            .is_none_or(|condition| condition.evaluate(self))
    }

    /// Hidden when the parent or owning question is hidden, the own condition
    /// fails, or every immediate child's condition fails.
    pub(crate) fn compute_visibility(&self, key: NodeKey) -> Visibility {
        let Some(node) = self.tree.arena.get(key) else {
            return Visibility::Hidden;
        };
        let parent_hidden = node
            .parent
            .and_then(|parent| self.tree.arena.get(parent))
            .is_some_and(|parent| !parent.is_visible());
        let owner_hidden = node
            .as_screen()
            .and_then(|screen| screen.owner)
            .and_then(|owner| self.tree.arena.get(owner))
            .is_some_and(|owner| !owner.is_visible());
        if parent_hidden || owner_hidden || !self.condition_holds(key) {
            return Visibility::Hidden;
        }
        if !node.children.is_empty()
            && !node.children.iter().any(|child| self.condition_holds(*child))
        {
            return Visibility::Hidden;
        }
        Visibility::Visible
    }

    fn set_visibility(&mut self, key: NodeKey, visibility: Visibility, mark_dirty: bool) {
        let Some(node) = self.tree.arena.get_mut(key) else {
            return;
        };
        node.visibility = visibility;
        let answered = node.as_question().is_some_and(|q| q.answer.is_some());
        debug!(node = %node.layout_id, ?visibility, "visibility changed");
        if mark_dirty && answered {
            self.mark_dirty(key);
        }
    }

    /// Re-evaluates everything reachable from `origin` through the dependants index.
    pub(crate) fn propagate(&mut self, origin: NodeKey) {
        let mut pass = Pass::default();
        self.propagate_from(origin, &mut pass);
    }

    fn propagate_from(&mut self, from: NodeKey, pass: &mut Pass) {
        let mut targets: Vec<NodeKey> = self.tree.graph.dependants(from).to_vec();
        // A container judges emptiness from its children's conditions, so a node
        // whose condition reads `from` also affects its parent.
        for dependant in self.tree.graph.dependants(from) {
            let reads_from = self
                .tree
                .arena
                .get(*dependant)
                .and_then(|node| node.condition.as_ref())
                .is_some_and(|condition| condition.dependencies(&*self).contains(&from));
            let parent = self.tree.arena.get(*dependant).and_then(|node| node.parent);
            if reads_from
                && let Some(parent) = parent
                && !targets.contains(&parent)
            {
                targets.push(parent);
            }
        }

        for target in targets {
            if !self.tree.arena.contains(target) {
                continue;
            }
            if pass.in_flight.contains(&target) {
                if self.is_structural_edge(from, target) {
                    trace!(?target, "skipping node already being updated");
                } else {
                    warn!(?target, "dependency cycle detected; propagation cut");
                }
                continue;
            }
            let next = self.compute_visibility(target);
            let current = self.tree.arena.get(target).map(|node| node.visibility);
            if current == Some(next) {
                continue;
            }
            let flips = pass.flips.entry(target).or_default();
            *flips += 1;
            if *flips > MAX_FLIPS_PER_PASS {
                warn!(?target, "visibility oscillates; propagation cut");
                continue;
            }
            self.set_visibility(target, next, true);
            pass.in_flight.insert(target);
            self.propagate_from(target, pass);
            pass.in_flight.remove(&target);
        }
    }

    fn is_structural_edge(&self, a: NodeKey, b: NodeKey) -> bool {
        let parent_of = |key: NodeKey| self.tree.arena.get(key).and_then(|node| node.parent);
        parent_of(a) == Some(b) || parent_of(b) == Some(a)
    }

    /// Evaluates every node top-down until nothing changes.
    pub(crate) fn recompute_all(&mut self, mark_dirty: bool) {
        let order = self.top_down_order();
        let limit = order.len() + 1;
        for _ in 0..limit {
            let mut changed = false;
            for key in &order {
                let next = self.compute_visibility(*key);
                if self.tree.arena.get(*key).map(|node| node.visibility) != Some(next) {
                    self.set_visibility(*key, next, mark_dirty);
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
        warn!("visibility did not settle; layout conditions form a cycle");
    }

    /// Sections, then each navigable screen followed by its questions.
    fn top_down_order(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.tree.arena.len());
        for (index, section) in self.tree.sections.iter().enumerate() {
            order.push(*section);
            for screen in &self.tree.section_screens[index] {
                order.push(*screen);
                if let Some(node) = self.tree.arena.get(*screen) {
                    order.extend(node.children.iter().copied());
                }
            }
        }
        order
    }

    /// Computes visibility for freshly inserted nodes, parents first.
    pub(crate) fn initialize_visibility(&mut self, keys: &[NodeKey]) {
        for key in keys {
            let next = self.compute_visibility(*key);
            if let Some(node) = self.tree.arena.get_mut(*key) {
                node.visibility = next;
            }
        }
    }
}

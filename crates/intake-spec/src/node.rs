use std::collections::BTreeMap;

use crate::answers::Answer;
use crate::condition::Condition;
use crate::graph::DependencyGraph;
use crate::id::LayoutId;
use crate::spec::question::{QuestionKind, QuestionSpec, SubquestionsConfig};
use crate::spec::screen::{ScreenKind, ScreenSpec};

/// Stable handle into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct SectionNode {
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ScreenNode {
    /// Static screen info; questions live as child nodes.
    pub spec: ScreenSpec,
    pub title: String,
    pub section_index: usize,
    /// Container question that spawned this screen.
    pub owner: Option<NodeKey>,
}

/// Subscreens materialized for one distinct selection.
#[derive(Debug, Clone)]
pub struct SubscreenGroup {
    pub hash: u32,
    pub potential_answer_id: String,
    pub text: String,
    pub screens: Vec<NodeKey>,
}

#[derive(Debug, Clone)]
pub struct QuestionNode {
    pub id: String,
    /// Id of the template question this one was cloned from.
    pub template_id: Option<String>,
    pub spec: QuestionSpec,
    pub template: Option<SubquestionsConfig>,
    pub parent_question: Option<NodeKey>,
    pub answer: Option<Answer>,
    pub dirty: bool,
    pub prefilled_persisted: bool,
    pub subscreens: Vec<SubscreenGroup>,
}

impl QuestionNode {
    pub fn kind(&self) -> QuestionKind {
        self.spec.kind()
    }

    pub fn is_container(&self) -> bool {
        self.template.as_ref().is_some_and(|t| !t.screens.is_empty())
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Section(SectionNode),
    Screen(ScreenNode),
    Question(QuestionNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub layout_id: LayoutId,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub condition: Option<Condition>,
    pub visibility: Visibility,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(layout_id: LayoutId, parent: Option<NodeKey>, condition: Option<Condition>, kind: NodeKind) -> Self {
        Self {
            layout_id,
            parent,
            children: Vec::new(),
            condition,
            visibility: Visibility::Visible,
            kind,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn as_question(&self) -> Option<&QuestionNode> {
        match &self.kind {
            NodeKind::Question(question) => Some(question),
            _ => None,
        }
    }

    pub fn as_question_mut(&mut self) -> Option<&mut QuestionNode> {
        match &mut self.kind {
            NodeKind::Question(question) => Some(question),
            _ => None,
        }
    }

    pub fn as_screen(&self) -> Option<&ScreenNode> {
        match &self.kind {
            NodeKind::Screen(screen) => Some(screen),
            _ => None,
        }
    }

    pub fn screen_kind(&self) -> Option<ScreenKind> {
        self.as_screen().map(|screen| screen.spec.kind())
    }
}

/// Slab of nodes; keys are never reused.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Option<Node>>,
}

impl Arena {
    pub fn insert(&mut self, node: Node) -> NodeKey {
        self.nodes.push(Some(node));
        NodeKey(self.nodes.len() - 1)
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<Node> {
        self.nodes.get_mut(key.0).and_then(Option::take)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.get(key).is_some()
    }

    pub fn question(&self, key: NodeKey) -> Option<&QuestionNode> {
        self.get(key).and_then(Node::as_question)
    }

    pub fn question_mut(&mut self, key: NodeKey) -> Option<&mut QuestionNode> {
        self.get_mut(key).and_then(Node::as_question_mut)
    }

    pub fn screen(&self, key: NodeKey) -> Option<&ScreenNode> {
        self.get(key).and_then(Node::as_screen)
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| NodeKey(index))
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything an answer mutation can touch; cloned wholesale for edit snapshots.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub arena: Arena,
    pub sections: Vec<NodeKey>,
    /// Navigable screens per section, subscreens spliced in.
    pub section_screens: Vec<Vec<NodeKey>>,
    pub question_index: BTreeMap<String, NodeKey>,
    pub screen_index: BTreeMap<String, NodeKey>,
    pub graph: DependencyGraph,
    /// Local media id -> question holding the item.
    pub pending_uploads: BTreeMap<String, NodeKey>,
}

impl Tree {
    pub fn question_key(&self, question_id: &str) -> Option<NodeKey> {
        self.question_index.get(question_id).copied()
    }

    pub fn screen_key(&self, layout_id: &str) -> Option<NodeKey> {
        self.screen_index.get(layout_id).copied()
    }

    /// Walks up `parent_question` links to the question that owns commits.
    pub fn commit_root(&self, key: NodeKey) -> NodeKey {
        let mut current = key;
        while let Some(parent) = self.arena.question(current).and_then(|q| q.parent_question) {
            current = parent;
        }
        current
    }

    /// Every question living inside `container`'s subscreens, recursively.
    pub fn subquestions_of(&self, container: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let Some(question) = self.arena.question(container) else {
            return out;
        };
        for group in &question.subscreens {
            for screen in &group.screens {
                let Some(node) = self.arena.get(*screen) else {
                    continue;
                };
                for child in &node.children {
                    out.push(*child);
                    out.extend(self.subquestions_of(*child));
                }
            }
        }
        out
    }

    /// Static and spliced screens of every section, in navigation order.
    pub fn screens_in_order(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.section_screens.iter().flatten().copied()
    }
}

use std::collections::BTreeMap;

use tracing::debug;

use crate::answers::{Answer, Selection};
use crate::condition::Condition;
use crate::engine::{Engine, canonicalize};
use crate::error::IntakeError;
use crate::id::subscreen_hash;
use crate::node::{NodeKey, NodeKind, QuestionNode, SubscreenGroup};
use crate::spec::question::QuestionSpec;
use crate::spec::screen::ScreenSpec;
use crate::tokens::substitute;

/// Identity of one selection as far as subscreens are concerned.
#[derive(Debug, Clone)]
pub struct SelectionKey {
    pub hash: u32,
    pub potential_answer_id: String,
    pub text: String,
    pub sub_answers: BTreeMap<String, Answer>,
}

/// Custom text when given, otherwise the potential answer's text.
pub fn display_text(spec: &QuestionSpec, selection: &Selection) -> String {
    if let Some(text) = selection.text.as_deref().filter(|t| !t.trim().is_empty()) {
        return text.to_string();
    }
    spec.potential_answers()
        .iter()
        .find(|pa| pa.id == selection.potential_answer_id)
        .map(|pa| pa.text.clone())
        .unwrap_or_default()
}

/// One key per selection (or autocomplete item), in answer order.
pub(crate) fn selection_keys(question: &QuestionNode, answer: &Answer) -> Vec<SelectionKey> {
    match answer {
        Answer::Autocomplete(autocomplete) => autocomplete
            .items
            .iter()
            .map(|item| SelectionKey {
                hash: subscreen_hash("", &item.text),
                potential_answer_id: String::new(),
                text: item.text.clone(),
                sub_answers: item.sub_answers.clone(),
            })
            .collect(),
        other => other
            .as_choice()
            .map(|choice| {
                choice
                    .selections
                    .iter()
                    .map(|selection| {
                        let text = display_text(&question.spec, selection);
                        SelectionKey {
                            hash: subscreen_hash(&selection.potential_answer_id, &text),
                            potential_answer_id: selection.potential_answer_id.clone(),
                            text,
                            sub_answers: selection.sub_answers.clone(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Drops sub-answers once they have been bound to subquestions.
pub(crate) fn strip_sub_answers(answer: &mut Answer) {
    match answer {
        Answer::Autocomplete(autocomplete) => {
            for item in &mut autocomplete.items {
                item.sub_answers.clear();
            }
        }
        other => {
            if let Some(choice) = other.as_choice_mut() {
                for selection in &mut choice.selections {
                    selection.sub_answers.clear();
                }
            }
        }
    }
}

impl Engine {
    /// Brings `container`'s subscreens in line with `selections`: reuses groups
    /// whose hash survives, inflates new ones, tears down orphans, then splices.
    pub(crate) fn sync_subscreens(
        &mut self,
        container: NodeKey,
        selections: Vec<SelectionKey>,
    ) -> Result<(), IntakeError> {
        let is_container = self.question_node(container)?.is_container();
        if !is_container {
            return Ok(());
        }
        let mut desired: Vec<SelectionKey> = Vec::new();
        for selection in selections {
            if !desired.iter().any(|d| d.hash == selection.hash) {
                desired.push(selection);
            }
        }

        let existing = self
            .tree
            .arena
            .question_mut(container)
            .map(|q| std::mem::take(&mut q.subscreens))
            .unwrap_or_default();
        let (kept, removed): (Vec<SubscreenGroup>, Vec<SubscreenGroup>) = existing
            .into_iter()
            .partition(|group| desired.iter().any(|d| d.hash == group.hash));
        for group in &removed {
            debug!(hash = group.hash, screens = group.screens.len(), "removing subscreens");
            self.teardown_group(group);
        }

        let mut groups = Vec::with_capacity(desired.len());
        for selection in &desired {
            match kept.iter().find(|group| group.hash == selection.hash) {
                Some(group) => groups.push(group.clone()),
                None => groups.push(self.inflate_group(container, selection)?),
            }
        }
        if let Some(question) = self.tree.arena.question_mut(container) {
            question.subscreens = groups;
        }
        self.splice(container)
    }

    fn inflate_group(
        &mut self,
        container: NodeKey,
        selection: &SelectionKey,
    ) -> Result<SubscreenGroup, IntakeError> {
        let node = self
            .tree
            .arena
            .get(container)
            .ok_or_else(|| IntakeError::Internal(format!("container {container:?} vanished")))?;
        let question = self.question_node(container)?;
        let template = question.template.clone().unwrap_or_default();
        let container_id = question.id.clone();
        let binds_by_selection = question.kind().is_choice();
        let base = node.layout_id.template(selection.hash);
        let parent_screen = node
            .parent
            .and_then(|parent| self.tree.arena.screen(parent))
            .ok_or_else(|| IntakeError::Internal(format!("question '{container_id}' has no screen")))?;
        let section_index = parent_screen.section_index;
        let section_key = *self.tree.sections.get(section_index).ok_or_else(|| {
            IntakeError::Internal(format!("section {section_index} is missing"))
        })?;
        let section_title = match self.tree.arena.get(section_key).map(|n| &n.kind) {
            Some(NodeKind::Section(section)) => section.title.clone(),
            _ => String::new(),
        };

        let mut renamed = BTreeMap::new();
        for (index, screen) in template.screens.iter().enumerate() {
            let screen_id = base.screen(index);
            for template_question in screen.questions() {
                let original = &template_question.common().id;
                renamed.insert(original.clone(), format!("{screen_id}_{original}"));
            }
        }

        let mut screens = Vec::with_capacity(template.screens.len());
        for (index, mut spec) in template.screens.into_iter().enumerate() {
            personalize(&mut spec, &selection.text, &renamed);
            let own = spec.common_mut().condition.take();
            let binding = binds_by_selection.then(|| {
                Condition::contains_any(container_id.clone(), &[selection.potential_answer_id.as_str()])
            });
            spec.common_mut().condition = match (own, binding) {
                (Some(own), Some(binding)) => Some(Condition::And {
                    operands: vec![own, binding],
                }),
                (own, binding) => own.or(binding),
            };
            let key = self.insert_screen(
                spec,
                base.screen(index),
                section_key,
                section_index,
                Some(container),
                &section_title,
                Some(&renamed),
            )?;
            screens.push(key);
        }

        for screen in &screens {
            self.register_subtree(*screen);
        }
        let fresh = self.subtree_keys(&screens);
        self.initialize_visibility(&fresh);
        self.bind_sub_answers(&screens, &selection.sub_answers)?;
        let fresh = self.subtree_keys(&screens);
        self.initialize_visibility(&fresh);

        debug!(
            container = %container_id,
            hash = selection.hash,
            screens = screens.len(),
            "inflated subscreens"
        );
        Ok(SubscreenGroup {
            hash: selection.hash,
            potential_answer_id: selection.potential_answer_id.clone(),
            text: selection.text.clone(),
            screens,
        })
    }

    /// Stores incoming sub-answers on the cloned questions, keyed by template id.
    fn bind_sub_answers(
        &mut self,
        screens: &[NodeKey],
        sub_answers: &BTreeMap<String, Answer>,
    ) -> Result<(), IntakeError> {
        if sub_answers.is_empty() {
            return Ok(());
        }
        let questions: Vec<NodeKey> = screens
            .iter()
            .filter_map(|screen| self.tree.arena.get(*screen))
            .flat_map(|node| node.children.iter().copied())
            .collect();
        for key in questions {
            let question = self.question_node(key)?;
            let Some(incoming) = question
                .template_id
                .as_ref()
                .and_then(|id| sub_answers.get(id))
            else {
                continue;
            };
            let mut answer = incoming.clone();
            canonicalize(&question.spec, &mut answer);
            let selections = selection_keys(question, &answer);
            let is_container = question.is_container();
            strip_sub_answers(&mut answer);
            let uploads = answer.pending_upload_ids();
            if let Some(question) = self.tree.arena.question_mut(key) {
                question.answer = Some(answer);
            }
            for local_id in uploads {
                self.tree.pending_uploads.insert(local_id, key);
            }
            if is_container {
                self.sync_subscreens(key, selections)?;
            }
        }
        Ok(())
    }

    fn subtree_keys(&self, screens: &[NodeKey]) -> Vec<NodeKey> {
        let mut keys = Vec::new();
        for screen in screens {
            keys.push(*screen);
            if let Some(node) = self.tree.arena.get(*screen) {
                keys.extend(node.children.iter().copied());
            }
        }
        keys
    }

    fn teardown_group(&mut self, group: &SubscreenGroup) {
        for screen in &group.screens {
            self.teardown_screen(*screen);
        }
    }

    fn teardown_screen(&mut self, screen: NodeKey) {
        let Some(node) = self.tree.arena.get(screen) else {
            return;
        };
        let children = node.children.clone();
        let layout_id = node.layout_id.to_string();
        let section_index = node.as_screen().map(|s| s.section_index);
        for child in children {
            if let Some(question) = self.tree.arena.question(child) {
                let nested = question.subscreens.clone();
                let id = question.id.clone();
                for group in &nested {
                    self.teardown_group(group);
                }
                self.tree.question_index.remove(&id);
                self.tree.pending_uploads.retain(|_, owner| *owner != child);
            }
            self.tree.graph.deregister(child);
            self.tree.arena.remove(child);
        }
        if let Some(list) = section_index.and_then(|index| self.tree.section_screens.get_mut(index)) {
            list.retain(|key| *key != screen);
        }
        self.tree.screen_index.remove(&layout_id);
        self.tree.graph.deregister(screen);
        self.tree.arena.remove(screen);
    }

    /// `container`'s subscreens in display order, nested containers expanded in place.
    pub(crate) fn spliced_sequence(&self, container: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let Some(question) = self.tree.arena.question(container) else {
            return out;
        };
        for group in &question.subscreens {
            for screen in &group.screens {
                out.push(*screen);
                if let Some(node) = self.tree.arena.get(*screen) {
                    for child in &node.children {
                        out.extend(self.spliced_sequence(*child));
                    }
                }
            }
        }
        out
    }

    /// Places `container`'s subscreens after its screen, or after the subscreens
    /// of the containers preceding it on that screen.
    fn splice(&mut self, container: NodeKey) -> Result<(), IntakeError> {
        let Some(node) = self.tree.arena.get(container) else {
            return Err(IntakeError::Internal(format!("container {container:?} vanished")));
        };
        let screen = node
            .parent
            .ok_or_else(|| IntakeError::Internal("container question has no screen".into()))?;
        let screen_node = self
            .tree
            .arena
            .get(screen)
            .ok_or_else(|| IntakeError::Internal("container screen vanished".into()))?;
        let section_index = screen_node
            .as_screen()
            .map(|s| s.section_index)
            .ok_or_else(|| IntakeError::Internal("container parent is not a screen".into()))?;
        let preceding: Vec<NodeKey> = screen_node
            .children
            .iter()
            .copied()
            .take_while(|child| *child != container)
            .flat_map(|child| self.spliced_sequence(child))
            .collect();
        let sequence = self.spliced_sequence(container);

        let Some(list) = self.tree.section_screens.get_mut(section_index) else {
            return Err(IntakeError::Internal(format!("section {section_index} is missing")));
        };
        list.retain(|key| !sequence.contains(key));
        // Not yet navigable: an enclosing container splices it later.
        let Some(mut anchor) = list.iter().position(|key| *key == screen) else {
            return Ok(());
        };
        for key in &preceding {
            if let Some(position) = list.iter().position(|k| k == key) {
                anchor = anchor.max(position);
            }
        }
        let at = anchor + 1;
        list.splice(at..at, sequence);
        Ok(())
    }
}

/// Substitutes parent-answer tokens and rewrites sibling question references.
fn personalize(spec: &mut ScreenSpec, text: &str, renamed: &BTreeMap<String, String>) {
    if let ScreenSpec::Questions(screen) | ScreenSpec::Media(screen) = spec
        && screen.header_title_has_tokens
        && let Some(header) = screen.header_title.as_mut()
    {
        *header = substitute(header, text);
    }
    for question in spec.questions_mut() {
        let common = question.common_mut();
        if common.title_has_tokens {
            common.title = substitute(&common.title, text);
        }
        if let Some(condition) = common.condition.as_mut() {
            condition.rewrite_question_ids(renamed);
        }
    }
    if let Some(condition) = spec.common_mut().condition.as_mut() {
        condition.rewrite_question_ids(renamed);
    }
}

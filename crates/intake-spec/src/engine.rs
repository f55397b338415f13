use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;
use tracing::{info, warn};

use crate::answers::{Answer, AnswerRules};
use crate::commit::{Client, ClientClock};
use crate::condition::DataSource;
use crate::config::EngineConfig;
use crate::edit::EditSession;
use crate::error::IntakeError;
use crate::graph::DependencyGraph;
use crate::id::LayoutId;
use crate::node::{Node, NodeKey, NodeKind, QuestionNode, ScreenNode, SectionNode, Tree};
use crate::spec::layout::{LayoutSpec, OverviewHeader, TransitionSpec};
use crate::spec::question::{QuestionSpec, SubquestionsConfig};
use crate::spec::screen::ScreenSpec;
use crate::status::CompletionStatus;
use crate::subscreens::{selection_keys, strip_sub_answers};
use crate::user_fields::UserFields;
use crate::wire::{MediaIdReplacement, Platform, VisitData};

/// Single-threaded intake state machine. Wrap it in a lock to share it.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) visit_id: i64,
    pub(crate) platform: Platform,
    pub(crate) submitted: bool,
    pub(crate) header: OverviewHeader,
    pub(crate) transitions: Vec<TransitionSpec>,
    pub(crate) tree: Tree,
    pub(crate) user_fields: UserFields,
    pub(crate) status: CompletionStatus,
    pub(crate) clock: ClientClock,
    pub(crate) client: Box<dyn Client>,
    pub(crate) edit: Option<EditSession>,
}

impl Engine {
    /// Builds an engine from an init payload.
    pub fn new(
        visit: VisitData,
        client: Box<dyn Client>,
        config: EngineConfig,
    ) -> Result<Self, IntakeError> {
        let layout = LayoutSpec::from_json(&visit.layout)?;
        let mut user_fields = UserFields::new();
        for pair in &visit.pairs {
            user_fields.set(&pair.key, pair.value.as_deref())?;
        }
        Self::build(
            layout,
            user_fields,
            visit.patient_visit_id,
            visit.platform,
            visit.is_submitted,
            client,
            config,
        )
    }

    /// Builds an editable engine straight from a parsed layout.
    pub fn from_layout(
        layout: LayoutSpec,
        client: Box<dyn Client>,
        config: EngineConfig,
    ) -> Result<Self, IntakeError> {
        layout.validate()?;
        Self::build(
            layout,
            UserFields::new(),
            0,
            Platform::default(),
            false,
            client,
            config,
        )
    }

    fn build(
        layout: LayoutSpec,
        user_fields: UserFields,
        visit_id: i64,
        platform: Platform,
        submitted: bool,
        client: Box<dyn Client>,
        config: EngineConfig,
    ) -> Result<Self, IntakeError> {
        let LayoutSpec {
            header,
            intake,
            answers,
        } = layout;
        let mut engine = Engine {
            config,
            visit_id,
            platform,
            submitted,
            header,
            transitions: intake.transitions,
            tree: Tree::default(),
            user_fields,
            status: CompletionStatus::default(),
            clock: ClientClock::new(),
            client,
            edit: None,
        };

        for (index, section) in intake.sections.into_iter().enumerate() {
            let section_id = LayoutId::section(index);
            let section_key = engine.tree.arena.insert(Node::new(
                section_id.clone(),
                None,
                None,
                NodeKind::Section(SectionNode {
                    title: section.title.clone(),
                }),
            ));
            engine.tree.sections.push(section_key);
            engine.tree.section_screens.push(Vec::new());
            for (screen_index, screen) in section.screens.into_iter().enumerate() {
                let screen_key = engine.insert_screen(
                    screen,
                    section_id.screen(screen_index),
                    section_key,
                    index,
                    None,
                    &section.title,
                    None,
                )?;
                if let Some(node) = engine.tree.arena.get_mut(section_key) {
                    node.children.push(screen_key);
                }
                engine.tree.section_screens[index].push(screen_key);
            }
        }

        for section in engine.tree.sections.clone() {
            engine.register_subtree(section);
        }
        engine.load_answers(answers)?;
        engine.recompute_all(false);

        let stale: Vec<NodeKey> = engine
            .question_keys_in_order()
            .into_iter()
            .filter(|key| {
                engine
                    .tree
                    .arena
                    .get(*key)
                    .is_some_and(|node| !node.is_visible())
                    && engine
                        .tree
                        .arena
                        .question(*key)
                        .is_some_and(|q| q.answer.is_some())
            })
            .collect();
        for key in stale {
            engine.mark_dirty(key);
        }

        engine.refresh_status();
        info!(
            visit_id = engine.visit_id,
            sections = engine.tree.sections.len(),
            questions = engine.tree.question_index.len(),
            "intake engine initialized"
        );
        Ok(engine)
    }

    /// Inserts a screen and its questions; returns the screen key.
    ///
    /// `renamed` maps template question ids to the ids their clones take.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn insert_screen(
        &mut self,
        mut spec: ScreenSpec,
        layout_id: LayoutId,
        parent: NodeKey,
        section_index: usize,
        owner: Option<NodeKey>,
        section_title: &str,
        renamed: Option<&BTreeMap<String, String>>,
    ) -> Result<NodeKey, IntakeError> {
        let condition = spec.common_mut().condition.take();
        let questions = spec.take_questions();
        let title = spec
            .common()
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| section_title.to_string());
        let key = self.tree.arena.insert(Node::new(
            layout_id.clone(),
            Some(parent),
            condition,
            NodeKind::Screen(ScreenNode {
                spec,
                title,
                section_index,
                owner,
            }),
        ));
        self.tree.screen_index.insert(layout_id.to_string(), key);
        for (index, question) in questions.into_iter().enumerate() {
            let question_key = self.insert_question(
                question,
                layout_id.question(index),
                key,
                owner,
                renamed,
            )?;
            if let Some(node) = self.tree.arena.get_mut(key) {
                node.children.push(question_key);
            }
        }
        Ok(key)
    }

    fn insert_question(
        &mut self,
        mut spec: QuestionSpec,
        layout_id: LayoutId,
        screen: NodeKey,
        parent_question: Option<NodeKey>,
        renamed: Option<&BTreeMap<String, String>>,
    ) -> Result<NodeKey, IntakeError> {
        spec.apply_defaults(&self.config.other_placeholder);
        let condition = spec.common_mut().condition.take();
        let template = spec.subquestions_config().cloned();
        let mut spec = spec.without_template();
        let original = spec.common().id.clone();
        let (id, template_id) = match renamed.and_then(|map| map.get(&original)) {
            Some(id) => (id.clone(), Some(original)),
            None => (original, None),
        };
        spec.common_mut().id = id.clone();
        if self.tree.question_index.contains_key(&id) {
            return Err(IntakeError::layout(format!("duplicate question id '{id}'")));
        }
        let key = self.tree.arena.insert(Node::new(
            layout_id,
            Some(screen),
            condition,
            NodeKind::Question(QuestionNode {
                id: id.clone(),
                template_id,
                spec,
                template,
                parent_question,
                answer: None,
                dirty: false,
                prefilled_persisted: false,
                subscreens: Vec::new(),
            }),
        ));
        self.tree.question_index.insert(id, key);
        Ok(key)
    }

    /// Parent, children, condition inputs and (for subscreens) the owning question.
    pub(crate) fn node_dependencies(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(node) = self.tree.arena.get(key) else {
            return Vec::new();
        };
        let mut deps: Vec<NodeKey> = node.parent.into_iter().collect();
        deps.extend(node.children.iter().copied());
        if let Some(condition) = &node.condition {
            deps.extend(condition.dependencies(self));
        }
        if let Some(owner) = node.as_screen().and_then(|screen| screen.owner) {
            deps.push(owner);
        }
        deps
    }

    pub(crate) fn register_subtree(&mut self, key: NodeKey) {
        let deps = self.node_dependencies(key);
        self.tree.graph.register(key, deps);
        let children = self
            .tree
            .arena
            .get(key)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.register_subtree(child);
        }
    }

    fn load_answers(&mut self, answers: BTreeMap<String, Value>) -> Result<(), IntakeError> {
        for (question_id, value) in answers {
            let Some(key) = self.tree.question_key(&question_id) else {
                warn!(question_id = %question_id, "ignoring stored answer for unknown question");
                continue;
            };
            let question = self.question_node(key)?;
            let template = question.template.clone();
            let mut answer = Answer::from_client_json(
                &question_id,
                question.kind(),
                &value,
                &|id| template_question(template.as_ref(), id).map(QuestionSpec::kind),
            )?;
            answer.validate(&question_id, rules_for(&question.spec))?;
            validate_sub_answers(question, &answer)?;
            canonicalize(&question.spec, &mut answer);
            let selections = selection_keys(question, &answer);
            let is_container = question.is_container();
            strip_sub_answers(&mut answer);
            if let Some(question) = self.tree.arena.question_mut(key) {
                question.answer = Some(answer);
            }
            if is_container {
                self.sync_subscreens(key, selections)?;
            }
        }
        Ok(())
    }

    pub(crate) fn question_node(&self, key: NodeKey) -> Result<&QuestionNode, IntakeError> {
        self.tree
            .arena
            .question(key)
            .ok_or_else(|| IntakeError::Internal(format!("node {key:?} is not a question")))
    }

    /// Questions of every navigable screen, in navigation order.
    pub(crate) fn question_keys_in_order(&self) -> Vec<NodeKey> {
        self.tree
            .screens_in_order()
            .filter_map(|screen| self.tree.arena.get(screen))
            .flat_map(|node| node.children.iter().copied())
            .collect()
    }

    /// Validates and stores `answer`, then re-evaluates the layout and commits.
    pub fn set_answer(&mut self, question_id: &str, mut answer: Answer) -> Result<(), IntakeError> {
        if self.submitted {
            return Err(IntakeError::ReadOnly);
        }
        let key = self
            .tree
            .question_key(question_id)
            .ok_or_else(|| IntakeError::UnknownQuestion(question_id.to_string()))?;
        let question = self.question_node(key)?;
        if answer.kind() != question.kind() {
            return Err(IntakeError::AnswerTypeMismatch {
                question_id: question_id.to_string(),
                expected: question.kind(),
                found: answer.kind(),
            });
        }
        answer.validate(question_id, rules_for(&question.spec))?;
        validate_sub_answers(question, &answer)?;
        canonicalize(&question.spec, &mut answer);

        let prefilled_pending =
            question.spec.common().prefilled && !question.prefilled_persisted;
        if !prefilled_pending && question.answer.as_ref() == Some(&answer) {
            return Ok(());
        }

        let selections = selection_keys(question, &answer);
        let is_container = question.is_container();
        strip_sub_answers(&mut answer);
        let uploads = answer.pending_upload_ids();
        if let Some(question) = self.tree.arena.question_mut(key) {
            question.answer = Some(answer);
        }
        self.mark_dirty(key);
        self.tree.pending_uploads.retain(|_, owner| *owner != key);
        for local_id in uploads {
            self.tree.pending_uploads.insert(local_id, key);
        }

        if is_container {
            self.sync_subscreens(key, selections)?;
        }
        self.propagate(key);
        self.commit_dirty()?;
        self.refresh_status();
        Ok(())
    }

    /// Current answer of `question_id`, with sub-answers collected from its subscreens.
    pub fn answer(&self, question_id: &str) -> Result<Option<Answer>, IntakeError> {
        let key = self
            .tree
            .question_key(question_id)
            .ok_or_else(|| IntakeError::UnknownQuestion(question_id.to_string()))?;
        Ok(self.materialized_answer(key))
    }

    /// Applies an external key/value pair and re-evaluates the whole layout.
    pub fn set_user_field(&mut self, key: &str, value: Option<&str>) -> Result<(), IntakeError> {
        if self.submitted {
            return Err(IntakeError::ReadOnly);
        }
        self.user_fields.set(key, value)?;
        self.recompute_all(true);
        self.commit_dirty()?;
        self.refresh_status();
        Ok(())
    }

    /// Binds the server id of an uploaded media item and commits its question.
    pub fn replace_id(
        &mut self,
        local_id: &str,
        replacement: MediaIdReplacement,
    ) -> Result<(), IntakeError> {
        if self.submitted {
            return Err(IntakeError::ReadOnly);
        }
        self.bind_upload(local_id, replacement.clone())?;
        if let Some(edit) = self.edit.as_mut() {
            edit.resolved_uploads.push((local_id.to_string(), replacement));
        }
        self.commit_dirty()?;
        self.refresh_status();
        Ok(())
    }

    /// Moves the pending item `local_id` onto its server id.
    pub(crate) fn bind_upload(
        &mut self,
        local_id: &str,
        replacement: MediaIdReplacement,
    ) -> Result<(), IntakeError> {
        let key = *self
            .tree
            .pending_uploads
            .get(local_id)
            .ok_or_else(|| IntakeError::UnknownUploadId(local_id.to_string()))?;
        let media = self
            .tree
            .arena
            .question_mut(key)
            .and_then(|q| q.answer.as_mut())
            .and_then(Answer::as_media_mut)
            .ok_or_else(|| IntakeError::Internal(format!("upload '{local_id}' has no media answer")))?;
        let item = media
            .items_mut()
            .find(|item| item.local_id.as_deref() == Some(local_id))
            .ok_or_else(|| IntakeError::Internal(format!("upload '{local_id}' is not held by its question")))?;
        if item.server_id.is_some() {
            return Err(IntakeError::AlreadyUploaded(local_id.to_string()));
        }
        item.server_id = Some(replacement.id);
        item.local_id = None;
        if replacement.url.is_some() {
            item.url = replacement.url;
        }
        if replacement.thumbnail_url.is_some() {
            item.thumbnail_url = replacement.thumbnail_url;
        }
        self.tree.pending_uploads.remove(local_id);
        Ok(())
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.tree.graph
    }

    /// Visibility of a question (by question id) or a screen (by layout id).
    pub fn is_visible(&self, id: &str) -> Option<bool> {
        let key = self
            .tree
            .question_key(id)
            .or_else(|| self.tree.screen_key(id))?;
        self.tree.arena.get(key).map(Node::is_visible)
    }

    pub fn is_dirty(&self, question_id: &str) -> Option<bool> {
        let key = self.tree.question_key(question_id)?;
        self.tree.arena.question(key).map(|q| q.dirty)
    }

    /// Layout ids of a section's navigable screens, subscreens included.
    pub fn section_screen_ids(&self, section: usize) -> Vec<String> {
        self.tree
            .section_screens
            .get(section)
            .into_iter()
            .flatten()
            .filter_map(|key| self.tree.arena.get(*key))
            .map(|node| node.layout_id.to_string())
            .collect()
    }

    /// Question ids living on the screen with `layout_id`.
    pub fn screen_question_ids(&self, layout_id: &str) -> Vec<String> {
        self.tree
            .screen_key(layout_id)
            .and_then(|key| self.tree.arena.get(key))
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.tree.arena.question(*child))
                    .map(|q| q.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn pending_upload_ids(&self) -> Vec<String> {
        self.tree.pending_uploads.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.tree.arena.len()
    }

    /// Checks that no node depends on a removed node and edges are symmetric.
    pub fn is_graph_consistent(&self) -> bool {
        self.tree.graph.is_consistent()
            && self
                .tree
                .arena
                .keys()
                .all(|key| self.tree.graph.dependencies(key).iter().all(|d| self.tree.arena.contains(*d)))
    }

    /// Human-readable tree listing for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (index, section) in self.tree.sections.iter().enumerate() {
            let title = match self.tree.arena.get(*section).map(|n| &n.kind) {
                Some(NodeKind::Section(s)) => s.title.as_str(),
                _ => "",
            };
            let _ = writeln!(out, "se:{index} {title}");
            for screen in &self.tree.section_screens[index] {
                let Some(node) = self.tree.arena.get(*screen) else {
                    continue;
                };
                let (kind, title) = node
                    .as_screen()
                    .map(|s| (s.spec.kind().type_tag(), s.title.as_str()))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {} [{}] {kind} {title}",
                    node.layout_id,
                    visibility_label(node)
                );
                for child in &node.children {
                    let Some(child_node) = self.tree.arena.get(*child) else {
                        continue;
                    };
                    let Some(question) = child_node.as_question() else {
                        continue;
                    };
                    let answer = self
                        .materialized_answer(*child)
                        .map(|a| a.to_client_json().to_string())
                        .unwrap_or_else(|| "-".into());
                    let _ = writeln!(
                        out,
                        "    {} [{}] {} '{}' = {answer}",
                        question.id,
                        visibility_label(child_node),
                        question.kind(),
                        question.spec.common().title
                    );
                }
            }
        }
        out
    }
}

fn visibility_label(node: &Node) -> &'static str {
    if node.is_visible() { "visible" } else { "hidden" }
}

impl DataSource for Engine {
    fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        let key = self.tree.question_key(question_id)?;
        self.tree.arena.question(key)?.answer.as_ref()
    }

    fn is_question_visible(&self, question_id: &str) -> bool {
        self.tree
            .question_key(question_id)
            .and_then(|key| self.tree.arena.get(key))
            .is_some_and(Node::is_visible)
    }

    fn question_key(&self, question_id: &str) -> Option<NodeKey> {
        self.tree.question_key(question_id)
    }

    fn user_fields(&self) -> &UserFields {
        &self.user_fields
    }
}

pub(crate) fn rules_for(spec: &QuestionSpec) -> AnswerRules<'_> {
    match spec {
        QuestionSpec::FreeText(_) | QuestionSpec::SingleEntry(_) => AnswerRules::Text,
        QuestionSpec::MultipleChoice(q) => AnswerRules::Choice {
            potential_answers: &q.potential_answers,
            single: false,
        },
        QuestionSpec::SingleSelect(q) | QuestionSpec::SegmentedControl(q) => AnswerRules::Choice {
            potential_answers: &q.potential_answers,
            single: true,
        },
        QuestionSpec::Autocomplete(_) => AnswerRules::Autocomplete,
        QuestionSpec::MediaSection(q) => AnswerRules::Media {
            allows_multiple_sections: q.additional_fields.allows_multiple_sections,
        },
    }
}

pub(crate) fn template_question<'a>(
    template: Option<&'a SubquestionsConfig>,
    question_id: &str,
) -> Option<&'a QuestionSpec> {
    template?
        .screens
        .iter()
        .flat_map(ScreenSpec::questions)
        .find(|q| q.common().id == question_id)
}

/// Checks sub-answers against the container's template questions.
fn validate_sub_answers(question: &QuestionNode, answer: &Answer) -> Result<(), IntakeError> {
    let groups: Vec<&BTreeMap<String, Answer>> = match answer {
        Answer::Autocomplete(a) => a.items.iter().map(|item| &item.sub_answers).collect(),
        other => other
            .as_choice()
            .map(|c| c.selections.iter().map(|s| &s.sub_answers).collect())
            .unwrap_or_default(),
    };
    for subs in groups {
        for (id, sub) in subs {
            let Some(template) = template_question(question.template.as_ref(), id) else {
                return Err(IntakeError::invalid_answer(
                    &question.id,
                    format!("sub-answer references unknown question '{id}'"),
                ));
            };
            if template.kind() != sub.kind() {
                return Err(IntakeError::AnswerTypeMismatch {
                    question_id: id.clone(),
                    expected: template.kind(),
                    found: sub.kind(),
                });
            }
            sub.validate(id, rules_for(template))?;
        }
    }
    Ok(())
}

/// Orders choice selections by their potential answers' authoring position.
pub(crate) fn canonicalize(spec: &QuestionSpec, answer: &mut Answer) {
    if let Some(choice) = answer.as_choice_mut() {
        for selection in &mut choice.selections {
            if selection.text.as_deref().is_some_and(|text| text.trim().is_empty()) {
                selection.text = None;
            }
        }
        let potentials = spec.potential_answers();
        choice.selections.sort_by_key(|selection| {
            potentials
                .iter()
                .position(|pa| pa.id == selection.potential_answer_id)
                .unwrap_or(usize::MAX)
        });
    }
}

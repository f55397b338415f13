use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::answers::Answer;
use crate::engine::Engine;
use crate::error::IntakeError;
use crate::node::NodeKey;
use crate::subscreens::selection_keys;
use crate::wire::{self, ClientAnswerData};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives encoded [`ClientAnswerData`] commits.
///
/// The engine calls this synchronously while holding its write lock, so
/// implementations must not call back into the engine.
pub trait Client: Send + Sync {
    fn persist_answer_for_question(&self, data: &[u8]) -> Result<(), ClientError>;
}

/// Client that accepts and discards every commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

impl Client for NoopClient {
    fn persist_answer_for_question(&self, _data: &[u8]) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Session id plus monotonically increasing counter stamped on each commit,
/// letting the receiver discard stale writes.
#[derive(Debug, Clone)]
pub struct ClientClock {
    pub session_id: String,
    pub counter: u64,
}

impl ClientClock {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            counter: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}

impl Default for ClientClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Flags the commit unit owning `key`.
    pub(crate) fn mark_dirty(&mut self, key: NodeKey) {
        let root = self.tree.commit_root(key);
        if let Some(question) = self.tree.arena.question_mut(root) {
            question.dirty = true;
        }
    }

    /// Answer including sub-answers gathered from visible subquestions.
    pub(crate) fn materialized_answer(&self, key: NodeKey) -> Option<Answer> {
        let question = self.tree.arena.question(key)?;
        let mut answer = question.answer.clone()?;
        if question.subscreens.is_empty() {
            return Some(answer);
        }
        let keys = selection_keys(question, &answer);
        let gathered: Vec<BTreeMap<String, Answer>> = keys
            .iter()
            .map(|selection| self.sub_answers_for(key, selection.hash))
            .collect();
        match &mut answer {
            Answer::Autocomplete(autocomplete) => {
                for (item, subs) in autocomplete.items.iter_mut().zip(gathered) {
                    item.sub_answers = subs;
                }
            }
            other => {
                if let Some(choice) = other.as_choice_mut() {
                    for (selection, subs) in choice.selections.iter_mut().zip(gathered) {
                        selection.sub_answers = subs;
                    }
                }
            }
        }
        Some(answer)
    }

    fn sub_answers_for(&self, container: NodeKey, hash: u32) -> BTreeMap<String, Answer> {
        let mut out = BTreeMap::new();
        let Some(group) = self
            .tree
            .arena
            .question(container)
            .and_then(|q| q.subscreens.iter().find(|g| g.hash == hash))
        else {
            return out;
        };
        for screen in &group.screens {
            let Some(node) = self.tree.arena.get(*screen) else {
                continue;
            };
            for child in &node.children {
                let visible = self.tree.arena.get(*child).is_some_and(|n| n.is_visible());
                let Some(question) = self.tree.arena.question(*child) else {
                    continue;
                };
                if !visible {
                    continue;
                }
                if let Some(answer) = self.materialized_answer(*child) {
                    let id = question.template_id.clone().unwrap_or_else(|| question.id.clone());
                    out.insert(id, answer);
                }
            }
        }
        out
    }

    /// Persists every dirty, commit-ready question in layout order.
    ///
    /// Deferred while an edit is open. A client failure aborts the pass and
    /// leaves the remaining flags set.
    pub(crate) fn commit_dirty(&mut self) -> Result<(), IntakeError> {
        if self.edit.is_some() {
            return Ok(());
        }
        let roots: Vec<NodeKey> = self
            .question_keys_in_order()
            .into_iter()
            .filter(|key| {
                self.tree
                    .arena
                    .question(*key)
                    .is_some_and(|q| q.dirty && q.parent_question.is_none())
            })
            .collect();
        for key in roots {
            self.commit_question(key)?;
        }
        Ok(())
    }

    fn commit_question(&mut self, key: NodeKey) -> Result<(), IntakeError> {
        let Some(answer) = self.materialized_answer(key) else {
            if let Some(question) = self.tree.arena.question_mut(key) {
                question.dirty = false;
            }
            return Ok(());
        };
        if !answer.is_commit_ready() {
            return Ok(());
        }
        let Some(node) = self.tree.arena.get(key) else {
            return Err(IntakeError::Internal(format!("dirty question {key:?} vanished")));
        };
        let Some(question) = node.as_question() else {
            return Err(IntakeError::Internal(format!("node {key:?} is not a question")));
        };
        let question_id = question.id.clone();
        let payload = if node.is_visible() {
            json!({ "answers": { question_id.clone(): answer.to_client_json() } })
        } else {
            json!({ "clear_answers": [question_id.clone()] })
        };
        let envelope = ClientAnswerData {
            question_id: question_id.clone(),
            question_type: question.kind().type_tag().to_string(),
            client_answer_json: payload.to_string(),
            session_id: self.clock.session_id.clone(),
            session_counter: self.clock.tick(),
        };
        let bytes = wire::encode(&envelope)?;
        self.client
            .persist_answer_for_question(&bytes)
            .map_err(|source| IntakeError::Client {
                question_id: question_id.clone(),
                source,
            })?;
        debug!(question_id = %question_id, visible = node.is_visible(), "committed answer");

        let mut persisted = self.tree.subquestions_of(key);
        persisted.push(key);
        for member in persisted {
            if let Some(question) = self.tree.arena.question_mut(member) {
                question.dirty = false;
                if question.spec.common().prefilled {
                    question.prefilled_persisted = true;
                }
            }
        }
        Ok(())
    }
}

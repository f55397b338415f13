use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::IntakeError;
use crate::node::{NodeKey, Tree};
use crate::wire::{MediaIdReplacement, ScreenIdData, ScreenType};

/// Open edit: the question being revisited and the tree as it was before.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub question_id: String,
    pub screen: NodeKey,
    pub(crate) snapshot: Tree,
    /// Uploads resolved while editing; they outlive a discard.
    pub(crate) resolved_uploads: Vec<(String, MediaIdReplacement)>,
}

impl Engine {
    /// Snapshots the answer state and returns the screen holding `question_id`.
    ///
    /// Answers keep flowing while editing, but commits wait for [`Engine::end_edit`].
    pub fn begin_edit(&mut self, question_id: &str) -> Result<ScreenIdData, IntakeError> {
        if self.submitted {
            return Err(IntakeError::ReadOnly);
        }
        if let Some(edit) = &self.edit {
            return Err(IntakeError::EditInProgress(edit.question_id.clone()));
        }
        let key = self
            .tree
            .question_key(question_id)
            .ok_or_else(|| IntakeError::UnknownQuestion(question_id.to_string()))?;
        let screen = self
            .tree
            .arena
            .get(key)
            .and_then(|node| node.parent)
            .ok_or_else(|| IntakeError::Internal(format!("question '{question_id}' has no screen")))?;
        let node = self
            .tree
            .arena
            .get(screen)
            .ok_or_else(|| IntakeError::Internal(format!("screen of '{question_id}' vanished")))?;
        let data = ScreenIdData {
            screen_type: node
                .screen_kind()
                .map(ScreenType::from)
                .unwrap_or(ScreenType::Questions),
            id: node.layout_id.to_string(),
        };
        self.edit = Some(EditSession {
            question_id: question_id.to_string(),
            screen,
            snapshot: self.tree.clone(),
            resolved_uploads: Vec::new(),
        });
        info!(question_id = %question_id, "edit started");
        Ok(data)
    }

    /// Closes the open edit.
    ///
    /// Discarding restores the snapshot, then re-binds uploads resolved in the
    /// meantime. Keeping validates the edited screen first; on failure the edit
    /// stays open.
    pub fn end_edit(&mut self, discard: bool) -> Result<(), IntakeError> {
        if self.submitted {
            return Err(IntakeError::ReadOnly);
        }
        let Some(edit) = self.edit.as_ref() else {
            return Err(IntakeError::NotInEditMode);
        };
        if discard {
            if let Some(edit) = self.edit.take() {
                self.tree = edit.snapshot;
                debug!(question_id = %edit.question_id, "edit discarded");
                for (local_id, replacement) in edit.resolved_uploads {
                    // Items added during the edit are gone with it.
                    if self.tree.pending_uploads.contains_key(&local_id) {
                        self.bind_upload(&local_id, replacement)?;
                    }
                }
            }
            self.recompute_all(false);
            self.commit_dirty()?;
            self.refresh_status();
            return Ok(());
        }
        // The edited screen may have been removed with its container's selection.
        if self.tree.arena.contains(edit.screen) {
            self.screen_requirements(edit.screen)?;
        }
        if let Some(edit) = self.edit.take() {
            debug!(question_id = %edit.question_id, "edit kept");
        }
        self.commit_dirty()?;
        self.refresh_status();
        Ok(())
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }
}

use crate::engine::Engine;
use crate::error::IntakeError;
use crate::node::NodeKey;
use crate::wire::{ScreenIdData, ScreenType};

impl Engine {
    pub(crate) fn screen_key_for(&self, screen_id: &str) -> Result<NodeKey, IntakeError> {
        self.tree
            .screen_key(screen_id)
            .ok_or_else(|| IntakeError::UnknownScreen(screen_id.to_string()))
    }

    pub(crate) fn overview_id_data(&self) -> ScreenIdData {
        ScreenIdData {
            screen_type: ScreenType::VisitOverview,
            id: self.config.overview_screen_id.clone(),
        }
    }

    /// Next visible screen after `current` within its section, or the overview.
    ///
    /// An empty `current` starts the visit at the overview. The current screen
    /// must meet its requirements, except for pending subquestions.
    pub fn compute_next_screen(&self, current: &str) -> Result<ScreenIdData, IntakeError> {
        if current.is_empty() {
            return Ok(self.overview_id_data());
        }
        let key = self.screen_key_for(current)?;
        match self.screen_requirements(key) {
            Ok(()) => {}
            Err(err) if err.is_subquestion_gate() => {}
            Err(err) => return Err(err.into()),
        }
        let section_index = self
            .tree
            .arena
            .screen(key)
            .map(|screen| screen.section_index)
            .ok_or_else(|| IntakeError::Internal(format!("'{current}' is not a screen")))?;
        let list = self
            .tree
            .section_screens
            .get(section_index)
            .ok_or_else(|| IntakeError::Internal(format!("section {section_index} is missing")))?;
        let position = list
            .iter()
            .position(|k| *k == key)
            .ok_or_else(|| IntakeError::Internal(format!("screen '{current}' is not navigable")))?;

        let next = list[position + 1..]
            .iter()
            .filter_map(|k| self.tree.arena.get(*k))
            .find(|node| node.is_visible());
        Ok(match next {
            Some(node) => ScreenIdData {
                screen_type: node
                    .screen_kind()
                    .map(ScreenType::from)
                    .unwrap_or(ScreenType::Questions),
                id: node.layout_id.to_string(),
            },
            None => self.overview_id_data(),
        })
    }

    /// `(position + 1) / len` over the screen's section list.
    pub(crate) fn progress(&self, key: NodeKey) -> Option<f32> {
        let section_index = self.tree.arena.screen(key)?.section_index;
        let list = self.tree.section_screens.get(section_index)?;
        let position = list.iter().position(|k| *k == key)?;
        Some((position + 1) as f32 / list.len() as f32)
    }
}

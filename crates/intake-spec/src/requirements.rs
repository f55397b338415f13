use thiserror::Error;

use crate::answers::Answer;
use crate::engine::Engine;
use crate::node::NodeKey;
use crate::spec::question::QuestionSpec;
use crate::spec::screen::ScreenSpec;
use crate::user_fields::IS_PHARMACY_SET;

/// First unmet requirement found while walking a screen, section or visit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("{message}")]
    QuestionRequirement { question_id: String, message: String },
    #[error("{message}")]
    MediaSlotMissing {
        question_id: String,
        slot_id: String,
        message: String,
    },
    #[error("subquestions of '{question_id}' are not complete")]
    SubquestionRequirements { question_id: String },
    #[error("{message}")]
    AtLeastOneQuestion { screen_id: String, message: String },
    #[error("{message}")]
    PharmacyNotSet { message: String },
    #[error("visit cannot complete while triage screen '{screen_id}' is visible")]
    TriageVisible { screen_id: String },
}

impl RequirementError {
    /// Message meant for the patient, when one is defined.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            RequirementError::QuestionRequirement { message, .. }
            | RequirementError::MediaSlotMissing { message, .. }
            | RequirementError::AtLeastOneQuestion { message, .. }
            | RequirementError::PharmacyNotSet { message } => Some(message),
            RequirementError::SubquestionRequirements { .. }
            | RequirementError::TriageVisible { .. } => None,
        }
    }

    pub fn is_subquestion_gate(&self) -> bool {
        matches!(self, RequirementError::SubquestionRequirements { .. })
    }
}

impl Engine {
    pub(crate) fn question_requirements(&self, key: NodeKey) -> Result<(), RequirementError> {
        let Some(node) = self.tree.arena.get(key) else {
            return Ok(());
        };
        let Some(question) = node.as_question() else {
            return Ok(());
        };
        if !node.is_visible() || !question.spec.common().required {
            return Ok(());
        }

        if let QuestionSpec::MediaSection(media) = &question.spec {
            let held = question.answer.as_ref().and_then(Answer::as_media);
            for slot in media.media_slots.iter().filter(|slot| slot.required) {
                let filled = held.is_some_and(|answer| answer.items().any(|item| item.slot_id == slot.id));
                if !filled {
                    let message = slot
                        .client_data
                        .media_missing_error_message
                        .clone()
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| self.config.media_missing_message.clone());
                    return Err(RequirementError::MediaSlotMissing {
                        question_id: question.id.clone(),
                        slot_id: slot.id.clone(),
                        message,
                    });
                }
            }
        }

        if question.answer.as_ref().is_none_or(Answer::is_empty) {
            return Err(RequirementError::QuestionRequirement {
                question_id: question.id.clone(),
                message: self.config.question_required_message.clone(),
            });
        }

        for group in &question.subscreens {
            for screen in &group.screens {
                if self.screen_requirements(*screen).is_err() {
                    return Err(RequirementError::SubquestionRequirements {
                        question_id: question.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn screen_requirements(&self, key: NodeKey) -> Result<(), RequirementError> {
        let Some(node) = self.tree.arena.get(key) else {
            return Ok(());
        };
        let Some(screen) = node.as_screen() else {
            return Ok(());
        };
        if !node.is_visible() {
            return Ok(());
        }
        match &screen.spec {
            ScreenSpec::Questions(spec) | ScreenSpec::Media(spec) => {
                for child in &node.children {
                    self.question_requirements(*child)?;
                }
                if spec.requires_at_least_one_question_answered {
                    let answered = node.children.iter().any(|child| {
                        self.tree.arena.get(*child).is_some_and(|n| n.is_visible())
                            && self
                                .tree
                                .arena
                                .question(*child)
                                .and_then(|q| q.answer.as_ref())
                                .is_some_and(|a| !a.is_empty())
                    });
                    if !answered {
                        return Err(RequirementError::AtLeastOneQuestion {
                            screen_id: node.layout_id.to_string(),
                            message: self.config.at_least_one_answer_message.clone(),
                        });
                    }
                }
                Ok(())
            }
            ScreenSpec::Pharmacy(_) => {
                if self.user_fields.boolean(IS_PHARMACY_SET) == Some(true) {
                    Ok(())
                } else {
                    Err(RequirementError::PharmacyNotSet {
                        message: self.config.pharmacy_required_message.clone(),
                    })
                }
            }
            ScreenSpec::Triage(_) => Err(RequirementError::TriageVisible {
                screen_id: node.layout_id.to_string(),
            }),
            ScreenSpec::WarningPopup(_) | ScreenSpec::GenericPopup(_) => Ok(()),
        }
    }

    /// Every navigable screen of the section, subscreens included.
    pub(crate) fn section_requirements(&self, index: usize) -> Result<(), RequirementError> {
        for screen in self.tree.section_screens.get(index).into_iter().flatten() {
            self.screen_requirements(*screen)?;
        }
        Ok(())
    }

    pub(crate) fn visit_requirements(&self) -> Result<(), RequirementError> {
        for index in 0..self.tree.sections.len() {
            self.section_requirements(index)?;
        }
        Ok(())
    }
}

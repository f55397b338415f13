//! Client-facing screen messages.
//!
//! Presentation fields are copied from the layout unchanged; the engine only
//! decides which questions are included and fills in answers and defaults.

use serde::{Deserialize, Serialize};

use crate::answers::Answer;
use crate::engine::Engine;
use crate::error::IntakeError;
use crate::node::{Node, NodeKey};
use crate::spec::layout::ButtonSpec;
use crate::spec::question::{MediaSlotSpec, MediaTip, QuestionSpec};
use crate::spec::screen::{BodySpec, InfoScreenSpec, PopupSpec, QuestionScreenSpec, ScreenSpec};
use crate::wire::{
    self, EnabledState, FilledState, Platform, ScreenData, ScreenType, ValidateRequirementsResult,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMessage {
    pub text: String,
    #[serde(default)]
    pub tap_url: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

impl From<&ButtonSpec> for ButtonMessage {
    fn from(button: &ButtonSpec) -> Self {
        Self {
            text: button.button_text.clone(),
            tap_url: button.tap_url.clone(),
            style: button.style.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupMessage {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&PopupSpec> for PopupMessage {
    fn from(popup: &PopupSpec) -> Self {
        Self {
            text: popup.text.clone(),
            image_url: popup.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyMessage {
    pub text: String,
    #[serde(default)]
    pub button: Option<ButtonMessage>,
}

impl From<&BodySpec> for BodyMessage {
    fn from(body: &BodySpec) -> Self {
        Self {
            text: body.text.clone(),
            button: body.button.as_ref().map(ButtonMessage::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialAnswerMessage {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub answer_type: String,
    #[serde(default)]
    pub placeholder_text: Option<String>,
    #[serde(default)]
    pub popup: Option<PopupMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerGroupMessage {
    pub title: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTipMessage {
    pub tip: String,
    pub tip_subtext: String,
    pub tip_style: String,
}

impl From<&MediaTip> for MediaTipMessage {
    fn from(tip: &MediaTip) -> Self {
        Self {
            tip: tip.tip.clone(),
            tip_subtext: tip.tip_subtext.clone(),
            tip_style: tip.tip_style.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSlotMessage {
    pub id: String,
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub slot_type: String,
    pub media_missing_error_message: String,
    #[serde(default)]
    pub overlay_image_url: Option<String>,
    #[serde(default)]
    pub initial_camera_direction: Option<String>,
    #[serde(default)]
    pub flash: Option<String>,
    pub tip: MediaTipMessage,
}

/// Kind-specific part of a rendered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionBody {
    Text {
        #[serde(default)]
        placeholder_text: Option<String>,
    },
    Choice {
        potential_answers: Vec<PotentialAnswerMessage>,
        #[serde(default)]
        answer_groups: Vec<AnswerGroupMessage>,
        #[serde(default)]
        placeholder_text: Option<String>,
    },
    Autocomplete {
        #[serde(default)]
        placeholder_text: Option<String>,
        #[serde(default)]
        add_text: Option<String>,
        #[serde(default)]
        add_button_text: Option<String>,
        #[serde(default)]
        remove_button_text: Option<String>,
        #[serde(default)]
        params: Vec<(String, String)>,
    },
    Media {
        slots: Vec<MediaSlotMessage>,
        allows_multiple_sections: bool,
        allows_user_defined_section_title: bool,
        disable_last_slot_duplication: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMessage {
    pub id: String,
    pub layout_id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub required: bool,
    pub prefilled: bool,
    #[serde(default)]
    pub popup: Option<PopupMessage>,
    pub body: QuestionBody,
    #[serde(default)]
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScreen {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub header_title: Option<String>,
    #[serde(default)]
    pub header_subtitle: Option<String>,
    #[serde(default)]
    pub popup: Option<PopupMessage>,
    #[serde(default)]
    pub bottom_button_title: Option<String>,
    pub requires_at_least_one_question_answered: bool,
    pub questions: Vec<QuestionMessage>,
}

/// Shared shape of pharmacy, warning and generic popup screens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoScreen {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub header_title: Option<String>,
    #[serde(default)]
    pub header_subtitle: Option<String>,
    #[serde(default)]
    pub body: Option<BodyMessage>,
    #[serde(default)]
    pub bottom_button_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageScreen {
    #[serde(flatten)]
    pub info: InfoScreen,
    pub pathway_id: String,
    /// JSON bytes, opaque to the engine.
    #[serde(default)]
    pub triage_params: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewSection {
    pub name: String,
    pub current: FilledState,
    pub previous: FilledState,
    pub enabled: EnabledState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitOverviewScreen {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<ButtonMessage>,
    pub sections: Vec<OverviewSection>,
}

impl Engine {
    /// Encoded screen for `screen_id`, the overview included.
    ///
    /// Rendering the overview records what was shown, hence `&mut self`.
    pub fn screen(&mut self, screen_id: &str) -> Result<ScreenData, IntakeError> {
        if screen_id == self.config.overview_screen_id {
            let overview = self.overview_screen();
            return Ok(ScreenData {
                screen_type: ScreenType::VisitOverview,
                data: wire::encode(&overview)?,
                progress: None,
            });
        }
        self.render_screen(screen_id)
    }

    /// Encoded content screen; the overview is not served here.
    pub fn render_screen(&self, screen_id: &str) -> Result<ScreenData, IntakeError> {
        let key = self.screen_key_for(screen_id)?;
        let node = self
            .tree
            .arena
            .get(key)
            .ok_or_else(|| IntakeError::UnknownScreen(screen_id.to_string()))?;
        if !node.is_visible() {
            return Err(IntakeError::HiddenScreen(screen_id.to_string()));
        }
        let screen = node
            .as_screen()
            .ok_or_else(|| IntakeError::Internal(format!("'{screen_id}' is not a screen")))?;
        let id = node.layout_id.to_string();
        let data = match &screen.spec {
            ScreenSpec::Questions(spec) | ScreenSpec::Media(spec) => {
                wire::encode(&self.question_screen(node, &screen.title, spec))?
            }
            ScreenSpec::Pharmacy(spec)
            | ScreenSpec::WarningPopup(spec)
            | ScreenSpec::GenericPopup(spec) => wire::encode(&info_screen(id, &screen.title, spec))?,
            ScreenSpec::Triage(spec) => {
                let triage_params = spec
                    .triage_params
                    .as_ref()
                    .map(serde_json::to_vec)
                    .transpose()?;
                wire::encode(&TriageScreen {
                    info: info_screen(id, &screen.title, &spec.info),
                    pathway_id: spec.pathway_id.clone(),
                    triage_params,
                })?
            }
        };
        Ok(ScreenData {
            screen_type: ScreenType::from(screen.spec.kind()),
            data,
            progress: self.progress(key),
        })
    }

    fn question_screen(&self, node: &Node, title: &str, spec: &QuestionScreenSpec) -> QuestionScreen {
        QuestionScreen {
            id: node.layout_id.to_string(),
            title: title.to_string(),
            header_title: spec.header_title.clone(),
            header_subtitle: spec.header_subtitle.clone(),
            popup: spec.popup.as_ref().map(PopupMessage::from),
            bottom_button_title: spec.bottom_button_title.clone(),
            requires_at_least_one_question_answered: spec.requires_at_least_one_question_answered,
            questions: node
                .children
                .iter()
                .filter_map(|child| self.question_message(*child))
                .collect(),
        }
    }

    /// `None` for hidden questions.
    fn question_message(&self, key: NodeKey) -> Option<QuestionMessage> {
        let node = self.tree.arena.get(key)?;
        if !node.is_visible() {
            return None;
        }
        let question = node.as_question()?;
        let common = question.spec.common();
        Some(QuestionMessage {
            id: question.id.clone(),
            layout_id: node.layout_id.to_string(),
            question_type: question.kind().type_tag().to_string(),
            title: common.title.clone(),
            subtitle: common.subtitle.clone(),
            summary: common.summary.clone(),
            required: common.required,
            prefilled: common.prefilled,
            popup: common.popup.as_ref().map(PopupMessage::from),
            body: self.question_body(&question.spec),
            answer: self.materialized_answer(key),
        })
    }

    fn question_body(&self, spec: &QuestionSpec) -> QuestionBody {
        match spec {
            QuestionSpec::FreeText(q) | QuestionSpec::SingleEntry(q) => QuestionBody::Text {
                placeholder_text: q.additional_fields.placeholder_text.clone(),
            },
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => QuestionBody::Choice {
                potential_answers: q
                    .potential_answers
                    .iter()
                    .map(|pa| PotentialAnswerMessage {
                        id: pa.id.clone(),
                        text: pa.text.clone(),
                        summary: pa.summary.clone(),
                        answer_type: serde_json::to_value(pa.kind)
                            .ok()
                            .and_then(|v| v.as_str().map(str::to_string))
                            .unwrap_or_default(),
                        placeholder_text: pa.client_data.placeholder_text.clone(),
                        popup: pa.popup.as_ref().map(PopupMessage::from),
                    })
                    .collect(),
                answer_groups: q
                    .additional_fields
                    .answer_groups
                    .iter()
                    .map(|group| AnswerGroupMessage {
                        title: group.title.clone(),
                        count: group.count,
                    })
                    .collect(),
                placeholder_text: q.additional_fields.placeholder_text.clone(),
            },
            QuestionSpec::Autocomplete(q) => {
                let fields = &q.additional_fields;
                QuestionBody::Autocomplete {
                    placeholder_text: fields.placeholder_text.clone(),
                    add_text: fields.add_text.clone(),
                    add_button_text: fields.add_button_text.clone(),
                    remove_button_text: fields.remove_button_text.clone(),
                    params: fields
                        .autocomplete_params
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                }
            }
            QuestionSpec::MediaSection(q) => QuestionBody::Media {
                slots: q
                    .media_slots
                    .iter()
                    .map(|slot| self.media_slot_message(slot))
                    .collect(),
                allows_multiple_sections: q.additional_fields.allows_multiple_sections,
                allows_user_defined_section_title: q
                    .additional_fields
                    .allows_user_defined_section_title,
                disable_last_slot_duplication: q.additional_fields.disable_last_slot_duplication,
            },
        }
    }

    fn media_slot_message(&self, slot: &MediaSlotSpec) -> MediaSlotMessage {
        let data = &slot.client_data;
        let tip = match (self.platform, data.tips.get("inline")) {
            (Platform::Android, Some(inline)) => inline,
            _ => &data.tip,
        };
        MediaSlotMessage {
            id: slot.id.clone(),
            name: slot.name.clone(),
            required: slot.required,
            slot_type: slot.slot_type.clone(),
            media_missing_error_message: data
                .media_missing_error_message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| self.config.media_missing_message.clone()),
            overlay_image_url: data.overlay_image_url.clone(),
            initial_camera_direction: data.initial_camera_direction.clone(),
            flash: data.flash.clone(),
            tip: MediaTipMessage::from(tip),
        }
    }

    /// Requirement check for one screen; pending subquestions count as unmet.
    pub fn validate_screen(&self, screen_id: &str) -> Result<ValidateRequirementsResult, IntakeError> {
        let key = self.screen_key_for(screen_id)?;
        Ok(match self.screen_requirements(key) {
            Ok(()) => ValidateRequirementsResult::ok(),
            Err(err) => ValidateRequirementsResult::error(Some(requirement_message(&err))),
        })
    }

    pub fn validate_visit(&self) -> ValidateRequirementsResult {
        match self.visit_requirements() {
            Ok(()) => ValidateRequirementsResult::ok(),
            Err(err) => ValidateRequirementsResult::error(Some(requirement_message(&err))),
        }
    }
}

fn requirement_message(err: &crate::requirements::RequirementError) -> String {
    err.user_message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

fn info_screen(id: String, title: &str, spec: &InfoScreenSpec) -> InfoScreen {
    InfoScreen {
        id,
        title: title.to_string(),
        header_title: spec.header_title.clone(),
        header_subtitle: spec.header_subtitle.clone(),
        body: spec.body.as_ref().map(BodyMessage::from),
        bottom_button_title: spec.bottom_button_title.clone(),
    }
}

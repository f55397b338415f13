use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::IntakeError;
use crate::spec::screen::{PopupSpec, ScreenSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    SingleEntry,
    MultipleChoice,
    SingleSelect,
    SegmentedControl,
    Autocomplete,
    MediaSection,
}

impl QuestionKind {
    pub fn type_tag(self) -> &'static str {
        match self {
            QuestionKind::FreeText => "q_type_free_text",
            QuestionKind::SingleEntry => "q_type_single_entry",
            QuestionKind::MultipleChoice => "q_type_multiple_choice",
            QuestionKind::SingleSelect => "q_type_single_select",
            QuestionKind::SegmentedControl => "q_type_segmented_control",
            QuestionKind::Autocomplete => "q_type_autocomplete",
            QuestionKind::MediaSection => "q_type_media_section",
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(
            self,
            QuestionKind::MultipleChoice | QuestionKind::SingleSelect | QuestionKind::SegmentedControl
        )
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Metadata shared by every question kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionCommon {
    #[serde(alias = "question_id")]
    pub id: String,
    #[serde(default, alias = "question_title")]
    pub title: String,
    #[serde(default, alias = "question_title_has_tokens")]
    pub title_has_tokens: bool,
    #[serde(default, alias = "question_subtitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, alias = "question_summary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, alias = "prefilled_with_previous_answers")]
    pub prefilled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PotentialAnswerKind {
    #[default]
    #[serde(rename = "a_type_multiple_choice")]
    Option,
    #[serde(rename = "a_type_multiple_choice_none")]
    NoneOfTheAbove,
    #[serde(rename = "a_type_multiple_choice_other_free_text")]
    OtherFreeText,
    #[serde(rename = "a_type_segmented_control")]
    Segmented,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PotentialAnswerClientData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
}

/// Fixed option offered by a choice-family question; list order is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PotentialAnswerSpec {
    #[serde(alias = "potential_answer_id")]
    pub id: String,
    #[serde(alias = "potential_answer")]
    pub text: String,
    #[serde(default, alias = "potential_answer_summary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, rename = "answer_type")]
    pub kind: PotentialAnswerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupSpec>,
    #[serde(default)]
    pub client_data: PotentialAnswerClientData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerGroupSpec {
    pub title: String,
    pub count: usize,
}

/// Screen templates cloned once per selection on a container question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubquestionsConfig {
    #[serde(default)]
    pub screens: Vec<ScreenSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TextFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextQuestionSpec {
    #[serde(flatten)]
    pub common: QuestionCommon,
    #[serde(default)]
    pub additional_fields: TextFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChoiceFields {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answer_groups: Vec<AnswerGroupSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceQuestionSpec {
    #[serde(flatten)]
    pub common: QuestionCommon,
    #[serde(default)]
    pub potential_answers: Vec<PotentialAnswerSpec>,
    #[serde(default)]
    pub additional_fields: ChoiceFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subquestions_config: Option<SubquestionsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AutocompleteFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_button_text: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub autocomplete_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AutocompleteQuestionSpec {
    #[serde(flatten)]
    pub common: QuestionCommon,
    #[serde(default)]
    pub additional_fields: AutocompleteFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subquestions_config: Option<SubquestionsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MediaTip {
    pub tip: String,
    pub tip_subtext: String,
    pub tip_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MediaSlotClientData {
    #[serde(flatten)]
    pub tip: MediaTip,
    pub overlay_image_url: Option<String>,
    pub media_missing_error_message: Option<String>,
    pub initial_camera_direction: Option<String>,
    pub flash: Option<String>,
    /// Platform-specific tips, e.g. `inline`.
    pub tips: BTreeMap<String, MediaTip>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MediaSlotSpec {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default = "default_slot_type")]
    pub slot_type: String,
    #[serde(default)]
    pub client_data: MediaSlotClientData,
}

fn default_slot_type() -> String {
    "image".into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MediaFields {
    pub allows_multiple_sections: bool,
    pub allows_user_defined_section_title: bool,
    pub disable_last_slot_duplication: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaQuestionSpec {
    #[serde(flatten)]
    pub common: QuestionCommon,
    #[serde(default)]
    pub additional_fields: MediaFields,
    #[serde(alias = "photo_slots")]
    pub media_slots: Vec<MediaSlotSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum QuestionSpec {
    #[serde(rename = "q_type_free_text")]
    FreeText(TextQuestionSpec),
    #[serde(rename = "q_type_single_entry")]
    SingleEntry(TextQuestionSpec),
    #[serde(rename = "q_type_multiple_choice")]
    MultipleChoice(ChoiceQuestionSpec),
    #[serde(rename = "q_type_single_select")]
    SingleSelect(ChoiceQuestionSpec),
    #[serde(rename = "q_type_segmented_control")]
    SegmentedControl(ChoiceQuestionSpec),
    #[serde(rename = "q_type_autocomplete")]
    Autocomplete(AutocompleteQuestionSpec),
    #[serde(rename = "q_type_media_section", alias = "q_type_photo_section")]
    MediaSection(MediaQuestionSpec),
}

impl QuestionSpec {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionSpec::FreeText(_) => QuestionKind::FreeText,
            QuestionSpec::SingleEntry(_) => QuestionKind::SingleEntry,
            QuestionSpec::MultipleChoice(_) => QuestionKind::MultipleChoice,
            QuestionSpec::SingleSelect(_) => QuestionKind::SingleSelect,
            QuestionSpec::SegmentedControl(_) => QuestionKind::SegmentedControl,
            QuestionSpec::Autocomplete(_) => QuestionKind::Autocomplete,
            QuestionSpec::MediaSection(_) => QuestionKind::MediaSection,
        }
    }

    pub fn common(&self) -> &QuestionCommon {
        match self {
            QuestionSpec::FreeText(q) | QuestionSpec::SingleEntry(q) => &q.common,
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => &q.common,
            QuestionSpec::Autocomplete(q) => &q.common,
            QuestionSpec::MediaSection(q) => &q.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut QuestionCommon {
        match self {
            QuestionSpec::FreeText(q) | QuestionSpec::SingleEntry(q) => &mut q.common,
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => &mut q.common,
            QuestionSpec::Autocomplete(q) => &mut q.common,
            QuestionSpec::MediaSection(q) => &mut q.common,
        }
    }

    pub fn potential_answers(&self) -> &[PotentialAnswerSpec] {
        match self {
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => &q.potential_answers,
            _ => &[],
        }
    }

    pub fn subquestions_config(&self) -> Option<&SubquestionsConfig> {
        match self {
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => q.subquestions_config.as_ref(),
            QuestionSpec::Autocomplete(q) => q.subquestions_config.as_ref(),
            _ => None,
        }
    }

    /// Clone without the subquestions template, for use as a runtime node.
    pub fn without_template(&self) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            QuestionSpec::MultipleChoice(q)
            | QuestionSpec::SingleSelect(q)
            | QuestionSpec::SegmentedControl(q) => q.subquestions_config = None,
            QuestionSpec::Autocomplete(q) => q.subquestions_config = None,
            _ => {}
        }
        copy
    }

    /// Applies layout defaults such as the "other" placeholder.
    pub fn apply_defaults(&mut self, other_placeholder: &str) {
        if let QuestionSpec::MultipleChoice(q)
        | QuestionSpec::SingleSelect(q)
        | QuestionSpec::SegmentedControl(q) = self
        {
            for potential in &mut q.potential_answers {
                if potential.kind == PotentialAnswerKind::OtherFreeText
                    && potential.client_data.placeholder_text.is_none()
                {
                    potential.client_data.placeholder_text = Some(other_placeholder.to_string());
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        let common = self.common();
        if common.id.is_empty() {
            return Err(IntakeError::layout("question is missing its id"));
        }
        if let Some(condition) = &common.condition {
            condition.validate()?;
        }
        if self.kind().is_choice() {
            let mut seen = std::collections::BTreeSet::new();
            for potential in self.potential_answers() {
                if !seen.insert(potential.id.as_str()) {
                    return Err(IntakeError::layout(format!(
                        "question '{}' repeats potential answer '{}'",
                        common.id, potential.id
                    )));
                }
            }
        }
        if let QuestionSpec::MediaSection(q) = self
            && q.media_slots.is_empty()
        {
            return Err(IntakeError::layout(format!(
                "media question '{}' declares no media slots",
                common.id
            )));
        }
        if let Some(config) = self.subquestions_config() {
            for screen in &config.screens {
                screen.validate()?;
            }
        }
        Ok(())
    }
}

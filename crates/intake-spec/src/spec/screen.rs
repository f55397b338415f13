use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;
use crate::error::IntakeError;
use crate::spec::layout::ButtonSpec;
use crate::spec::question::{QuestionKind, QuestionSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    Questions,
    Media,
    Pharmacy,
    Triage,
    WarningPopup,
    GenericPopup,
}

impl ScreenKind {
    pub fn type_tag(self) -> &'static str {
        match self {
            ScreenKind::Questions => "screen_type_questions",
            ScreenKind::Media => "screen_type_media",
            ScreenKind::Pharmacy => "screen_type_pharmacy",
            ScreenKind::Triage => "screen_type_triage",
            ScreenKind::WarningPopup => "screen_type_warning_popup",
            ScreenKind::GenericPopup => "screen_type_generic_popup",
        }
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScreenCommon {
    #[serde(default, alias = "screen_title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PopupSpec {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BodySpec {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionScreenSpec {
    #[serde(flatten)]
    pub common: ScreenCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_subtitle: Option<String>,
    #[serde(default)]
    pub header_title_has_tokens: bool,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupSpec>,
    #[serde(default)]
    pub requires_at_least_one_question_answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_button_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InfoScreenSpec {
    #[serde(flatten)]
    pub common: ScreenCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_button_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriageScreenSpec {
    #[serde(flatten)]
    pub info: InfoScreenSpec,
    #[serde(default)]
    pub pathway_id: String,
    /// Opaque parameters forwarded to the client untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage_params: Option<Value>,
}

/// One screen of a section or of a subquestions template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ScreenSpec {
    #[serde(rename = "screen_type_questions")]
    Questions(QuestionScreenSpec),
    #[serde(rename = "screen_type_media", alias = "screen_type_photo")]
    Media(QuestionScreenSpec),
    #[serde(rename = "screen_type_pharmacy")]
    Pharmacy(InfoScreenSpec),
    #[serde(rename = "screen_type_triage")]
    Triage(TriageScreenSpec),
    #[serde(rename = "screen_type_warning_popup")]
    WarningPopup(InfoScreenSpec),
    #[serde(rename = "screen_type_generic_popup")]
    GenericPopup(InfoScreenSpec),
}

impl ScreenSpec {
    pub fn kind(&self) -> ScreenKind {
        match self {
            ScreenSpec::Questions(_) => ScreenKind::Questions,
            ScreenSpec::Media(_) => ScreenKind::Media,
            ScreenSpec::Pharmacy(_) => ScreenKind::Pharmacy,
            ScreenSpec::Triage(_) => ScreenKind::Triage,
            ScreenSpec::WarningPopup(_) => ScreenKind::WarningPopup,
            ScreenSpec::GenericPopup(_) => ScreenKind::GenericPopup,
        }
    }

    pub fn common(&self) -> &ScreenCommon {
        match self {
            ScreenSpec::Questions(s) | ScreenSpec::Media(s) => &s.common,
            ScreenSpec::Pharmacy(s) | ScreenSpec::WarningPopup(s) | ScreenSpec::GenericPopup(s) => {
                &s.common
            }
            ScreenSpec::Triage(s) => &s.info.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ScreenCommon {
        match self {
            ScreenSpec::Questions(s) | ScreenSpec::Media(s) => &mut s.common,
            ScreenSpec::Pharmacy(s) | ScreenSpec::WarningPopup(s) | ScreenSpec::GenericPopup(s) => {
                &mut s.common
            }
            ScreenSpec::Triage(s) => &mut s.info.common,
        }
    }

    pub fn questions(&self) -> &[QuestionSpec] {
        match self {
            ScreenSpec::Questions(s) | ScreenSpec::Media(s) => &s.questions,
            _ => &[],
        }
    }

    pub fn questions_mut(&mut self) -> &mut [QuestionSpec] {
        match self {
            ScreenSpec::Questions(s) | ScreenSpec::Media(s) => &mut s.questions,
            _ => &mut [],
        }
    }

    /// Moves the questions out, leaving the static screen info behind.
    pub fn take_questions(&mut self) -> Vec<QuestionSpec> {
        match self {
            ScreenSpec::Questions(s) | ScreenSpec::Media(s) => std::mem::take(&mut s.questions),
            _ => Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        if let Some(condition) = &self.common().condition {
            condition.validate()?;
        }
        if let ScreenSpec::Media(screen) = self
            && let Some(question) = screen
                .questions
                .iter()
                .find(|q| q.kind() != QuestionKind::MediaSection)
        {
            return Err(IntakeError::layout(format!(
                "media screen holds non-media question '{}'",
                question.common().id
            )));
        }
        for question in self.questions() {
            question.validate()?;
        }
        Ok(())
    }
}

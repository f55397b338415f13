//! Structured binary messages exchanged with the embedding application.
//!
//! Every message is a serde struct encoded as CBOR.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::answers::Answer;
use crate::error::IntakeError;
use crate::spec::screen::ScreenKind;

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, IntakeError> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf)?;
    Ok(buf)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, IntakeError> {
    Ok(ciborium::from_reader(bytes)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Init payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitData {
    pub patient_visit_id: i64,
    /// Layout JSON document.
    pub layout: Vec<u8>,
    #[serde(default)]
    pub pairs: Vec<KeyValuePair>,
    #[serde(default)]
    pub is_submitted: bool,
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAnswerData {
    pub question_id: String,
    pub answer: Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenType {
    Questions,
    Media,
    Pharmacy,
    Triage,
    WarningPopup,
    GenericPopup,
    VisitOverview,
}

impl From<ScreenKind> for ScreenType {
    fn from(kind: ScreenKind) -> Self {
        match kind {
            ScreenKind::Questions => ScreenType::Questions,
            ScreenKind::Media => ScreenType::Media,
            ScreenKind::Pharmacy => ScreenType::Pharmacy,
            ScreenKind::Triage => ScreenType::Triage,
            ScreenKind::WarningPopup => ScreenType::WarningPopup,
            ScreenKind::GenericPopup => ScreenType::GenericPopup,
        }
    }
}

/// Canonical push-to-client payload; `data` holds the encoded per-type screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenData {
    #[serde(rename = "type")]
    pub screen_type: ScreenType,
    pub data: Vec<u8>,
    #[serde(default)]
    pub progress: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenIdData {
    #[serde(rename = "type")]
    pub screen_type: ScreenType,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequirementsResult {
    pub status: RequirementStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidateRequirementsResult {
    pub fn ok() -> Self {
        Self {
            status: RequirementStatus::Ok,
            message: None,
        }
    }

    pub fn error(message: Option<String>) -> Self {
        Self {
            status: RequirementStatus::Error,
            message,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RequirementStatus::Ok
    }
}

/// Commit envelope handed to the persistence client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAnswerData {
    pub question_id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub client_answer_json: String,
    pub session_id: String,
    pub session_counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdReplacementType {
    PhotoId,
    MediaId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReplacementData {
    #[serde(rename = "type")]
    pub replacement_type: IdReplacementType,
    /// Encoded [`MediaIdReplacement`].
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIdReplacement {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilledState {
    FilledStateUndefined,
    Filled,
    Unfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnabledState {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatusData {
    pub name: String,
    pub filled_state: FilledState,
    #[serde(default)]
    pub resume_screen_id: Option<String>,
}

/// Result of a completion-status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitStatusData {
    pub sections: Vec<SectionStatusData>,
    pub resume_section_index: u32,
    #[serde(default)]
    pub resume_screen_id: Option<String>,
}

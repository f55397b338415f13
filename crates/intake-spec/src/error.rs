use thiserror::Error;

use crate::commit::ClientError;
use crate::requirements::RequirementError;
use crate::spec::question::QuestionKind;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("layout malformed: {0}")]
    Layout(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid layout id '{0}'")]
    InvalidLayoutId(String),
    #[error("invalid answer for question '{question_id}': {reason}")]
    InvalidAnswer { question_id: String, reason: String },
    #[error(
        "question '{question_id}' expects an answer of kind '{expected}' but received '{found}'"
    )]
    AnswerTypeMismatch {
        question_id: String,
        expected: QuestionKind,
        found: QuestionKind,
    },
    #[error(transparent)]
    RequirementNotMet(#[from] RequirementError),
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("unknown screen '{0}'")]
    UnknownScreen(String),
    #[error("screen '{0}' is hidden")]
    HiddenScreen(String),
    #[error("no item pending upload with id '{0}'")]
    UnknownUploadId(String),
    #[error("item '{0}' already carries a server id")]
    AlreadyUploaded(String),
    #[error("visit is submitted and cannot be modified")]
    ReadOnly,
    #[error("invalid user field '{key}': {reason}")]
    InvalidUserField { key: String, reason: String },
    #[error("question '{0}' is already being edited")]
    EditInProgress(String),
    #[error("no edit in progress")]
    NotInEditMode,
    #[error("client failed to persist answer for '{question_id}': {source}")]
    Client {
        question_id: String,
        #[source]
        source: ClientError,
    },
    #[error("internal inconsistency: {0}")]
    Internal(String),
}

impl IntakeError {
    pub(crate) fn invalid_answer(question_id: &str, reason: impl Into<String>) -> Self {
        IntakeError::InvalidAnswer {
            question_id: question_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn layout(message: impl Into<String>) -> Self {
        IntakeError::Layout(message.into())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for IntakeError {
    fn from(err: ciborium::de::Error<std::io::Error>) -> Self {
        IntakeError::Codec(err.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for IntakeError {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        IntakeError::Codec(err.to_string())
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Id under which the synthesized overview screen is served.
pub const OVERVIEW_SCREEN_ID: &str = "visit_overview";

/// User-facing defaults applied by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub question_required_message: String,
    pub pharmacy_required_message: String,
    pub at_least_one_answer_message: String,
    pub media_missing_message: String,
    pub other_placeholder: String,
    pub overview_screen_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            question_required_message: "Please answer the question to continue.".into(),
            pharmacy_required_message: "Please choose a pharmacy to continue.".into(),
            at_least_one_answer_message: "Please answer at least one question to continue."
                .into(),
            media_missing_message: "Please take all required photos to continue.".into(),
            other_placeholder: "Type to add another".into(),
            overview_screen_id: OVERVIEW_SCREEN_ID.into(),
        }
    }
}

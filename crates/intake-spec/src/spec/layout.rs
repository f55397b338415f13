use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IntakeError;
use crate::spec::screen::ScreenSpec;

/// Top-level layout document: overview header, intake tree and optional prior answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LayoutSpec {
    #[serde(default)]
    pub header: OverviewHeader,
    pub intake: IntakeSpec,
    /// Previously persisted answers keyed by question id, in client shape.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OverviewHeader {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "icon")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeSpec {
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionSpec {
    #[serde(alias = "section_title")]
    pub title: String,
    #[serde(default)]
    pub screens: Vec<ScreenSpec>,
}

/// Message and buttons shown on the overview before a section (or before submission).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionSpec {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ButtonSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ButtonSpec {
    pub button_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl LayoutSpec {
    pub fn from_json(bytes: &[u8]) -> Result<Self, IntakeError> {
        let layout: LayoutSpec = serde_json::from_slice(bytes)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Structural checks serde does not cover.
    pub fn validate(&self) -> Result<(), IntakeError> {
        let sections = self.intake.sections.len();
        if self.intake.transitions.len() != sections + 1 {
            return Err(IntakeError::layout(format!(
                "expected {} transitions for {sections} sections, found {}",
                sections + 1,
                self.intake.transitions.len()
            )));
        }
        for section in &self.intake.sections {
            for screen in &section.screens {
                screen.validate()?;
            }
        }
        Ok(())
    }
}

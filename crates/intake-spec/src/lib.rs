#![allow(missing_docs)]

pub mod answers;
pub mod commit;
pub mod condition;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod graph;
pub mod id;
pub mod navigation;
pub mod node;
pub mod render;
pub mod requirements;
pub mod spec;
pub mod status;
pub mod subscreens;
pub mod tokens;
pub mod user_fields;
pub mod visibility;
pub mod wire;

pub use answers::{
    Answer, AnswerRules, AutocompleteAnswer, AutocompleteItem, ChoiceAnswer, MediaAnswer,
    MediaItem, MediaSection, MediaType, Selection, TextAnswer,
};
pub use commit::{Client, ClientClock, ClientError, NoopClient};
pub use condition::{Condition, DataSource};
pub use config::{EngineConfig, OVERVIEW_SCREEN_ID};
pub use edit::EditSession;
pub use engine::Engine;
pub use error::IntakeError;
pub use graph::DependencyGraph;
pub use id::{LayoutId, Segment, fnv32a, subscreen_hash};
pub use node::{NodeKey, Visibility};
pub use render::{
    InfoScreen, QuestionBody, QuestionMessage, QuestionScreen, TriageScreen, VisitOverviewScreen,
};
pub use requirements::RequirementError;
pub use spec::{LayoutSpec, QuestionKind, QuestionSpec, ScreenKind, ScreenSpec};
pub use status::{CompletionStatus, SectionState};
pub use subscreens::display_text;
pub use user_fields::{UserFieldValue, UserFields};
pub use wire::{
    ClientAnswerData, IdReplacementData, IdReplacementType, KeyValuePair, MediaIdReplacement,
    PatientAnswerData, Platform, ScreenData, ScreenIdData, ScreenType, ValidateRequirementsResult,
    VisitData, VisitStatusData,
};

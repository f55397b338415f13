pub mod layout;
pub mod question;
pub mod screen;

pub use layout::{ButtonSpec, IntakeSpec, LayoutSpec, OverviewHeader, SectionSpec, TransitionSpec};
pub use question::{
    AnswerGroupSpec, MediaSlotSpec, PotentialAnswerKind, PotentialAnswerSpec, QuestionCommon,
    QuestionKind, QuestionSpec, SubquestionsConfig,
};
pub use screen::{BodySpec, PopupSpec, ScreenCommon, ScreenKind, ScreenSpec};

mod common;

use std::collections::BTreeMap;

use common::*;
use intake_spec::wire::{self, EnabledState, FilledState};
use intake_spec::{
    Answer, ChoiceAnswer, Engine, MediaAnswer, MediaItem, MediaSection, OVERVIEW_SCREEN_ID,
    ScreenType, VisitOverviewScreen,
};

fn answer_first_two_sections(engine: &mut Engine) {
    let mut nausea = selection("11", None);
    nausea.sub_answers = BTreeMap::from([(
        "q_symptom_detail".to_string(),
        Answer::free_text("three days"),
    )]);
    engine
        .set_answer(
            "q_symptoms",
            Answer::MultipleChoice(ChoiceAnswer {
                selections: vec![nausea],
            }),
        )
        .expect("symptoms");
    engine
        .set_answer("q_severity", single_select("mild"))
        .expect("severity");
    engine
        .set_answer("q_allergies", Answer::free_text("none"))
        .expect("allergies");
}

fn uploaded_photo() -> Answer {
    Answer::MediaSection(MediaAnswer {
        sections: vec![MediaSection {
            name: "Forehead".into(),
            media: vec![MediaItem {
                name: "Front".into(),
                slot_id: "slot_front".into(),
                server_id: Some("S1".into()),
                ..MediaItem::default()
            }],
        }],
    })
}

fn overview(engine: &mut Engine) -> VisitOverviewScreen {
    let data = engine.screen(OVERVIEW_SCREEN_ID).expect("overview renders");
    assert_eq!(data.screen_type, ScreenType::VisitOverview);
    wire::decode(&data.data).expect("overview decodes")
}

#[test]
fn fresh_visit_resumes_at_first_section() {
    let (engine, _client) = headache_engine(&[]);
    let status = engine.compute_status();
    assert_eq!(status.resume_section_index, 0);
    assert_eq!(status.resume_screen_id.as_deref(), Some("se:0|sc:0"));
    assert_eq!(status.sections.len(), 3);
    assert!(status
        .sections
        .iter()
        .all(|s| s.filled_state == FilledState::Unfilled));
    assert_eq!(status.sections[1].name, "Medical History");
}

#[test]
fn resume_pointer_moves_to_first_incomplete_section() {
    let (mut engine, _client) = headache_engine(&[]);
    answer_first_two_sections(&mut engine);

    let status = engine.compute_status();
    assert_eq!(status.sections[0].filled_state, FilledState::Filled);
    assert_eq!(status.sections[1].filled_state, FilledState::Filled);
    assert_eq!(status.sections[2].filled_state, FilledState::Unfilled);
    assert_eq!(status.resume_section_index, 2);
    assert_eq!(status.resume_screen_id.as_deref(), Some("se:2|sc:0"));

    engine.set_answer("q_photos", uploaded_photo()).expect("photo");
    assert_eq!(engine.compute_status().resume_section_index, 2);

    engine
        .set_user_field("is_pharmacy_set", Some("true"))
        .expect("pharmacy chosen");
    let status = engine.compute_status();
    assert_eq!(status.resume_section_index, 3);
    assert_eq!(status.resume_screen_id, None);
    assert!(engine.validate_visit().is_ok());
}

#[test]
fn incomplete_subquestions_keep_section_open() {
    let (mut engine, _client) = headache_engine(&[]);
    engine
        .set_answer("q_symptoms", Answer::choices(&["10"]))
        .expect("headache");
    engine
        .set_answer("q_severity", single_select("mild"))
        .expect("severity");
    let status = engine.compute_status();
    assert_eq!(status.sections[0].filled_state, FilledState::Unfilled);
    assert_eq!(status.resume_section_index, 0);
    assert!(!engine.validate_screen("se:0|sc:0").expect("screen").is_ok());
}

#[test]
fn visible_triage_screen_blocks_completion() {
    let (mut engine, _client) = headache_engine(&[("gender", "female")]);
    answer_first_two_sections(&mut engine);
    assert_eq!(engine.compute_status().resume_section_index, 2);

    engine
        .set_answer("q_pregnant", single_select("preg_yes"))
        .expect("pregnant");
    let status = engine.compute_status();
    assert_eq!(status.resume_section_index, 1);
    assert_eq!(status.sections[1].filled_state, FilledState::Unfilled);
}

#[test]
fn overview_tracks_previously_shown_state() {
    let (mut engine, _client) = headache_engine(&[]);
    let first = overview(&mut engine);
    assert_eq!(first.title, "Headache Visit");
    assert_eq!(first.text, "Let's get started.");
    assert_eq!(first.buttons[0].text, "Begin");
    assert_eq!(first.sections[0].enabled, EnabledState::Enabled);
    assert_eq!(first.sections[1].enabled, EnabledState::Disabled);
    assert_eq!(first.sections[2].enabled, EnabledState::Disabled);
    assert_eq!(first.sections[0].previous, FilledState::FilledStateUndefined);
    assert_eq!(first.sections[0].current, FilledState::Unfilled);

    answer_first_two_sections(&mut engine);
    let second = overview(&mut engine);
    assert_eq!(second.text, "Almost done: photos and pharmacy.");
    assert_eq!(second.sections[0].previous, FilledState::Unfilled);
    assert_eq!(second.sections[0].current, FilledState::Filled);
    assert!(second
        .sections
        .iter()
        .all(|s| s.enabled == EnabledState::Enabled));

    let third = overview(&mut engine);
    assert_eq!(third.sections[0].previous, FilledState::Filled);
}

#[test]
fn completed_visit_shows_submit_transition() {
    let (mut engine, _client) = headache_engine(&[("is_pharmacy_set", "true")]);
    answer_first_two_sections(&mut engine);
    engine.set_answer("q_photos", uploaded_photo()).expect("photo");
    let screen = overview(&mut engine);
    assert_eq!(screen.text, "You're ready to submit.");
    assert_eq!(screen.buttons[0].tap_url.as_deref(), Some("app://submit"));
}

#[test]
fn navigation_walks_visible_screens_then_returns_to_overview() {
    let (mut engine, _client) = headache_engine(&[]);
    let start = engine.compute_next_screen("").expect("start");
    assert_eq!(start.id, OVERVIEW_SCREEN_ID);

    let err = engine
        .compute_next_screen("se:0|sc:0")
        .expect_err("required question unanswered");
    assert_eq!(err.to_string(), "Please answer the question to continue.");

    engine
        .set_answer("q_symptoms", Answer::choices(&["11"]))
        .expect("nausea");
    let subscreen = format!(
        "se:0|sc:0|qu:0|te:{}|sc:0",
        intake_spec::subscreen_hash("11", "Nausea")
    );
    let next = engine.compute_next_screen("se:0|sc:0").expect("next");
    assert_eq!(next.id, subscreen);
    let err = engine
        .compute_next_screen(&subscreen)
        .expect_err("detail unanswered");
    assert_eq!(err.to_string(), "Please answer the question to continue.");

    engine
        .set_answer(&format!("{subscreen}_q_symptom_detail"), Answer::free_text("a day"))
        .expect("detail");
    let next = engine.compute_next_screen(&subscreen).expect("after subscreen");
    assert_eq!(next.id, "se:0|sc:1");

    engine
        .set_answer("q_severity", single_select("mild"))
        .expect("mild");
    let next = engine.compute_next_screen("se:0|sc:1").expect("popup hidden");
    assert_eq!(next.screen_type, ScreenType::VisitOverview);

    engine
        .set_answer("q_severity", single_select("severe"))
        .expect("severe");
    let next = engine.compute_next_screen("se:0|sc:1").expect("popup shown");
    assert_eq!(next.id, "se:0|sc:2");
    assert_eq!(next.screen_type, ScreenType::WarningPopup);
}

#[test]
fn hidden_screens_are_not_rendered() {
    let (engine, _client) = headache_engine(&[]);
    assert!(matches!(
        engine.render_screen("se:1|sc:2"),
        Err(intake_spec::IntakeError::HiddenScreen(_))
    ));
    assert!(matches!(
        engine.render_screen("se:9|sc:0"),
        Err(intake_spec::IntakeError::UnknownScreen(_))
    ));
    let data = engine.render_screen("se:1|sc:0").expect("visible");
    assert_eq!(data.progress, Some(1.0 / 3.0));
}

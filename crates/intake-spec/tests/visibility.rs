mod common;

use common::*;
use intake_spec::{Answer, IntakeError};
use serde_json::json;

fn hide_show_layout() -> serde_json::Value {
    layout(vec![section(
        "Symptoms",
        vec![question_screen(vec![
            multiple_choice("q1", &[("1", "A"), ("2", "B")]),
            with(free_text("q2"), "condition", contains_any("q1", &["1"])),
        ])],
    )])
}

#[test]
fn answer_change_shows_and_hides_dependant() {
    let (mut engine, client) = engine_from(hide_show_layout());
    assert_eq!(engine.is_visible("q2"), Some(false));

    engine.set_answer("q1", Answer::choices(&["1"])).expect("select A");
    assert_eq!(engine.is_visible("q2"), Some(true));

    engine
        .set_answer("q2", Answer::free_text("since monday"))
        .expect("answer q2");
    client.clear();

    engine.set_answer("q1", Answer::choices(&["2"])).expect("select B");
    assert_eq!(engine.is_visible("q2"), Some(false));
    let payloads = client.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["answers"]["q1"]["potential_answers"][0]["id"], "2");
    assert_eq!(payloads[1], json!({ "clear_answers": ["q2"] }));
    assert_eq!(engine.is_dirty("q2"), Some(false));
}

#[test]
fn hidden_screen_hides_its_questions() {
    let gated = with(
        question_screen(vec![free_text("q2")]),
        "condition",
        contains_any("q1", &["1"]),
    );
    let (mut engine, _client) = engine_from(layout(vec![section(
        "One",
        vec![
            question_screen(vec![multiple_choice("q1", &[("1", "A"), ("2", "B")])]),
            gated,
        ],
    )]));
    assert_eq!(engine.is_visible("se:0|sc:1"), Some(false));
    assert_eq!(engine.is_visible("q2"), Some(false));

    engine.set_answer("q1", Answer::choices(&["1"])).expect("select A");
    assert_eq!(engine.is_visible("se:0|sc:1"), Some(true));
    assert_eq!(engine.is_visible("q2"), Some(true));
}

#[test]
fn screen_is_hidden_when_every_question_condition_fails() {
    let (mut engine, _client) = engine_from(layout(vec![section(
        "One",
        vec![
            question_screen(vec![multiple_choice("q1", &[("1", "A"), ("2", "B")])]),
            question_screen(vec![with(
                free_text("q2"),
                "condition",
                contains_any("q1", &["1"]),
            )]),
        ],
    )]));
    assert_eq!(engine.is_visible("se:0|sc:1"), Some(false));

    engine.set_answer("q1", Answer::choices(&["1"])).expect("select A");
    assert_eq!(engine.is_visible("se:0|sc:1"), Some(true));
    assert_eq!(engine.is_visible("q2"), Some(true));

    engine.set_answer("q1", Answer::choices(&["2"])).expect("select B");
    assert_eq!(engine.is_visible("se:0|sc:1"), Some(false));
    assert_eq!(engine.is_visible("q2"), Some(false));
}

#[test]
fn cyclic_conditions_terminate() {
    let (mut engine, _client) = engine_from(layout(vec![section(
        "Loop",
        vec![question_screen(vec![
            with(
                multiple_choice("q1", &[("a", "A")]),
                "condition",
                contains_any("q2", &["b"]),
            ),
            with(
                multiple_choice("q2", &[("b", "B")]),
                "condition",
                contains_any("q1", &["a"]),
            ),
        ])],
    )]));
    engine.set_answer("q1", Answer::choices(&["a"])).expect("answer q1");
    engine.set_answer("q2", Answer::choices(&["b"])).expect("answer q2");
    assert!(engine.is_graph_consistent());
}

#[test]
fn user_fields_drive_gender_conditions() {
    let (mut engine, _client) = headache_engine(&[]);
    assert_eq!(engine.is_visible("q_pregnant"), Some(false));
    assert_eq!(engine.is_visible("se:1|sc:1"), Some(false));

    engine
        .set_user_field("gender", Some("Female"))
        .expect("gender accepted");
    assert_eq!(engine.is_visible("q_pregnant"), Some(true));
    assert_eq!(engine.is_visible("se:1|sc:1"), Some(true));
    assert_eq!(engine.is_visible("se:1|sc:2"), Some(false));

    engine
        .set_answer("q_pregnant", single_select("preg_yes"))
        .expect("answer pregnancy");
    assert_eq!(engine.is_visible("se:1|sc:2"), Some(true));

    engine.set_user_field("gender", None).expect("gender removed");
    assert_eq!(engine.is_visible("q_pregnant"), Some(false));
    assert_eq!(engine.is_visible("se:1|sc:2"), Some(false));
}

#[test]
fn init_pairs_are_applied_before_first_evaluation() {
    let (engine, _client) = headache_engine(&[("gender", "female"), ("age_in_years", "31")]);
    assert_eq!(engine.is_visible("q_pregnant"), Some(true));
}

#[test]
fn unknown_user_field_is_rejected() {
    let (mut engine, _client) = headache_engine(&[]);
    let err = engine
        .set_user_field("favourite_colour", Some("blue"))
        .expect_err("unknown key");
    assert!(matches!(err, IntakeError::InvalidUserField { .. }));
    let err = engine
        .set_user_field("age_in_years", Some("forty"))
        .expect_err("not an integer");
    assert!(matches!(err, IntakeError::InvalidUserField { .. }));
}

#[test]
fn hidden_answered_question_is_cleared_on_init() {
    let mut layout = hide_show_layout();
    layout["answers"] = json!({
        "q1": { "potential_answers": [ { "id": "2" } ] },
        "q2": { "text": "stale" }
    });
    let (mut engine, client) = engine_from(layout);
    assert_eq!(engine.is_visible("q2"), Some(false));
    assert_eq!(engine.is_dirty("q2"), Some(true));
    assert!(client.commits().is_empty());

    engine
        .set_answer("q1", Answer::choices(&["1", "2"]))
        .expect("select both");
    assert!(client.payloads().iter().all(|p| p.get("clear_answers").is_none()));
    assert_eq!(engine.is_dirty("q2"), Some(false));
}

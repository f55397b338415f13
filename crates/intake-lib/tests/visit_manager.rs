use std::sync::{Arc, Mutex};
use std::thread;

use intake_lib::intake_spec::wire::{
    self, ClientAnswerData, FilledState, IdReplacementData, IdReplacementType, KeyValuePair,
    PatientAnswerData, ScreenData, ScreenIdData, ScreenType, ValidateRequirementsResult,
    VisitData, VisitStatusData,
};
use intake_lib::intake_spec::{
    Answer, ChoiceAnswer, Client, ClientError, IntakeError, MediaAnswer, MediaIdReplacement,
    MediaItem, MediaSection, Platform, QuestionScreen, Selection,
};
use intake_lib::{ManagerError, VisitManager};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorder {
    commits: Arc<Mutex<Vec<ClientAnswerData>>>,
}

impl Recorder {
    fn question_ids(&self) -> Vec<String> {
        self.commits
            .lock()
            .expect("lock")
            .iter()
            .map(|c| c.question_id.clone())
            .collect()
    }
}

impl Client for Recorder {
    fn persist_answer_for_question(&self, data: &[u8]) -> Result<(), ClientError> {
        let commit: ClientAnswerData =
            wire::decode(data).map_err(|err| ClientError::new(err.to_string()))?;
        self.commits.lock().expect("lock").push(commit);
        Ok(())
    }
}

fn layout() -> Value {
    json!({
        "header": { "title": "Rash Visit" },
        "intake": {
            "sections": [
                { "title": "About you", "screens": [
                    { "type": "screen_type_questions", "questions": [
                        { "type": "q_type_single_select", "id": "q_itch", "title": "Does it itch?", "required": true,
                          "potential_answers": [ { "id": "yes", "text": "Yes" }, { "id": "no", "text": "No" } ] }
                    ] },
                    { "type": "screen_type_questions", "questions": [
                        { "type": "q_type_free_text", "id": "q_where", "title": "Where?",
                          "condition": { "type": "answer_contains_any", "question_id": "q_itch", "potential_answers_id": ["yes"] } }
                    ] }
                ] },
                { "title": "Photos", "screens": [
                    { "type": "screen_type_media", "questions": [
                        { "type": "q_type_media_section", "id": "q_photo", "title": "Photo", "required": true,
                          "media_slots": [ { "id": "front", "name": "Front", "required": true } ] }
                    ] }
                ] }
            ],
            "transitions": [ { "message": "start" }, { "message": "photos" }, { "message": "done" } ]
        }
    })
}

fn init_bytes(layout: &Value) -> Vec<u8> {
    wire::encode(&VisitData {
        patient_visit_id: 11,
        layout: serde_json::to_vec(layout).expect("layout bytes"),
        pairs: vec![KeyValuePair {
            key: "gender".into(),
            value: Some("female".into()),
        }],
        is_submitted: false,
        platform: Platform::Ios,
    })
    .expect("encode init")
}

fn manager() -> (VisitManager, Recorder) {
    let recorder = Recorder::default();
    let manager = VisitManager::new();
    manager
        .init(&init_bytes(&layout()), Box::new(recorder.clone()))
        .expect("init");
    (manager, recorder)
}

fn answer_bytes(question_id: &str, answer: Answer) -> Vec<u8> {
    wire::encode(&PatientAnswerData {
        question_id: question_id.into(),
        answer,
    })
    .expect("encode answer")
}

fn single(id: &str) -> Answer {
    Answer::SingleSelect(ChoiceAnswer {
        selections: vec![Selection {
            potential_answer_id: id.into(),
            ..Selection::default()
        }],
    })
}

#[test]
fn calls_before_init_fail() {
    let manager = VisitManager::new();
    assert!(!manager.is_initialized());
    assert!(matches!(
        manager.compute_layout_status(),
        Err(ManagerError::NotInitialized)
    ));
    assert!(matches!(
        manager.set_answer_for_question(&answer_bytes("q", Answer::free_text("x"))),
        Err(ManagerError::NotInitialized)
    ));
}

#[test]
fn malformed_init_is_rejected() {
    let manager = VisitManager::new();
    let err = manager
        .init(&[0x01, 0x02], Box::new(Recorder::default()))
        .expect_err("not cbor");
    assert!(matches!(err, ManagerError::Intake(IntakeError::Codec(_))));

    let mut broken = layout();
    broken["intake"]["transitions"] = json!([]);
    let err = manager
        .init(&init_bytes(&broken), Box::new(Recorder::default()))
        .expect_err("bad transitions");
    assert!(matches!(err, ManagerError::Intake(IntakeError::Layout(_))));
    assert!(!manager.is_initialized());
}

#[test]
fn binary_round_trip_through_a_visit() {
    let (manager, recorder) = manager();

    let start: ScreenIdData = wire::decode(&manager.compute_next_screen("").expect("start"))
        .expect("screen id");
    assert_eq!(start.screen_type, ScreenType::VisitOverview);

    manager
        .set_answer_for_question(&answer_bytes("q_itch", single("yes")))
        .expect("itch");
    let next: ScreenIdData =
        wire::decode(&manager.compute_next_screen("se:0|sc:0").expect("next")).expect("decode");
    assert_eq!(next.id, "se:0|sc:1");

    let screen: ScreenData = wire::decode(&manager.screen("se:0|sc:1").expect("screen")).expect("decode");
    let questions: QuestionScreen = wire::decode(&screen.data).expect("question screen");
    assert_eq!(questions.questions[0].id, "q_where");
    assert_eq!(screen.progress, Some(1.0));

    let photo = Answer::MediaSection(MediaAnswer {
        sections: vec![MediaSection {
            name: "Arm".into(),
            media: vec![MediaItem {
                name: "Front".into(),
                slot_id: "front".into(),
                local_id: Some("local-7".into()),
                ..MediaItem::default()
            }],
        }],
    });
    manager
        .set_answer_for_question(&answer_bytes("q_photo", photo))
        .expect("photo");
    assert_eq!(recorder.question_ids(), vec!["q_itch".to_string()]);

    let replacement = IdReplacementData {
        replacement_type: IdReplacementType::MediaId,
        data: wire::encode(&MediaIdReplacement {
            id: "server-7".into(),
            ..MediaIdReplacement::default()
        })
        .expect("encode replacement"),
    };
    manager
        .replace_id("local-7", &wire::encode(&replacement).expect("encode"))
        .expect("replace");
    assert_eq!(
        recorder.question_ids(),
        vec!["q_itch".to_string(), "q_photo".to_string()]
    );

    let result: ValidateRequirementsResult =
        wire::decode(&manager.validate_requirements_in_layout().expect("validate")).expect("decode");
    assert!(result.is_ok());
    let status: VisitStatusData =
        wire::decode(&manager.compute_layout_status().expect("status")).expect("decode");
    assert_eq!(status.resume_section_index, 2);
    assert!(status.sections.iter().all(|s| s.filled_state == FilledState::Filled));
}

#[test]
fn key_value_pairs_are_validated() {
    let (manager, _recorder) = manager();
    let pair = |value: Option<&str>| {
        wire::encode(&KeyValuePair {
            key: "age_in_years".into(),
            value: value.map(str::to_string),
        })
        .expect("encode pair")
    };
    manager.set(&pair(Some("44"))).expect("age");
    manager.set(&pair(None)).expect("age removed");
    let err = manager.set(&pair(Some("old"))).expect_err("not an integer");
    assert!(matches!(
        err,
        ManagerError::Intake(IntakeError::InvalidUserField { .. })
    ));
}

#[test]
fn requirement_failures_surface_as_errors() {
    let (manager, _recorder) = manager();
    let err = manager
        .compute_next_screen("se:0|sc:0")
        .expect_err("required question");
    assert_eq!(err.to_string(), "Please answer the question to continue.");

    let result: ValidateRequirementsResult =
        wire::decode(&manager.validate_screen("se:0|sc:0").expect("validate")).expect("decode");
    assert!(!result.is_ok());
    assert!(matches!(
        manager.validate_screen("se:5|sc:0"),
        Err(ManagerError::Intake(IntakeError::UnknownScreen(_)))
    ));
}

#[test]
fn edit_mode_through_the_facade() {
    let (manager, recorder) = manager();
    manager
        .set_answer_for_question(&answer_bytes("q_itch", single("yes")))
        .expect("itch");
    let screen: ScreenIdData = wire::decode(
        &manager
            .start_edit_mode_with_question("q_itch")
            .expect("edit starts"),
    )
    .expect("decode");
    assert_eq!(screen.id, "se:0|sc:0");

    manager
        .set_answer_for_question(&answer_bytes("q_itch", single("no")))
        .expect("edit");
    assert_eq!(recorder.question_ids().len(), 1);
    manager.end_edit_mode(false).expect("keep");
    assert_eq!(recorder.question_ids().len(), 2);
    assert!(matches!(
        manager.end_edit_mode(true),
        Err(ManagerError::Intake(IntakeError::NotInEditMode))
    ));
}

#[test]
fn readers_run_alongside_a_writer() {
    let (manager, _recorder) = manager();
    let manager = Arc::new(manager);
    thread::scope(|scope| {
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                for _ in 0..25 {
                    let status: VisitStatusData = wire::decode(
                        &manager.compute_layout_status().expect("status"),
                    )
                    .expect("decode");
                    assert_eq!(status.sections.len(), 2);
                }
            });
        }
        let writer = Arc::clone(&manager);
        scope.spawn(move || {
            for round in 0..25 {
                let pick = if round % 2 == 0 { "yes" } else { "no" };
                writer
                    .set_answer_for_question(&answer_bytes("q_itch", single(pick)))
                    .expect("write");
            }
        });
    });
    let dump = manager.dump().expect("dump");
    assert!(dump.contains("q_itch"));
}

use intake_spec::spec::question::QuestionKind;
use intake_spec::{
    Answer, AnswerRules, AutocompleteAnswer, AutocompleteItem, ChoiceAnswer, IntakeError,
    PatientAnswerData, QuestionSpec, Selection, TextAnswer, wire,
};
use proptest::prelude::*;
use serde_json::json;

fn choice_question(value: serde_json::Value) -> QuestionSpec {
    serde_json::from_value(value).expect("question parses")
}

fn symptoms() -> QuestionSpec {
    choice_question(json!({
        "type": "q_type_multiple_choice",
        "id": "q1",
        "title": "Symptoms",
        "potential_answers": [
            { "id": "1", "text": "Cough" },
            { "id": "2", "text": "None", "answer_type": "a_type_multiple_choice_none" },
            { "id": "3", "text": "Other", "answer_type": "a_type_multiple_choice_other_free_text" }
        ]
    }))
}

fn rules(spec: &QuestionSpec, single: bool) -> AnswerRules<'_> {
    AnswerRules::Choice {
        potential_answers: spec.potential_answers(),
        single,
    }
}

fn pick(id: &str, text: Option<&str>) -> Selection {
    Selection {
        potential_answer_id: id.to_string(),
        text: text.map(str::to_string),
        ..Selection::default()
    }
}

fn choice(selections: Vec<Selection>) -> Answer {
    Answer::MultipleChoice(ChoiceAnswer { selections })
}

#[test]
fn none_of_the_above_is_exclusive() {
    let spec = symptoms();
    let answer = choice(vec![pick("1", None), pick("2", None)]);
    let err = answer.validate("q1", rules(&spec, false)).expect_err("exclusive");
    assert!(matches!(err, IntakeError::InvalidAnswer { .. }));
    choice(vec![pick("2", None)])
        .validate("q1", rules(&spec, false))
        .expect("none alone is fine");
}

#[test]
fn other_requires_custom_text_and_plain_options_reject_it() {
    let spec = symptoms();
    assert!(choice(vec![pick("3", Some("  "))])
        .validate("q1", rules(&spec, false))
        .is_err());
    choice(vec![pick("3", Some("Dizzy"))])
        .validate("q1", rules(&spec, false))
        .expect("custom text accepted");
    assert!(choice(vec![pick("1", Some("extra"))])
        .validate("q1", rules(&spec, false))
        .is_err());
}

#[test]
fn blank_text_on_plain_options_is_not_custom_text() {
    let spec = symptoms();
    choice(vec![pick("1", Some("")), pick("3", Some("Dizzy"))])
        .validate("q1", rules(&spec, false))
        .expect("blank text ignored");

    let value = json!({ "potential_answers": [ { "id": "1", "text": "  " } ] });
    let answer = Answer::from_client_json("q1", QuestionKind::MultipleChoice, &value, &|_| None)
        .expect("parses");
    assert_eq!(answer.as_choice().expect("choice").selections[0].text, None);
}

#[test]
fn unknown_potential_answer_and_multiple_single_selections_fail() {
    let spec = symptoms();
    let err = choice(vec![pick("9", None)])
        .validate("q1", rules(&spec, false))
        .expect_err("unknown id");
    assert!(err.to_string().contains("'9'"));
    assert!(choice(vec![pick("1", None), pick("3", Some("x"))])
        .validate("q1", rules(&spec, true))
        .is_err());
}

#[test]
fn autocomplete_items_need_text() {
    let answer = Answer::Autocomplete(AutocompleteAnswer {
        items: vec![AutocompleteItem::default()],
    });
    assert!(answer.validate("meds", AnswerRules::Autocomplete).is_err());
}

#[test]
fn answer_and_rules_must_agree_on_kind() {
    let err = Answer::free_text("x")
        .validate("q1", AnswerRules::Autocomplete)
        .expect_err("kind mismatch");
    assert!(err.to_string().contains("q_type_free_text"));
}

#[test]
fn client_json_accepts_numeric_ids_and_nested_answers() {
    let value = json!({ "potential_answers": [
        { "id": 1, "answers": { "detail": { "text": "two days" }, "unknown": { "text": "x" } } },
        { "potential_answer_id": "3", "text": "Dizzy" }
    ] });
    let answer = Answer::from_client_json("q1", QuestionKind::MultipleChoice, &value, &|id| {
        (id == "detail").then_some(QuestionKind::FreeText)
    })
    .expect("parses");
    let choice = answer.as_choice().expect("choice");
    assert_eq!(choice.selections[0].potential_answer_id, "1");
    assert_eq!(
        choice.selections[0].sub_answers.keys().collect::<Vec<_>>(),
        vec!["detail"]
    );
    assert_eq!(choice.selections[1].text.as_deref(), Some("Dizzy"));

    let err = Answer::from_client_json("q2", QuestionKind::FreeText, &json!({}), &|_| None)
        .expect_err("missing text");
    assert!(matches!(err, IntakeError::InvalidAnswer { question_id, .. } if question_id == "q2"));
}

#[test]
fn media_client_json_uses_media_id() {
    let value = json!({ "sections": [ { "name": "Face", "media": [
        { "name": "front", "slot_id": "s1", "media_id": 991, "type": "video" }
    ] } ] });
    let answer = Answer::from_client_json("m", QuestionKind::MediaSection, &value, &|_| None)
        .expect("parses");
    let media = answer.as_media().expect("media");
    let item = media.items().next().expect("one item");
    assert_eq!(item.server_id.as_deref(), Some("991"));
    assert!(answer.is_commit_ready());
    assert_eq!(answer.to_client_json()["sections"][0]["media"][0]["media_id"], "991");
}

#[test]
fn patient_answer_payload_round_trips_through_cbor() {
    let payload = PatientAnswerData {
        question_id: "q1".into(),
        answer: choice(vec![pick("3", Some("Dizzy"))]),
    };
    let bytes = wire::encode(&payload).expect("encode");
    let decoded: PatientAnswerData = wire::decode(&bytes).expect("decode");
    assert_eq!(decoded, payload);
    assert!(wire::decode::<PatientAnswerData>(&[0xff, 0x00]).is_err());
}

fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

fn custom_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ]{0,23}"
}

fn answer_strategy() -> impl Strategy<Value = Answer> {
    prop_oneof![
        text_strategy().prop_map(|text| Answer::FreeText(TextAnswer { text })),
        prop::collection::vec(("[0-9]{1,3}", prop::option::of(custom_text_strategy())), 0..5).prop_map(
            |picks| {
                choice(
                    picks
                        .into_iter()
                        .map(|(id, text)| Selection {
                            potential_answer_id: id,
                            text,
                            ..Selection::default()
                        })
                        .collect(),
                )
            }
        ),
        prop::collection::vec(text_strategy(), 0..4).prop_map(|texts| {
            Answer::Autocomplete(AutocompleteAnswer {
                items: texts
                    .into_iter()
                    .map(|text| AutocompleteItem {
                        text,
                        ..AutocompleteItem::default()
                    })
                    .collect(),
            })
        }),
    ]
}

proptest! {
    #[test]
    fn cbor_codec_preserves_answers(answer in answer_strategy()) {
        let bytes = answer.to_cbor().expect("encode");
        let decoded = Answer::from_cbor(&bytes).expect("decode");
        prop_assert_eq!(decoded, answer);
    }

    #[test]
    fn client_json_preserves_answers(answer in answer_strategy()) {
        let value = answer.to_client_json();
        let parsed = Answer::from_client_json("q", answer.kind(), &value, &|_| None).expect("parse");
        prop_assert_eq!(parsed, answer);
    }
}

mod common;

use common::*;
use intake_spec::wire;
use intake_spec::{
    Answer, IntakeError, MediaAnswer, MediaIdReplacement, MediaItem, MediaSection, Platform,
    QuestionBody, QuestionScreen, ScreenType,
};

const MEDIA_SCREEN: &str = "se:2|sc:0";

fn photo(slot_id: &str, local_id: Option<&str>, server_id: Option<&str>) -> MediaItem {
    MediaItem {
        name: format!("{slot_id} photo"),
        slot_id: slot_id.to_string(),
        local_id: local_id.map(str::to_string),
        server_id: server_id.map(str::to_string),
        ..MediaItem::default()
    }
}

fn media(items: Vec<MediaItem>) -> Answer {
    Answer::MediaSection(MediaAnswer {
        sections: vec![MediaSection {
            name: "Forehead".into(),
            media: items,
        }],
    })
}

fn replacement(id: &str) -> MediaIdReplacement {
    MediaIdReplacement {
        id: id.to_string(),
        url: Some(format!("https://cdn.example.com/{id}.jpg")),
        thumbnail_url: None,
    }
}

#[test]
fn pending_upload_blocks_commit_until_replaced() {
    let (mut engine, client) = headache_engine(&[]);
    engine
        .set_answer("q_photos", media(vec![photo("slot_front", Some("L1"), None)]))
        .expect("media answer");
    assert!(client.commits().is_empty());
    assert_eq!(engine.is_dirty("q_photos"), Some(true));
    assert_eq!(engine.pending_upload_ids(), vec!["L1".to_string()]);

    engine.replace_id("L1", replacement("S1")).expect("replace id");
    let commits = client.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].question_id, "q_photos");
    assert_eq!(commits[0].question_type, "q_type_media_section");
    let item = &client.last_payload()["answers"]["q_photos"]["sections"][0]["media"][0];
    assert_eq!(item["media_id"], "S1");
    assert_eq!(item["slot_id"], "slot_front");
    assert_eq!(item["url"], "https://cdn.example.com/S1.jpg");
    assert_eq!(engine.is_dirty("q_photos"), Some(false));
    assert!(engine.pending_upload_ids().is_empty());

    let err = engine
        .replace_id("L1", replacement("S2"))
        .expect_err("local id already resolved");
    assert!(matches!(err, IntakeError::UnknownUploadId(id) if id == "L1"));
}

#[test]
fn commit_waits_for_every_pending_item() {
    let (mut engine, client) = headache_engine(&[]);
    engine
        .set_answer(
            "q_photos",
            media(vec![
                photo("slot_front", Some("L1"), None),
                photo("slot_side", Some("L2"), None),
            ]),
        )
        .expect("media answer");

    engine.replace_id("L2", replacement("S2")).expect("replace second");
    assert!(client.commits().is_empty());

    engine.replace_id("L1", replacement("S1")).expect("replace first");
    assert_eq!(client.commits().len(), 1);
}

#[test]
fn media_items_need_an_id_and_a_name() {
    let (mut engine, _client) = headache_engine(&[]);
    let err = engine
        .set_answer("q_photos", media(vec![photo("slot_front", None, None)]))
        .expect_err("no id");
    assert!(matches!(err, IntakeError::InvalidAnswer { .. }));

    let mut unnamed = photo("slot_front", None, Some("S1"));
    unnamed.name = " ".into();
    let err = engine
        .set_answer("q_photos", media(vec![unnamed]))
        .expect_err("no name");
    assert!(matches!(err, IntakeError::InvalidAnswer { ref reason, .. } if reason.contains("name")));
}

#[test]
fn resent_answer_holding_both_ids_is_committed() {
    let (mut engine, client) = headache_engine(&[]);
    engine
        .set_answer("q_photos", media(vec![photo("slot_front", Some("L1"), Some("S1"))]))
        .expect("local and server id");
    assert!(engine.pending_upload_ids().is_empty());
    assert_eq!(client.commits().len(), 1);
    let item = &client.last_payload()["answers"]["q_photos"]["sections"][0]["media"][0];
    assert_eq!(item["media_id"], "S1");
    assert_eq!(engine.is_dirty("q_photos"), Some(false));
}

#[test]
fn single_section_questions_reject_extra_sections() {
    let (mut engine, _client) = headache_engine(&[]);
    let answer = Answer::MediaSection(MediaAnswer {
        sections: vec![
            MediaSection {
                name: "Front".into(),
                media: vec![photo("slot_front", None, Some("S1"))],
            },
            MediaSection {
                name: "Back".into(),
                media: vec![photo("slot_front", None, Some("S2"))],
            },
        ],
    });
    let err = engine.set_answer("q_photos", answer).expect_err("two sections");
    assert!(matches!(err, IntakeError::InvalidAnswer { .. }));
}

#[test]
fn missing_required_slot_fails_screen_validation() {
    let (mut engine, _client) = headache_engine(&[]);
    engine
        .set_answer("q_photos", media(vec![photo("slot_side", None, Some("S9"))]))
        .expect("side photo only");
    let result = engine.validate_screen(MEDIA_SCREEN).expect("screen exists");
    assert!(!result.is_ok());
    assert_eq!(
        result.message.as_deref(),
        Some("Please take all required photos to continue.")
    );

    engine
        .set_answer(
            "q_photos",
            media(vec![
                photo("slot_front", None, Some("S1")),
                photo("slot_side", None, Some("S9")),
            ]),
        )
        .expect("both photos");
    assert!(engine.validate_screen(MEDIA_SCREEN).expect("screen exists").is_ok());
}

fn rendered_slots(platform: Platform) -> Vec<intake_spec::render::MediaSlotMessage> {
    let (engine, _client) = headache_engine_on(platform, &[]);
    let data = engine.render_screen(MEDIA_SCREEN).expect("media screen renders");
    assert_eq!(data.screen_type, ScreenType::Media);
    let screen: QuestionScreen = wire::decode(&data.data).expect("decodes");
    match &screen.questions[0].body {
        QuestionBody::Media { slots, .. } => slots.clone(),
        other => panic!("expected media body, got {other:?}"),
    }
}

#[test]
fn android_prefers_inline_tip() {
    let slots = rendered_slots(Platform::Android);
    assert_eq!(slots[0].tip.tip, "Hold the phone at eye level");
    assert_eq!(slots[1].slot_type, "video");
    assert_eq!(
        slots[0].media_missing_error_message,
        "Please take all required photos to continue."
    );

    let slots = rendered_slots(Platform::Ios);
    assert_eq!(slots[0].tip.tip, "Face the camera");
}

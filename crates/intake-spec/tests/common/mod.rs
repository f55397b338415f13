#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use intake_spec::wire;
use intake_spec::{
    Answer, ChoiceAnswer, Client, ClientAnswerData, ClientError, Engine, EngineConfig,
    KeyValuePair, LayoutSpec, Platform, Selection, VisitData,
};
use serde_json::{Value, json};

pub const HEADACHE_VISIT: &str = include_str!("../fixtures/headache_visit.json");

/// Records every commit it receives; can be switched to fail.
#[derive(Clone, Default)]
pub struct RecordingClient {
    commits: Arc<Mutex<Vec<ClientAnswerData>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingClient {
    pub fn commits(&self) -> Vec<ClientAnswerData> {
        self.commits.lock().expect("commits lock").clone()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.commits()
            .iter()
            .map(|c| serde_json::from_str(&c.client_answer_json).expect("commit json"))
            .collect()
    }

    pub fn last_payload(&self) -> Value {
        self.payloads().pop().expect("at least one commit")
    }

    pub fn clear(&self) {
        self.commits.lock().expect("commits lock").clear();
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("failing lock") = failing;
    }
}

impl Client for RecordingClient {
    fn persist_answer_for_question(&self, data: &[u8]) -> Result<(), ClientError> {
        if *self.failing.lock().expect("failing lock") {
            return Err(ClientError::new("client offline"));
        }
        let commit: ClientAnswerData =
            wire::decode(data).map_err(|err| ClientError::new(err.to_string()))?;
        self.commits.lock().expect("commits lock").push(commit);
        Ok(())
    }
}

pub fn engine_from(layout: Value) -> (Engine, RecordingClient) {
    let client = RecordingClient::default();
    let layout: LayoutSpec = serde_json::from_value(layout).expect("layout parses");
    let engine = Engine::from_layout(layout, Box::new(client.clone()), EngineConfig::default())
        .expect("engine builds");
    (engine, client)
}

pub fn headache_engine(pairs: &[(&str, &str)]) -> (Engine, RecordingClient) {
    headache_engine_on(Platform::Android, pairs)
}

pub fn headache_engine_on(platform: Platform, pairs: &[(&str, &str)]) -> (Engine, RecordingClient) {
    let client = RecordingClient::default();
    let visit = VisitData {
        patient_visit_id: 42,
        layout: HEADACHE_VISIT.as_bytes().to_vec(),
        pairs: pairs
            .iter()
            .map(|(key, value)| KeyValuePair {
                key: key.to_string(),
                value: Some(value.to_string()),
            })
            .collect(),
        is_submitted: false,
        platform,
    };
    let engine = Engine::new(visit, Box::new(client.clone()), EngineConfig::default())
        .expect("engine builds");
    (engine, client)
}

pub fn layout(sections: Vec<Value>) -> Value {
    let transitions: Vec<Value> = (0..=sections.len())
        .map(|index| json!({ "message": format!("transition {index}") }))
        .collect();
    json!({
        "header": { "title": "Visit" },
        "intake": { "sections": sections, "transitions": transitions }
    })
}

pub fn section(title: &str, screens: Vec<Value>) -> Value {
    json!({ "title": title, "screens": screens })
}

pub fn question_screen(questions: Vec<Value>) -> Value {
    json!({ "type": "screen_type_questions", "questions": questions })
}

pub fn free_text(id: &str) -> Value {
    json!({ "type": "q_type_free_text", "id": id, "title": format!("Question {id}") })
}

pub fn multiple_choice(id: &str, options: &[(&str, &str)]) -> Value {
    let potential_answers: Vec<Value> = options
        .iter()
        .map(|(pa, text)| json!({ "id": pa, "text": text }))
        .collect();
    json!({
        "type": "q_type_multiple_choice",
        "id": id,
        "title": format!("Question {id}"),
        "potential_answers": potential_answers
    })
}

pub fn contains_any(question_id: &str, ids: &[&str]) -> Value {
    json!({ "type": "answer_contains_any", "question_id": question_id, "potential_answers_id": ids })
}

pub fn with(mut value: Value, key: &str, field: Value) -> Value {
    value[key] = field;
    value
}

pub fn single_select(potential_answer_id: &str) -> Answer {
    Answer::SingleSelect(ChoiceAnswer {
        selections: vec![Selection {
            potential_answer_id: potential_answer_id.to_string(),
            ..Selection::default()
        }],
    })
}

pub fn selection(potential_answer_id: &str, text: Option<&str>) -> Selection {
    Selection {
        potential_answer_id: potential_answer_id.to_string(),
        text: text.map(str::to_string),
        ..Selection::default()
    }
}

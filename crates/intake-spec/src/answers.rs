use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::IntakeError;
use crate::spec::question::{PotentialAnswerKind, PotentialAnswerSpec, QuestionKind};

/// Answer held by a question. Equality ignores sub-answers and upload urls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    FreeText(TextAnswer),
    SingleEntry(TextAnswer),
    Autocomplete(AutocompleteAnswer),
    MultipleChoice(ChoiceAnswer),
    SingleSelect(ChoiceAnswer),
    SegmentedControl(ChoiceAnswer),
    MediaSection(MediaAnswer),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TextAnswer {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AutocompleteAnswer {
    #[serde(default)]
    pub items: Vec<AutocompleteItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AutocompleteItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_answers: BTreeMap<String, Answer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceAnswer {
    #[serde(default)]
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Selection {
    pub potential_answer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_answers: BTreeMap<String, Answer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MediaAnswer {
    #[serde(default)]
    pub sections: Vec<MediaSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MediaSection {
    pub name: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MediaItem {
    #[serde(default)]
    pub name: String,
    pub slot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Question-side facts needed to validate an incoming answer.
#[derive(Debug, Clone, Copy)]
pub enum AnswerRules<'a> {
    Text,
    Choice {
        potential_answers: &'a [PotentialAnswerSpec],
        single: bool,
    },
    Autocomplete,
    Media {
        allows_multiple_sections: bool,
    },
}

impl PartialEq for TextAnswer {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl PartialEq for AutocompleteAnswer {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.text == b.text)
    }
}

impl PartialEq for ChoiceAnswer {
    fn eq(&self, other: &Self) -> bool {
        self.selections.len() == other.selections.len()
            && self.selections.iter().zip(&other.selections).all(|(a, b)| {
                a.potential_answer_id == b.potential_answer_id && a.text == b.text
            })
    }
}

impl PartialEq for MediaAnswer {
    fn eq(&self, other: &Self) -> bool {
        self.sections.len() == other.sections.len()
            && self.sections.iter().zip(&other.sections).all(|(a, b)| {
                a.name == b.name
                    && a.media.len() == b.media.len()
                    && a.media.iter().zip(&b.media).all(|(x, y)| {
                        x.name == y.name
                            && x.slot_id == y.slot_id
                            && x.local_id == y.local_id
                            && x.server_id == y.server_id
                    })
            })
    }
}

impl PartialEq for Answer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Answer::FreeText(a), Answer::FreeText(b))
            | (Answer::SingleEntry(a), Answer::SingleEntry(b)) => a == b,
            (Answer::Autocomplete(a), Answer::Autocomplete(b)) => a == b,
            (Answer::MultipleChoice(a), Answer::MultipleChoice(b))
            | (Answer::SingleSelect(a), Answer::SingleSelect(b))
            | (Answer::SegmentedControl(a), Answer::SegmentedControl(b)) => a == b,
            (Answer::MediaSection(a), Answer::MediaSection(b)) => a == b,
            _ => false,
        }
    }
}

impl Answer {
    pub fn free_text(text: impl Into<String>) -> Self {
        Answer::FreeText(TextAnswer { text: text.into() })
    }

    /// Multiple-choice answer selecting plain options by potential answer id.
    pub fn choices(ids: &[&str]) -> Self {
        Answer::MultipleChoice(ChoiceAnswer {
            selections: ids
                .iter()
                .map(|id| Selection {
                    potential_answer_id: id.to_string(),
                    ..Selection::default()
                })
                .collect(),
        })
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Answer::FreeText(_) => QuestionKind::FreeText,
            Answer::SingleEntry(_) => QuestionKind::SingleEntry,
            Answer::Autocomplete(_) => QuestionKind::Autocomplete,
            Answer::MultipleChoice(_) => QuestionKind::MultipleChoice,
            Answer::SingleSelect(_) => QuestionKind::SingleSelect,
            Answer::SegmentedControl(_) => QuestionKind::SegmentedControl,
            Answer::MediaSection(_) => QuestionKind::MediaSection,
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceAnswer> {
        match self {
            Answer::MultipleChoice(choice)
            | Answer::SingleSelect(choice)
            | Answer::SegmentedControl(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn as_choice_mut(&mut self) -> Option<&mut ChoiceAnswer> {
        match self {
            Answer::MultipleChoice(choice)
            | Answer::SingleSelect(choice)
            | Answer::SegmentedControl(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaAnswer> {
        match self {
            Answer::MediaSection(media) => Some(media),
            _ => None,
        }
    }

    pub fn as_media_mut(&mut self) -> Option<&mut MediaAnswer> {
        match self {
            Answer::MediaSection(media) => Some(media),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Answer::FreeText(a) | Answer::SingleEntry(a) => a.text.trim().is_empty(),
            Answer::Autocomplete(a) => a.items.is_empty(),
            Answer::MultipleChoice(a) | Answer::SingleSelect(a) | Answer::SegmentedControl(a) => {
                a.selections.is_empty()
            }
            Answer::MediaSection(a) => a.sections.is_empty(),
        }
    }

    /// True once every external reference the answer carries is resolved.
    pub fn is_commit_ready(&self) -> bool {
        match self {
            Answer::MediaSection(media) => media
                .items()
                .all(|item| item.server_id.is_some()),
            Answer::Autocomplete(a) => a
                .items
                .iter()
                .all(|item| item.sub_answers.values().all(Answer::is_commit_ready)),
            Answer::MultipleChoice(a) | Answer::SingleSelect(a) | Answer::SegmentedControl(a) => a
                .selections
                .iter()
                .all(|selection| selection.sub_answers.values().all(Answer::is_commit_ready)),
            Answer::FreeText(_) | Answer::SingleEntry(_) => true,
        }
    }

    /// Local ids of media items still waiting on an upload.
    pub fn pending_upload_ids(&self) -> Vec<String> {
        match self {
            Answer::MediaSection(media) => media
                .items()
                .filter(|item| item.server_id.is_none())
                .filter_map(|item| item.local_id.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Checks per-kind structural rules.
    pub fn validate(&self, question_id: &str, rules: AnswerRules<'_>) -> Result<(), IntakeError> {
        let fail = |reason: String| Err(IntakeError::invalid_answer(question_id, reason));
        match (self, rules) {
            (Answer::FreeText(_) | Answer::SingleEntry(_), AnswerRules::Text) => Ok(()),
            (Answer::Autocomplete(answer), AnswerRules::Autocomplete) => {
                if answer.items.iter().any(|item| item.text.trim().is_empty()) {
                    return fail("autocomplete items must have text".into());
                }
                Ok(())
            }
            (
                Answer::MultipleChoice(answer)
                | Answer::SingleSelect(answer)
                | Answer::SegmentedControl(answer),
                AnswerRules::Choice {
                    potential_answers,
                    single,
                },
            ) => {
                if single && answer.selections.len() > 1 {
                    return fail(format!(
                        "expected at most one selection, found {}",
                        answer.selections.len()
                    ));
                }
                let mut has_none = false;
                for selection in &answer.selections {
                    let Some(potential) = potential_answers
                        .iter()
                        .find(|pa| pa.id == selection.potential_answer_id)
                    else {
                        return fail(format!(
                            "unknown potential answer '{}'",
                            selection.potential_answer_id
                        ));
                    };
                    let custom = selection.text.as_deref().map(str::trim).unwrap_or_default();
                    match potential.kind {
                        PotentialAnswerKind::NoneOfTheAbove => has_none = true,
                        PotentialAnswerKind::OtherFreeText if custom.is_empty() => {
                            return fail(format!(
                                "selection '{}' requires custom text",
                                potential.id
                            ));
                        }
                        PotentialAnswerKind::Option | PotentialAnswerKind::Segmented
                            if !custom.is_empty() =>
                        {
                            return fail(format!(
                                "selection '{}' does not accept custom text",
                                potential.id
                            ));
                        }
                        _ => {}
                    }
                }
                if has_none && answer.selections.len() > 1 {
                    return fail("'none of the above' cannot be combined with other selections".into());
                }
                Ok(())
            }
            (
                Answer::MediaSection(answer),
                AnswerRules::Media {
                    allows_multiple_sections,
                },
            ) => {
                if !allows_multiple_sections && answer.sections.len() > 1 {
                    return fail("question accepts a single media section".into());
                }
                for section in &answer.sections {
                    if section.name.trim().is_empty() {
                        return fail("media section requires a name".into());
                    }
                    if section.media.is_empty() {
                        return fail(format!("media section '{}' has no media", section.name));
                    }
                    for item in &section.media {
                        if item.slot_id.is_empty() {
                            return fail("media item is missing its slot id".into());
                        }
                        if item.name.trim().is_empty() {
                            return fail(format!(
                                "media item in slot '{}' requires a name",
                                item.slot_id
                            ));
                        }
                        if item.local_id.is_none() && item.server_id.is_none() {
                            return fail(format!(
                                "media item in slot '{}' needs a local id or a server id",
                                item.slot_id
                            ));
                        }
                    }
                }
                Ok(())
            }
            (answer, _) => fail(format!("unexpected answer kind '{}'", answer.kind())),
        }
    }

    /// Client-facing JSON shape used in commit payloads.
    pub fn to_client_json(&self) -> Value {
        match self {
            Answer::FreeText(a) | Answer::SingleEntry(a) => json!({ "text": a.text }),
            Answer::Autocomplete(a) => {
                let items: Vec<Value> = a
                    .items
                    .iter()
                    .map(|item| {
                        let mut entry = Map::new();
                        entry.insert("text".into(), Value::String(item.text.clone()));
                        insert_sub_answers(&mut entry, &item.sub_answers);
                        Value::Object(entry)
                    })
                    .collect();
                json!({ "items": items })
            }
            Answer::MultipleChoice(a) | Answer::SingleSelect(a) | Answer::SegmentedControl(a) => {
                let selections: Vec<Value> = a
                    .selections
                    .iter()
                    .map(|selection| {
                        let mut entry = Map::new();
                        entry.insert(
                            "id".into(),
                            Value::String(selection.potential_answer_id.clone()),
                        );
                        if let Some(text) = &selection.text {
                            entry.insert("text".into(), Value::String(text.clone()));
                        }
                        insert_sub_answers(&mut entry, &selection.sub_answers);
                        Value::Object(entry)
                    })
                    .collect();
                json!({ "potential_answers": selections })
            }
            Answer::MediaSection(a) => {
                let sections: Vec<Value> = a
                    .sections
                    .iter()
                    .map(|section| {
                        let media: Vec<Value> = section
                            .media
                            .iter()
                            .map(|item| {
                                let mut entry = Map::new();
                                entry.insert("name".into(), Value::String(item.name.clone()));
                                entry.insert("slot_id".into(), Value::String(item.slot_id.clone()));
                                let media_id = item.server_id.as_ref().or(item.local_id.as_ref());
                                entry.insert(
                                    "media_id".into(),
                                    media_id.cloned().map(Value::String).unwrap_or(Value::Null),
                                );
                                entry.insert(
                                    "type".into(),
                                    serde_json::to_value(item.media_type).unwrap_or(Value::Null),
                                );
                                if let Some(url) = &item.url {
                                    entry.insert("url".into(), Value::String(url.clone()));
                                }
                                if let Some(url) = &item.thumbnail_url {
                                    entry.insert("thumbnail_url".into(), Value::String(url.clone()));
                                }
                                Value::Object(entry)
                            })
                            .collect();
                        json!({ "name": section.name, "media": media })
                    })
                    .collect();
                json!({ "sections": sections })
            }
        }
    }

    /// Parses a previously persisted client answer for a question of `kind`.
    ///
    /// `sub_kind` resolves the kind of template questions referenced by sub-answers;
    /// entries it cannot resolve are dropped.
    pub fn from_client_json(
        question_id: &str,
        kind: QuestionKind,
        value: &Value,
        sub_kind: &dyn Fn(&str) -> Option<QuestionKind>,
    ) -> Result<Self, IntakeError> {
        let invalid = |reason: &str| IntakeError::invalid_answer(question_id, reason);
        let answer = match kind {
            QuestionKind::FreeText | QuestionKind::SingleEntry => {
                let text = value
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("missing 'text'"))?;
                let text = TextAnswer { text: text.to_string() };
                if kind == QuestionKind::FreeText {
                    Answer::FreeText(text)
                } else {
                    Answer::SingleEntry(text)
                }
            }
            QuestionKind::Autocomplete => {
                let mut items = Vec::new();
                for entry in array_field(value, "items").ok_or_else(|| invalid("missing 'items'"))? {
                    let text = entry
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("autocomplete item missing 'text'"))?;
                    items.push(AutocompleteItem {
                        text: text.to_string(),
                        sub_answers: parse_sub_answers(entry, sub_kind)?,
                    });
                }
                Answer::Autocomplete(AutocompleteAnswer { items })
            }
            QuestionKind::MultipleChoice
            | QuestionKind::SingleSelect
            | QuestionKind::SegmentedControl => {
                let mut selections = Vec::new();
                for entry in array_field(value, "potential_answers")
                    .ok_or_else(|| invalid("missing 'potential_answers'"))?
                {
                    let id = entry
                        .get("id")
                        .or_else(|| entry.get("potential_answer_id"))
                        .and_then(value_as_id)
                        .ok_or_else(|| invalid("selection missing 'id'"))?;
                    selections.push(Selection {
                        potential_answer_id: id,
                        text: entry
                            .get("text")
                            .and_then(Value::as_str)
                            .filter(|text| !text.trim().is_empty())
                            .map(str::to_string),
                        sub_answers: parse_sub_answers(entry, sub_kind)?,
                    });
                }
                let choice = ChoiceAnswer { selections };
                match kind {
                    QuestionKind::SingleSelect => Answer::SingleSelect(choice),
                    QuestionKind::SegmentedControl => Answer::SegmentedControl(choice),
                    _ => Answer::MultipleChoice(choice),
                }
            }
            QuestionKind::MediaSection => {
                let mut sections = Vec::new();
                for entry in array_field(value, "sections").ok_or_else(|| invalid("missing 'sections'"))? {
                    let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
                    let mut media = Vec::new();
                    for item in array_field(entry, "media").into_iter().flatten() {
                        let media_type = item
                            .get("type")
                            .cloned()
                            .map(serde_json::from_value)
                            .transpose()?
                            .unwrap_or_default();
                        media.push(MediaItem {
                            name: string_field(item, "name").unwrap_or_default(),
                            slot_id: string_field(item, "slot_id").unwrap_or_default(),
                            local_id: None,
                            server_id: item.get("media_id").and_then(value_as_id),
                            url: string_field(item, "url"),
                            thumbnail_url: string_field(item, "thumbnail_url"),
                            media_type,
                        });
                    }
                    sections.push(MediaSection {
                        name: name.to_string(),
                        media,
                    });
                }
                Answer::MediaSection(MediaAnswer { sections })
            }
        };
        Ok(answer)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, IntakeError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, IntakeError> {
        Ok(ciborium::from_reader(bytes)?)
    }
}

impl MediaAnswer {
    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.sections.iter().flat_map(|section| section.media.iter())
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut MediaItem> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.media.iter_mut())
    }
}

fn insert_sub_answers(entry: &mut Map<String, Value>, sub_answers: &BTreeMap<String, Answer>) {
    if sub_answers.is_empty() {
        return;
    }
    let answers: Map<String, Value> = sub_answers
        .iter()
        .map(|(id, answer)| (id.clone(), answer.to_client_json()))
        .collect();
    entry.insert("answers".into(), Value::Object(answers));
}

fn parse_sub_answers(
    entry: &Value,
    sub_kind: &dyn Fn(&str) -> Option<QuestionKind>,
) -> Result<BTreeMap<String, Answer>, IntakeError> {
    let mut out = BTreeMap::new();
    let Some(answers) = entry.get("answers").and_then(Value::as_object) else {
        return Ok(out);
    };
    for (id, value) in answers {
        let Some(kind) = sub_kind(id) else {
            tracing::debug!(question_id = %id, "dropping sub-answer for unknown template question");
            continue;
        };
        let answer = Answer::from_client_json(id, kind, value, &|_| None)?;
        out.insert(id.clone(), answer);
    }
    Ok(out)
}

fn array_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Ids arrive either as strings or as bare integers.
fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

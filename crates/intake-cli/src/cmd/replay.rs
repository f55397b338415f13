use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use intake_lib::VisitManager;
use intake_lib::intake_spec::wire::{
    self, ClientAnswerData, IdReplacementData, IdReplacementType, KeyValuePair,
    PatientAnswerData, ScreenData, ScreenIdData, ScreenType, ValidateRequirementsResult,
    VisitStatusData,
};
use intake_lib::intake_spec::{
    Answer, EngineConfig, InfoScreen, MediaIdReplacement, QuestionScreen, TriageScreen,
    VisitOverviewScreen,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::session::{self, VisitArgs};

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub visit: VisitArgs,

    /// Script JSON: `{ "steps": [ { "op": "answer", ... } ] }`
    #[arg(long = "script", value_name = "FILE")]
    pub script: PathBuf,

    /// Stop at the first failing step
    #[arg(long = "strict")]
    pub strict: bool,

    /// Emit a JSON report instead of text
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Set {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    Answer {
        question_id: String,
        answer: Answer,
    },
    ReplaceId {
        local_id: String,
        media_id: String,
        #[serde(default)]
        url: Option<String>,
    },
    Next {
        #[serde(default)]
        from: String,
    },
    Screen {
        id: String,
    },
    Validate {
        #[serde(default)]
        screen: Option<String>,
    },
    Edit {
        question_id: String,
    },
    EndEdit {
        #[serde(default)]
        discard: bool,
    },
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Step::Set { .. } => "set",
            Step::Answer { .. } => "answer",
            Step::ReplaceId { .. } => "replace_id",
            Step::Next { .. } => "next",
            Step::Screen { .. } => "screen",
            Step::Validate { .. } => "validate",
            Step::Edit { .. } => "edit",
            Step::EndEdit { .. } => "end_edit",
        }
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    index: usize,
    op: &'static str,
    ok: bool,
    detail: Value,
    commits: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    steps: Vec<StepReport>,
    status: VisitStatusData,
}

pub fn run(args: &ReplayArgs, config: EngineConfig) -> Result<()> {
    let raw = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("invalid script {}", args.script.display()))?;
    let (manager, log) = session::open_visit(&args.visit, config)?;

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let outcome = apply(&manager, step);
        let commits = log.drain().iter().map(commit_value).collect();
        let (ok, detail) = match outcome {
            Ok(detail) => (true, detail),
            Err(err) => {
                if args.strict {
                    return Err(err)
                        .with_context(|| format!("step {index} ({}) failed", step.op()));
                }
                (false, json!(format!("{err:#}")))
            }
        };
        debug!(index, op = step.op(), ok, "replayed step");
        steps.push(StepReport {
            index,
            op: step.op(),
            ok,
            detail,
            commits,
        });
    }

    let status: VisitStatusData = wire::decode(&manager.compute_layout_status()?)?;
    let report = ReplayReport { steps, status };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}

fn apply(manager: &VisitManager, step: &Step) -> Result<Value> {
    match step {
        Step::Set { key, value } => {
            let pair = KeyValuePair {
                key: key.clone(),
                value: value.clone(),
            };
            manager.set(&wire::encode(&pair)?)?;
            Ok(Value::Null)
        }
        Step::Answer {
            question_id,
            answer,
        } => {
            let payload = PatientAnswerData {
                question_id: question_id.clone(),
                answer: answer.clone(),
            };
            manager.set_answer_for_question(&wire::encode(&payload)?)?;
            Ok(Value::Null)
        }
        Step::ReplaceId {
            local_id,
            media_id,
            url,
        } => {
            let replacement = MediaIdReplacement {
                id: media_id.clone(),
                url: url.clone(),
                thumbnail_url: None,
            };
            let envelope = IdReplacementData {
                replacement_type: IdReplacementType::MediaId,
                data: wire::encode(&replacement)?,
            };
            manager.replace_id(local_id, &wire::encode(&envelope)?)?;
            Ok(Value::Null)
        }
        Step::Next { from } => {
            let next: ScreenIdData = wire::decode(&manager.compute_next_screen(from)?)?;
            Ok(json!({ "id": next.id, "type": next.screen_type }))
        }
        Step::Screen { id } => {
            let screen: ScreenData = wire::decode(&manager.screen(id)?)?;
            screen_value(&screen)
        }
        Step::Validate { screen } => {
            let bytes = match screen {
                Some(id) => manager.validate_screen(id)?,
                None => manager.validate_requirements_in_layout()?,
            };
            let result: ValidateRequirementsResult = wire::decode(&bytes)?;
            if !result.is_ok() {
                bail!(
                    "{}",
                    result
                        .message
                        .unwrap_or_else(|| "requirements not met".to_string())
                );
            }
            Ok(Value::Null)
        }
        Step::Edit { question_id } => {
            let screen: ScreenIdData =
                wire::decode(&manager.start_edit_mode_with_question(question_id)?)?;
            Ok(json!({ "id": screen.id, "type": screen.screen_type }))
        }
        Step::EndEdit { discard } => {
            manager.end_edit_mode(*discard)?;
            Ok(Value::Null)
        }
    }
}

fn screen_value(screen: &ScreenData) -> Result<Value> {
    let body = match screen.screen_type {
        ScreenType::Questions | ScreenType::Media => {
            serde_json::to_value(wire::decode::<QuestionScreen>(&screen.data)?)?
        }
        ScreenType::Triage => serde_json::to_value(wire::decode::<TriageScreen>(&screen.data)?)?,
        ScreenType::VisitOverview => {
            serde_json::to_value(wire::decode::<VisitOverviewScreen>(&screen.data)?)?
        }
        ScreenType::Pharmacy | ScreenType::WarningPopup | ScreenType::GenericPopup => {
            serde_json::to_value(wire::decode::<InfoScreen>(&screen.data)?)?
        }
    };
    Ok(json!({
        "type": screen.screen_type,
        "progress": screen.progress,
        "screen": body,
    }))
}

fn commit_value(commit: &ClientAnswerData) -> Value {
    let payload = serde_json::from_str::<Value>(&commit.client_answer_json)
        .unwrap_or_else(|_| Value::String(commit.client_answer_json.clone()));
    json!({
        "question_id": commit.question_id,
        "type": commit.question_type,
        "counter": commit.session_counter,
        "payload": payload,
    })
}

fn print_text(report: &ReplayReport) {
    for step in &report.steps {
        let outcome = if step.ok { "ok" } else { "error" };
        match &step.detail {
            Value::Null => println!("[{}] {} {outcome}", step.index, step.op),
            Value::String(message) => {
                println!("[{}] {} {outcome}: {message}", step.index, step.op)
            }
            detail => println!("[{}] {} {outcome} {}", step.index, step.op, summarize(detail)),
        }
        for commit in &step.commits {
            println!(
                "  commit #{} {} {}",
                commit["counter"],
                commit["question_id"].as_str().unwrap_or_default(),
                commit["payload"]
            );
        }
    }
    println!("status:");
    for (index, section) in report.status.sections.iter().enumerate() {
        let marker = if index as u32 == report.status.resume_section_index {
            ">"
        } else {
            " "
        };
        println!("{marker} {index} {} {:?}", section.name, section.filled_state);
    }
    if let Some(screen) = &report.status.resume_screen_id {
        println!("resume at {screen}");
    }
}

fn summarize(detail: &Value) -> String {
    if let Some(id) = detail.get("id").and_then(Value::as_str) {
        return format!("-> {id}");
    }
    let progress = detail
        .get("progress")
        .and_then(Value::as_f64)
        .map(|p| format!(" progress {p:.2}"))
        .unwrap_or_default();
    let title = detail
        .pointer("/screen/title")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let questions: Vec<&str> = detail
        .pointer("/screen/questions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|q| q["id"].as_str()).collect())
        .unwrap_or_default();
    if questions.is_empty() {
        format!("'{title}'{progress}")
    } else {
        format!("'{title}'{progress} [{}]", questions.join(", "))
    }
}

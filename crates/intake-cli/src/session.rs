//! Visit setup shared by the subcommands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use intake_lib::VisitManager;
use intake_lib::intake_spec::wire::{self, ClientAnswerData, KeyValuePair, VisitData};
use intake_lib::intake_spec::{Client, ClientError, EngineConfig, Platform};
use tracing::debug;

#[derive(Args, Debug, Clone)]
pub struct VisitArgs {
    /// Layout JSON document
    #[arg(long = "layout", value_name = "FILE")]
    pub layout: PathBuf,

    #[arg(long = "platform", value_enum, default_value_t = PlatformArg::Android)]
    pub platform: PlatformArg,

    /// User field, repeatable (e.g. --pair gender=female)
    #[arg(long = "pair", value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub pairs: Vec<(String, String)>,

    /// Open the visit read-only
    #[arg(long = "submitted")]
    pub submitted: bool,

    #[arg(long = "visit-id", value_name = "ID", default_value_t = 1)]
    pub visit_id: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&raw)
        .with_context(|| format!("invalid engine config {}", path.display()))?;
    debug!(path = %path.display(), "loaded engine config");
    Ok(config)
}

/// Client that keeps every commit for later printing.
#[derive(Clone, Default)]
pub struct CommitLog {
    commits: Arc<Mutex<Vec<ClientAnswerData>>>,
}

impl CommitLog {
    /// Removes and returns the commits received so far.
    pub fn drain(&self) -> Vec<ClientAnswerData> {
        match self.commits.lock() {
            Ok(mut commits) => std::mem::take(&mut *commits),
            Err(_) => Vec::new(),
        }
    }
}

impl Client for CommitLog {
    fn persist_answer_for_question(&self, data: &[u8]) -> Result<(), ClientError> {
        let commit: ClientAnswerData =
            wire::decode(data).map_err(|err| ClientError::new(err.to_string()))?;
        self.commits
            .lock()
            .map_err(|_| ClientError::new("commit log poisoned"))?
            .push(commit);
        Ok(())
    }
}

/// Reads the layout, initializes a manager and returns it with its commit log.
pub fn open_visit(args: &VisitArgs, config: EngineConfig) -> Result<(VisitManager, CommitLog)> {
    let layout = fs::read(&args.layout)
        .with_context(|| format!("failed to read layout {}", args.layout.display()))?;
    let visit = VisitData {
        patient_visit_id: args.visit_id,
        layout,
        pairs: args
            .pairs
            .iter()
            .map(|(key, value)| KeyValuePair {
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect(),
        is_submitted: args.submitted,
        platform: args.platform.into(),
    };
    let bytes = wire::encode(&visit).context("failed to encode visit data")?;
    let log = CommitLog::default();
    let manager = VisitManager::new();
    manager
        .init_with_config(&bytes, Box::new(log.clone()), config)
        .with_context(|| format!("failed to initialize visit from {}", args.layout.display()))?;
    Ok((manager, log))
}

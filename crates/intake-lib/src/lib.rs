//! Binary-in, binary-out entry points for embedding the intake engine.
//!
//! Every call decodes a CBOR message, runs the engine under one readers-writer
//! lock and encodes the reply. The persistence client is invoked synchronously
//! while the write lock is held, so it must never call back into the manager.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use intake_spec::wire::{self, IdReplacementData, KeyValuePair, PatientAnswerData, VisitData};
use intake_spec::{Client, Engine, EngineConfig, IntakeError, MediaIdReplacement};
use thiserror::Error;
use tracing::info;

pub use intake_spec;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("visit manager is not initialized")]
    NotInitialized,
    #[error("visit state lock poisoned")]
    LockPoisoned,
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Shared handle to one visit's intake state.
pub struct VisitManager {
    engine: RwLock<Option<Engine>>,
    config: EngineConfig,
}

impl Default for VisitManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitManager {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Manager whose `init` calls use `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: RwLock::new(None),
            config,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Builds the engine from an encoded [`VisitData`], replacing any previous visit.
    pub fn init(&self, data: &[u8], client: Box<dyn Client>) -> ManagerResult<()> {
        self.init_with_config(data, client, self.config.clone())
    }

    pub fn init_with_config(
        &self,
        data: &[u8],
        client: Box<dyn Client>,
        config: EngineConfig,
    ) -> ManagerResult<()> {
        let visit: VisitData = wire::decode(data)?;
        let visit_id = visit.patient_visit_id;
        let engine = Engine::new(visit, client, config)?;
        *self.write()? = Some(engine);
        info!(visit_id, "visit initialized");
        Ok(())
    }

    /// Applies an encoded [`KeyValuePair`].
    pub fn set(&self, data: &[u8]) -> ManagerResult<()> {
        let pair: KeyValuePair = wire::decode(data)?;
        self.with_engine_mut(|engine| engine.set_user_field(&pair.key, pair.value.as_deref()))
    }

    /// Stores an encoded [`PatientAnswerData`].
    pub fn set_answer_for_question(&self, data: &[u8]) -> ManagerResult<()> {
        let PatientAnswerData {
            question_id,
            answer,
        } = wire::decode(data)?;
        self.with_engine_mut(|engine| engine.set_answer(&question_id, answer))
    }

    /// Binds the server id carried by an encoded [`IdReplacementData`] to `current_id`.
    pub fn replace_id(&self, current_id: &str, data: &[u8]) -> ManagerResult<()> {
        let envelope: IdReplacementData = wire::decode(data)?;
        let replacement: MediaIdReplacement = wire::decode(&envelope.data)?;
        self.with_engine_mut(|engine| engine.replace_id(current_id, replacement))
    }

    /// Encoded [`intake_spec::ScreenIdData`] of the screen after `current`.
    pub fn compute_next_screen(&self, current: &str) -> ManagerResult<Vec<u8>> {
        self.with_engine(|engine| wire::encode(&engine.compute_next_screen(current)?))
    }

    /// Encoded [`intake_spec::ScreenData`]; serving the overview records its state.
    pub fn screen(&self, screen_id: &str) -> ManagerResult<Vec<u8>> {
        self.with_engine_mut(|engine| wire::encode(&engine.screen(screen_id)?))
    }

    pub fn validate_screen(&self, screen_id: &str) -> ManagerResult<Vec<u8>> {
        self.with_engine(|engine| wire::encode(&engine.validate_screen(screen_id)?))
    }

    pub fn validate_requirements_in_layout(&self) -> ManagerResult<Vec<u8>> {
        self.with_engine(|engine| wire::encode(&engine.validate_visit()))
    }

    /// Encoded [`intake_spec::VisitStatusData`].
    pub fn compute_layout_status(&self) -> ManagerResult<Vec<u8>> {
        self.with_engine(|engine| wire::encode(&engine.compute_status()))
    }

    /// Opens an edit on `question_id`; returns the encoded id of its screen.
    pub fn start_edit_mode_with_question(&self, question_id: &str) -> ManagerResult<Vec<u8>> {
        self.with_engine_mut(|engine| wire::encode(&engine.begin_edit(question_id)?))
    }

    pub fn end_edit_mode(&self, discard: bool) -> ManagerResult<()> {
        self.with_engine_mut(|engine| engine.end_edit(discard))
    }

    /// Human-readable dump of the current tree.
    pub fn dump(&self) -> ManagerResult<String> {
        self.with_engine(|engine| Ok(engine.dump()))
    }

    fn read(&self) -> ManagerResult<RwLockReadGuard<'_, Option<Engine>>> {
        self.engine.read().map_err(|_| ManagerError::LockPoisoned)
    }

    fn write(&self) -> ManagerResult<RwLockWriteGuard<'_, Option<Engine>>> {
        self.engine.write().map_err(|_| ManagerError::LockPoisoned)
    }

    fn with_engine<T>(
        &self,
        f: impl FnOnce(&Engine) -> Result<T, IntakeError>,
    ) -> ManagerResult<T> {
        let guard = self.read()?;
        let engine = guard.as_ref().ok_or(ManagerError::NotInitialized)?;
        Ok(f(engine)?)
    }

    fn with_engine_mut<T>(
        &self,
        f: impl FnOnce(&mut Engine) -> Result<T, IntakeError>,
    ) -> ManagerResult<T> {
        let mut guard = self.write()?;
        let engine = guard.as_mut().ok_or(ManagerError::NotInitialized)?;
        Ok(f(engine)?)
    }
}

//! Checkpoint saver: writes the training state at fit end and on every new best epoch.

use crate::config::SaverConfig;
use crate::error::MlError;
use crate::training::events::EventHandler;
use crate::training::state::{State, Stateful};
use std::path::{Path, PathBuf};
use tracing::info;

pub const LAST_CHECKPOINT: &str = "last.json";
pub const BEST_CHECKPOINT: &str = "best.json";

/// Saves `last.json` when fitting ends and `best.json` whenever the monitored
/// metric's best epoch is the current one.
#[derive(Debug, Clone)]
pub struct ModelSaver {
    path: PathBuf,
    monitor: String,
}

impl ModelSaver {
    pub fn new(path: impl Into<PathBuf>, monitor: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            monitor: monitor.into(),
        }
    }

    pub fn from_config(config: &SaverConfig) -> Self {
        Self::new(config.path.clone(), config.monitor.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn monitor(&self) -> &str {
        &self.monitor
    }
}

impl Stateful for ModelSaver {}

impl EventHandler for ModelSaver {
    fn on_fit_end(&mut self, state: &mut State) -> Result<(), MlError> {
        let filename = self.path.join(LAST_CHECKPOINT);
        info!(path = %filename.display(), "Saving last model");
        state.save(&filename)
    }

    fn on_epoch_end(&mut self, state: &mut State) -> Result<(), MlError> {
        let epoch = state.epoch()?;
        let best = state.best_results()?;
        let result = best.get(&self.monitor).ok_or_else(|| {
            MlError::training(format!("no best result recorded for '{}'", self.monitor))
        })?;
        if result.best_epoch == epoch {
            let filename = self.path.join(BEST_CHECKPOINT);
            info!(epoch, path = %filename.display(), "Found new best model");
            state.save(&filename)?;
        }
        Ok(())
    }
}

//! Configuration system for mlutils.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment.

use crate::error::{MlError, SplitError};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MlConfig {
    /// How splits are computed.
    #[serde(default)]
    pub splitter: SplitterConfig,
    /// Where splits live and how loaders batch them.
    #[serde(default)]
    pub data: DataConfig,
    /// Checkpoint saver settings.
    #[serde(default)]
    pub saver: SaverConfig,
}

/// The four nesting schemes a splitter can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitterKind {
    /// Holdout test set, holdout validation set.
    Holdout,
    /// Holdout test set, k-fold inner cross-validation.
    CvHoldout,
    /// K-fold outer test folds, holdout validation set.
    NestedHoldout,
    /// K-fold outer test folds, k-fold inner cross-validation.
    #[default]
    NestedCv,
}

impl SplitterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holdout => "holdout",
            Self::CvHoldout => "cv-holdout",
            Self::NestedHoldout => "nested-holdout",
            Self::NestedCv => "nested-cv",
        }
    }

    /// Whether the outer level is a k-fold partition.
    pub fn outer_is_kfold(&self) -> bool {
        matches!(self, Self::NestedHoldout | Self::NestedCv)
    }

    /// Whether the inner level is a k-fold partition.
    pub fn inner_is_kfold(&self) -> bool {
        matches!(self, Self::CvHoldout | Self::NestedCv)
    }
}

impl fmt::Display for SplitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitterKind {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "holdout" => Ok(Self::Holdout),
            "cv-holdout" => Ok(Self::CvHoldout),
            "nested-holdout" => Ok(Self::NestedHoldout),
            "nested-cv" => Ok(Self::NestedCv),
            other => Err(SplitError::invalid_config(format!(
                "unknown splitter '{other}'"
            ))),
        }
    }
}

/// Splitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Nesting scheme.
    #[serde(default)]
    pub kind: SplitterKind,
    /// Holdout fraction used by every holdout level.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Outer k-fold count (k-fold outer levels only; defaults to 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_folds: Option<usize>,
    /// Inner k-fold count (k-fold inner levels only; defaults to 5 for
    /// cv-holdout and 3 for nested-cv).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_folds: Option<usize>,
    /// Preserve class proportions in every fold.
    #[serde(default)]
    pub stratified: bool,
    /// Shuffle positions before k-fold partitioning.
    #[serde(default)]
    pub shuffle: bool,
    /// Seed for every random draw.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            kind: SplitterKind::default(),
            test_size: default_test_size(),
            outer_folds: None,
            inner_folds: None,
            stratified: false,
            shuffle: false,
            seed: default_seed(),
        }
    }
}

impl SplitterConfig {
    pub fn new(kind: SplitterKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Outer fold count with the per-kind default applied.
    pub fn resolved_outer_folds(&self) -> usize {
        if self.kind.outer_is_kfold() {
            self.outer_folds.unwrap_or(DEFAULT_OUTER_FOLDS)
        } else {
            1
        }
    }

    /// Inner fold count with the per-kind default applied.
    pub fn resolved_inner_folds(&self) -> usize {
        match self.kind {
            SplitterKind::CvHoldout => self.inner_folds.unwrap_or(DEFAULT_CV_HOLDOUT_INNER_FOLDS),
            SplitterKind::NestedCv => self.inner_folds.unwrap_or(DEFAULT_NESTED_CV_INNER_FOLDS),
            SplitterKind::Holdout | SplitterKind::NestedHoldout => 1,
        }
    }

    /// Reject values no fold strategy can honor.
    pub fn validate(&self) -> Result<(), SplitError> {
        let uses_holdout = !self.kind.outer_is_kfold() || !self.kind.inner_is_kfold();
        if uses_holdout && !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SplitError::invalid_config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.kind.outer_is_kfold() && self.resolved_outer_folds() < 2 {
            return Err(SplitError::invalid_config(
                "outer_folds must be at least 2",
            ));
        }
        if self.kind.inner_is_kfold() && self.resolved_inner_folds() < 2 {
            return Err(SplitError::invalid_config(
                "inner_folds must be at least 2",
            ));
        }
        Ok(())
    }
}

const DEFAULT_OUTER_FOLDS: usize = 5;
const DEFAULT_CV_HOLDOUT_INNER_FOLDS: usize = 5;
const DEFAULT_NESTED_CV_INNER_FOLDS: usize = 3;

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

/// Split file location and loader batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Persisted split assignment.
    #[serde(default = "default_splits_path")]
    pub splits_path: PathBuf,
    /// Items per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Shuffle items within a partition before batching.
    #[serde(default)]
    pub shuffle: bool,
    /// Drop a trailing batch smaller than `batch_size`.
    #[serde(default)]
    pub drop_last: bool,
    /// Seed for loader shuffling.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            splits_path: default_splits_path(),
            batch_size: default_batch_size(),
            shuffle: false,
            drop_last: false,
            seed: default_seed(),
        }
    }
}

fn default_splits_path() -> PathBuf {
    PathBuf::from("splits.yaml")
}

fn default_batch_size() -> usize {
    32
}

/// Checkpoint saver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaverConfig {
    /// Directory receiving `last.json` and `best.json`.
    #[serde(default = "default_checkpoint_dir")]
    pub path: PathBuf,
    /// Key into the state's best results that decides when a new best is saved.
    #[serde(default = "default_monitor")]
    pub monitor: String,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_dir(),
            monitor: default_monitor(),
        }
    }
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_monitor() -> String {
    "validation_loss".to_string()
}

/// Workspace-local configuration file, `<workspace>/.mlutils/config.toml`.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".mlutils").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `MLUTILS_`, `__` between levels)
/// 2. Explicit config file
/// 3. Workspace-local config (`.mlutils/config.toml`)
/// 4. User config (`~/.config/mlutils/config.toml`)
/// 5. Built-in defaults
pub fn load_config(workspace: Option<&Path>, explicit: Option<&Path>) -> Result<MlConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(MlConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "mlutils", "mlutils") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(MlError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // MLUTILS_SPLITTER__KIND, MLUTILS_SAVER__MONITOR, ...
    figment = figment.merge(Env::prefixed("MLUTILS_").split("__"));

    Ok(figment.extract()?)
}

//! Training state: named values plus stateful components, serializable as one document.

use crate::error::MlError;
use crate::persistence;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Components that can snapshot and restore their own state.
pub trait Stateful {
    fn state_dict(&self) -> Value {
        Value::Object(Map::new())
    }

    fn load_state_dict(&mut self, _state: Value) -> Result<(), MlError> {
        Ok(())
    }
}

/// Best value seen so far for one monitored metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub best_epoch: usize,
    pub best_value: f64,
}

pub const EPOCH: &str = "epoch";
pub const BEST_RESULTS: &str = "best_results";

/// Shared state handed to every event handler.
#[derive(Default)]
pub struct State {
    values: BTreeMap<String, Value>,
    components: BTreeMap<String, Box<dyn Stateful + Send>>,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("values", &self.values)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.components.contains_key(name)
    }

    /// Store a plain value under `name`, replacing any previous one.
    pub fn set<T: Serialize>(&mut self, name: impl Into<String>, value: T) -> Result<(), MlError> {
        self.values.insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Read a plain value. `Ok(None)` when nothing is stored under `name`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, MlError> {
        match self.values.get(name) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some() || self.components.remove(name).is_some()
    }

    /// Own a component; its state is serialized through [`Stateful`].
    pub fn insert_component(&mut self, name: impl Into<String>, component: Box<dyn Stateful + Send>) {
        self.components.insert(name.into(), component);
    }

    pub fn component(&self, name: &str) -> Option<&(dyn Stateful + Send)> {
        self.components.get(name).map(|c| c.as_ref())
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut (dyn Stateful + Send + 'static)> {
        self.components.get_mut(name).map(|c| c.as_mut())
    }

    pub fn epoch(&self) -> Result<usize, MlError> {
        self.get(EPOCH)?
            .ok_or_else(|| MlError::training("state has no epoch"))
    }

    pub fn best_results(&self) -> Result<BTreeMap<String, BestResult>, MlError> {
        Ok(self.get(BEST_RESULTS)?.unwrap_or_default())
    }

    /// Record `value` for `metric` at the current epoch if it beats the stored best.
    /// Returns whether it did.
    pub fn update_best(&mut self, metric: &str, value: f64, lower_is_better: bool) -> Result<bool, MlError> {
        let epoch = self.epoch()?;
        let mut best = self.best_results()?;
        let improved = match best.get(metric) {
            None => true,
            Some(prev) if lower_is_better => value < prev.best_value,
            Some(prev) => value > prev.best_value,
        };
        if improved {
            best.insert(
                metric.to_string(),
                BestResult {
                    best_epoch: epoch,
                    best_value: value,
                },
            );
            self.set(BEST_RESULTS, best)?;
        }
        Ok(improved)
    }

    /// Write the state dict as JSON.
    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        persistence::atomic_write_json(path, &self.state_dict())
    }

    /// Restore a state written by [`State::save`].
    pub fn load(&mut self, path: &Path) -> Result<(), MlError> {
        let value: Value = persistence::load_document(path)?;
        self.load_state_dict(value)
    }
}

impl Stateful for State {
    fn state_dict(&self) -> Value {
        let mut state: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, component) in &self.components {
            state.insert(name.clone(), component.state_dict());
        }
        let mut root = Map::new();
        root.insert("state".to_string(), Value::Object(state));
        Value::Object(root)
    }

    fn load_state_dict(&mut self, state: Value) -> Result<(), MlError> {
        let entries = match state {
            Value::Object(mut root) => match root.remove("state") {
                Some(Value::Object(entries)) => entries,
                _ => return Err(MlError::training("state dict has no 'state' object")),
            },
            _ => return Err(MlError::training("state dict must be an object")),
        };
        for (name, value) in entries {
            match self.components.get_mut(&name) {
                Some(component) if !value.is_null() => component.load_state_dict(value)?,
                _ => {
                    self.values.insert(name, value);
                }
            }
        }
        Ok(())
    }
}

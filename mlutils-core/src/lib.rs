//! # mlutils-core: helpers for machine-learning experiment pipelines
//!
//! - [`data`]: nested cross-validation / holdout splitting with persisted,
//!   reproducible split files, plus a provider that turns splits into batch loaders.
//! - [`training`]: lifecycle events for training callbacks, a shared state
//!   container, and a checkpoint saver keyed on a monitored metric.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;

// Splitting and loading
pub mod data;

// Callbacks and checkpoints
pub mod training;

// Re-exports
pub use config::{MlConfig, SplitterConfig, SplitterKind, load_config};
pub use data::{DataProvider, Dataset, Partition, SplitAssignment, Splitter};
pub use error::{MlError, SplitError};
pub use training::{Event, EventDispatcher, EventHandler, ModelSaver, State, Stateful};

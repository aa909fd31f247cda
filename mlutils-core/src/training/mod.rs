//! Training infrastructure: lifecycle events, shared state, checkpoint saving.

pub mod events;
pub mod saver;
pub mod state;

pub use events::{Event, EventDispatcher, EventHandler, HandlerId};
pub use saver::ModelSaver;
pub use state::{BestResult, State, Stateful};

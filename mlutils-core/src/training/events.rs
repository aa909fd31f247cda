//! Training lifecycle events and the dispatcher that fans them out to handlers.

use crate::error::MlError;
use crate::training::state::{State, Stateful};
use serde_json::Value;
use tracing::trace;

/// Points in the training lifecycle handlers can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    FitStart,
    FitEnd,
    EpochStart,
    EpochEnd,
    TrainingEpochStart,
    TrainingEpochEnd,
    ValidationEpochStart,
    ValidationEpochEnd,
    TrainingBatchStart,
    TrainingBatchEnd,
    ValidationBatchStart,
    ValidationBatchEnd,
    Backward,
    TestStart,
    TestEnd,
    TestBatchStart,
    TestBatchEnd,
}

impl Event {
    pub const ALL: [Event; 17] = [
        Event::FitStart,
        Event::FitEnd,
        Event::EpochStart,
        Event::EpochEnd,
        Event::TrainingEpochStart,
        Event::TrainingEpochEnd,
        Event::ValidationEpochStart,
        Event::ValidationEpochEnd,
        Event::TrainingBatchStart,
        Event::TrainingBatchEnd,
        Event::ValidationBatchStart,
        Event::ValidationBatchEnd,
        Event::Backward,
        Event::TestStart,
        Event::TestEnd,
        Event::TestBatchStart,
        Event::TestBatchEnd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Event::FitStart => "fit_start",
            Event::FitEnd => "fit_end",
            Event::EpochStart => "epoch_start",
            Event::EpochEnd => "epoch_end",
            Event::TrainingEpochStart => "training_epoch_start",
            Event::TrainingEpochEnd => "training_epoch_end",
            Event::ValidationEpochStart => "validation_epoch_start",
            Event::ValidationEpochEnd => "validation_epoch_end",
            Event::TrainingBatchStart => "training_batch_start",
            Event::TrainingBatchEnd => "training_batch_end",
            Event::ValidationBatchStart => "validation_batch_start",
            Event::ValidationBatchEnd => "validation_batch_end",
            Event::Backward => "backward",
            Event::TestStart => "test_start",
            Event::TestEnd => "test_end",
            Event::TestBatchStart => "test_batch_start",
            Event::TestBatchEnd => "test_batch_end",
        }
    }
}

type HandlerResult = Result<(), MlError>;

/// A training callback. Every hook defaults to a no-op.
pub trait EventHandler: Stateful + Send {
    fn on_fit_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_fit_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_epoch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_epoch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_training_epoch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_training_epoch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_validation_epoch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_validation_epoch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_training_batch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_training_batch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_validation_batch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_validation_batch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_backward(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_test_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_test_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_test_batch_start(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }
    fn on_test_batch_end(&mut self, _state: &mut State) -> HandlerResult {
        Ok(())
    }

    /// Route `event` to its hook.
    fn handle(&mut self, event: Event, state: &mut State) -> HandlerResult {
        match event {
            Event::FitStart => self.on_fit_start(state),
            Event::FitEnd => self.on_fit_end(state),
            Event::EpochStart => self.on_epoch_start(state),
            Event::EpochEnd => self.on_epoch_end(state),
            Event::TrainingEpochStart => self.on_training_epoch_start(state),
            Event::TrainingEpochEnd => self.on_training_epoch_end(state),
            Event::ValidationEpochStart => self.on_validation_epoch_start(state),
            Event::ValidationEpochEnd => self.on_validation_epoch_end(state),
            Event::TrainingBatchStart => self.on_training_batch_start(state),
            Event::TrainingBatchEnd => self.on_training_batch_end(state),
            Event::ValidationBatchStart => self.on_validation_batch_start(state),
            Event::ValidationBatchEnd => self.on_validation_batch_end(state),
            Event::Backward => self.on_backward(state),
            Event::TestStart => self.on_test_start(state),
            Event::TestEnd => self.on_test_end(state),
            Event::TestBatchStart => self.on_test_batch_start(state),
            Event::TestBatchEnd => self.on_test_batch_end(state),
        }
    }
}

/// Handle returned by [`EventDispatcher::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Calls registered handlers in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<(HandlerId, Box<dyn EventHandler>)>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn EventHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler, handing it back.
    pub fn unregister(&mut self, id: HandlerId) -> Option<Box<dyn EventHandler>> {
        let pos = self.handlers.iter().position(|(h, _)| *h == id)?;
        Some(self.handlers.remove(pos).1)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver `event` to every handler; the first error stops delivery.
    pub fn dispatch(&mut self, event: Event, state: &mut State) -> Result<(), MlError> {
        trace!(event = event.name(), handlers = self.handlers.len(), "Dispatching event");
        for (_, handler) in &mut self.handlers {
            handler.handle(event, state)?;
        }
        Ok(())
    }
}

impl Stateful for EventDispatcher {
    /// Handler states in registration order.
    fn state_dict(&self) -> Value {
        Value::Array(self.handlers.iter().map(|(_, h)| h.state_dict()).collect())
    }

    fn load_state_dict(&mut self, state: Value) -> Result<(), MlError> {
        let states = match state {
            Value::Array(states) if states.len() == self.handlers.len() => states,
            _ => {
                return Err(MlError::training(format!(
                    "expected an array of {} handler states",
                    self.handlers.len()
                )));
            }
        };
        for ((_, handler), state) in self.handlers.iter_mut().zip(states) {
            handler.load_state_dict(state)?;
        }
        Ok(())
    }
}

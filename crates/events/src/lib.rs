#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in relsync
//!
//! Library crates never print or log directly. They emit domain events
//! through an `EventSender`; the CLI drains the channel and forwards every
//! message to `tracing`.

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, CacheLookupKind, EventMessage, FailureContext, GeneralEvent, SyncEvent,
    TransferEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for the event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout relsync
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Correlation identifier stamped on every emitted event
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let mut message = EventMessage::from_event(event);
            if let Some(id) = self.correlation_id() {
                message.meta = message.meta.with_correlation_id(id);
            }
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(message);
        }
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit an operation failed event
    fn emit_operation_failed(&self, operation: impl Into<String>, error: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationFailed {
            operation: operation.into(),
            error: error.into(),
        }));
    }

    /// Emit a sync domain event
    fn emit_sync(&self, event: SyncEvent) {
        self.emit(AppEvent::Sync(event));
    }

    /// Emit a transfer domain event
    fn emit_transfer(&self, event: TransferEvent) {
        self.emit(AppEvent::Transfer(event));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Emitter that stamps one correlation id on everything it sends
#[derive(Debug, Clone)]
pub struct CorrelatedEmitter {
    tx: EventSender,
    correlation_id: String,
}

impl CorrelatedEmitter {
    #[must_use]
    pub fn new(tx: EventSender, correlation_id: impl Into<String>) -> Self {
        Self {
            tx,
            correlation_id: correlation_id.into(),
        }
    }
}

impl EventEmitter for CorrelatedEmitter {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }

    fn correlation_id(&self) -> Option<&str> {
        Some(&self.correlation_id)
    }
}

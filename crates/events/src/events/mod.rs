use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventMeta, EventSource};
use relsync_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod sync;
pub mod transfer;

pub use general::*;
pub use sync::*;
pub use transfer::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Sync cycle lifecycle
    Sync(SyncEvent),

    /// Download/upload stream
    Transfer(TransferEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Sync(_) => EventSource::Sync,
            Self::Transfer(_) => EventSource::Transfer,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::OperationFailed { .. })
            | Self::Sync(SyncEvent::Failed { .. })
            | Self::Transfer(TransferEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Transfer(TransferEvent::Aborted { .. })
            | Self::Sync(SyncEvent::CacheChecked {
                lookup: CacheLookupKind::Ambiguous | CacheLookupKind::Unreadable,
                ..
            }) => Level::WARN,

            Self::Sync(SyncEvent::CacheChecked { .. })
            | Self::Transfer(TransferEvent::Progress { .. } | TransferEvent::PartUploaded { .. }) => {
                Level::DEBUG
            }

            _ => Level::INFO,
        }
    }
}

/// An event together with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event, deriving level and source from the event itself
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let meta = EventMeta::new(EventLevel::from(event.log_level()), event.event_source());
        Self { meta, event }
    }
}

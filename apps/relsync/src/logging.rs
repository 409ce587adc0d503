//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields, at
//! the level each event declares in its metadata.

use relsync_events::{AppEvent, EventMessage, GeneralEvent, SyncEvent, TransferEvent};
use tracing::Level;

/// Emit a tracing record at a level only known at runtime
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+);
        } else if level == Level::WARN {
            tracing::warn!($($arg)+);
        } else if level == Level::INFO {
            tracing::info!($($arg)+);
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    }};
}

/// Log an event message using the tracing infrastructure with structured fields
#[allow(clippy::too_many_lines)]
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let level = meta.tracing_level();
    let domain = meta.source.as_str();

    match &message.event {
        AppEvent::Sync(sync_event) => match sync_event {
            SyncEvent::Started { target, platform } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    platform = %platform,
                    "Sync started"
                );
            }
            SyncEvent::AssetResolved { release, asset } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    release = %release,
                    asset = %asset.name,
                    url = %asset.download_url,
                    "Latest asset resolved"
                );
            }
            SyncEvent::CacheChecked {
                target,
                lookup,
                tag,
                detail,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    lookup = lookup.as_str(),
                    tag = ?tag,
                    detail = ?detail,
                    "Cached version tag read"
                );
            }
            SyncEvent::UpToDate { target, asset } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    asset = %asset,
                    "Mirror is up to date"
                );
            }
            SyncEvent::Stale {
                target,
                asset,
                cached,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    asset = %asset,
                    cached = ?cached,
                    "Mirror is stale"
                );
            }
            SyncEvent::Updated {
                target,
                asset,
                bytes,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    asset = %asset,
                    bytes = bytes,
                    "Mirror updated"
                );
            }
            SyncEvent::Failed { target, failure } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = ?target.as_ref().map(ToString::to_string),
                    retryable = failure.retryable,
                    code = ?failure.code,
                    reason = %failure.message,
                    hint = ?failure.hint,
                    "Sync failed"
                );
            }
        },

        AppEvent::Transfer(transfer_event) => match transfer_event {
            TransferEvent::Started {
                url,
                target,
                total_bytes,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    object = %target,
                    total_bytes = ?total_bytes,
                    "Transfer started"
                );
            }
            TransferEvent::Progress {
                target,
                bytes_uploaded,
                total_bytes,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    bytes_uploaded = bytes_uploaded,
                    total_bytes = ?total_bytes,
                    "Transfer progress"
                );
            }
            TransferEvent::PartUploaded {
                target,
                part_number,
                part_bytes,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    part_number = part_number,
                    part_bytes = part_bytes,
                    "Part uploaded"
                );
            }
            TransferEvent::Completed {
                target,
                bytes,
                duration,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    bytes = bytes,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "Transfer completed"
                );
            }
            TransferEvent::Failed {
                target,
                bytes_transferred,
                failure,
            } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    bytes_transferred = bytes_transferred,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    reason = %failure.message,
                    hint = ?failure.hint,
                    "Transfer failed"
                );
            }
            TransferEvent::Aborted { target, reason } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    object = %target,
                    reason = %reason,
                    "Transfer aborted"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    warning = %message,
                    context = ?context,
                    "Warning"
                );
            }
            GeneralEvent::OperationStarted { operation } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    operation = %operation,
                    "Operation started"
                );
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    operation = %operation,
                    success = success,
                    "Operation completed"
                );
            }
            GeneralEvent::OperationFailed { operation, error } => {
                event_at!(
                    level,
                    domain,
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    operation = %operation,
                    error = %error,
                    "Operation failed"
                );
            }
        },
    }
}

//! Event handling and user feedback

use console::{style, Term};
use relsync_events::{AppEvent, EventMessage, GeneralEvent, SyncEvent, TransferEvent};

use crate::logging::log_event_with_tracing;

/// Forwards every event to tracing and prints short status lines
pub struct EventHandler {
    colors_enabled: bool,
    /// Status lines are suppressed in JSON mode so stdout stays parseable
    quiet: bool,
    term: Term,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            quiet,
            term: Term::stderr(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);

        if self.quiet {
            return;
        }
        if let Some(line) = status_line(&message.event) {
            self.show_status(&line);
        }
    }

    fn show_status(&self, line: &str) {
        let rendered = if self.colors_enabled {
            style(line).dim().to_string()
        } else {
            line.to_string()
        };
        let _ = self.term.write_line(&rendered);
    }
}

/// User-facing line for the events worth showing outside the log
fn status_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Sync(SyncEvent::AssetResolved { release, asset }) => {
            Some(format!("Resolved {} ({release})", asset.name))
        }
        AppEvent::Sync(SyncEvent::Stale {
            target,
            cached: Some(cached),
            ..
        }) => Some(format!("{target} holds {cached}, replacing")),
        AppEvent::Sync(SyncEvent::Stale { target, .. }) => {
            Some(format!("{target} has no version tag, mirroring"))
        }
        AppEvent::Transfer(TransferEvent::Started {
            total_bytes: Some(total),
            ..
        }) => Some(format!("Transferring {total} bytes")),
        AppEvent::General(GeneralEvent::Warning {
            message,
            context: Some(context),
        }) => Some(format!("warning: {message}: {context}")),
        AppEvent::General(GeneralEvent::Warning { message, .. }) => {
            Some(format!("warning: {message}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relsync_types::MirrorTarget;

    #[test]
    fn test_stale_line_names_cached_tag() {
        let event = AppEvent::Sync(SyncEvent::Stale {
            target: MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap(),
            asset: "actions-runner-linux-x64-2.301.0.tar.gz".into(),
            cached: Some("actions-runner-linux-x64-2.300.0.tar.gz".into()),
        });
        let line = status_line(&event).unwrap();
        assert!(line.contains("mirror/runner.tar.gz"));
        assert!(line.contains("2.300.0"));
    }

    #[test]
    fn test_progress_is_not_printed() {
        let event = AppEvent::Transfer(TransferEvent::Progress {
            target: MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap(),
            bytes_uploaded: 10,
            total_bytes: Some(20),
        });
        assert!(status_line(&event).is_none());
    }
}

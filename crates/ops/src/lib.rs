#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for relsync
//!
//! This crate sits between the CLI and the specialised crates: it wires the
//! resolver, the version cache and the stream transfer into one sync cycle.

mod context;
mod sync;
mod transfer;

pub use context::{net_config, OpsContextBuilder, OpsCtx};
pub use sync::SyncOrchestrator;
pub use transfer::{StreamTransfer, TransferReport, TransferSettings};

use relsync_errors::{Error, SyncError};
use relsync_types::{SyncOutcome, SyncPlan};
use serde::Serialize;

/// Result of a CLI-facing operation
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "command", content = "result", rename_all = "snake_case")]
pub enum OperationResult {
    /// A completed check-and-sync cycle
    Sync(SyncOutcome),
    /// A check-only report
    Status(SyncPlan),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Whether the mirror was written
    #[must_use]
    pub fn wrote_object(&self) -> bool {
        matches!(self, Self::Sync(outcome) if outcome.is_updated())
    }
}

/// Run one check-and-sync cycle
///
/// # Errors
///
/// See [`SyncOrchestrator::run`].
pub async fn sync(ctx: &OpsCtx) -> Result<SyncOutcome, SyncError> {
    SyncOrchestrator::new(ctx).run().await
}

/// Report what a sync would do without writing anything
///
/// # Errors
///
/// See [`SyncOrchestrator::plan`].
pub async fn status(ctx: &OpsCtx) -> Result<SyncPlan, SyncError> {
    SyncOrchestrator::new(ctx).plan().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use relsync_types::{MirrorTarget, ReleaseAsset};

    #[test]
    fn test_operation_result_json_shape() {
        let result = OperationResult::Sync(SyncOutcome::UpToDate {
            target: MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap(),
            asset: ReleaseAsset::new("actions-runner-linux-x64-2.300.0.tar.gz", "https://x/a"),
        });

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["command"], "sync");
        assert_eq!(json["result"]["status"], "up_to_date");
        assert!(!result.wrote_object());
    }
}

use relsync_types::MirrorTarget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Stream transfer events (download leg piped into upload leg)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    /// Download opened; `total_bytes` is the upstream length hint if any
    Started {
        url: String,
        target: MirrorTarget,
        total_bytes: Option<u64>,
    },

    /// Bytes durably accepted by the store so far
    Progress {
        target: MirrorTarget,
        bytes_uploaded: u64,
        total_bytes: Option<u64>,
    },

    /// One upload part was committed
    PartUploaded {
        target: MirrorTarget,
        part_number: u32,
        part_bytes: u64,
    },

    /// Upload completed and tag attached
    Completed {
        target: MirrorTarget,
        bytes: u64,
        duration: Duration,
    },

    /// Either leg failed; partial data was discarded
    Failed {
        target: MirrorTarget,
        bytes_transferred: u64,
        failure: FailureContext,
    },

    /// The transfer was cancelled before it could finish
    Aborted { target: MirrorTarget, reason: String },
}

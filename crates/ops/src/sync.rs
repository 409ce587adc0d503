//! Check-and-sync cycle
//!
//! One pass: validate the target, resolve the asset and read the cached tag
//! concurrently, compare, then transfer or skip. Nothing is kept between
//! passes.

use relsync_config::TargetConfig;
use relsync_errors::{NetworkError, ResolveError, SyncError, TransferError};
use relsync_events::{
    CacheLookupKind, CorrelatedEmitter, EventEmitter, FailureContext, SyncEvent, TransferEvent,
};
use relsync_resolver::{Resolution, Resolver};
use relsync_store::{TagLookup, VersionCache};
use relsync_types::{MirrorTarget, Platform, SyncDecision, SyncOutcome, SyncPlan};
use std::time::Duration;
use tokio::time::Instant;

use crate::context::OpsCtx;
use crate::transfer::{StreamTransfer, TransferSettings};

/// Stand-in for a deadline the clock cannot represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant `limit` from now; limits past the clock's range mean no deadline
fn deadline_from_now(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Drives a single sync cycle for one target and platform
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    target: TargetConfig,
    platform: Platform,
    resolver: Resolver,
    cache: VersionCache,
    transfer: StreamTransfer,
    deadline: Duration,
    emitter: CorrelatedEmitter,
}

impl SyncOrchestrator {
    /// Wire the orchestrator from an operations context
    #[must_use]
    pub fn new(ctx: &OpsCtx) -> Self {
        let config = &ctx.config;
        let settings = TransferSettings {
            buffer_chunks: config.transfer.buffer_chunks,
            chunk_timeout: config.transfer.chunk_timeout(),
            part_size: config.store.part_size,
            sse: config.store.sse.clone(),
        };

        Self {
            target: config.target.clone(),
            platform: config.platform.platform(),
            resolver: Resolver::new(ctx.feed.clone(), config.feed.repository.clone()),
            cache: VersionCache::new(ctx.store.clone()),
            transfer: StreamTransfer::new(ctx.source.clone(), ctx.store.clone(), settings),
            deadline: config.transfer.deadline(),
            emitter: CorrelatedEmitter::new(ctx.tx.clone(), uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Run the full cycle, transferring when the mirror is stale
    ///
    /// # Errors
    ///
    /// `Configuration` before any network call when the target is
    /// incomplete, `AssetResolution` when no single asset can be resolved,
    /// `Transfer` when the copy fails. Cache read problems never fail the
    /// cycle.
    pub async fn run(&self) -> Result<SyncOutcome, SyncError> {
        self.emitter.emit_operation_started("sync");
        let result = self.run_cycle().await;

        match &result {
            Ok(_) => self.emitter.emit_operation_completed("sync", true),
            Err(err) => self.report_failure(err),
        }
        result
    }

    /// Everything up to the decision, without writing
    ///
    /// A resolution failure is reported as `UnknownAsset` rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Only `Configuration`.
    pub async fn plan(&self) -> Result<SyncPlan, SyncError> {
        let target = self.validate()?;
        let deadline = deadline_from_now(self.deadline);

        let (resolution, lookup) = self.resolve_and_lookup(&target, deadline).await;
        self.report_lookup(&target, &lookup);

        let cache_lookup = lookup.as_str().to_string();
        let cached_tag = lookup.into_version();

        let plan = match resolution {
            Ok(resolution) => SyncPlan {
                decision: SyncDecision::decide(&resolution.asset, cached_tag.as_deref()),
                asset: Some(resolution.asset),
                target,
                platform: self.platform.clone(),
                cached_tag,
                cache_lookup,
                resolve_error: None,
            },
            Err(err) => {
                self.emitter.emit_warning_with_context(
                    "latest asset could not be resolved",
                    err.to_string(),
                );
                SyncPlan {
                    decision: SyncDecision::UnknownAsset,
                    asset: None,
                    target,
                    platform: self.platform.clone(),
                    cached_tag,
                    cache_lookup,
                    resolve_error: Some(err.to_string()),
                }
            }
        };
        Ok(plan)
    }

    async fn run_cycle(&self) -> Result<SyncOutcome, SyncError> {
        let target = self.validate()?;
        self.emitter.emit_sync(SyncEvent::Started {
            target: target.clone(),
            platform: self.platform.clone(),
        });

        let deadline = deadline_from_now(self.deadline);
        let (resolution, lookup) = self.resolve_and_lookup(&target, deadline).await;
        let Resolution { release, asset } = resolution?;
        self.emitter.emit_sync(SyncEvent::AssetResolved {
            release,
            asset: asset.clone(),
        });

        self.report_lookup(&target, &lookup);
        let previous_tag = lookup.into_version();

        if SyncDecision::decide(&asset, previous_tag.as_deref()).is_up_to_date() {
            self.emitter.emit_sync(SyncEvent::UpToDate {
                target: target.clone(),
                asset: asset.name.clone(),
            });
            return Ok(SyncOutcome::UpToDate { target, asset });
        }

        self.emitter.emit_sync(SyncEvent::Stale {
            target: target.clone(),
            asset: asset.name.clone(),
            cached: previous_tag.clone(),
        });

        let report = tokio::time::timeout_at(
            deadline,
            self.transfer.mirror(&target, &asset, &self.emitter),
        )
        .await
        .map_err(|_| {
            self.emitter.emit_transfer(TransferEvent::Aborted {
                target: target.clone(),
                reason: "sync deadline expired".to_string(),
            });
            TransferError::DeadlineExceeded {
                seconds: self.deadline.as_secs(),
            }
        })??;

        self.emitter.emit_sync(SyncEvent::Updated {
            target: target.clone(),
            asset: asset.name.clone(),
            bytes: report.bytes,
        });

        Ok(SyncOutcome::Updated {
            target,
            asset,
            previous_tag,
            bytes: report.bytes,
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn validate(&self) -> Result<MirrorTarget, SyncError> {
        self.target.to_target().map_err(SyncError::from)
    }

    /// Resolve and read the cache concurrently, both bounded by `deadline`
    async fn resolve_and_lookup(
        &self,
        target: &MirrorTarget,
        deadline: Instant,
    ) -> (Result<Resolution, ResolveError>, TagLookup) {
        let both = async {
            tokio::join!(self.resolver.resolve(&self.platform), self.cache.lookup(target))
        };

        match tokio::time::timeout_at(deadline, both).await {
            Ok(results) => results,
            Err(_) => (
                Err(ResolveError::Feed(NetworkError::Timeout {
                    url: self.resolver.repository().to_string(),
                })),
                TagLookup::Missing,
            ),
        }
    }

    fn report_lookup(&self, target: &MirrorTarget, lookup: &TagLookup) {
        let (kind, detail) = match lookup {
            TagLookup::Found(_) => (CacheLookupKind::Found, None),
            TagLookup::Missing => (CacheLookupKind::Missing, None),
            TagLookup::Ambiguous { count } => (
                CacheLookupKind::Ambiguous,
                Some(format!("{count} tags share the version key")),
            ),
            TagLookup::Unreadable(err) => (CacheLookupKind::Unreadable, Some(err.to_string())),
        };

        self.emitter.emit_sync(SyncEvent::CacheChecked {
            target: target.clone(),
            lookup: kind,
            tag: lookup.version().map(str::to_string),
            detail,
        });
    }

    fn report_failure(&self, err: &SyncError) {
        let target = self.target.to_target().ok();
        self.emitter.emit_sync(SyncEvent::Failed {
            target,
            failure: FailureContext::from_error(err),
        });
        self.emitter.emit_operation_failed("sync", err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrepresentable_deadline_is_clamped() {
        let deadline = deadline_from_now(Duration::from_secs(u64::MAX));
        assert!(deadline > Instant::now() + Duration::from_secs(86_400 * 365));
    }

    #[test]
    fn test_ordinary_deadline_is_exact() {
        let before = Instant::now();
        let deadline = deadline_from_now(Duration::from_secs(5));
        assert!(deadline >= before + Duration::from_secs(5));
        assert!(deadline <= Instant::now() + Duration::from_secs(5));
    }
}

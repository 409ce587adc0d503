//! Asset selection within a single release

use relsync_errors::ResolveError;
use relsync_types::{Platform, Release, ReleaseAsset};

/// Pick the one asset of `release` built for `platform`.
///
/// An asset matches when its name contains
/// `actions-runner-{os}-{arch}-{version}.` where `version` is the release tag
/// without its leading `v`.
///
/// # Errors
///
/// `NoAssets` for an empty release, `NoMatch` for zero candidates and
/// `Ambiguous` for more than one.
pub fn select_asset(release: &Release, platform: &Platform) -> Result<ReleaseAsset, ResolveError> {
    let version = release.version();

    if release.assets.is_empty() {
        return Err(ResolveError::NoAssets {
            version: version.to_string(),
        });
    }

    let pattern = platform.asset_pattern(version);
    let mut matches = release
        .assets
        .iter()
        .filter(|asset| asset.name.contains(&pattern));

    match (matches.next(), matches.next()) {
        (Some(asset), None) => Ok(asset.clone()),
        (None, _) => Err(ResolveError::NoMatch {
            version: version.to_string(),
            pattern,
        }),
        (Some(_), Some(_)) => Err(ResolveError::Ambiguous {
            version: version.to_string(),
            count: 2 + matches.count(),
            pattern,
        }),
    }
}

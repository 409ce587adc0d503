//! Release feed port and the GitHub implementation

use async_trait::async_trait;
use relsync_errors::NetworkError;
use relsync_types::{Release, ReleaseAsset};
use serde::Deserialize;

use crate::client::{classify_error, ensure_success, NetClient};

/// Source of "latest release" metadata for a repository
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Fetch the newest published release of `repository` (`owner/name`)
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` for transport failures, non-success status
    /// codes, throttling, or an undecodable body.
    async fn latest_release(&self, repository: &str) -> Result<Release, NetworkError>;
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        Self {
            version_tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|a| ReleaseAsset::new(a.name, a.browser_download_url))
                .collect(),
        }
    }
}

/// `ReleaseFeed` backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubReleaseFeed {
    client: NetClient,
    api_url: String,
    token: Option<String>,
}

impl GithubReleaseFeed {
    #[must_use]
    pub fn new(client: NetClient, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn latest_url(&self, repository: &str) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_url,
            repository.trim_matches('/')
        )
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseFeed {
    async fn latest_release(&self, repository: &str) -> Result<Release, NetworkError> {
        let url = self.latest_url(repository);
        let bearer = self.token.as_ref().map(|t| format!("Bearer {t}"));

        let mut headers = vec![("Accept", "application/vnd.github+json")];
        if let Some(bearer) = bearer.as_deref() {
            headers.push(("Authorization", bearer));
        }

        let response = self.client.get_with_headers(&url, &headers).await?;
        ensure_success(&response)?;

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&e, &url))?;

        let release: GithubRelease =
            serde_json::from_str(&body).map_err(|e| NetworkError::InvalidResponse {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if release.tag_name.trim().is_empty() {
            return Err(NetworkError::InvalidResponse {
                url,
                message: "release has an empty tag_name".to_string(),
            });
        }

        Ok(release.into())
    }
}

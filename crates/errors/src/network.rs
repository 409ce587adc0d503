//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("SSL/TLS error: {0}")]
    TlsError(String),

    #[error("network unavailable")]
    NetworkUnavailable,

    #[error("rate limited: retry after {seconds} seconds")]
    RateLimited { seconds: u64 },
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::NetworkUnavailable => {
                Some("Check network connectivity to the release feed and retry.")
            }
            Self::RateLimited { .. } => {
                Some("The release feed is throttling requests; configure a feed token or wait.")
            }
            Self::HttpError { status: 401 | 403, .. } => {
                Some("Verify the feed token (RELSYNC_GITHUB_TOKEN) has read access.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedProtocol { .. } => {
                Some("Fix the feed or download URL; only http and https are supported.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::DownloadFailed(_)
            | Self::ConnectionRefused(_)
            | Self::NetworkUnavailable
            | Self::RateLimited { .. } => true,
            Self::HttpError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::UnsupportedProtocol { .. } => "network.unsupported_protocol",
            Self::HttpError { .. } => "network.http_error",
            Self::InvalidResponse { .. } => "network.invalid_response",
            Self::TlsError(_) => "network.tls_error",
            Self::NetworkUnavailable => "network.unavailable",
            Self::RateLimited { .. } => "network.rate_limited",
        };
        Some(code)
    }
}

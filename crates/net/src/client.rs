//! HTTP client with connection pooling

use relsync_errors::NetworkError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600), // whole-body limit for large artifacts
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("relsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client wrapper that maps transport failures into `NetworkError`
///
/// Requests are sent once. Retrying a whole cycle is the caller's decision.
#[derive(Clone, Debug)]
pub struct NetClient {
    client: Client,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: &NetConfig) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client })
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns an error on timeouts, connection failures, or when the server
    /// asks the client to back off.
    pub async fn get(&self, url: &str) -> Result<Response, NetworkError> {
        self.get_with_headers(url, &[]).await
    }

    /// Execute a GET request with extra headers
    ///
    /// # Errors
    ///
    /// Returns an error on timeouts, connection failures, or when the server
    /// asks the client to back off.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, NetworkError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| classify_error(&e, url))?;
        check_rate_limit(&response)?;
        Ok(response)
    }
}

/// Map a reqwest failure onto the network taxonomy
pub(crate) fn classify_error(error: &reqwest::Error, url: &str) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: error
                .url()
                .map_or_else(|| url.to_string(), std::string::ToString::to_string),
        }
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string())
    } else {
        NetworkError::DownloadFailed(error.to_string())
    }
}

fn check_rate_limit(response: &Response) -> Result<(), NetworkError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let seconds = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(NetworkError::RateLimited { seconds });
    }
    Ok(())
}

/// Turn a non-success status into an `HttpError`
pub(crate) fn ensure_success(response: &Response) -> Result<(), NetworkError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status.to_string(),
        })
    }
}

#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network plumbing for relsync
//!
//! Provides the HTTP client, the release feed used to discover the latest
//! runner build, and the streaming artifact source used during transfers.

mod cache;
mod client;
mod feed;
mod source;

pub use cache::ClientCache;
pub use client::{NetClient, NetConfig};
pub use feed::{GithubReleaseFeed, ReleaseFeed};
pub use source::{validate_url, ArtifactSource, ByteStream, HttpArtifactSource, SourceStream};

/// Repository whose releases are mirrored by default
pub const DEFAULT_REPOSITORY: &str = "actions/runner";

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

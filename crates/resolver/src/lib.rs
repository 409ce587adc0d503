#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release resolution for relsync
//!
//! Turns "latest release of the feed" plus an os/arch pair into exactly one
//! downloadable asset, or a typed reason why that is not possible.

mod resolver;
mod select;

pub use resolver::{Resolution, Resolver};
pub use select::select_asset;

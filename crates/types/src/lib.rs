#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for relsync
//!
//! This crate provides the values passed between the resolver, the blob
//! store, and the sync orchestrator.

pub mod release;
pub mod sync;
pub mod target;

// Re-export commonly used types
pub use release::{ObjectTag, Release, ReleaseAsset, VERSION_TAG_KEY};
pub use sync::{SyncDecision, SyncOutcome, SyncPlan};
pub use target::{MirrorTarget, Platform, ASSET_PREFIX};

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

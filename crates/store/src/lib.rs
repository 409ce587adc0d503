#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Blob storage for relsync
//!
//! Defines the `BlobStore` port used for mirrored objects, a filesystem
//! implementation, an in-memory implementation, and the version cache that
//! reads the asset name recorded on a mirrored object.

mod blob;
mod fs;
mod memory;
mod version_cache;

pub use blob::{
    BlobStore, ProgressFn, UploadBody, UploadProgress, UploadReceipt, UploadRequest,
    DEFAULT_PART_SIZE,
};
pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, StoredObject};
pub use version_cache::{TagLookup, VersionCache};

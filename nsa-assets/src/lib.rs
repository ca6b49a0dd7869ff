//! Asset plumbing around the NSA animation core
//!
//! - [`bundle`] - Tagged record stream reader and writer
//! - [`manager`] - Reference-counted registry of located animation sources
//! - [`config`] - TOML loader configuration
//! - [`loader`] - Bundle → locate → register glue, all-or-nothing per bundle

pub mod bundle;
pub mod config;
pub mod loader;
pub mod manager;

pub use bundle::{ANIMATION_TAG, AssetId, BundleError, BundleReader, BundleRecord, BundleWriter, TypeTag};
pub use config::{AssetTypeEntry, LoaderConfig};
pub use loader::{BundleLoader, LoadedBundle};
pub use manager::{AssetManager, ManagerError};

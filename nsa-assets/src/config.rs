//! Loader configuration (TOML)
//!
//! ```toml
//! max_asset_size = 16777216
//!
//! [locate]
//! layout = "flat"
//! byte_order = "big"
//! base_address = 0x10000000
//!
//! [[asset_types]]
//! tag = [0x5c07569f, 0x985d2cd6]
//! type_id = 4
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use nsa_core::{ANIM_NSA, LocateOptions, TypeId};
use serde::{Deserialize, Serialize};

use crate::bundle::{ANIMATION_TAG, DEFAULT_MAX_ASSET_SIZE, TypeTag};

/// Bundle tag handled by a registered locate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTypeEntry {
    pub tag: TypeTag,
    pub type_id: TypeId,
}

/// How bundles are read and their assets located
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Largest accepted record payload in bytes
    #[serde(default = "default_max_asset_size")]
    pub max_asset_size: u32,
    /// Layout generation, byte order and base address of the bundle's assets
    #[serde(default)]
    pub locate: LocateOptions,
    /// Record tags to load; records with other tags are skipped
    #[serde(default = "default_asset_types")]
    pub asset_types: Vec<AssetTypeEntry>,
}

fn default_max_asset_size() -> u32 {
    DEFAULT_MAX_ASSET_SIZE
}

fn default_asset_types() -> Vec<AssetTypeEntry> {
    vec![AssetTypeEntry {
        tag: ANIMATION_TAG,
        type_id: ANIM_NSA,
    }]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_asset_size: default_max_asset_size(),
            locate: LocateOptions::default(),
            asset_types: default_asset_types(),
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse loader config")
    }

    /// Read a config file; a missing or malformed file is an error
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid loader config: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize loader config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write loader config: {}", path.display()))
    }

    /// Tag to type id lookup; later entries override earlier ones
    pub fn type_table(&self) -> HashMap<TypeTag, TypeId> {
        self.asset_types
            .iter()
            .map(|entry| (entry.tag, entry.type_id))
            .collect()
    }
}

//! Reference-counted registry of loaded animation sources

use std::sync::Arc;

use hashbrown::HashMap;
use nsa_core::AnimSource;

use crate::bundle::AssetId;

/// Error updating the asset registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    #[error("asset {0:#x} is already registered")]
    AlreadyRegistered(AssetId),

    #[error("asset {0:#x} is not registered")]
    NotRegistered(AssetId),
}

#[derive(Debug)]
struct Entry {
    source: Arc<AnimSource>,
    ref_count: u32,
}

/// Loaded assets keyed by id
///
/// Sources are handed out as `Arc`s so samplers keep working on an asset
/// even after its last bundle released it.
#[derive(Debug, Default)]
pub struct AssetManager {
    assets: HashMap<AssetId, Entry>,
}

impl AssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a located source with a reference count of zero
    pub fn register(&mut self, id: AssetId, source: AnimSource) -> Result<Arc<AnimSource>, ManagerError> {
        if self.assets.contains_key(&id) {
            return Err(ManagerError::AlreadyRegistered(id));
        }
        let source = Arc::new(source);
        self.assets.insert(
            id,
            Entry {
                source: Arc::clone(&source),
                ref_count: 0,
            },
        );
        tracing::debug!("registered asset {:#x} ({})", id, source.format_name());
        Ok(source)
    }

    /// Take a reference to a registered asset
    pub fn acquire(&mut self, id: AssetId) -> Result<Arc<AnimSource>, ManagerError> {
        let entry = self
            .assets
            .get_mut(&id)
            .ok_or(ManagerError::NotRegistered(id))?;
        entry.ref_count += 1;
        Ok(Arc::clone(&entry.source))
    }

    /// Drop a reference; returns whether the asset was unregistered
    pub fn release(&mut self, id: AssetId) -> Result<bool, ManagerError> {
        let entry = self
            .assets
            .get_mut(&id)
            .ok_or(ManagerError::NotRegistered(id))?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return Ok(false);
        }
        self.assets.remove(&id);
        tracing::debug!("unregistered asset {:#x}", id);
        Ok(true)
    }

    pub fn get(&self, id: AssetId) -> Option<Arc<AnimSource>> {
        self.assets.get(&id).map(|entry| Arc::clone(&entry.source))
    }

    pub fn ref_count(&self, id: AssetId) -> Option<u32> {
        self.assets.get(&id).map(|entry| entry.ref_count)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

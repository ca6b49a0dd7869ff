//! Bundle loading: read records, locate their assets and register them
//!
//! Loading is all-or-nothing per bundle. If any record fails to read,
//! locate or register, every reference the bundle already took is released
//! before the error is returned.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use nsa_core::{AnimSource, AssetBuffer, LocateOptions, TypeId, TypeRegistry};

use crate::bundle::{AssetId, BundleReader, BundleRecord, TypeTag};
use crate::config::LoaderConfig;
use crate::manager::AssetManager;

/// Assets a bundle holds references to, in load order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadedBundle {
    asset_ids: Vec<AssetId>,
}

impl LoadedBundle {
    pub fn asset_ids(&self) -> &[AssetId] {
        &self.asset_ids
    }

    pub fn len(&self) -> usize {
        self.asset_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asset_ids.is_empty()
    }
}

pub struct BundleLoader {
    registry: TypeRegistry,
    options: LocateOptions,
    type_table: HashMap<TypeTag, TypeId>,
    max_asset_size: u32,
}

impl BundleLoader {
    /// Loader using the core locate functions
    pub fn new(config: &LoaderConfig) -> Self {
        Self::with_registry(config, TypeRegistry::new())
    }

    pub fn with_registry(config: &LoaderConfig, registry: TypeRegistry) -> Self {
        Self {
            registry,
            options: config.locate,
            type_table: config.type_table(),
            max_asset_size: config.max_asset_size,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    pub fn load_bundle_file(&self, path: &Path, manager: &mut AssetManager) -> Result<LoadedBundle> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open bundle: {}", path.display()))?;
        self.load_bundle(BufReader::new(file), manager)
            .with_context(|| format!("Failed to load bundle: {}", path.display()))
    }

    /// Load every known record of a bundle, taking one reference per record
    pub fn load_bundle<R: Read>(&self, reader: R, manager: &mut AssetManager) -> Result<LoadedBundle> {
        let mut bundle = LoadedBundle::default();
        match self.load_records(reader, manager, &mut bundle) {
            Ok(()) => {
                tracing::debug!("loaded bundle with {} assets", bundle.len());
                Ok(bundle)
            }
            Err(e) => {
                release_all(manager, &bundle.asset_ids);
                Err(e)
            }
        }
    }

    /// Release every reference the bundle holds; returns how many assets were freed
    pub fn unload_bundle(&self, bundle: LoadedBundle, manager: &mut AssetManager) -> Result<usize> {
        let mut freed = 0;
        for &id in bundle.asset_ids.iter().rev() {
            if manager
                .release(id)
                .with_context(|| format!("Failed to release asset {:#x}", id))?
            {
                freed += 1;
            }
        }
        Ok(freed)
    }

    fn load_records<R: Read>(
        &self,
        reader: R,
        manager: &mut AssetManager,
        bundle: &mut LoadedBundle,
    ) -> Result<()> {
        let mut reader = BundleReader::new(reader).with_max_asset_size(self.max_asset_size);
        while let Some(record) = reader
            .read_next_asset()
            .with_context(|| format!("Failed to read bundle record {}", reader.records_read()))?
        {
            let Some(&type_id) = self.type_table.get(&record.tag) else {
                tracing::warn!(
                    "skipping asset {:#x}: no loader for tag {:08x}:{:08x}",
                    record.asset_id,
                    record.tag.0,
                    record.tag.1
                );
                continue;
            };

            let id = record.asset_id;
            if !manager.contains(id) {
                let source = self
                    .locate_record(record, type_id)
                    .with_context(|| format!("Failed to locate asset {:#x}", id))?;
                manager.register(id, source)?;
            }
            manager.acquire(id)?;
            bundle.asset_ids.push(id);
        }
        Ok(())
    }

    fn locate_record(&self, record: BundleRecord, type_id: TypeId) -> Result<AnimSource> {
        let mut buffer = AssetBuffer::new(record.bytes);
        self.registry.locate(&mut buffer, type_id, &self.options)?;
        Ok(AnimSource::from_buffer(buffer)?)
    }
}

fn release_all(manager: &mut AssetManager, ids: &[AssetId]) {
    for &id in ids.iter().rev() {
        if let Err(e) = manager.release(id) {
            tracing::warn!("failed to release asset {:#x} after a bundle error: {}", id, e);
        }
    }
}

//! Type id → locate function registry
//!
//! Nested objects whose concrete type is only known at load time (the
//! trajectory source of an animation, for instance) carry a type tag as their
//! first word. The locate routine of the parent resolves that tag through this
//! registry instead of through per-instance virtual dispatch.

use hashbrown::HashMap;

use crate::error::{NsaError, Result};
use crate::fixup::{AssetBuffer, Fixup, LocateOptions};
use crate::source::{NsaLayout, locate_anim_nsa};
use crate::trajectory::{TrajectoryLayout, locate_trajectory_nsa};

/// Numeric tag identifying a locatable type
pub type TypeId = u32;

/// Compressed animation source, NSA format
pub const ANIM_NSA: TypeId = 4;

/// Trajectory channel source, NSA format
pub const TRAJECTORY_NSA: TypeId = 5;

/// Locate the object that starts at the given offset
pub type LocateFn = fn(&mut Fixup<'_>, usize) -> Result<Located>;

/// Typed graph produced by a locate routine
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    AnimNsa(Box<NsaLayout>),
    TrajectoryNsa(TrajectoryLayout),
}

impl Located {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnimNsa(_) => "NSA animation",
            Self::TrajectoryNsa(_) => "NSA trajectory",
        }
    }
}

/// Registry of locate functions keyed by type id
#[derive(Clone)]
pub struct TypeRegistry {
    locate_fns: HashMap<TypeId, LocateFn>,
}

impl TypeRegistry {
    /// Registry with no types registered
    pub fn empty() -> Self {
        Self {
            locate_fns: HashMap::new(),
        }
    }

    /// Registry with every type this crate can locate
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ANIM_NSA, locate_anim_nsa);
        registry.register(TRAJECTORY_NSA, locate_trajectory_nsa);
        registry
    }

    /// Register a locate function, returning the one it replaces
    pub fn register(&mut self, type_id: TypeId, locate: LocateFn) -> Option<LocateFn> {
        self.locate_fns.insert(type_id, locate)
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.locate_fns.contains_key(&type_id)
    }

    pub fn locate_fn(&self, type_id: TypeId) -> Result<LocateFn> {
        self.locate_fns
            .get(&type_id)
            .copied()
            .ok_or(NsaError::UnknownType(type_id))
    }

    /// Locate a raw buffer whose root object has the given type
    ///
    /// The buffer moves to `Located` on success and `Failed` on any error
    /// raised while rewriting it. An unknown type id leaves it `Raw`.
    pub fn locate(
        &self,
        buffer: &mut AssetBuffer,
        type_id: TypeId,
        options: &LocateOptions,
    ) -> Result<()> {
        let locate = self.locate_fn(type_id)?;
        buffer.locate_with(|bytes| {
            let mut fixup = Fixup::new(bytes, *options, self);
            locate(&mut fixup, 0)
        })?;

        tracing::debug!(
            "located type {} ({} bytes, {:?}, {:?})",
            type_id,
            buffer.len(),
            options.layout,
            options.byte_order
        );
        Ok(())
    }

    /// Locate a nested object whose type tag is its first word
    pub fn locate_nested(&self, fixup: &mut Fixup<'_>, at: usize) -> Result<Located> {
        let type_id = fixup.peek_u32(at)?;
        let locate = self.locate_fn(type_id)?;
        locate(fixup, at)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.locate_fns.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &ids).finish()
    }
}

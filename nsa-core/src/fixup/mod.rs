//! In-place location of serialized asset buffers
//!
//! A raw asset is a flat byte blob whose scalars are stored in the byte order
//! of the platform that saved it and whose pointer fields are stored in one of
//! two encodings (see [`LayoutVariant`]). Locating walks the structure graph
//! once, pre-order, and rewrites the blob so that:
//!
//! - every scalar is in native byte order
//! - every non-null pointer field holds the absolute byte offset of its target
//!   inside the buffer, and null stays 0
//!
//! The rewritten offsets act as indices into the buffer. Every one of them is
//! bounds-checked while locating, so readers of a located buffer never do
//! unchecked pointer arithmetic.

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{NsaError, Result};
use crate::quantisation::QuantisationScaleAndOffset;
use crate::registry::{Located, TypeRegistry};
use glam::Vec3;

#[cfg(test)]
mod tests;

// ============================================================================
// Options
// ============================================================================

/// Byte order an asset was saved in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running platform
    pub const NATIVE: Self = if cfg!(target_endian = "big") {
        Self::Big
    } else {
        Self::Little
    };

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(bytes),
            Self::Big => BigEndian::read_u32(bytes),
        }
    }

    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(bytes),
            Self::Big => BigEndian::read_u16(bytes),
        }
    }

    #[inline]
    pub fn write_u32(self, bytes: &mut [u8], value: u32) {
        match self {
            Self::Little => LittleEndian::write_u32(bytes, value),
            Self::Big => BigEndian::write_u32(bytes, value),
        }
    }

    #[inline]
    pub fn write_u16(self, bytes: &mut [u8], value: u16) {
        match self {
            Self::Little => LittleEndian::write_u16(bytes, value),
            Self::Big => BigEndian::write_u16(bytes, value),
        }
    }
}

/// Serialization generation of an asset
///
/// The two generations seen in shipped data differ only in which header
/// fields are populated, so the loader has to say which one it is reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVariant {
    /// Pointers are signed offsets relative to the owning structure.
    /// Sampled data is split into a frame × channel section grid.
    #[default]
    Sectioned,
    /// Pointers are absolute save-time addresses (`base_address + offset`).
    /// Sampled data is a single section block.
    Flat,
}

/// How a raw buffer should be located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateOptions {
    pub layout: LayoutVariant,
    pub byte_order: Endianness,
    /// Save-time address of the buffer start, used by [`LayoutVariant::Flat`]
    pub base_address: u32,
}

impl LocateOptions {
    pub fn new(layout: LayoutVariant, byte_order: Endianness) -> Self {
        Self {
            layout,
            byte_order,
            base_address: 0,
        }
    }

    pub fn with_base_address(mut self, base_address: u32) -> Self {
        self.base_address = base_address;
        self
    }
}

// ============================================================================
// Asset Buffer
// ============================================================================

/// Location progress of an [`AssetBuffer`]
#[derive(Debug)]
pub enum LocationState {
    /// Bytes exactly as serialized
    Raw,
    /// Fixed up, with the typed graph built while locating
    Located(Located),
    /// Locating failed part way; the bytes are unusable
    Failed,
}

/// Owned copy of one serialized asset
#[derive(Debug)]
pub struct AssetBuffer {
    bytes: Vec<u8>,
    state: LocationState,
}

impl AssetBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            state: LocationState::Raw,
        }
    }

    /// Copy a block handed out by a bundle reader
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn state(&self) -> &LocationState {
        &self.state
    }

    pub fn is_located(&self) -> bool {
        matches!(self.state, LocationState::Located(_))
    }

    /// Run a locate routine over the raw bytes and record the outcome
    ///
    /// Only a `Raw` buffer can be located. A failure leaves the buffer
    /// `Failed` because the bytes may already be partly rewritten.
    pub(crate) fn locate_with<F>(&mut self, locate: F) -> Result<()>
    where
        F: FnOnce(&mut [u8]) -> Result<Located>,
    {
        match self.state {
            LocationState::Raw => {}
            LocationState::Located(_) => return Err(NsaError::AlreadyLocated),
            LocationState::Failed => {
                return Err(NsaError::corrupt("buffer was left unusable by a failed locate"));
            }
        }

        match locate(self.bytes.as_mut_slice()) {
            Ok(located) => {
                self.state = LocationState::Located(located);
                Ok(())
            }
            Err(e) => {
                self.state = LocationState::Failed;
                Err(e)
            }
        }
    }

    /// Take the located bytes and typed graph out of the buffer
    pub fn into_located(self) -> Result<(Vec<u8>, Located)> {
        match self.state {
            LocationState::Located(located) => Ok((self.bytes, located)),
            LocationState::Raw => Err(NsaError::NotLocated),
            LocationState::Failed => Err(NsaError::corrupt("buffer failed to locate")),
        }
    }
}

// ============================================================================
// Fixup Context
// ============================================================================

/// Mutable view of a raw buffer during one locate pass
///
/// Every accessor bounds-checks before touching the bytes. Scalar accessors
/// read in the source byte order, write back in native order and return the
/// native value, so each scalar must be swapped exactly once. Structures are
/// claimed by offset as they are entered, so a graph that reaches one twice
/// fails instead of swapping it again or recursing forever.
pub struct Fixup<'a> {
    bytes: &'a mut [u8],
    options: LocateOptions,
    registry: &'a TypeRegistry,
    claimed: HashSet<usize>,
}

impl<'a> Fixup<'a> {
    pub fn new(bytes: &'a mut [u8], options: LocateOptions, registry: &'a TypeRegistry) -> Self {
        Self {
            bytes,
            options,
            registry,
            claimed: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    /// Registry used to locate nested polymorphic objects
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Fail unless `len` bytes starting at `at` are inside the buffer
    pub fn require(&self, at: usize, len: usize, what: &str) -> Result<()> {
        match at.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(NsaError::corrupt(format!(
                "{} at {:#x} ({} bytes) exceeds buffer of {} bytes",
                what,
                at,
                len,
                self.bytes.len()
            ))),
        }
    }

    /// Mark the structure at `at` as located; a second claim is corrupt
    pub fn claim(&mut self, at: usize, what: &str) -> Result<()> {
        if !self.claimed.insert(at) {
            return Err(NsaError::corrupt(format!(
                "{} at {:#x} is reached more than once",
                what, at
            )));
        }
        Ok(())
    }

    /// Read a word in source order without rewriting it
    pub fn peek_u32(&self, at: usize) -> Result<u32> {
        self.require(at, 4, "word")?;
        Ok(self.options.byte_order.read_u32(&self.bytes[at..]))
    }

    pub fn swap_u32(&mut self, at: usize) -> Result<u32> {
        let value = self.peek_u32(at)?;
        NativeEndian::write_u32(&mut self.bytes[at..], value);
        Ok(value)
    }

    pub fn swap_f32(&mut self, at: usize) -> Result<f32> {
        self.swap_u32(at).map(f32::from_bits)
    }

    pub fn swap_vec3(&mut self, at: usize) -> Result<Vec3> {
        Ok(Vec3::new(
            self.swap_f32(at)?,
            self.swap_f32(at + 4)?,
            self.swap_f32(at + 8)?,
        ))
    }

    pub fn swap_quantisation(&mut self, at: usize) -> Result<QuantisationScaleAndOffset> {
        self.require(at, QuantisationScaleAndOffset::SIZE, "quantisation range")?;
        let scale = self.swap_vec3(at)?;
        let offset = self.swap_vec3(at + 12)?;
        Ok(QuantisationScaleAndOffset::new(scale, offset))
    }

    pub fn swap_u32_array(&mut self, at: usize, count: usize) -> Result<()> {
        let len = array_bytes(count, 4)?;
        self.require(at, len, "u32 array")?;
        let order = self.options.byte_order;
        for word in self.bytes[at..at + len].chunks_exact_mut(4) {
            let value = order.read_u32(word);
            NativeEndian::write_u32(word, value);
        }
        Ok(())
    }

    pub fn swap_u16_array(&mut self, at: usize, count: usize) -> Result<()> {
        let len = array_bytes(count, 2)?;
        self.require(at, len, "u16 array")?;
        let order = self.options.byte_order;
        for half in self.bytes[at..at + len].chunks_exact_mut(2) {
            let value = order.read_u16(half);
            NativeEndian::write_u16(half, value);
        }
        Ok(())
    }

    /// Rebase the pointer field at `field` and return its target offset
    ///
    /// `owner` is the start of the structure that holds the field; sectioned
    /// pointers are relative to it. Null stays null.
    pub fn pointer(&mut self, owner: usize, field: usize) -> Result<Option<usize>> {
        let raw = self.swap_u32(field)?;
        if raw == 0 {
            return Ok(None);
        }

        let target = match self.options.layout {
            LayoutVariant::Sectioned => owner as i64 + (raw as i32) as i64,
            LayoutVariant::Flat => raw as i64 - self.options.base_address as i64,
        };
        // Offset 0 is the root header, never a pointee. One past the end is
        // allowed for empty arrays; callers bounds-check what they read.
        if target <= 0 || target > self.bytes.len() as i64 {
            return Err(NsaError::corrupt(format!(
                "pointer at {:#x} resolves to {:#x}, outside buffer of {} bytes",
                field,
                target,
                self.bytes.len()
            )));
        }

        let target = target as usize;
        NativeEndian::write_u32(&mut self.bytes[field..], target as u32);
        Ok(Some(target))
    }

    /// Rebase the pointer to an array of `count` elements of `elem_size` bytes
    ///
    /// Returns 0 for an empty array without dereferencing the pointer. A
    /// non-empty array must be non-null and fit inside the buffer.
    pub fn array_pointer(
        &mut self,
        owner: usize,
        field: usize,
        count: usize,
        elem_size: usize,
        what: &str,
    ) -> Result<usize> {
        let target = self.pointer(owner, field)?;
        if count == 0 {
            return Ok(target.unwrap_or(0));
        }
        let target = target.ok_or_else(|| {
            NsaError::corrupt(format!("{} has {} elements but a null pointer", what, count))
        })?;
        self.require(target, array_bytes(count, elem_size)?, what)?;
        Ok(target)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        self.bytes
    }
}

/// Byte length of `count` elements, rejecting counts that overflow
pub fn array_bytes(count: usize, elem_size: usize) -> Result<usize> {
    count
        .checked_mul(elem_size)
        .ok_or_else(|| NsaError::corrupt(format!("element count {} overflows", count)))
}

// ============================================================================
// Located Reads
// ============================================================================

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    NativeEndian::read_u32(&bytes[at..])
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    NativeEndian::read_u16(&bytes[at..])
}

#[inline]
pub(crate) fn read_u16x3(bytes: &[u8], at: usize) -> [u16; 3] {
    [
        read_u16(bytes, at),
        read_u16(bytes, at + 2),
        read_u16(bytes, at + 4),
    ]
}

//! NSA compressed animation core
//!
//! This crate locates relocatable NSA animation assets in place and samples
//! bone transforms from their quantised, sectioned keyframe data.
//!
//! # Modules
//!
//! - [`fixup`] - Asset buffers, locate options and the in-place fixup context
//! - [`registry`] - Type id → locate function table for nested objects
//! - [`source`] - Located NSA animations and the [`AnimSource`] dispatch enum
//! - [`section`] - Frame-wise and channel-wise section lookup
//! - [`quantisation`] - Multiply-add and tan-quarter-angle decoding
//! - [`sampler`] - `compute_at_time` / `compute_at_frame` entry points
//! - [`trajectory`] - Root motion channel
//! - [`rig`] - Rig, rig-to-animation map and pose buffer
//! - [`layout`] - Byte offsets of every serialized structure
//!
//! # Lifecycle
//!
//! ```text
//! raw bytes -> AssetBuffer (Raw)
//!           -> TypeRegistry::locate -> AssetBuffer (Located)
//!           -> AnimSource::from_buffer -> compute_at_time ...
//! ```

pub mod error;
pub mod fixup;
pub mod layout;
pub mod quantisation;
pub mod registry;
pub mod rig;
pub mod sampler;
pub mod section;
pub mod source;
pub mod trajectory;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use error::{NsaError, Result};
pub use fixup::{AssetBuffer, Endianness, Fixup, LayoutVariant, LocateOptions, LocationState};
pub use quantisation::QuantisationScaleAndOffset;
pub use registry::{ANIM_NSA, LocateFn, Located, TRAJECTORY_NSA, TypeId, TypeRegistry};
pub use rig::{AnimRig, ChannelTransform, RigToAnimMap, TransformBuffer};
pub use section::{SectionBlock, SectionIndex};
pub use source::{AnimSource, ChannelMap, ChannelNameTable, NsaAnimation, NsaLayout};
pub use trajectory::{TrajectoryLayout, TrajectorySource};

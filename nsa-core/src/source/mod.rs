//! NSA compressed animation source
//!
//! A located NSA asset keeps its bytes (bulk keyframe data, read in place) and
//! a typed [`NsaLayout`] holding the small metadata that was decoded while
//! locating: channel maps, quantisation sets, the section table and the
//! per-channel storage slots.
//!
//! Channel sets are split per component into unchanging channels, stored once,
//! and sampled channels, stored per frame in section blocks:
//!
//! ```text
//!               channel section 0   channel section 1
//! frames 0..=9  block (0, 0)        block (0, 1)
//! frames 9..=19 block (1, 0)        block (1, 1)
//! ```

mod locate;
mod types;

#[cfg(test)]
mod tests;

pub(crate) use locate::locate_anim_nsa;
pub use types::{
    ChannelMap, ChannelNameTable, ChannelSlot, ChannelSlots, NsaLayout, UnchangingData,
};

use crate::error::{NsaError, Result};
use crate::fixup::{AssetBuffer, LayoutVariant};
use crate::layout::header::FLAG_CYCLIC;
use crate::registry::Located;
use crate::rig::{AnimRig, ChannelTransform, RigToAnimMap, TransformBuffer};
use crate::trajectory::TrajectorySource;

/// A located NSA animation, immutable and safe to share between threads
#[derive(Debug, Clone)]
pub struct NsaAnimation {
    bytes: Box<[u8]>,
    layout: Box<NsaLayout>,
}

impl NsaAnimation {
    /// Take ownership of a located buffer
    pub fn from_buffer(buffer: AssetBuffer) -> Result<Self> {
        match buffer.into_located()? {
            (bytes, Located::AnimNsa(layout)) => Ok(Self {
                bytes: bytes.into_boxed_slice(),
                layout,
            }),
            (_, other) => Err(NsaError::UnexpectedType {
                expected: "NSA animation",
                found: other.kind(),
            }),
        }
    }

    pub fn layout(&self) -> &NsaLayout {
        &self.layout
    }

    /// Located bytes, native byte order
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn layout_variant(&self) -> LayoutVariant {
        self.layout.layout
    }

    /// Playback length in seconds
    pub fn duration(&self) -> f32 {
        self.layout.duration
    }

    pub fn sample_frequency(&self) -> f32 {
        self.layout.sample_frequency
    }

    pub fn num_channel_sets(&self) -> u32 {
        self.layout.num_channel_sets
    }

    pub fn num_frame_sections(&self) -> usize {
        self.layout.sections.num_frame_sections()
    }

    pub fn num_channel_sections(&self) -> usize {
        self.layout.sections.num_channel_sections()
    }

    /// Stored frames, including the last
    pub fn num_frames(&self) -> u32 {
        self.layout.sections.num_frames()
    }

    /// First and last frame are identical and playback may wrap
    pub fn is_cyclic(&self) -> bool {
        self.layout.flags & FLAG_CYCLIC != 0
    }

    /// Root motion channel, if the asset has one
    pub fn trajectory_channel_data(&self) -> Option<TrajectorySource<'_>> {
        self.layout
            .trajectory
            .as_ref()
            .map(|trajectory| TrajectorySource::new(&self.bytes, trajectory))
    }

    pub fn channel_name_table(&self) -> Option<&ChannelNameTable> {
        self.layout.channel_names.as_ref()
    }

    pub fn unchanging_pos_map(&self) -> &ChannelMap {
        &self.layout.unchanging_pos_map
    }

    pub fn unchanging_quat_map(&self) -> &ChannelMap {
        &self.layout.unchanging_quat_map
    }

    pub fn sampled_pos_map(&self) -> &ChannelMap {
        &self.layout.sampled_pos_map
    }

    pub fn sampled_quat_map(&self) -> &ChannelMap {
        &self.layout.sampled_quat_map
    }
}

/// Any located animation source, dispatched by format
#[derive(Debug, Clone)]
pub enum AnimSource {
    Nsa(NsaAnimation),
}

impl AnimSource {
    /// Wrap a located buffer in the source type its locate routine produced
    pub fn from_buffer(buffer: AssetBuffer) -> Result<Self> {
        NsaAnimation::from_buffer(buffer).map(Self::Nsa)
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Nsa(_) => "NSA",
        }
    }

    pub fn as_nsa(&self) -> Option<&NsaAnimation> {
        match self {
            Self::Nsa(anim) => Some(anim),
        }
    }

    pub fn duration(&self) -> f32 {
        match self {
            Self::Nsa(anim) => anim.duration(),
        }
    }

    pub fn sample_frequency(&self) -> f32 {
        match self {
            Self::Nsa(anim) => anim.sample_frequency(),
        }
    }

    pub fn num_channel_sets(&self) -> u32 {
        match self {
            Self::Nsa(anim) => anim.num_channel_sets(),
        }
    }

    pub fn is_cyclic(&self) -> bool {
        match self {
            Self::Nsa(anim) => anim.is_cyclic(),
        }
    }

    pub fn trajectory_channel_data(&self) -> Option<TrajectorySource<'_>> {
        match self {
            Self::Nsa(anim) => anim.trajectory_channel_data(),
        }
    }

    pub fn channel_name_table(&self) -> Option<&ChannelNameTable> {
        match self {
            Self::Nsa(anim) => anim.channel_name_table(),
        }
    }

    pub fn compute_at_time(
        &self,
        time: f32,
        rig: &AnimRig,
        rig_to_anim: &RigToAnimMap,
        output_subset: &[usize],
        out: &mut TransformBuffer,
    ) -> Result<()> {
        match self {
            Self::Nsa(anim) => anim.compute_at_time(time, rig, rig_to_anim, output_subset, out),
        }
    }

    pub fn compute_at_time_single_transform(
        &self,
        time: f32,
        rig_channel: usize,
        rig_to_anim: &RigToAnimMap,
    ) -> Result<ChannelTransform> {
        match self {
            Self::Nsa(anim) => anim.compute_at_time_single_transform(time, rig_channel, rig_to_anim),
        }
    }

    pub fn compute_at_frame(&self, frame: u32) -> Result<Vec<ChannelTransform>> {
        match self {
            Self::Nsa(anim) => anim.compute_at_frame(frame),
        }
    }
}

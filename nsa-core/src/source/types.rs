//! Typed records built while locating an NSA animation

use glam::{Quat, Vec3};

use crate::fixup::LayoutVariant;
use crate::quantisation::QuantisationScaleAndOffset;
use crate::section::SectionIndex;
use crate::trajectory::TrajectoryLayout;

/// Ordered list of animation channel set indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelMap {
    channels: Vec<u16>,
}

impl ChannelMap {
    pub fn new(channels: Vec<u16>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.channels
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.channels.iter().copied()
    }

    pub fn contains(&self, channel: u16) -> bool {
        self.channels.contains(&channel)
    }
}

/// Constant samples of every unchanging channel, decoded at locate time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnchangingData {
    pub pos_quantisation: Option<QuantisationScaleAndOffset>,
    /// Indexed like the unchanging position map
    pub positions: Vec<Vec3>,
    /// Indexed like the unchanging rotation map
    pub rotations: Vec<Quat>,
}

/// Bone names indexed by channel set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelNameTable {
    names: Vec<String>,
}

impl ChannelNameTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, channel: usize) -> Option<&str> {
        self.names.get(channel).map(String::as_str)
    }

    /// Channel set index of a bone name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Where one component of a channel set is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSlot {
    /// Index into the unchanging data
    Unchanging(u32),
    /// Channel within every block of a channel section
    Sampled { channel_section: u32, index: u32 },
}

/// Storage of both components of a channel set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSlots {
    pub pos: ChannelSlot,
    pub quat: ChannelSlot,
}

/// Everything known about a located NSA animation
#[derive(Debug, Clone, PartialEq)]
pub struct NsaLayout {
    pub layout: LayoutVariant,
    pub duration: f32,
    pub sample_frequency: f32,
    pub num_channel_sets: u32,
    pub max_of_channel_num: u32,
    pub max_num_comp_channels: u32,
    pub flags: u32,
    pub pos_means: QuantisationScaleAndOffset,

    pub unchanging_pos_map: ChannelMap,
    pub unchanging_quat_map: ChannelMap,
    pub sampled_pos_map: ChannelMap,
    pub sampled_quat_map: ChannelMap,
    /// Per channel section, the channels stored in its blocks
    pub sampled_pos_maps: Vec<ChannelMap>,
    pub sampled_quat_maps: Vec<ChannelMap>,

    pub sampled_pos_qsets: Vec<QuantisationScaleAndOffset>,
    pub sampled_quat_qsets: Vec<QuantisationScaleAndOffset>,
    pub unchanging: UnchangingData,

    pub sections: SectionIndex,
    pub max_section_size: u32,

    pub trajectory: Option<TrajectoryLayout>,
    pub channel_names: Option<ChannelNameTable>,

    /// Indexed by channel set
    pub slots: Vec<ChannelSlots>,
}

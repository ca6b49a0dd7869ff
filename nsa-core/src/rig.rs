//! Rig, rig-to-animation mapping and pose output buffer

use glam::{Quat, Vec3};

use crate::error::{NsaError, Result};

/// Position and orientation of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl ChannelTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Flat `[px, py, pz, qx, qy, qz, qw]` layout used for dumps and golden data
    pub fn to_array(&self) -> [f32; 7] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
            self.rotation.w,
        ]
    }
}

impl Default for ChannelTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Skeleton an animation is played back on
#[derive(Debug, Clone, PartialEq)]
pub struct AnimRig {
    bind_pose: Vec<ChannelTransform>,
}

impl AnimRig {
    /// Rig with an identity bind pose
    pub fn new(num_bones: usize) -> Self {
        Self {
            bind_pose: vec![ChannelTransform::IDENTITY; num_bones],
        }
    }

    pub fn with_bind_pose(bind_pose: Vec<ChannelTransform>) -> Self {
        Self { bind_pose }
    }

    pub fn num_bones(&self) -> usize {
        self.bind_pose.len()
    }

    pub fn bind_pose(&self) -> &[ChannelTransform] {
        &self.bind_pose
    }
}

/// Maps rig bones to animation channel sets
///
/// Bones without an entry are not driven by the animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigToAnimMap {
    entries: Vec<Option<u16>>,
}

impl RigToAnimMap {
    /// Bone `i` plays channel set `i`
    pub fn identity(num_bones: usize) -> Self {
        Self {
            entries: (0..num_bones).map(|i| Some(i as u16)).collect(),
        }
    }

    /// Map built from `(rig bone, anim channel)` pairs
    pub fn from_pairs(num_bones: usize, pairs: &[(usize, u16)]) -> Result<Self> {
        let mut entries = vec![None; num_bones];
        for &(bone, channel) in pairs {
            let slot = entries
                .get_mut(bone)
                .ok_or_else(|| NsaError::out_of_range("rig bone", bone as u64, num_bones as u64))?;
            *slot = Some(channel);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Animation channel driving a rig bone, `None` if the bone is unmapped
    pub fn anim_channel(&self, rig_bone: usize) -> Option<u16> {
        self.entries.get(rig_bone).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(bone, channel)| channel.map(|c| (bone, c)))
    }
}

/// Caller-owned pose buffer, one slot per rig bone
///
/// Slots the sampler did not compute keep the bind pose and stay unflagged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformBuffer {
    transforms: Vec<ChannelTransform>,
    used: Vec<bool>,
}

impl TransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_rig(rig: &AnimRig) -> Self {
        let mut buffer = Self::new();
        buffer.reset(rig);
        buffer
    }

    /// Resize to the rig and restore the bind pose in every slot
    pub fn reset(&mut self, rig: &AnimRig) {
        self.transforms.clear();
        self.transforms.extend_from_slice(rig.bind_pose());
        self.used.clear();
        self.used.resize(rig.num_bones(), false);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn get(&self, bone: usize) -> Option<&ChannelTransform> {
        self.transforms.get(bone)
    }

    /// Whether the last sample wrote this slot
    pub fn is_used(&self, bone: usize) -> bool {
        self.used.get(bone).copied().unwrap_or(false)
    }

    pub fn transforms(&self) -> &[ChannelTransform] {
        &self.transforms
    }

    pub fn num_used(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }

    pub(crate) fn set(&mut self, bone: usize, transform: ChannelTransform) {
        self.transforms[bone] = transform;
        self.used[bone] = true;
    }
}

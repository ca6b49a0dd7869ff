//! Trajectory (root motion) channel
//!
//! The trajectory is a standalone sampled channel with its own frame count,
//! sample frequency and quantisation ranges. Keys are absolute: a packed
//! 11:11:10 position and a 16-bit tan-quarter-angle rotation per frame.

use glam::{Quat, Vec3};

use crate::error::{NsaError, Result};
use crate::fixup::{Fixup, read_u16x3, read_u32};
use crate::layout::trajectory as field;
use crate::quantisation::{QuantisationScaleAndOffset, tqa_to_quat, unpack_pos_key, widen};
use crate::registry::Located;
use crate::rig::ChannelTransform;
use crate::sampler::split_frame;

/// Located trajectory source
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryLayout {
    pub offset: usize,
    pub type_tag: u32,
    pub num_frames: u32,
    pub sample_frequency: f32,
    pub pos_quantisation: QuantisationScaleAndOffset,
    pub quat_quantisation: QuantisationScaleAndOffset,
    /// Byte offset of `u32[num_frames]` packed position keys
    pub pos_keys: usize,
    /// Byte offset of `u16[num_frames * 3]` rotation keys
    pub quat_keys: usize,
}

pub(crate) fn locate_trajectory_nsa(fx: &mut Fixup<'_>, at: usize) -> Result<Located> {
    fx.require(at, field::SIZE, "trajectory source")?;
    fx.claim(at, "trajectory source")?;

    let type_tag = fx.swap_u32(at + field::TYPE_TAG)?;
    let num_frames = fx.swap_u32(at + field::NUM_FRAMES)?;
    let sample_frequency = fx.swap_f32(at + field::SAMPLE_FREQUENCY)?;
    let pos_quantisation = fx.swap_quantisation(at + field::POS_QUANTISATION)?;
    let quat_quantisation = fx.swap_quantisation(at + field::QUAT_QUANTISATION)?;

    if num_frames == 0 {
        return Err(NsaError::corrupt("trajectory has no frames"));
    }
    if !sample_frequency.is_finite() || sample_frequency <= 0.0 {
        return Err(NsaError::corrupt(format!(
            "trajectory sample frequency {}",
            sample_frequency
        )));
    }

    let n = num_frames as usize;
    let pos_keys = fx.array_pointer(at, at + field::POS_KEYS, n, 4, "trajectory position keys")?;
    fx.swap_u32_array(pos_keys, n)?;
    let quat_keys = fx.array_pointer(at, at + field::QUAT_KEYS, n * 3, 2, "trajectory rotation keys")?;
    fx.swap_u16_array(quat_keys, n * 3)?;

    Ok(Located::TrajectoryNsa(TrajectoryLayout {
        offset: at,
        type_tag,
        num_frames,
        sample_frequency,
        pos_quantisation,
        quat_quantisation,
        pos_keys,
        quat_keys,
    }))
}

/// Read-only view of a located trajectory
#[derive(Debug, Clone, Copy)]
pub struct TrajectorySource<'a> {
    bytes: &'a [u8],
    layout: &'a TrajectoryLayout,
}

impl<'a> TrajectorySource<'a> {
    /// View over the located bytes the layout was built from
    pub fn new(bytes: &'a [u8], layout: &'a TrajectoryLayout) -> Self {
        Self { bytes, layout }
    }

    pub fn layout(&self) -> &'a TrajectoryLayout {
        self.layout
    }

    pub fn num_frames(&self) -> u32 {
        self.layout.num_frames
    }

    pub fn sample_frequency(&self) -> f32 {
        self.layout.sample_frequency
    }

    /// Playback length in seconds
    pub fn duration(&self) -> f32 {
        (self.layout.num_frames - 1) as f32 / self.layout.sample_frequency
    }

    /// Decoded key of one frame
    pub fn key_at_frame(&self, frame: u32) -> Result<ChannelTransform> {
        if frame >= self.layout.num_frames {
            return Err(NsaError::out_of_range(
                "trajectory frame",
                frame as u64,
                self.layout.num_frames as u64,
            ));
        }
        let i = frame as usize;
        let packed = read_u32(self.bytes, self.layout.pos_keys + 4 * i);
        let position = self.layout.pos_quantisation.decode(unpack_pos_key(packed));
        let code = read_u16x3(self.bytes, self.layout.quat_keys + 6 * i);
        let rotation = tqa_to_quat(self.layout.quat_quantisation.decode(widen(code)));
        Ok(ChannelTransform::new(position, rotation))
    }

    /// Interpolated trajectory transform at a time in seconds
    pub fn compute_at_time(&self, time: f32) -> Result<(Vec3, Quat)> {
        if !time.is_finite() {
            return Err(NsaError::InvalidTime(time));
        }
        let last = self.layout.num_frames - 1;
        if last == 0 {
            let key = self.key_at_frame(0)?;
            return Ok((key.position, key.rotation));
        }

        let frame_f = (time * self.layout.sample_frequency).clamp(0.0, last as f32);
        let (frame, u) = split_frame(frame_f, last);
        let a = self.key_at_frame(frame)?;
        let b = self.key_at_frame(frame + 1)?;

        tracing::trace!("trajectory sample t={} frame={} u={}", time, frame, u);
        Ok((a.position.lerp(b.position, u), a.rotation.lerp(b.rotation, u)))
    }
}

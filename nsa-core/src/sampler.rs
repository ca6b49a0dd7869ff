//! Pose sampling for located NSA animations
//!
//! Time maps linearly onto the stored frames, `0` to the first and the clip
//! duration to the last. The two frames bounding that point always lie in the
//! same section block because blocks share their boundary frame.

use glam::{Quat, Vec3};

use crate::error::{NsaError, Result};
use crate::fixup::{read_u16x3, read_u32};
use crate::quantisation::{decode_quat_mean, tqa_to_quat, unpack_pos_key, widen};
use crate::rig::{AnimRig, ChannelTransform, RigToAnimMap, TransformBuffer};
use crate::source::{ChannelSlot, NsaAnimation};

/// Split a clamped fractional frame into a base frame and blend weight
///
/// The last frame is returned as `(last - 1, 1.0)` so the pair never reaches
/// past it. `last` must be at least 1.
pub(crate) fn split_frame(frame_f: f32, last: u32) -> (u32, f32) {
    let frame = frame_f.floor() as u32;
    if frame >= last {
        (last - 1, 1.0)
    } else {
        (frame, frame_f - frame as f32)
    }
}

/// Resolved sample position within the section grid
#[derive(Debug, Clone, Copy, PartialEq)]
struct SamplePoint {
    frame_section: usize,
    /// Base frame relative to the section start
    local_frame: u32,
    /// Blend weight towards `local_frame + 1`
    u: f32,
}

impl NsaAnimation {
    /// Sample every requested bone of a rig at `time` seconds
    ///
    /// `output_subset` lists rig bones to compute; empty means every mapped
    /// bone. Unmapped bones keep their bind pose and stay unflagged in `out`.
    /// Times outside `[0, duration]` are clamped; cyclic clips should be
    /// wrapped by the caller.
    pub fn compute_at_time(
        &self,
        time: f32,
        rig: &AnimRig,
        rig_to_anim: &RigToAnimMap,
        output_subset: &[usize],
        out: &mut TransformBuffer,
    ) -> Result<()> {
        self.check_request(rig, rig_to_anim, output_subset)?;
        let point = self.sample_point(time)?;
        out.reset(rig);

        if output_subset.is_empty() {
            for (bone, channel) in rig_to_anim.iter() {
                out.set(bone, self.sample_channel(channel as usize, &point)?);
            }
        } else {
            for &bone in output_subset {
                if let Some(channel) = rig_to_anim.anim_channel(bone) {
                    out.set(bone, self.sample_channel(channel as usize, &point)?);
                }
            }
        }

        tracing::trace!(
            "sampled t={} ({} bones, section {}, frame {}+{})",
            time,
            out.num_used(),
            point.frame_section,
            point.local_frame,
            point.u
        );
        Ok(())
    }

    /// Sample the channel driving a single rig bone
    pub fn compute_at_time_single_transform(
        &self,
        time: f32,
        rig_channel: usize,
        rig_to_anim: &RigToAnimMap,
    ) -> Result<ChannelTransform> {
        let channel = rig_to_anim.anim_channel(rig_channel).ok_or_else(|| {
            NsaError::out_of_range("mapped rig channel", rig_channel as u64, rig_to_anim.len() as u64)
        })?;
        let point = self.sample_point(time)?;
        self.sample_channel(channel as usize, &point)
    }

    /// Decode one stored frame for every channel set, without interpolation
    pub fn compute_at_frame(&self, frame: u32) -> Result<Vec<ChannelTransform>> {
        let sections = &self.layout().sections;
        let frame_section = sections.find_section(frame)?;
        let local_frame = frame - sections.start_frames()[frame_section];

        self.layout()
            .slots
            .iter()
            .map(|slots| {
                Ok(ChannelTransform::new(
                    self.position(slots.pos, frame_section, local_frame)?,
                    self.rotation(slots.quat, frame_section, local_frame)?,
                ))
            })
            .collect()
    }

    /// Validate every bone and channel of a request so a rejected call
    /// leaves the output buffer as it was
    fn check_request(
        &self,
        rig: &AnimRig,
        rig_to_anim: &RigToAnimMap,
        output_subset: &[usize],
    ) -> Result<()> {
        if rig_to_anim.len() > rig.num_bones() {
            return Err(NsaError::out_of_range(
                "rig-to-anim map entry",
                rig_to_anim.len() as u64 - 1,
                rig.num_bones() as u64,
            ));
        }

        if output_subset.is_empty() {
            for (_, channel) in rig_to_anim.iter() {
                self.check_channel(channel as usize)?;
            }
        } else {
            for &bone in output_subset {
                if bone >= rig.num_bones() {
                    return Err(NsaError::out_of_range(
                        "rig bone",
                        bone as u64,
                        rig.num_bones() as u64,
                    ));
                }
                if let Some(channel) = rig_to_anim.anim_channel(bone) {
                    self.check_channel(channel as usize)?;
                }
            }
        }
        Ok(())
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel >= self.layout().slots.len() {
            return Err(NsaError::out_of_range(
                "anim channel",
                channel as u64,
                self.layout().num_channel_sets as u64,
            ));
        }
        Ok(())
    }

    fn sample_point(&self, time: f32) -> Result<SamplePoint> {
        if !time.is_finite() {
            return Err(NsaError::InvalidTime(time));
        }
        let layout = self.layout();
        let last = layout.sections.sentinel();
        let duration = layout.duration;

        let frame_f = if duration > 0.0 {
            (time.clamp(0.0, duration) / duration * last as f32).clamp(0.0, last as f32)
        } else {
            0.0
        };
        let (frame, u) = split_frame(frame_f, last);
        let frame_section = layout.sections.find_section(frame)?;

        Ok(SamplePoint {
            frame_section,
            local_frame: frame - layout.sections.start_frames()[frame_section],
            u,
        })
    }

    fn sample_channel(&self, channel: usize, point: &SamplePoint) -> Result<ChannelTransform> {
        let slots = self.layout().slots.get(channel).ok_or_else(|| {
            NsaError::out_of_range(
                "anim channel",
                channel as u64,
                self.layout().num_channel_sets as u64,
            )
        })?;
        let (fs, local, u) = (point.frame_section, point.local_frame, point.u);

        let position = match slots.pos {
            ChannelSlot::Unchanging(_) => self.position(slots.pos, fs, local)?,
            ChannelSlot::Sampled { .. } => self
                .position(slots.pos, fs, local)?
                .lerp(self.position(slots.pos, fs, local + 1)?, u),
        };
        let rotation = match slots.quat {
            ChannelSlot::Unchanging(_) => self.rotation(slots.quat, fs, local)?,
            ChannelSlot::Sampled { .. } => self
                .rotation(slots.quat, fs, local)?
                .lerp(self.rotation(slots.quat, fs, local + 1)?, u),
        };
        Ok(ChannelTransform::new(position, rotation))
    }

    fn position(&self, slot: ChannelSlot, frame_section: usize, local_frame: u32) -> Result<Vec3> {
        let layout = self.layout();
        match slot {
            ChannelSlot::Unchanging(i) => Ok(layout.unchanging.positions[i as usize]),
            ChannelSlot::Sampled {
                channel_section,
                index,
            } => {
                let block = layout.sections.block(frame_section, channel_section as usize)?;
                let info = block.pos_channels[index as usize];
                let mean = layout.pos_means.decode(widen(info.mean));
                let key = read_u32(self.bytes(), block.pos_key_offset(local_frame, index as usize));
                let qset = &layout.sampled_pos_qsets[info.qset as usize];
                Ok(mean + qset.decode(unpack_pos_key(key)))
            }
        }
    }

    fn rotation(&self, slot: ChannelSlot, frame_section: usize, local_frame: u32) -> Result<Quat> {
        let layout = self.layout();
        match slot {
            ChannelSlot::Unchanging(i) => Ok(layout.unchanging.rotations[i as usize]),
            ChannelSlot::Sampled {
                channel_section,
                index,
            } => {
                let block = layout.sections.block(frame_section, channel_section as usize)?;
                let info = block.quat_channels[index as usize];
                let code = read_u16x3(self.bytes(), block.quat_key_offset(local_frame, index as usize));
                let qset = &layout.sampled_quat_qsets[info.qset as usize];
                let delta = tqa_to_quat(qset.decode(widen(code)));
                Ok(decode_quat_mean(info.mean) * delta)
            }
        }
    }
}

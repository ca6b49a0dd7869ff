//! Frame-wise and channel-wise section lookup
//!
//! Sampled keyframes are split into `F` frame-wise sections, each split again
//! into `C` channel-wise blocks, stored frame major. Frame section `s` covers
//! frames `start[s]..=start[s + 1]`: the boundary frame is stored at the end of
//! one section and again at the start of the next, so interpolating between
//! `f` and `f + 1` never needs two blocks. `start[F]` is the last frame of the
//! clip (the sentinel).

use crate::error::{NsaError, Result};

/// Mean and quantisation set of one sampled channel within a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledChannelInfo {
    pub mean: [u16; 3],
    pub qset: u16,
}

/// One located section block
///
/// Key arrays stay in the asset buffer and are referenced by byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionBlock {
    /// Byte offset of the block header
    pub offset: usize,
    /// Recorded byte size of the block
    pub size: usize,
    pub start_frame: u32,
    /// Frames stored, including the trailing overlap frame
    pub num_frames: u32,
    pub pos_channels: Vec<SampledChannelInfo>,
    pub quat_channels: Vec<SampledChannelInfo>,
    /// Byte offset of `u32[num_frames * num_pos]` packed position keys
    pub pos_keys: usize,
    /// Byte offset of `u16[num_frames * num_quat * 3]` rotation keys
    pub quat_keys: usize,
}

impl SectionBlock {
    pub fn num_pos_channels(&self) -> usize {
        self.pos_channels.len()
    }

    pub fn num_quat_channels(&self) -> usize {
        self.quat_channels.len()
    }

    /// Byte offset of the position key for a section-local frame and channel
    #[inline]
    pub fn pos_key_offset(&self, local_frame: u32, channel: usize) -> usize {
        self.pos_keys + 4 * (local_frame as usize * self.pos_channels.len() + channel)
    }

    /// Byte offset of the first rotation key component for a section-local frame and channel
    #[inline]
    pub fn quat_key_offset(&self, local_frame: u32, channel: usize) -> usize {
        self.quat_keys + 6 * (local_frame as usize * self.quat_channels.len() + channel)
    }
}

/// Section table of a located animation
#[derive(Debug, Clone, PartialEq)]
pub struct SectionIndex {
    start_frames: Vec<u32>,
    num_channel_sections: usize,
    blocks: Vec<SectionBlock>,
}

impl SectionIndex {
    /// Build an index from `F + 1` start frames and `F * C` frame-major blocks
    ///
    /// Start frames must begin at 0 and strictly increase, and each block must
    /// cover exactly the frames of its frame section.
    pub fn new(
        start_frames: Vec<u32>,
        num_channel_sections: usize,
        blocks: Vec<SectionBlock>,
    ) -> Result<Self> {
        if start_frames.len() < 2 {
            return Err(NsaError::corrupt("section table needs at least one frame section"));
        }
        if start_frames[0] != 0 {
            return Err(NsaError::corrupt(format!(
                "first section starts at frame {}",
                start_frames[0]
            )));
        }
        if let Some(w) = start_frames.windows(2).find(|w| w[0] >= w[1]) {
            return Err(NsaError::corrupt(format!(
                "section start frames not increasing ({} then {})",
                w[0], w[1]
            )));
        }

        let num_frame_sections = start_frames.len() - 1;
        if num_channel_sections == 0
            || blocks.len() != num_frame_sections * num_channel_sections
        {
            return Err(NsaError::corrupt(format!(
                "{} section blocks for {} x {} sections",
                blocks.len(),
                num_frame_sections,
                num_channel_sections
            )));
        }

        for (i, block) in blocks.iter().enumerate() {
            let s = i / num_channel_sections;
            let start = start_frames[s];
            let frames = start_frames[s + 1] - start + 1;
            if block.start_frame != start || block.num_frames != frames {
                return Err(NsaError::corrupt(format!(
                    "section block {} covers frames {}+{}, table says {}+{}",
                    i, block.start_frame, block.num_frames, start, frames
                )));
            }
        }

        Ok(Self {
            start_frames,
            num_channel_sections,
            blocks,
        })
    }

    pub fn num_frame_sections(&self) -> usize {
        self.start_frames.len() - 1
    }

    pub fn num_channel_sections(&self) -> usize {
        self.num_channel_sections
    }

    pub fn start_frames(&self) -> &[u32] {
        &self.start_frames
    }

    /// Index of the last frame
    pub fn sentinel(&self) -> u32 {
        self.start_frames[self.start_frames.len() - 1]
    }

    pub fn num_frames(&self) -> u32 {
        self.sentinel() + 1
    }

    /// Frame section containing `frame`
    ///
    /// Returns `s` with `start[s] <= frame < start[s + 1]`, or the last
    /// section when `frame` is the sentinel.
    pub fn find_section(&self, frame: u32) -> Result<usize> {
        let sentinel = self.sentinel();
        if frame > sentinel {
            return Err(NsaError::out_of_range("frame", frame as u64, sentinel as u64 + 1));
        }
        let last = self.num_frame_sections() - 1;
        Ok(self.start_frames[1..]
            .iter()
            .position(|&next| frame < next)
            .unwrap_or(last))
    }

    pub fn block(&self, frame_section: usize, channel_section: usize) -> Result<&SectionBlock> {
        if frame_section >= self.num_frame_sections() {
            return Err(NsaError::out_of_range(
                "frame section",
                frame_section as u64,
                self.num_frame_sections() as u64,
            ));
        }
        if channel_section >= self.num_channel_sections {
            return Err(NsaError::out_of_range(
                "channel section",
                channel_section as u64,
                self.num_channel_sections as u64,
            ));
        }
        Ok(&self.blocks[frame_section * self.num_channel_sections + channel_section])
    }

    /// Byte offset and size of the block holding `frame` for a channel section
    pub fn block_range(&self, frame: u32, channel_section: usize) -> Result<(usize, usize)> {
        let block = self.block(self.find_section(frame)?, channel_section)?;
        Ok((block.offset, block.size))
    }

    /// All blocks, frame major
    pub fn blocks(&self) -> &[SectionBlock] {
        &self.blocks
    }
}

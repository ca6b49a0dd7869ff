//! Serializer for synthetic NSA assets
//!
//! Builds raw, unlocated buffers from plain per-channel tracks in either
//! layout generation and either byte order. The quantisation choices are the
//! simplest ones that decode within one quantisation step; this is test
//! tooling, not a production encoder.

use glam::{Quat, Vec3};

use crate::fixup::{AssetBuffer, Endianness, LayoutVariant, LocateOptions};
use crate::layout::{channel_map, header, name_table, section as block_field, trajectory, unchanging};
use crate::quantisation::{
    POS_KEY_BITS, QuantisationScaleAndOffset, encode_quat_mean, decode_quat_mean, narrow,
    pack_pos_key, quat_to_tqa, widen,
};
use crate::registry::TRAJECTORY_NSA;

const U16_BITS: [u32; 3] = [16; 3];

/// Position track of one channel set
#[derive(Debug, Clone, PartialEq)]
pub enum PosTrack {
    Constant(Vec3),
    /// One value per frame
    Sampled(Vec<Vec3>),
}

/// Rotation track of one channel set
#[derive(Debug, Clone, PartialEq)]
pub enum QuatTrack {
    Constant(Quat),
    /// One value per frame
    Sampled(Vec<Quat>),
}

/// Builder for a raw NSA animation asset
#[derive(Debug, Clone)]
pub struct NsaBuilder {
    duration: f32,
    sample_frequency: f32,
    num_frames: u32,
    cyclic: bool,
    channels: Vec<(PosTrack, QuatTrack)>,
    section_starts: Vec<u32>,
    num_channel_sections: usize,
    names: Option<Vec<String>>,
    trajectory: Option<(f32, Vec<(Vec3, Quat)>)>,
}

impl NsaBuilder {
    /// Empty clip storing `num_frames` frames (at least 2)
    pub fn new(duration: f32, sample_frequency: f32, num_frames: u32) -> Self {
        assert!(num_frames >= 2, "a clip stores at least two frames");
        Self {
            duration,
            sample_frequency,
            num_frames,
            cyclic: false,
            channels: Vec::new(),
            section_starts: vec![0],
            num_channel_sections: 1,
            names: None,
            trajectory: None,
        }
    }

    pub fn cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }

    /// Append a channel set
    pub fn channel(mut self, pos: PosTrack, quat: QuatTrack) -> Self {
        if let PosTrack::Sampled(keys) = &pos {
            assert_eq!(keys.len(), self.num_frames as usize, "position track length");
        }
        if let QuatTrack::Sampled(keys) = &quat {
            assert_eq!(keys.len(), self.num_frames as usize, "rotation track length");
        }
        self.channels.push((pos, quat));
        self
    }

    /// Start frames of the frame sections; the first must be 0.
    /// Only the sectioned layout uses more than one section.
    pub fn frame_sections(mut self, starts: &[u32]) -> Self {
        assert_eq!(starts.first(), Some(&0), "first section starts at frame 0");
        self.section_starts = starts.to_vec();
        self
    }

    pub fn channel_sections(mut self, count: usize) -> Self {
        assert!(count > 0);
        self.num_channel_sections = count;
        self
    }

    pub fn names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn trajectory(mut self, sample_frequency: f32, keys: Vec<(Vec3, Quat)>) -> Self {
        assert!(!keys.is_empty());
        self.trajectory = Some((sample_frequency, keys));
        self
    }

    pub fn build_buffer(&self, options: &LocateOptions) -> AssetBuffer {
        AssetBuffer::new(self.build(options))
    }

    /// Serialize the clip
    pub fn build(&self, options: &LocateOptions) -> Vec<u8> {
        let last = self.num_frames - 1;
        let (starts, num_cs) = match options.layout {
            LayoutVariant::Sectioned => {
                let mut starts = self.section_starts.clone();
                starts.push(last);
                (starts, self.num_channel_sections)
            }
            LayoutVariant::Flat => (vec![0, last], 1),
        };
        let num_fs = starts.len() - 1;

        // Classify channels
        let mut unchanging_pos = Vec::new();
        let mut sampled_pos = Vec::new();
        let mut unchanging_quat = Vec::new();
        let mut sampled_quat = Vec::new();
        for (c, (pos, quat)) in self.channels.iter().enumerate() {
            let c = c as u16;
            match pos {
                PosTrack::Constant(p) => unchanging_pos.push((c, *p)),
                PosTrack::Sampled(keys) => sampled_pos.push((c, keys.as_slice())),
            }
            match quat {
                QuatTrack::Constant(q) => unchanging_quat.push((c, *q)),
                QuatTrack::Sampled(keys) => sampled_quat.push((c, keys.as_slice())),
            }
        }

        let pos = encode_positions(&sampled_pos, &starts);
        let quat = encode_rotations(&sampled_quat, &starts);

        let mut w = Writer::new(*options);
        let root = w.alloc(header::SIZE);
        debug_assert_eq!(root, 0);

        // Header scalars
        let num_channel_sets = self.channels.len();
        let max_of_channel_num = [
            unchanging_pos.len(),
            unchanging_quat.len(),
            sampled_pos.len(),
            sampled_quat.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        w.f32(header::DURATION, self.duration);
        w.f32(header::SAMPLE_FREQUENCY, self.sample_frequency);
        w.u32(header::NUM_CHANNEL_SETS, num_channel_sets as u32);
        w.u32(header::MAX_OF_CHANNEL_NUM, max_of_channel_num as u32);
        w.u32(
            header::MAX_NUM_COMP_CHANNELS,
            sampled_pos.len().max(sampled_quat.len()) as u32,
        );
        w.quantisation(header::POS_MEANS_QUANTISATION, &pos.means);
        w.u32(header::SAMPLED_POS_NUM_QSETS, pos.qsets.len() as u32);
        w.u32(header::SAMPLED_QUAT_NUM_QSETS, quat.qsets.len() as u32);
        w.u32(header::FLAGS, if self.cyclic { header::FLAG_CYCLIC } else { 0 });

        // Channel maps
        let map = w.channel_map(&channels_of(&unchanging_quat));
        w.ptr(root, header::UNCHANGING_QUAT_MAP, map);
        let stored_pos_map = match options.layout {
            LayoutVariant::Sectioned => channels_of(&unchanging_pos),
            LayoutVariant::Flat => Vec::new(),
        };
        let map = w.channel_map(&stored_pos_map);
        w.ptr(root, header::UNCHANGING_POS_MAP, map);
        let map = w.channel_map(&channels_of(&sampled_pos));
        w.ptr(root, header::SAMPLED_POS_MAP, map);
        let map = w.channel_map(&channels_of(&sampled_quat));
        w.ptr(root, header::SAMPLED_QUAT_MAP, map);
        if options.layout == LayoutVariant::Flat {
            let map = w.channel_map(&[]);
            w.ptr(root, header::RESERVED_MAP, map);
        }

        // Quantisation sets
        let qsets = w.qsets(&pos.qsets);
        w.ptr(root, header::SAMPLED_POS_QINFO, qsets);
        let qsets = w.qsets(&quat.qsets);
        w.ptr(root, header::SAMPLED_QUAT_QINFO, qsets);

        // Unchanging data
        let data = w.unchanging(&unchanging_pos, &unchanging_quat);
        w.ptr(root, header::UNCHANGING_DATA, data);

        // Section blocks, frame major
        let section_pos: Vec<Vec<usize>> = (0..num_cs)
            .map(|cs| (0..sampled_pos.len()).filter(|j| j % num_cs == cs).collect())
            .collect();
        let section_quat: Vec<Vec<usize>> = (0..num_cs)
            .map(|cs| (0..sampled_quat.len()).filter(|j| j % num_cs == cs).collect())
            .collect();
        let mut blocks = Vec::with_capacity(num_fs * num_cs);
        for s in 0..num_fs {
            for cs in 0..num_cs {
                blocks.push(w.section(s, &starts, &section_pos[cs], &section_quat[cs], &pos, &quat));
            }
        }
        let max_section_size = blocks.iter().map(|&(_, size)| size).max().unwrap_or(0);
        w.u32(header::MAX_SECTION_SIZE, max_section_size as u32);

        let trajectory_field = match options.layout {
            LayoutVariant::Sectioned => {
                w.u32(header::NUM_FRAME_SECTIONS, num_fs as u32);
                w.u32(header::NUM_CHANNEL_SECTIONS, num_cs as u32);

                let grid = w.alloc(4 * blocks.len());
                for (i, &(block, _)) in blocks.iter().enumerate() {
                    w.ptr(root, grid + 4 * i, block);
                }
                w.ptr(root, header::SECTION_GRID, grid);

                let sizes: Vec<u32> = blocks.iter().map(|&(_, size)| size as u32).collect();
                let sizes = w.u32_array(&sizes);
                w.ptr(root, header::SECTION_SIZES, sizes);
                let starts_at = w.u32_array(&starts);
                w.ptr(root, header::SECTION_START_FRAMES, starts_at);

                for (field, sections, sampled) in [
                    (header::SAMPLED_POS_MAPS, &section_pos, channels_of(&sampled_pos)),
                    (header::SAMPLED_QUAT_MAPS, &section_quat, channels_of(&sampled_quat)),
                ] {
                    let maps: Vec<usize> = sections
                        .iter()
                        .map(|js| {
                            let list: Vec<u16> = js.iter().map(|&j| sampled[j]).collect();
                            w.channel_map(&list)
                        })
                        .collect();
                    let table = w.alloc(4 * maps.len());
                    for (i, &map) in maps.iter().enumerate() {
                        w.ptr(root, table + 4 * i, map);
                    }
                    w.ptr(root, field, table);
                }
                header::TRAJECTORY
            }
            LayoutVariant::Flat => {
                w.ptr(root, header::FLAT_SECTION_DATA, blocks[0].0);
                header::FLAT_TRAJECTORY
            }
        };

        if let Some((frequency, keys)) = &self.trajectory {
            let at = w.trajectory(*frequency, keys);
            w.ptr(root, trajectory_field, at);
        }

        if let Some(names) = &self.names {
            let at = w.name_table(names);
            w.ptr(root, header::CHANNEL_NAMES, at);
        }

        w.buf
    }
}

fn channels_of<T>(list: &[(u16, T)]) -> Vec<u16> {
    list.iter().map(|(c, _)| *c).collect()
}

/// Serialize a standalone trajectory source
pub fn build_trajectory(
    sample_frequency: f32,
    keys: &[(Vec3, Quat)],
    options: &LocateOptions,
) -> Vec<u8> {
    let mut w = Writer::new(*options);
    w.trajectory(sample_frequency, keys);
    w.buf
}

/// Linear position ramp, one value per frame
pub fn ramp(num_frames: u32, from: Vec3, to: Vec3) -> Vec<Vec3> {
    let last = (num_frames - 1).max(1) as f32;
    (0..num_frames)
        .map(|i| from.lerp(to, i as f32 / last))
        .collect()
}

/// Rotation about `axis` sweeping linearly from one angle to another
pub fn spin(num_frames: u32, axis: Vec3, from: f32, to: f32) -> Vec<Quat> {
    let last = (num_frames - 1).max(1) as f32;
    (0..num_frames)
        .map(|i| Quat::from_axis_angle(axis, from + (to - from) * i as f32 / last))
        .collect()
}

/// Read a word of a raw buffer in its stored byte order
pub fn raw_u32(bytes: &[u8], at: usize, order: Endianness) -> u32 {
    order.read_u32(&bytes[at..])
}

/// Overwrite a word of a raw buffer
pub fn patch_u32(bytes: &mut [u8], at: usize, value: u32, order: Endianness) {
    order.write_u32(&mut bytes[at..], value);
}


// ============================================================================
// Quantisation
// ============================================================================

fn bounds(values: impl IntoIterator<Item = Vec3>) -> (Vec3, Vec3) {
    values
        .into_iter()
        .fold(None, |acc: Option<(Vec3, Vec3)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((Vec3::ZERO, Vec3::ZERO))
}

/// Encoded sampled positions: `means[s][j]`, `keys[s][j][local frame]`
struct EncodedPositions {
    means: QuantisationScaleAndOffset,
    qsets: Vec<QuantisationScaleAndOffset>,
    section_means: Vec<Vec<[u16; 3]>>,
    keys: Vec<Vec<Vec<u32>>>,
}

fn encode_positions(sampled: &[(u16, &[Vec3])], starts: &[u32]) -> EncodedPositions {
    let (lo, hi) = bounds(sampled.iter().flat_map(|(_, keys)| keys.iter().copied()));
    let means = QuantisationScaleAndOffset::from_range(lo, hi, U16_BITS);
    let num_fs = starts.len() - 1;
    let frames = |s: usize| starts[s] as usize..=starts[s + 1] as usize;

    let section_means: Vec<Vec<[u16; 3]>> = (0..num_fs)
        .map(|s| {
            sampled
                .iter()
                .map(|&(_, keys)| {
                    let range = frames(s);
                    let count = range.clone().count() as f32;
                    let mean = keys[range].iter().copied().sum::<Vec3>() / count;
                    narrow(means.quantise(mean, U16_BITS))
                })
                .collect()
        })
        .collect();

    let qsets: Vec<QuantisationScaleAndOffset> = sampled
        .iter()
        .enumerate()
        .map(|(j, &(_, keys))| {
            let deltas = (0..num_fs).flat_map(|s| {
                let mean = means.decode(widen(section_means[s][j]));
                keys[frames(s)].iter().map(move |&p| p - mean)
            });
            let (lo, hi) = bounds(deltas);
            QuantisationScaleAndOffset::from_range(lo, hi, POS_KEY_BITS)
        })
        .collect();

    let keys = (0..num_fs)
        .map(|s| {
            sampled
                .iter()
                .enumerate()
                .map(|(j, &(_, keys))| {
                    let mean = means.decode(widen(section_means[s][j]));
                    keys[frames(s)]
                        .iter()
                        .map(|&p| pack_pos_key(qsets[j].quantise(p - mean, POS_KEY_BITS)))
                        .collect()
                })
                .collect()
        })
        .collect();

    EncodedPositions {
        means,
        qsets,
        section_means,
        keys,
    }
}

/// Encoded sampled rotations: `means[s][j]`, `keys[s][j][local frame]`
struct EncodedRotations {
    qsets: Vec<QuantisationScaleAndOffset>,
    section_means: Vec<Vec<[u16; 3]>>,
    keys: Vec<Vec<Vec<[u16; 3]>>>,
}

fn encode_rotations(sampled: &[(u16, &[Quat])], starts: &[u32]) -> EncodedRotations {
    let num_fs = starts.len() - 1;
    let frames = |s: usize| starts[s] as usize..=starts[s + 1] as usize;

    let section_means: Vec<Vec<[u16; 3]>> = (0..num_fs)
        .map(|s| {
            let mid = (starts[s] as usize + starts[s + 1] as usize) / 2;
            sampled
                .iter()
                .map(|&(_, keys)| encode_quat_mean(keys[mid]))
                .collect()
        })
        .collect();

    let deltas = |s: usize, j: usize, keys: &[Quat]| -> Vec<Vec3> {
        let mean_inv = decode_quat_mean(section_means[s][j]).inverse();
        keys[frames(s)]
            .iter()
            .map(|&q| quat_to_tqa(mean_inv * q))
            .collect()
    };

    let qsets: Vec<QuantisationScaleAndOffset> = sampled
        .iter()
        .enumerate()
        .map(|(j, &(_, keys))| {
            let (lo, hi) = bounds((0..num_fs).flat_map(|s| deltas(s, j, keys)));
            QuantisationScaleAndOffset::from_range(lo, hi, U16_BITS)
        })
        .collect();

    let keys = (0..num_fs)
        .map(|s| {
            sampled
                .iter()
                .enumerate()
                .map(|(j, &(_, keys))| {
                    deltas(s, j, keys)
                        .into_iter()
                        .map(|v| narrow(qsets[j].quantise(v, U16_BITS)))
                        .collect()
                })
                .collect()
        })
        .collect();

    EncodedRotations {
        qsets,
        section_means,
        keys,
    }
}

// ============================================================================
// Writer
// ============================================================================

struct Writer {
    buf: Vec<u8>,
    options: LocateOptions,
}

impl Writer {
    fn new(options: LocateOptions) -> Self {
        Self {
            buf: Vec::new(),
            options,
        }
    }

    /// Reserve zeroed, 4-aligned space
    fn alloc(&mut self, size: usize) -> usize {
        let at = (self.buf.len() + 3) & !3;
        self.buf.resize(at + size, 0);
        at
    }

    fn aligned_len(&self) -> usize {
        (self.buf.len() + 3) & !3
    }

    fn u32(&mut self, at: usize, value: u32) {
        self.options.byte_order.write_u32(&mut self.buf[at..], value);
    }

    fn u16(&mut self, at: usize, value: u16) {
        self.options.byte_order.write_u16(&mut self.buf[at..], value);
    }

    fn f32(&mut self, at: usize, value: f32) {
        self.u32(at, value.to_bits());
    }

    fn vec3(&mut self, at: usize, v: Vec3) {
        self.f32(at, v.x);
        self.f32(at + 4, v.y);
        self.f32(at + 8, v.z);
    }

    fn quantisation(&mut self, at: usize, q: &QuantisationScaleAndOffset) {
        self.vec3(at, q.scale);
        self.vec3(at + 12, q.offset);
    }

    /// Encode a pointer field; a zero target is written as null
    fn ptr(&mut self, owner: usize, field: usize, target: usize) {
        let raw = if target == 0 {
            0
        } else {
            match self.options.layout {
                LayoutVariant::Sectioned => (target as i64 - owner as i64) as i32 as u32,
                LayoutVariant::Flat => self.options.base_address.wrapping_add(target as u32),
            }
        };
        self.u32(field, raw);
    }

    fn u16_array(&mut self, values: &[u16]) -> usize {
        if values.is_empty() {
            return 0;
        }
        let at = self.alloc(2 * values.len());
        for (i, &v) in values.iter().enumerate() {
            self.u16(at + 2 * i, v);
        }
        at
    }

    fn u32_array(&mut self, values: &[u32]) -> usize {
        if values.is_empty() {
            return 0;
        }
        let at = self.alloc(4 * values.len());
        for (i, &v) in values.iter().enumerate() {
            self.u32(at + 4 * i, v);
        }
        at
    }

    fn channel_map(&mut self, channels: &[u16]) -> usize {
        let at = self.alloc(channel_map::ANIM_CHANNELS + 2 * channels.len());
        self.u32(at + channel_map::NUM_CHANNELS, channels.len() as u32);
        for (i, &c) in channels.iter().enumerate() {
            self.u16(at + channel_map::ANIM_CHANNELS + 2 * i, c);
        }
        at
    }

    fn qsets(&mut self, qsets: &[QuantisationScaleAndOffset]) -> usize {
        if qsets.is_empty() {
            return 0;
        }
        let at = self.alloc(QuantisationScaleAndOffset::SIZE * qsets.len());
        for (i, q) in qsets.iter().enumerate() {
            self.quantisation(at + QuantisationScaleAndOffset::SIZE * i, q);
        }
        at
    }

    fn unchanging(&mut self, positions: &[(u16, Vec3)], rotations: &[(u16, Quat)]) -> usize {
        let at = self.alloc(unchanging::SIZE);
        let (lo, hi) = bounds(positions.iter().map(|&(_, p)| p));
        let quantisation = QuantisationScaleAndOffset::from_range(lo, hi, U16_BITS);

        self.u32(at + unchanging::POS_NUM_CHANNELS, positions.len() as u32);
        self.u32(at + unchanging::QUAT_NUM_CHANNELS, rotations.len() as u32);
        self.quantisation(at + unchanging::POS_QUANTISATION, &quantisation);

        let codes: Vec<u16> = positions
            .iter()
            .flat_map(|&(_, p)| narrow(quantisation.quantise(p, U16_BITS)))
            .collect();
        let data = self.u16_array(&codes);
        self.ptr(at, at + unchanging::POS_DATA, data);

        let codes: Vec<u16> = rotations
            .iter()
            .flat_map(|&(_, q)| encode_quat_mean(q))
            .collect();
        let data = self.u16_array(&codes);
        self.ptr(at, at + unchanging::QUAT_DATA, data);
        at
    }

    /// Write one section block, returning its offset and size
    fn section(
        &mut self,
        s: usize,
        starts: &[u32],
        pos_channels: &[usize],
        quat_channels: &[usize],
        pos: &EncodedPositions,
        quat: &EncodedRotations,
    ) -> (usize, usize) {
        let at = self.alloc(block_field::SIZE);
        let num_frames = starts[s + 1] - starts[s] + 1;
        self.u32(at + block_field::START_FRAME, starts[s]);
        self.u32(at + block_field::NUM_FRAMES, num_frames);
        self.u32(at + block_field::NUM_POS_CHANNELS, pos_channels.len() as u32);
        self.u32(at + block_field::NUM_QUAT_CHANNELS, quat_channels.len() as u32);

        let info = |means: &[[u16; 3]], channels: &[usize]| -> Vec<u16> {
            channels
                .iter()
                .flat_map(|&j| {
                    let m = means[j];
                    [m[0], m[1], m[2], j as u16]
                })
                .collect()
        };
        let pos_info = self.u16_array(&info(&pos.section_means[s], pos_channels));
        self.ptr(at, at + block_field::POS_CHANNEL_INFO, pos_info);
        let quat_info = self.u16_array(&info(&quat.section_means[s], quat_channels));
        self.ptr(at, at + block_field::QUAT_CHANNEL_INFO, quat_info);

        let frames = 0..num_frames as usize;
        let pos_keys: Vec<u32> = frames
            .clone()
            .flat_map(|f| pos_channels.iter().map(move |&j| pos.keys[s][j][f]))
            .collect();
        let keys_at = self.u32_array(&pos_keys);
        self.ptr(at, at + block_field::POS_KEYS, keys_at);

        let quat_keys: Vec<u16> = frames
            .flat_map(|f| quat_channels.iter().flat_map(move |&j| quat.keys[s][j][f]))
            .collect();
        let keys_at = self.u16_array(&quat_keys);
        self.ptr(at, at + block_field::QUAT_KEYS, keys_at);

        (at, self.aligned_len() - at)
    }

    fn trajectory(&mut self, sample_frequency: f32, keys: &[(Vec3, Quat)]) -> usize {
        let at = self.alloc(trajectory::SIZE);
        let (lo, hi) = bounds(keys.iter().map(|&(p, _)| p));
        let pos_q = QuantisationScaleAndOffset::from_range(lo, hi, POS_KEY_BITS);
        let tqa: Vec<Vec3> = keys.iter().map(|&(_, q)| quat_to_tqa(q)).collect();
        let (lo, hi) = bounds(tqa.iter().copied());
        let quat_q = QuantisationScaleAndOffset::from_range(lo, hi, U16_BITS);

        self.u32(at + trajectory::TYPE_TAG, TRAJECTORY_NSA);
        self.u32(at + trajectory::NUM_FRAMES, keys.len() as u32);
        self.f32(at + trajectory::SAMPLE_FREQUENCY, sample_frequency);
        self.quantisation(at + trajectory::POS_QUANTISATION, &pos_q);
        self.quantisation(at + trajectory::QUAT_QUANTISATION, &quat_q);

        let pos_keys: Vec<u32> = keys
            .iter()
            .map(|&(p, _)| pack_pos_key(pos_q.quantise(p, POS_KEY_BITS)))
            .collect();
        let keys_at = self.u32_array(&pos_keys);
        self.ptr(at, at + trajectory::POS_KEYS, keys_at);

        let quat_keys: Vec<u16> = tqa
            .iter()
            .flat_map(|&v| narrow(quat_q.quantise(v, U16_BITS)))
            .collect();
        let keys_at = self.u16_array(&quat_keys);
        self.ptr(at, at + trajectory::QUAT_KEYS, keys_at);
        at
    }

    fn name_table(&mut self, names: &[String]) -> usize {
        let at = self.alloc(name_table::SIZE);
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(names.len());
        for name in names {
            offsets.push(data.len() as u32);
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }

        self.u32(at + name_table::NUM_ENTRIES, names.len() as u32);
        self.u32(at + name_table::DATA_LENGTH, data.len() as u32);
        let offsets_at = self.u32_array(&offsets);
        self.ptr(at, at + name_table::OFFSETS, offsets_at);

        let data_at = if data.is_empty() {
            0
        } else {
            let data_at = self.alloc(data.len());
            self.buf[data_at..data_at + data.len()].copy_from_slice(&data);
            data_at
        };
        self.ptr(at, at + name_table::DATA, data_at);
        at
    }
}

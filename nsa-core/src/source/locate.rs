//! Locate routine for the NSA animation graph
//!
//! Each structure is handled pre-order: its scalar fields are swapped first,
//! then its pointer fields are rebased, then the structures they reference are
//! located, and flat trailing arrays are swapped last.

use crate::error::{NsaError, Result};
use crate::fixup::{Fixup, LayoutVariant, read_u16, read_u16x3, read_u32};
use crate::layout::{channel_map, header, name_table, section as block_field, unchanging};
use crate::quantisation::{QuantisationScaleAndOffset, decode_quat_mean, widen};
use crate::registry::{ANIM_NSA, Located};
use crate::section::{SampledChannelInfo, SectionBlock, SectionIndex};
use crate::trajectory::TrajectoryLayout;

use super::types::{ChannelMap, ChannelNameTable, ChannelSlot, ChannelSlots, NsaLayout, UnchangingData};

fn unsupported(msg: impl Into<String>) -> NsaError {
    NsaError::UnsupportedLayoutVariant(msg.into())
}

/// Product of element counts, rejecting overflow
fn elements(counts: &[usize]) -> Result<usize> {
    counts.iter().try_fold(1usize, |acc, &n| {
        acc.checked_mul(n)
            .ok_or_else(|| NsaError::corrupt(format!("element count overflows at {}", n)))
    })
}

fn read_u32s(fx: &Fixup<'_>, at: usize, count: usize) -> Vec<u32> {
    (0..count).map(|i| read_u32(fx.bytes(), at + 4 * i)).collect()
}

pub(crate) fn locate_anim_nsa(fx: &mut Fixup<'_>, at: usize) -> Result<Located> {
    fx.require(at, header::SIZE, "animation header")?;
    fx.claim(at, "animation header")?;
    let variant = fx.options().layout;
    reject_other_generation(fx, at, variant)?;

    // Scalars
    let duration = fx.swap_f32(at + header::DURATION)?;
    let sample_frequency = fx.swap_f32(at + header::SAMPLE_FREQUENCY)?;
    let num_channel_sets = fx.swap_u32(at + header::NUM_CHANNEL_SETS)?;
    let max_of_channel_num = fx.swap_u32(at + header::MAX_OF_CHANNEL_NUM)?;
    let max_num_comp_channels = fx.swap_u32(at + header::MAX_NUM_COMP_CHANNELS)?;
    let pos_means = fx.swap_quantisation(at + header::POS_MEANS_QUANTISATION)?;
    let num_pos_qsets = fx.swap_u32(at + header::SAMPLED_POS_NUM_QSETS)? as usize;
    let num_quat_qsets = fx.swap_u32(at + header::SAMPLED_QUAT_NUM_QSETS)? as usize;
    let max_section_size = fx.swap_u32(at + header::MAX_SECTION_SIZE)?;
    let num_channel_sections = fx.swap_u32(at + header::NUM_CHANNEL_SECTIONS)? as usize;
    let num_frame_sections = fx.swap_u32(at + header::NUM_FRAME_SECTIONS)? as usize;
    let flags = fx.swap_u32(at + header::FLAGS)?;

    for reserved in header::RESERVED {
        if fx.swap_u32(at + reserved)? != 0 {
            return Err(unsupported(format!(
                "reserved header word at {:#x} is non-zero",
                reserved
            )));
        }
    }
    if flags & !header::FLAG_CYCLIC != 0 {
        return Err(unsupported(format!("unknown header flags {:#x}", flags)));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(NsaError::corrupt(format!("duration {}", duration)));
    }
    if !sample_frequency.is_finite() || sample_frequency <= 0.0 {
        return Err(NsaError::corrupt(format!("sample frequency {}", sample_frequency)));
    }
    if num_channel_sets > u16::MAX as u32 + 1 {
        return Err(NsaError::corrupt(format!(
            "{} channel sets cannot be indexed by 16-bit channel maps",
            num_channel_sets
        )));
    }

    // Pointers
    let unchanging_quat_map_at = fx.pointer(at, at + header::UNCHANGING_QUAT_MAP)?;
    let unchanging_pos_map_at = fx.pointer(at, at + header::UNCHANGING_POS_MAP)?;
    let sampled_pos_map_at = fx.pointer(at, at + header::SAMPLED_POS_MAP)?;
    let sampled_quat_map_at = fx.pointer(at, at + header::SAMPLED_QUAT_MAP)?;
    let reserved_map_at = fx.pointer(at, at + header::RESERVED_MAP)?;
    let pos_qsets_at = fx.array_pointer(
        at,
        at + header::SAMPLED_POS_QINFO,
        num_pos_qsets,
        QuantisationScaleAndOffset::SIZE,
        "sampled position quantisation sets",
    )?;
    let quat_qsets_at = fx.array_pointer(
        at,
        at + header::SAMPLED_QUAT_QINFO,
        num_quat_qsets,
        QuantisationScaleAndOffset::SIZE,
        "sampled rotation quantisation sets",
    )?;
    let unchanging_at = fx.pointer(at, at + header::UNCHANGING_DATA)?;
    let names_at = fx.pointer(at, at + header::CHANNEL_NAMES)?;

    let sections_at = match variant {
        LayoutVariant::Sectioned => {
            SectionPointers::rebase(fx, at, num_frame_sections, num_channel_sections)?
        }
        LayoutVariant::Flat => SectionPointers::Flat {
            block: fx.pointer(at, at + header::FLAT_SECTION_DATA)?,
            trajectory: fx.pointer(at, at + header::FLAT_TRAJECTORY)?,
        },
    };

    // Children
    let unchanging_quat_map = locate_channel_map(fx, unchanging_quat_map_at)?;
    let mut unchanging_pos_map = locate_channel_map(fx, unchanging_pos_map_at)?;
    let sampled_pos_map = locate_channel_map(fx, sampled_pos_map_at)?;
    let sampled_quat_map = locate_channel_map(fx, sampled_quat_map_at)?;
    if !locate_channel_map(fx, reserved_map_at)?.is_empty() {
        return Err(unsupported("reserved channel map is not empty"));
    }

    let sampled_pos_qsets = locate_qsets(fx, pos_qsets_at, num_pos_qsets)?;
    let sampled_quat_qsets = locate_qsets(fx, quat_qsets_at, num_quat_qsets)?;

    let unchanging = match unchanging_at {
        Some(p) => locate_unchanging(fx, p)?,
        None => UnchangingData::default(),
    };

    let (sections, sampled_pos_maps, sampled_quat_maps, trajectory) = match sections_at {
        SectionPointers::Sectioned {
            grid,
            sizes,
            start_frames,
            pos_maps,
            quat_maps,
            trajectory,
        } => {
            fx.swap_u32_array(start_frames, num_frame_sections + 1)?;
            let start_frames = read_u32s(fx, start_frames, num_frame_sections + 1);
            fx.swap_u32_array(sizes, grid.len())?;
            let sizes = read_u32s(fx, sizes, grid.len());

            let mut blocks = Vec::with_capacity(grid.len());
            for (&block_at, &size) in grid.iter().zip(&sizes) {
                blocks.push(locate_section(fx, block_at, Some(size as usize))?);
            }
            let pos_maps = pos_maps
                .into_iter()
                .map(|p| locate_channel_map(fx, p))
                .collect::<Result<Vec<_>>>()?;
            let quat_maps = quat_maps
                .into_iter()
                .map(|p| locate_channel_map(fx, p))
                .collect::<Result<Vec<_>>>()?;
            let trajectory = locate_trajectory(fx, trajectory)?;

            let sections = SectionIndex::new(start_frames, num_channel_sections, blocks)?;
            (sections, pos_maps, quat_maps, trajectory)
        }
        SectionPointers::Flat { block, trajectory } => {
            let block_at = block.ok_or_else(|| NsaError::corrupt("flat layout has no section data"))?;
            let block = locate_section(fx, block_at, None)?;
            let last_frame = block
                .start_frame
                .checked_add(block.num_frames)
                .and_then(|end| end.checked_sub(1))
                .ok_or_else(|| NsaError::corrupt("section data has no frames"))?;
            let trajectory = locate_trajectory(fx, trajectory)?;

            let sections = SectionIndex::new(vec![block.start_frame, last_frame], 1, vec![block])?;
            (
                sections,
                vec![sampled_pos_map.clone()],
                vec![sampled_quat_map.clone()],
                trajectory,
            )
        }
    };

    let channel_names = match names_at {
        Some(p) => Some(locate_name_table(fx, p)?),
        None => None,
    };

    // The flat generation stores the unchanging position map empty
    if variant == LayoutVariant::Flat {
        if !unchanging_pos_map.is_empty() {
            return Err(unsupported("flat layout stores an unchanging position map"));
        }
        unchanging_pos_map = complement(&sampled_pos_map, num_channel_sets)?;
    }

    // Cross-structure checks
    if unchanging.positions.len() != unchanging_pos_map.len() {
        return Err(NsaError::corrupt(format!(
            "{} unchanging positions for {} mapped channels",
            unchanging.positions.len(),
            unchanging_pos_map.len()
        )));
    }
    if unchanging.rotations.len() != unchanging_quat_map.len() {
        return Err(NsaError::corrupt(format!(
            "{} unchanging rotations for {} mapped channels",
            unchanging.rotations.len(),
            unchanging_quat_map.len()
        )));
    }
    if sampled_pos_maps.len() != sections.num_channel_sections()
        || sampled_quat_maps.len() != sections.num_channel_sections()
    {
        return Err(NsaError::corrupt("channel section maps do not match the section grid"));
    }
    check_blocks(
        &sections,
        &sampled_pos_maps,
        &sampled_quat_maps,
        sampled_pos_qsets.len(),
        sampled_quat_qsets.len(),
    )?;

    let n = num_channel_sets as usize;
    let pos_slots = build_slots(n, &unchanging_pos_map, &sampled_pos_map, &sampled_pos_maps, "position")?;
    let quat_slots = build_slots(n, &unchanging_quat_map, &sampled_quat_map, &sampled_quat_maps, "rotation")?;
    let slots = pos_slots
        .into_iter()
        .zip(quat_slots)
        .map(|(pos, quat)| ChannelSlots { pos, quat })
        .collect();

    let layout = NsaLayout {
        layout: variant,
        duration,
        sample_frequency,
        num_channel_sets,
        max_of_channel_num,
        max_num_comp_channels,
        flags,
        pos_means,
        unchanging_pos_map,
        unchanging_quat_map,
        sampled_pos_map,
        sampled_quat_map,
        sampled_pos_maps,
        sampled_quat_maps,
        sampled_pos_qsets,
        sampled_quat_qsets,
        unchanging,
        sections,
        max_section_size,
        trajectory,
        channel_names,
        slots,
    };
    report_diagnostics(&layout);

    Ok(Located::AnimNsa(Box::new(layout)))
}

/// Fields the other generation populates must be zero
fn reject_other_generation(fx: &Fixup<'_>, at: usize, variant: LayoutVariant) -> Result<()> {
    let foreign: &[usize] = match variant {
        LayoutVariant::Sectioned => &header::FLAT_ONLY,
        LayoutVariant::Flat => &header::SECTIONED_ONLY,
    };
    for &field in foreign {
        if fx.peek_u32(at + field)? != 0 {
            return Err(unsupported(format!(
                "{:?} layout has header field {:#x} populated",
                variant, field
            )));
        }
    }
    Ok(())
}

/// Rebased pointer fields describing where sampled data lives
enum SectionPointers {
    Sectioned {
        grid: Vec<usize>,
        sizes: usize,
        start_frames: usize,
        pos_maps: Vec<Option<usize>>,
        quat_maps: Vec<Option<usize>>,
        trajectory: Option<usize>,
    },
    Flat {
        block: Option<usize>,
        trajectory: Option<usize>,
    },
}

impl SectionPointers {
    fn rebase(
        fx: &mut Fixup<'_>,
        at: usize,
        num_frame_sections: usize,
        num_channel_sections: usize,
    ) -> Result<Self> {
        if num_frame_sections == 0 || num_channel_sections == 0 {
            return Err(NsaError::corrupt(format!(
                "section grid is {} x {}",
                num_frame_sections, num_channel_sections
            )));
        }
        let cells = elements(&[num_frame_sections, num_channel_sections])?;

        let grid_at = fx.array_pointer(at, at + header::SECTION_GRID, cells, 4, "section grid")?;
        let sizes = fx.array_pointer(at, at + header::SECTION_SIZES, cells, 4, "section sizes")?;
        let start_frames = fx.array_pointer(
            at,
            at + header::SECTION_START_FRAMES,
            num_frame_sections + 1,
            4,
            "section start frames",
        )?;
        let pos_maps_at = fx.array_pointer(
            at,
            at + header::SAMPLED_POS_MAPS,
            num_channel_sections,
            4,
            "sampled position map table",
        )?;
        let quat_maps_at = fx.array_pointer(
            at,
            at + header::SAMPLED_QUAT_MAPS,
            num_channel_sections,
            4,
            "sampled rotation map table",
        )?;
        let trajectory = fx.pointer(at, at + header::TRAJECTORY)?;

        // Pointer table elements are relative to the root header
        let mut grid = Vec::with_capacity(cells);
        for i in 0..cells {
            let block = fx.pointer(at, grid_at + 4 * i)?;
            grid.push(block.ok_or_else(|| NsaError::corrupt(format!("section block {} is null", i)))?);
        }
        let pos_maps = (0..num_channel_sections)
            .map(|i| fx.pointer(at, pos_maps_at + 4 * i))
            .collect::<Result<Vec<_>>>()?;
        let quat_maps = (0..num_channel_sections)
            .map(|i| fx.pointer(at, quat_maps_at + 4 * i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::Sectioned {
            grid,
            sizes,
            start_frames,
            pos_maps,
            quat_maps,
            trajectory,
        })
    }
}

// ============================================================================
// Sub-structures
// ============================================================================

/// A null map is an empty map
fn locate_channel_map(fx: &mut Fixup<'_>, at: Option<usize>) -> Result<ChannelMap> {
    let Some(at) = at else {
        return Ok(ChannelMap::default());
    };
    fx.claim(at, "channel map")?;
    let num_channels = fx.swap_u32(at + channel_map::NUM_CHANNELS)? as usize;
    let channels_at = at + channel_map::ANIM_CHANNELS;
    fx.swap_u16_array(channels_at, num_channels)?;
    let channels = (0..num_channels)
        .map(|i| read_u16(fx.bytes(), channels_at + 2 * i))
        .collect();
    Ok(ChannelMap::new(channels))
}

fn locate_qsets(
    fx: &mut Fixup<'_>,
    at: usize,
    count: usize,
) -> Result<Vec<QuantisationScaleAndOffset>> {
    (0..count)
        .map(|i| fx.swap_quantisation(at + i * QuantisationScaleAndOffset::SIZE))
        .collect()
}

fn locate_unchanging(fx: &mut Fixup<'_>, at: usize) -> Result<UnchangingData> {
    fx.require(at, unchanging::SIZE, "unchanging data")?;
    fx.claim(at, "unchanging data")?;

    let pos_n = fx.swap_u32(at + unchanging::POS_NUM_CHANNELS)? as usize;
    let quat_n = fx.swap_u32(at + unchanging::QUAT_NUM_CHANNELS)? as usize;
    let pos_quantisation = fx.swap_quantisation(at + unchanging::POS_QUANTISATION)?;
    for i in 0..unchanging::NUM_RESERVED {
        if fx.swap_u32(at + unchanging::RESERVED + 4 * i)? != 0 {
            return Err(unsupported("reserved unchanging data word is non-zero"));
        }
    }

    let pos_data = fx.array_pointer(at, at + unchanging::POS_DATA, elements(&[pos_n, 3])?, 2, "unchanging positions")?;
    let quat_data = fx.array_pointer(at, at + unchanging::QUAT_DATA, elements(&[quat_n, 3])?, 2, "unchanging rotations")?;
    fx.swap_u16_array(pos_data, pos_n * 3)?;
    fx.swap_u16_array(quat_data, quat_n * 3)?;

    let bytes = fx.bytes();
    let positions = (0..pos_n)
        .map(|i| pos_quantisation.decode(widen(read_u16x3(bytes, pos_data + 6 * i))))
        .collect();
    let rotations = (0..quat_n)
        .map(|i| decode_quat_mean(read_u16x3(bytes, quat_data + 6 * i)))
        .collect();

    Ok(UnchangingData {
        pos_quantisation: Some(pos_quantisation),
        positions,
        rotations,
    })
}

/// Locate one section block; `size` is the recorded size, if the layout has one
fn locate_section(fx: &mut Fixup<'_>, at: usize, size: Option<usize>) -> Result<SectionBlock> {
    fx.require(at, block_field::SIZE, "section data")?;
    fx.claim(at, "section data")?;

    let start_frame = fx.swap_u32(at + block_field::START_FRAME)?;
    let num_frames = fx.swap_u32(at + block_field::NUM_FRAMES)?;
    let num_pos = fx.swap_u32(at + block_field::NUM_POS_CHANNELS)? as usize;
    let num_quat = fx.swap_u32(at + block_field::NUM_QUAT_CHANNELS)? as usize;
    let frames = num_frames as usize;

    let info_words = block_field::CHANNEL_INFO_WORDS;
    let pos_info_len = elements(&[num_pos, info_words])?;
    let quat_info_len = elements(&[num_quat, info_words])?;
    let pos_keys_len = elements(&[frames, num_pos])?;
    let quat_keys_len = elements(&[frames, num_quat, 3])?;

    let pos_info = fx.array_pointer(at, at + block_field::POS_CHANNEL_INFO, pos_info_len, 2, "position channel info")?;
    let quat_info = fx.array_pointer(at, at + block_field::QUAT_CHANNEL_INFO, quat_info_len, 2, "rotation channel info")?;
    let pos_keys = fx.array_pointer(at, at + block_field::POS_KEYS, pos_keys_len, 4, "position keys")?;
    let quat_keys = fx.array_pointer(at, at + block_field::QUAT_KEYS, quat_keys_len, 2, "rotation keys")?;

    let spans = [
        (block_field::SIZE, at, block_field::SIZE),
        (pos_info_len, pos_info, pos_info_len * 2),
        (quat_info_len, quat_info, quat_info_len * 2),
        (pos_keys_len, pos_keys, pos_keys_len * 4),
        (quat_keys_len, quat_keys, quat_keys_len * 2),
    ];
    let size = match size {
        Some(size) => {
            for &(count, start, len) in &spans {
                if count > 0 && (start < at || start + len > at + size) {
                    return Err(NsaError::corrupt(format!(
                        "section data at {:#x} reaches past its recorded size of {} bytes",
                        at, size
                    )));
                }
            }
            size
        }
        None => spans
            .iter()
            .filter(|&&(count, ..)| count > 0)
            .map(|&(_, start, len)| (start + len).saturating_sub(at))
            .max()
            .unwrap_or(block_field::SIZE),
    };

    fx.swap_u16_array(pos_info, pos_info_len)?;
    fx.swap_u16_array(quat_info, quat_info_len)?;
    fx.swap_u32_array(pos_keys, pos_keys_len)?;
    fx.swap_u16_array(quat_keys, quat_keys_len)?;

    let bytes = fx.bytes();
    let read_info = |base: usize, i: usize| {
        let at = base + 2 * info_words * i;
        SampledChannelInfo {
            mean: read_u16x3(bytes, at),
            qset: read_u16(bytes, at + 6),
        }
    };
    let pos_channels = (0..num_pos).map(|i| read_info(pos_info, i)).collect();
    let quat_channels = (0..num_quat).map(|i| read_info(quat_info, i)).collect();

    Ok(SectionBlock {
        offset: at,
        size,
        start_frame,
        num_frames,
        pos_channels,
        quat_channels,
        pos_keys,
        quat_keys,
    })
}

/// Nested trajectory, dispatched on its type tag
///
/// Only trajectory types may sit in this slot. Anything else registered is
/// rejected before its locate routine runs.
fn locate_trajectory(fx: &mut Fixup<'_>, at: Option<usize>) -> Result<Option<TrajectoryLayout>> {
    let Some(at) = at else {
        return Ok(None);
    };
    if fx.peek_u32(at)? == ANIM_NSA {
        return Err(NsaError::UnexpectedType {
            expected: "NSA trajectory",
            found: "NSA animation",
        });
    }
    let registry = fx.registry();
    match registry.locate_nested(fx, at)? {
        Located::TrajectoryNsa(trajectory) => Ok(Some(trajectory)),
        other => Err(NsaError::UnexpectedType {
            expected: "NSA trajectory",
            found: other.kind(),
        }),
    }
}

fn locate_name_table(fx: &mut Fixup<'_>, at: usize) -> Result<ChannelNameTable> {
    fx.require(at, name_table::SIZE, "channel name table")?;
    fx.claim(at, "channel name table")?;

    let num_entries = fx.swap_u32(at + name_table::NUM_ENTRIES)? as usize;
    let data_length = fx.swap_u32(at + name_table::DATA_LENGTH)? as usize;
    let offsets = fx.array_pointer(at, at + name_table::OFFSETS, num_entries, 4, "name offsets")?;
    let data = fx.array_pointer(at, at + name_table::DATA, data_length, 1, "name data")?;
    fx.swap_u32_array(offsets, num_entries)?;

    let bytes = fx.bytes();
    let mut names = Vec::with_capacity(num_entries);
    for i in 0..num_entries {
        let offset = read_u32(bytes, offsets + 4 * i) as usize;
        if offset >= data_length {
            return Err(NsaError::corrupt(format!(
                "name {} starts at {} past {} bytes of name data",
                i, offset, data_length
            )));
        }
        let tail = &bytes[data + offset..data + data_length];
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| NsaError::corrupt(format!("name {} is not terminated", i)))?;
        let name = std::str::from_utf8(&tail[..end])
            .map_err(|e| NsaError::corrupt(format!("name {} is not UTF-8: {}", i, e)))?;
        names.push(name.to_owned());
    }
    Ok(ChannelNameTable::new(names))
}

// ============================================================================
// Validation
// ============================================================================

/// Channel sets missing from the sampled map, ascending
fn complement(sampled: &ChannelMap, num_channel_sets: u32) -> Result<ChannelMap> {
    let mut is_sampled = vec![false; num_channel_sets as usize];
    for channel in sampled.iter() {
        let slot = is_sampled.get_mut(channel as usize).ok_or_else(|| {
            NsaError::corrupt(format!(
                "position channel {} >= {} channel sets",
                channel, num_channel_sets
            ))
        })?;
        *slot = true;
    }
    Ok(ChannelMap::new(
        (0..num_channel_sets)
            .filter(|&c| !is_sampled[c as usize])
            .map(|c| c as u16)
            .collect(),
    ))
}

fn check_blocks(
    sections: &SectionIndex,
    pos_maps: &[ChannelMap],
    quat_maps: &[ChannelMap],
    num_pos_qsets: usize,
    num_quat_qsets: usize,
) -> Result<()> {
    let num_channel_sections = sections.num_channel_sections();
    for (i, block) in sections.blocks().iter().enumerate() {
        let cs = i % num_channel_sections;
        if block.num_pos_channels() != pos_maps[cs].len()
            || block.num_quat_channels() != quat_maps[cs].len()
        {
            return Err(NsaError::corrupt(format!(
                "section block {} holds {}/{} channels, channel section {} maps {}/{}",
                i,
                block.num_pos_channels(),
                block.num_quat_channels(),
                cs,
                pos_maps[cs].len(),
                quat_maps[cs].len()
            )));
        }
        let bad_qset = block
            .pos_channels
            .iter()
            .any(|info| info.qset as usize >= num_pos_qsets)
            || block
                .quat_channels
                .iter()
                .any(|info| info.qset as usize >= num_quat_qsets);
        if bad_qset {
            return Err(NsaError::corrupt(format!(
                "section block {} references a missing quantisation set",
                i
            )));
        }
    }
    Ok(())
}

/// Assign every channel set exactly one storage slot for one component
fn build_slots(
    num_channel_sets: usize,
    unchanging: &ChannelMap,
    sampled: &ChannelMap,
    section_maps: &[ChannelMap],
    component: &str,
) -> Result<Vec<ChannelSlot>> {
    let mut slots: Vec<Option<ChannelSlot>> = vec![None; num_channel_sets];
    let mut assign = |channel: u16, slot: ChannelSlot| -> Result<()> {
        let entry = slots.get_mut(channel as usize).ok_or_else(|| {
            NsaError::corrupt(format!(
                "{} channel {} >= {} channel sets",
                component, channel, num_channel_sets
            ))
        })?;
        if entry.replace(slot).is_some() {
            return Err(NsaError::corrupt(format!(
                "{} channel {} is mapped twice",
                component, channel
            )));
        }
        Ok(())
    };

    for (i, channel) in unchanging.iter().enumerate() {
        assign(channel, ChannelSlot::Unchanging(i as u32))?;
    }
    for (cs, map) in section_maps.iter().enumerate() {
        for (i, channel) in map.iter().enumerate() {
            assign(
                channel,
                ChannelSlot::Sampled {
                    channel_section: cs as u32,
                    index: i as u32,
                },
            )?;
        }
    }

    let in_sections: usize = section_maps.iter().map(ChannelMap::len).sum();
    let partitioned = in_sections == sampled.len()
        && section_maps
            .iter()
            .flat_map(ChannelMap::iter)
            .all(|channel| sampled.contains(channel));
    if !partitioned {
        return Err(NsaError::corrupt(format!(
            "channel sections do not partition the sampled {} map",
            component
        )));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(channel, slot)| {
            slot.ok_or_else(|| {
                NsaError::corrupt(format!(
                    "{} channel {} is neither unchanging nor sampled",
                    component, channel
                ))
            })
        })
        .collect()
}

fn report_diagnostics(layout: &NsaLayout) {
    let largest_map = [
        &layout.unchanging_pos_map,
        &layout.unchanging_quat_map,
        &layout.sampled_pos_map,
        &layout.sampled_quat_map,
    ]
    .iter()
    .map(|m| m.len())
    .max()
    .unwrap_or(0);
    if layout.max_of_channel_num as usize != largest_map {
        tracing::warn!(
            "max_of_channel_num is {} but the largest channel map has {} entries",
            layout.max_of_channel_num,
            largest_map
        );
    }

    let expected_last = (layout.duration * layout.sample_frequency).round();
    let sentinel = layout.sections.sentinel();
    if expected_last != sentinel as f32 {
        tracing::warn!(
            "duration {}s at {}Hz implies last frame {}, sections end at frame {}",
            layout.duration,
            layout.sample_frequency,
            expected_last,
            sentinel
        );
    }

    if let Some(block) = layout
        .sections
        .blocks()
        .iter()
        .find(|b| b.size > layout.max_section_size as usize)
    {
        tracing::warn!(
            "max_section_size is {} but section data at {:#x} is {} bytes",
            layout.max_section_size,
            block.offset,
            block.size
        );
    }
}

//! Tests for locating NSA animations in both layout generations

use glam::{Quat, Vec3};

use super::*;
use crate::fixture::{NsaBuilder, PosTrack, QuatTrack, patch_u32, ramp, raw_u32, spin};
use crate::fixup::{Endianness, LocateOptions, LocationState};
use crate::layout::header;
use crate::registry::{ANIM_NSA, TypeRegistry};

const FRAMES: u32 = 31;
const POS_TOLERANCE: f32 = 1e-2;
const QUAT_TOLERANCE: f32 = 1e-4;

fn all_options() -> [LocateOptions; 4] {
    [
        LocateOptions::new(LayoutVariant::Sectioned, Endianness::Little),
        LocateOptions::new(LayoutVariant::Sectioned, Endianness::Big),
        LocateOptions::new(LayoutVariant::Flat, Endianness::Little).with_base_address(0x1000_0000),
        LocateOptions::new(LayoutVariant::Flat, Endianness::Big).with_base_address(0x0040_0000),
    ]
}

fn sectioned_le() -> LocateOptions {
    LocateOptions::new(LayoutVariant::Sectioned, Endianness::Little)
}

fn source_tracks() -> Vec<(PosTrack, QuatTrack)> {
    vec![
        (
            PosTrack::Constant(Vec3::new(1.0, 2.0, 3.0)),
            QuatTrack::Constant(Quat::from_rotation_y(0.5)),
        ),
        (
            PosTrack::Sampled(ramp(FRAMES, Vec3::ZERO, Vec3::new(3.0, -1.0, 2.0))),
            QuatTrack::Sampled(spin(FRAMES, Vec3::Z, 0.0, 1.5)),
        ),
        (
            PosTrack::Sampled(ramp(FRAMES, Vec3::new(-1.0, 0.5, 0.0), Vec3::new(-2.0, 0.5, 1.0))),
            QuatTrack::Constant(Quat::from_rotation_x(-0.3)),
        ),
        (
            PosTrack::Constant(Vec3::new(0.0, 0.25, -4.0)),
            QuatTrack::Sampled(spin(FRAMES, Vec3::Y, -0.5, 0.75)),
        ),
    ]
}

fn sample_clip() -> NsaBuilder {
    let keys = (0..10)
        .map(|i| (Vec3::new(i as f32 * 0.1, 0.0, 0.0), Quat::from_rotation_y(i as f32 * 0.05)))
        .collect();
    source_tracks()
        .into_iter()
        .fold(NsaBuilder::new(1.0, 30.0, FRAMES), |b, (pos, quat)| b.channel(pos, quat))
        .frame_sections(&[0, 10, 20])
        .channel_sections(2)
        .names(&["root", "spine", "head", "tail"])
        .trajectory(30.0, keys)
}

fn locate(builder: &NsaBuilder, options: &LocateOptions) -> Result<NsaAnimation> {
    let mut buffer = builder.build_buffer(options);
    TypeRegistry::new().locate(&mut buffer, ANIM_NSA, options)?;
    NsaAnimation::from_buffer(buffer)
}

fn locate_bytes(bytes: Vec<u8>, options: &LocateOptions) -> Result<NsaAnimation> {
    let mut buffer = AssetBuffer::new(bytes);
    TypeRegistry::new().locate(&mut buffer, ANIM_NSA, options)?;
    NsaAnimation::from_buffer(buffer)
}

fn assert_quat_close(actual: Quat, expected: Quat, context: &str) {
    assert!(
        actual.dot(expected).abs() > 1.0 - QUAT_TOLERANCE,
        "{}: {:?} != {:?}",
        context,
        actual,
        expected
    );
}

// ============================================================================
// Header And Maps
// ============================================================================

#[test]
fn test_locate_reads_header_in_every_layout() {
    for options in all_options() {
        let anim = locate(&sample_clip(), &options).unwrap();
        assert_eq!(anim.layout_variant(), options.layout);
        assert_eq!(anim.duration(), 1.0);
        assert_eq!(anim.sample_frequency(), 30.0);
        assert_eq!(anim.num_channel_sets(), 4);
        assert_eq!(anim.num_frames(), FRAMES);
        assert!(!anim.is_cyclic());

        match options.layout {
            LayoutVariant::Sectioned => {
                assert_eq!(anim.num_frame_sections(), 3);
                assert_eq!(anim.num_channel_sections(), 2);
                assert_eq!(anim.layout().sections.start_frames(), &[0, 10, 20, 30]);
            }
            LayoutVariant::Flat => {
                assert_eq!(anim.num_frame_sections(), 1);
                assert_eq!(anim.num_channel_sections(), 1);
            }
        }
    }
}

#[test]
fn test_channel_maps_partition_channel_sets() {
    for options in all_options() {
        let anim = locate(&sample_clip(), &options).unwrap();
        for c in 0..4u16 {
            assert!(
                anim.unchanging_pos_map().contains(c) != anim.sampled_pos_map().contains(c),
                "position channel {} must be in exactly one map ({:?})",
                c,
                options
            );
            assert!(
                anim.unchanging_quat_map().contains(c) != anim.sampled_quat_map().contains(c),
                "rotation channel {} must be in exactly one map ({:?})",
                c,
                options
            );
        }
        assert_eq!(anim.unchanging_pos_map().as_slice(), &[0, 3]);
        assert_eq!(anim.sampled_pos_map().as_slice(), &[1, 2]);
        assert_eq!(anim.unchanging_quat_map().as_slice(), &[0, 2]);
        assert_eq!(anim.sampled_quat_map().as_slice(), &[1, 3]);
    }
}

#[test]
fn test_channel_sections_partition_sampled_maps() {
    let anim = locate(&sample_clip(), &sectioned_le()).unwrap();
    let layout = anim.layout();

    let mut pos: Vec<u16> = layout.sampled_pos_maps.iter().flat_map(|m| m.iter()).collect();
    pos.sort_unstable();
    assert_eq!(pos, anim.sampled_pos_map().as_slice());

    for block in layout.sections.blocks() {
        assert!(block.num_pos_channels() <= 1);
        assert!(block.num_quat_channels() <= 1);
    }
}

#[test]
fn test_flat_layout_derives_unchanging_position_map() {
    let options = LocateOptions::new(LayoutVariant::Flat, Endianness::Little);
    let bytes = sample_clip().build(&options);

    // Stored as an empty map
    let map_at = raw_u32(&bytes, header::UNCHANGING_POS_MAP, Endianness::Little) as usize;
    assert_eq!(raw_u32(&bytes, map_at, Endianness::Little), 0);

    let anim = locate_bytes(bytes, &options).unwrap();
    assert_eq!(anim.unchanging_pos_map().as_slice(), &[0, 3]);
}

// ============================================================================
// Decoded Values
// ============================================================================

#[test]
fn test_stored_frames_decode_to_source_values() {
    let tracks = source_tracks();
    for options in all_options() {
        let anim = locate(&sample_clip(), &options).unwrap();
        for frame in [0, 5, 9, 10, 11, 19, 20, 29, 30] {
            let pose = anim.compute_at_frame(frame).unwrap();
            assert_eq!(pose.len(), 4);

            for (c, (pos, quat)) in tracks.iter().enumerate() {
                let expected_pos = match pos {
                    PosTrack::Constant(p) => *p,
                    PosTrack::Sampled(keys) => keys[frame as usize],
                };
                let expected_quat = match quat {
                    QuatTrack::Constant(q) => *q,
                    QuatTrack::Sampled(keys) => keys[frame as usize],
                };
                assert!(
                    pose[c].position.abs_diff_eq(expected_pos, POS_TOLERANCE),
                    "channel {} frame {} ({:?}): {:?} != {:?}",
                    c,
                    frame,
                    options,
                    pose[c].position,
                    expected_pos
                );
                assert_quat_close(
                    pose[c].rotation,
                    expected_quat,
                    &format!("channel {} frame {} ({:?})", c, frame, options),
                );
            }
        }
    }
}

#[test]
fn test_byte_orders_decode_identically() {
    for layout in [LayoutVariant::Sectioned, LayoutVariant::Flat] {
        let little = locate(&sample_clip(), &LocateOptions::new(layout, Endianness::Little)).unwrap();
        let big = locate(&sample_clip(), &LocateOptions::new(layout, Endianness::Big)).unwrap();

        for frame in 0..FRAMES {
            let a: Vec<_> = little.compute_at_frame(frame).unwrap().iter().map(|t| t.to_array()).collect();
            let b: Vec<_> = big.compute_at_frame(frame).unwrap().iter().map(|t| t.to_array()).collect();
            assert_eq!(a, b, "frame {} differs between byte orders ({:?})", frame, layout);
        }
    }
}

#[test]
fn test_located_bytes_are_native_order() {
    let little = locate(&sample_clip(), &sectioned_le()).unwrap();
    let big = locate(
        &sample_clip(),
        &LocateOptions::new(LayoutVariant::Sectioned, Endianness::Big),
    )
    .unwrap();
    assert_eq!(little.bytes(), big.bytes());
}

// ============================================================================
// Names And Trajectory
// ============================================================================

#[test]
fn test_channel_name_table() {
    for options in all_options() {
        let anim = locate(&sample_clip(), &options).unwrap();
        let names = anim.channel_name_table().expect("names present");
        assert_eq!(names.len(), 4);
        assert_eq!(names.name(2), Some("head"));
        assert_eq!(names.find("tail"), Some(3));
        assert_eq!(names.find("missing"), None);
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["root", "spine", "head", "tail"]);
    }
}

#[test]
fn test_optional_structures_absent() {
    let builder = NsaBuilder::new(1.0, 30.0, 2).channel(
        PosTrack::Constant(Vec3::ONE),
        QuatTrack::Constant(Quat::IDENTITY),
    );
    for options in all_options() {
        let anim = locate(&builder, &options).unwrap();
        assert!(anim.channel_name_table().is_none());
        assert!(anim.trajectory_channel_data().is_none());
        assert!(anim.sampled_pos_map().is_empty());
        assert!(anim.sampled_quat_map().is_empty());
    }
}

#[test]
fn test_trajectory_located_with_animation() {
    for options in all_options() {
        let anim = locate(&sample_clip(), &options).unwrap();
        let trajectory = anim.trajectory_channel_data().expect("trajectory present");
        assert_eq!(trajectory.num_frames(), 10);
        assert_eq!(trajectory.sample_frequency(), 30.0);

        let key = trajectory.key_at_frame(9).unwrap();
        assert!(key.position.abs_diff_eq(Vec3::new(0.9, 0.0, 0.0), POS_TOLERANCE));
        assert_quat_close(key.rotation, Quat::from_rotation_y(0.45), "last trajectory key");
    }
}

// ============================================================================
// State Machine
// ============================================================================

#[test]
fn test_second_locate_rejected() {
    let options = sectioned_le();
    let mut buffer = sample_clip().build_buffer(&options);
    let registry = TypeRegistry::new();

    registry.locate(&mut buffer, ANIM_NSA, &options).unwrap();
    let before = buffer.bytes().to_vec();
    assert_eq!(
        registry.locate(&mut buffer, ANIM_NSA, &options).unwrap_err(),
        NsaError::AlreadyLocated
    );
    assert_eq!(buffer.bytes(), before.as_slice(), "bytes must be untouched");
}

#[test]
fn test_from_buffer_requires_location() {
    let buffer = sample_clip().build_buffer(&sectioned_le());
    assert_eq!(NsaAnimation::from_buffer(buffer).unwrap_err(), NsaError::NotLocated);
}

#[test]
fn test_anim_source_wraps_nsa() {
    let options = sectioned_le();
    let mut buffer = sample_clip().build_buffer(&options);
    TypeRegistry::new().locate(&mut buffer, ANIM_NSA, &options).unwrap();

    let source = AnimSource::from_buffer(buffer).unwrap();
    assert_eq!(source.format_name(), "NSA");
    assert_eq!(source.duration(), 1.0);
    assert_eq!(source.num_channel_sets(), 4);
    assert!(source.as_nsa().is_some());
    assert!(source.trajectory_channel_data().is_some());
}

// ============================================================================
// Rejected Assets
// ============================================================================

fn assert_fails(bytes: Vec<u8>, options: &LocateOptions) -> NsaError {
    let mut buffer = AssetBuffer::new(bytes);
    let err = TypeRegistry::new()
        .locate(&mut buffer, ANIM_NSA, options)
        .unwrap_err();
    assert!(matches!(buffer.state(), LocationState::Failed));
    err
}

#[test]
fn test_reserved_word_is_unsupported() {
    let options = sectioned_le();
    for reserved in header::RESERVED {
        let mut bytes = sample_clip().build(&options);
        patch_u32(&mut bytes, reserved, 1, Endianness::Little);
        let err = assert_fails(bytes, &options);
        assert!(
            matches!(err, NsaError::UnsupportedLayoutVariant(_)),
            "reserved word {:#x}: {:?}",
            reserved,
            err
        );
    }
}

#[test]
fn test_unknown_flag_is_unsupported() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    patch_u32(&mut bytes, header::FLAGS, 0x2, Endianness::Little);
    assert!(matches!(
        assert_fails(bytes, &options),
        NsaError::UnsupportedLayoutVariant(_)
    ));
}

#[test]
fn test_wrong_generation_is_unsupported() {
    let sectioned = sectioned_le();
    let flat = LocateOptions::new(LayoutVariant::Flat, Endianness::Little);

    let bytes = sample_clip().build(&sectioned);
    assert!(matches!(
        assert_fails(bytes, &flat),
        NsaError::UnsupportedLayoutVariant(_)
    ));

    let bytes = sample_clip().build(&flat);
    assert!(matches!(
        assert_fails(bytes, &sectioned),
        NsaError::UnsupportedLayoutVariant(_)
    ));
}

#[test]
fn test_truncated_buffer_is_corrupt() {
    let options = sectioned_le();
    let bytes = sample_clip().build(&options);

    for len in [0, 16, header::SIZE, bytes.len() / 2, bytes.len() - 4] {
        let err = assert_fails(bytes[..len].to_vec(), &options);
        assert!(
            matches!(err, NsaError::CorruptAsset(_)),
            "truncated to {}: {:?}",
            len,
            err
        );
    }
}

#[test]
fn test_oversized_count_is_corrupt() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    patch_u32(&mut bytes, header::SAMPLED_POS_NUM_QSETS, 0x4000_0000, Endianness::Little);
    assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
}

#[test]
fn test_channel_index_out_of_range_is_corrupt() {
    for options in all_options() {
        let mut bytes = sample_clip().build(&options);
        patch_u32(&mut bytes, header::NUM_CHANNEL_SETS, 3, options.byte_order);
        assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
    }
}

#[test]
fn test_unmapped_channel_is_corrupt() {
    for options in all_options() {
        let mut bytes = sample_clip().build(&options);
        patch_u32(&mut bytes, header::NUM_CHANNEL_SETS, 5, options.byte_order);
        assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
    }
}

#[test]
fn test_section_larger_than_recorded_size_is_corrupt() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    let sizes_at = raw_u32(&bytes, header::SECTION_SIZES, Endianness::Little) as usize;
    patch_u32(&mut bytes, sizes_at, 8, Endianness::Little);
    assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
}

#[test]
fn test_unordered_start_frames_are_corrupt() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    let starts_at = raw_u32(&bytes, header::SECTION_START_FRAMES, Endianness::Little) as usize;
    patch_u32(&mut bytes, starts_at + 4, 25, Endianness::Little);
    assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
}

#[test]
fn test_unknown_nested_type_is_reported() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    let trajectory_at = raw_u32(&bytes, header::TRAJECTORY, Endianness::Little) as usize;
    patch_u32(&mut bytes, trajectory_at, 99, Endianness::Little);
    assert_eq!(assert_fails(bytes, &options), NsaError::UnknownType(99));
}

#[test]
fn test_negative_duration_is_corrupt() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    patch_u32(&mut bytes, header::DURATION, (-1.0f32).to_bits(), Endianness::Little);
    assert!(matches!(assert_fails(bytes, &options), NsaError::CorruptAsset(_)));
}

#[test]
fn test_max_section_size_mismatch_still_locates() {
    let options = sectioned_le();
    let mut bytes = sample_clip().build(&options);
    patch_u32(&mut bytes, header::MAX_SECTION_SIZE, 0, Endianness::Little);
    let anim = locate_bytes(bytes, &options).unwrap();
    assert_eq!(anim.layout().max_section_size, 0);
}

/// Append a copy of the root header whose trajectory slot points at itself,
/// and point the root's trajectory at the copy. Flat layout with base 0 keeps
/// raw pointers equal to offsets.
fn append_self_referencing_header(bytes: &mut Vec<u8>, type_tag: u32) {
    let order = Endianness::Little;
    let at = (bytes.len() + 3) & !3;
    bytes.resize(at, 0);
    let copy = bytes[..header::SIZE].to_vec();
    bytes.extend_from_slice(&copy);
    patch_u32(bytes, at + header::DURATION, type_tag, order);
    patch_u32(bytes, at + header::FLAT_TRAJECTORY, at as u32, order);
    patch_u32(bytes, header::FLAT_TRAJECTORY, at as u32, order);
}

#[test]
fn test_animation_in_trajectory_slot_is_rejected() {
    let options = LocateOptions::new(LayoutVariant::Flat, Endianness::Little);
    let mut bytes = sample_clip().build(&options);
    append_self_referencing_header(&mut bytes, ANIM_NSA);

    assert_eq!(
        assert_fails(bytes, &options),
        NsaError::UnexpectedType {
            expected: "NSA trajectory",
            found: "NSA animation",
        }
    );
}

#[test]
fn test_structure_reached_twice_is_corrupt() {
    // An animation type registered under a second id gets past the
    // trajectory slot check, so the cycle is caught by the claimed set.
    let options = LocateOptions::new(LayoutVariant::Flat, Endianness::Little);
    let mut bytes = sample_clip().build(&options);
    append_self_referencing_header(&mut bytes, 6);

    let mut registry = TypeRegistry::new();
    registry.register(6, locate_anim_nsa);
    let mut buffer = AssetBuffer::new(bytes);
    let err = registry.locate(&mut buffer, ANIM_NSA, &options).unwrap_err();
    assert!(matches!(err, NsaError::CorruptAsset(_)), "{:?}", err);
    assert!(matches!(buffer.state(), LocationState::Failed));
}

#[test]
fn test_shared_channel_map_is_corrupt() {
    for options in all_options() {
        let order = options.byte_order;
        let mut bytes = sample_clip().build(&options);
        let map = raw_u32(&bytes, header::UNCHANGING_QUAT_MAP, order);
        patch_u32(&mut bytes, header::SAMPLED_QUAT_MAP, map, order);
        let err = assert_fails(bytes, &options);
        assert!(matches!(err, NsaError::CorruptAsset(_)), "{:?}: {:?}", options, err);
    }
}

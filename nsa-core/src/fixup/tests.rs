//! Tests for the fixup primitives and the asset buffer state machine

use super::*;
use crate::registry::{TypeRegistry, Located};
use crate::trajectory::TrajectoryLayout;

fn words(order: Endianness, values: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 4];
    for (i, &v) in values.iter().enumerate() {
        order.write_u32(&mut bytes[i * 4..], v);
    }
    bytes
}

fn sectioned(order: Endianness) -> LocateOptions {
    LocateOptions::new(LayoutVariant::Sectioned, order)
}

fn flat(order: Endianness, base: u32) -> LocateOptions {
    LocateOptions::new(LayoutVariant::Flat, order).with_base_address(base)
}

fn dummy_located() -> Located {
    Located::TrajectoryNsa(TrajectoryLayout {
        offset: 0,
        type_tag: 0,
        num_frames: 1,
        sample_frequency: 30.0,
        pos_quantisation: QuantisationScaleAndOffset::new(Vec3::ZERO, Vec3::ZERO),
        quat_quantisation: QuantisationScaleAndOffset::new(Vec3::ZERO, Vec3::ZERO),
        pos_keys: 0,
        quat_keys: 0,
    })
}

fn locate_dummy(_: &mut Fixup<'_>, _: usize) -> Result<Located> {
    Ok(dummy_located())
}

// ============================================================================
// Scalar Swapping
// ============================================================================

#[test]
fn test_swap_u32_big_endian_to_native() {
    let registry = TypeRegistry::empty();
    let mut bytes = words(Endianness::Big, &[0x1122_3344, 7]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Big), &registry);

    assert_eq!(fx.swap_u32(0).unwrap(), 0x1122_3344);
    assert_eq!(fx.swap_u32(4).unwrap(), 7);
    assert_eq!(NativeEndian::read_u32(&bytes[0..]), 0x1122_3344);
    assert_eq!(NativeEndian::read_u32(&bytes[4..]), 7);
}

#[test]
fn test_swap_f32_little_endian() {
    let registry = TypeRegistry::empty();
    let mut bytes = words(Endianness::Little, &[1.5f32.to_bits()]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    assert_eq!(fx.swap_f32(0).unwrap(), 1.5);
    assert_eq!(f32::from_bits(NativeEndian::read_u32(&bytes)), 1.5);
}

#[test]
fn test_swap_u16_array() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0x12, 0x34, 0xAB, 0xCD, 0xFF, 0xFF];
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Big), &registry);

    fx.swap_u16_array(0, 2).unwrap();
    assert_eq!(NativeEndian::read_u16(&bytes[0..]), 0x1234);
    assert_eq!(NativeEndian::read_u16(&bytes[2..]), 0xABCD);
    // Outside the counted range is untouched
    assert_eq!(&bytes[4..], &[0xFF, 0xFF]);
}

#[test]
fn test_swap_past_end_is_corrupt() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0u8; 6];
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    assert!(matches!(fx.swap_u32(4), Err(NsaError::CorruptAsset(_))));
    assert!(matches!(fx.swap_u32_array(0, 2), Err(NsaError::CorruptAsset(_))));
    assert!(matches!(fx.swap_u16_array(0, 4), Err(NsaError::CorruptAsset(_))));
}

#[test]
fn test_require_rejects_overflow() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0u8; 8];
    let fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    assert!(fx.require(0, 8, "all").is_ok());
    assert!(fx.require(usize::MAX, 2, "wrapped").is_err());
    assert!(array_bytes(usize::MAX, 4).is_err());
}

#[test]
fn test_claim_rejects_second_visit() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0u8; 16];
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    assert!(fx.claim(4, "map").is_ok());
    assert!(fx.claim(8, "map").is_ok());
    assert!(matches!(fx.claim(4, "map"), Err(NsaError::CorruptAsset(_))));
}

// ============================================================================
// Pointer Rebasing
// ============================================================================

#[test]
fn test_sectioned_pointer_is_relative_to_owner() {
    let registry = TypeRegistry::empty();
    // Field at 8 owned by the structure at 4; points 16 bytes past the owner
    let mut bytes = words(Endianness::Big, &[0, 0, 16, 0, 0, 0, (-8i32) as u32, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Big), &registry);

    assert_eq!(fx.pointer(4, 8).unwrap(), Some(20));
    // Negative offsets point backwards from the owner
    assert_eq!(fx.pointer(24, 24).unwrap(), Some(16));

    assert_eq!(NativeEndian::read_u32(&bytes[8..]), 20);
    assert_eq!(NativeEndian::read_u32(&bytes[24..]), 16);
}

#[test]
fn test_flat_pointer_subtracts_base_address() {
    let registry = TypeRegistry::empty();
    let mut bytes = words(Endianness::Little, &[0, 0x8000_0010, 0, 0, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, flat(Endianness::Little, 0x8000_0000), &registry);

    // The owner is irrelevant for absolute pointers
    assert_eq!(fx.pointer(12, 4).unwrap(), Some(0x10));
    assert_eq!(NativeEndian::read_u32(&bytes[4..]), 0x10);
}

#[test]
fn test_null_pointer_stays_null() {
    let registry = TypeRegistry::empty();
    for options in [sectioned(Endianness::Big), flat(Endianness::Big, 0x1000)] {
        let mut bytes = vec![0u8; 16];
        let mut fx = Fixup::new(&mut bytes, options, &registry);
        assert_eq!(fx.pointer(0, 4).unwrap(), None);
        assert_eq!(NativeEndian::read_u32(&bytes[4..]), 0);
    }
}

#[test]
fn test_pointer_outside_buffer_is_corrupt() {
    let registry = TypeRegistry::empty();

    let mut bytes = words(Endianness::Little, &[0, 0x100, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);
    assert!(matches!(fx.pointer(0, 4), Err(NsaError::CorruptAsset(_))));

    // Below the base address
    let mut bytes = words(Endianness::Little, &[0, 0x0FF0, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, flat(Endianness::Little, 0x1000), &registry);
    assert!(matches!(fx.pointer(0, 4), Err(NsaError::CorruptAsset(_))));

    // Back onto the root header
    let mut bytes = words(Endianness::Little, &[0, 0, (-8i32) as u32, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);
    assert!(matches!(fx.pointer(8, 8), Err(NsaError::CorruptAsset(_))));
}

#[test]
fn test_empty_array_skips_null_pointer() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0u8; 16];
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    assert_eq!(fx.array_pointer(0, 4, 0, 4, "empty").unwrap(), 0);
    // Nothing to swap either
    fx.swap_u32_array(0, 0).unwrap();
}

#[test]
fn test_non_empty_array_needs_pointer() {
    let registry = TypeRegistry::empty();
    let mut bytes = vec![0u8; 16];
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    let err = fx.array_pointer(0, 4, 3, 4, "things").unwrap_err();
    assert!(matches!(err, NsaError::CorruptAsset(msg) if msg.contains("things")));
}

#[test]
fn test_array_must_fit_in_buffer() {
    let registry = TypeRegistry::empty();
    let mut bytes = words(Endianness::Little, &[0, 8, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);

    // 8 bytes from offset 12 would end at 20
    assert!(fx.array_pointer(4, 4, 2, 4, "array").is_err());

    let mut bytes = words(Endianness::Little, &[0, 8, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);
    assert_eq!(fx.array_pointer(4, 4, 1, 4, "array").unwrap(), 12);
}

#[test]
fn test_huge_count_is_corrupt_not_panic() {
    let registry = TypeRegistry::empty();
    let mut bytes = words(Endianness::Little, &[0, 8, 0, 0]);
    let mut fx = Fixup::new(&mut bytes, sectioned(Endianness::Little), &registry);
    assert!(fx.array_pointer(0, 4, usize::MAX / 2, 4, "array").is_err());
}

// ============================================================================
// Asset Buffer State
// ============================================================================

#[test]
fn test_second_locate_is_rejected() {
    let mut registry = TypeRegistry::empty();
    registry.register(42, locate_dummy);
    let mut buffer = AssetBuffer::new(vec![0; 8]);

    registry
        .locate(&mut buffer, 42, &LocateOptions::default())
        .unwrap();
    assert!(buffer.is_located());

    let err = registry
        .locate(&mut buffer, 42, &LocateOptions::default())
        .unwrap_err();
    assert_eq!(err, NsaError::AlreadyLocated);
    assert!(buffer.is_located(), "rejected locate must not change state");
}

#[test]
fn test_into_located_requires_location() {
    let buffer = AssetBuffer::from_slice(&[1, 2, 3, 4]);
    assert_eq!(buffer.into_located().unwrap_err(), NsaError::NotLocated);

    let mut buffer = AssetBuffer::from_slice(&[1, 2, 3, 4]);
    buffer.locate_with(|_| Ok(dummy_located())).unwrap();
    let (bytes, located) = buffer.into_located().unwrap();
    assert_eq!(bytes, vec![1, 2, 3, 4]);
    assert_eq!(located, dummy_located());
}

#[test]
fn test_failed_locate_is_terminal() {
    let mut buffer = AssetBuffer::new(vec![0; 4]);
    let err = buffer
        .locate_with(|_| Err(NsaError::corrupt("bad")))
        .unwrap_err();
    assert_eq!(err, NsaError::CorruptAsset("bad".into()));
    assert!(matches!(buffer.state(), LocationState::Failed));

    let err = buffer.locate_with(|_| Ok(dummy_located())).unwrap_err();
    assert!(matches!(err, NsaError::CorruptAsset(_)));
    assert!(buffer.into_located().is_err());
}

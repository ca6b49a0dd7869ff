//! Quantisation codec for compressed animation channels
//!
//! Every quantised component is reconstructed with a single multiply-add:
//! `value = code * scale + offset`. Orientations are stored as tan-quarter-angle
//! rotation vectors, which map to a unit quaternion analytically.

use glam::{Quat, Vec3};

/// Bit widths of a packed sampled position key (`[x:11][y:11][z:10]`)
pub const POS_KEY_BITS: [u32; 3] = [11, 11, 10];

/// Largest code of a 16-bit quantised component
pub const U16_CODE_MAX: u32 = 0xFFFF;

/// Scale and offset vectors for one quantisation range (24 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantisationScaleAndOffset {
    pub scale: Vec3,
    pub offset: Vec3,
}

impl QuantisationScaleAndOffset {
    /// Serialized size in bytes
    pub const SIZE: usize = 24;

    /// Fixed range of quaternion means and unchanging quaternions: `[-1, 1]` over 16 bits
    pub const QUAT_MEANS: Self = Self {
        scale: Vec3::splat(2.0 / U16_CODE_MAX as f32),
        offset: Vec3::splat(-1.0),
    };

    pub const fn new(scale: Vec3, offset: Vec3) -> Self {
        Self { scale, offset }
    }

    /// Range covering `[min, max]` per axis with the given code widths
    pub fn from_range(min: Vec3, max: Vec3, bits: [u32; 3]) -> Self {
        let steps = Vec3::new(
            code_max(bits[0]) as f32,
            code_max(bits[1]) as f32,
            code_max(bits[2]) as f32,
        );
        Self {
            scale: (max - min) / steps,
            offset: min,
        }
    }

    /// Decode one quantised vector
    #[inline]
    pub fn decode(&self, code: [u32; 3]) -> Vec3 {
        Vec3::new(code[0] as f32, code[1] as f32, code[2] as f32) * self.scale + self.offset
    }

    /// Quantise a vector to the nearest codes, clamped to the code widths
    pub fn quantise(&self, value: Vec3, bits: [u32; 3]) -> [u32; 3] {
        [
            quantise_component(value.x, self.scale.x, self.offset.x, bits[0]),
            quantise_component(value.y, self.scale.y, self.offset.y, bits[1]),
            quantise_component(value.z, self.scale.z, self.offset.z, bits[2]),
        ]
    }
}

#[inline]
fn code_max(bits: u32) -> u32 {
    (1u32 << bits) - 1
}

fn quantise_component(value: f32, scale: f32, offset: f32, bits: u32) -> u32 {
    if scale == 0.0 {
        return 0;
    }
    let code = ((value - offset) / scale).round();
    code.clamp(0.0, code_max(bits) as f32) as u32
}

// ============================================================================
// Packed Position Keys
// ============================================================================

/// Split a packed sampled position key into its three codes
#[inline]
pub fn unpack_pos_key(packed: u32) -> [u32; 3] {
    [packed >> 21, (packed >> 10) & 0x7FF, packed & 0x3FF]
}

/// Pack three position codes into a `[x:11][y:11][z:10]` key
#[inline]
pub fn pack_pos_key(code: [u32; 3]) -> u32 {
    ((code[0] & 0x7FF) << 21) | ((code[1] & 0x7FF) << 10) | (code[2] & 0x3FF)
}

// ============================================================================
// Tan-Quarter-Angle Orientation
// ============================================================================

/// Convert a tan-quarter-angle rotation vector into a unit quaternion
///
/// With `m = |v|²` the quaternion is `(2v / (1 + m), (1 - m) / (1 + m))`,
/// which has unit length for any `v`.
#[inline]
pub fn tqa_to_quat(v: Vec3) -> Quat {
    let m = v.length_squared();
    let inv = 1.0 / (1.0 + m);
    let xyz = v * (2.0 * inv);
    Quat::from_xyzw(xyz.x, xyz.y, xyz.z, (1.0 - m) * inv)
}

/// Convert a quaternion into its tan-quarter-angle rotation vector
///
/// The quaternion is flipped onto the `w >= 0` hemisphere first so every
/// component of the result lies in `[-1, 1]`.
pub fn quat_to_tqa(q: Quat) -> Vec3 {
    let q = if q.w < 0.0 { -q } else { q };
    Vec3::new(q.x, q.y, q.z) / (1.0 + q.w)
}

/// Decode a 16-bit tan-quarter-angle triple over the fixed `[-1, 1]` range
#[inline]
pub fn decode_quat_mean(code: [u16; 3]) -> Quat {
    let v = QuantisationScaleAndOffset::QUAT_MEANS.decode(widen(code));
    tqa_to_quat(v)
}

/// Quantise a quaternion into a 16-bit tan-quarter-angle triple over `[-1, 1]`
pub fn encode_quat_mean(q: Quat) -> [u16; 3] {
    narrow(QuantisationScaleAndOffset::QUAT_MEANS.quantise(quat_to_tqa(q), [16; 3]))
}

/// Widen 16-bit codes for decoding
#[inline]
pub fn widen(code: [u16; 3]) -> [u32; 3] {
    [code[0] as u32, code[1] as u32, code[2] as u32]
}

#[inline]
pub(crate) fn narrow(code: [u32; 3]) -> [u16; 3] {
    [code[0] as u16, code[1] as u16, code[2] as u16]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quat_close(a: Quat, b: Quat, eps: f32) -> bool {
        a.dot(b).abs() > 1.0 - eps
    }

    #[test]
    fn test_decode_is_multiply_add() {
        let q = QuantisationScaleAndOffset::new(Vec3::new(0.5, 0.25, 2.0), Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(q.decode([0, 0, 0]), Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(q.decode([4, 8, 1]), Vec3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn test_position_roundtrip_within_step() {
        let min = Vec3::new(-2.0, 0.0, -10.0);
        let max = Vec3::new(3.0, 1.0, 10.0);
        let q = QuantisationScaleAndOffset::from_range(min, max, POS_KEY_BITS);

        for value in [
            Vec3::new(-2.0, 0.0, -10.0),
            Vec3::new(0.123, 0.777, 4.56),
            Vec3::new(3.0, 1.0, 10.0),
            Vec3::new(1.999, 0.001, -9.99),
        ] {
            let decoded = q.decode(q.quantise(value, POS_KEY_BITS));
            let err = (decoded - value).abs();
            assert!(
                err.cmple(q.scale).all(),
                "error {:?} exceeds step {:?} for {:?}",
                err,
                q.scale,
                value
            );
        }
    }

    #[test]
    fn test_quantise_clamps_out_of_range() {
        let q = QuantisationScaleAndOffset::from_range(Vec3::ZERO, Vec3::ONE, [10; 3]);
        assert_eq!(q.quantise(Vec3::splat(-5.0), [10; 3]), [0, 0, 0]);
        assert_eq!(q.quantise(Vec3::splat(5.0), [10; 3]), [1023, 1023, 1023]);
    }

    #[test]
    fn test_zero_range_decodes_to_offset() {
        let q = QuantisationScaleAndOffset::from_range(Vec3::splat(0.5), Vec3::splat(0.5), POS_KEY_BITS);
        let code = q.quantise(Vec3::splat(0.5), POS_KEY_BITS);
        assert_eq!(code, [0, 0, 0]);
        assert_eq!(q.decode(code), Vec3::splat(0.5));
    }

    #[test]
    fn test_pos_key_packing() {
        let code = [0x7FF, 0x123, 0x3FF];
        let packed = pack_pos_key(code);
        assert_eq!(unpack_pos_key(packed), code);
        assert_eq!(unpack_pos_key(0xFFFF_FFFF), [0x7FF, 0x7FF, 0x3FF]);
        assert_eq!(unpack_pos_key(1 << 21), [1, 0, 0]);
        assert_eq!(unpack_pos_key(1 << 10), [0, 1, 0]);
        assert_eq!(unpack_pos_key(1), [0, 0, 1]);
    }

    #[test]
    fn test_tqa_identity() {
        assert_eq!(tqa_to_quat(Vec3::ZERO), Quat::IDENTITY);
        assert_eq!(quat_to_tqa(Quat::IDENTITY), Vec3::ZERO);
    }

    #[test]
    fn test_tqa_is_unit_length() {
        for v in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(0.3, -0.2, 0.9),
        ] {
            let q = tqa_to_quat(v);
            assert!((q.length() - 1.0).abs() < 1e-6, "|q| = {}", q.length());
        }
    }

    #[test]
    fn test_tqa_roundtrip() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, -0.5).normalize(), 1.3);
        let back = tqa_to_quat(quat_to_tqa(q));
        assert!(quat_close(q, back, 1e-6));

        // 180 degrees lands on the edge of the range
        let half_turn = Quat::from_xyzw(0.0, 1.0, 0.0, 0.0);
        assert_eq!(quat_to_tqa(half_turn), Vec3::Y);
        assert!(quat_close(half_turn, tqa_to_quat(Vec3::Y), 1e-6));
    }

    #[test]
    fn test_tqa_half_turn_with_rounded_w() {
        // In f32 this has w of about -4.4e-8, so the hemisphere flip picks -y
        let half_turn = Quat::from_axis_angle(Vec3::Y, std::f32::consts::PI);
        let v = quat_to_tqa(half_turn);
        assert!((v.y.abs() - 1.0).abs() < 1e-5, "tqa = {:?}", v);
        assert!(v.x.abs() < 1e-6 && v.z.abs() < 1e-6, "tqa = {:?}", v);
        assert!(quat_close(half_turn, tqa_to_quat(v), 1e-5));
    }

    #[test]
    fn test_tqa_negated_quat_same_vector() {
        let q = Quat::from_axis_angle(Vec3::Z, 0.7);
        assert!((quat_to_tqa(q) - quat_to_tqa(-q)).length() < 1e-6);
    }

    #[test]
    fn test_quat_mean_roundtrip() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 1.0).normalize(), -2.1);
        let decoded = decode_quat_mean(encode_quat_mean(q));
        assert!(quat_close(q, decoded, 1e-6), "decoded = {:?}", decoded);
    }

    #[test]
    fn test_quat_mean_range_endpoints() {
        let q = decode_quat_mean([0x7FFF, 0x7FFF, 0x7FFF]);
        assert!(q.w > 0.9999);
        let v = QuantisationScaleAndOffset::QUAT_MEANS.decode([0, 0xFFFF, 0]);
        assert_eq!(v.x, -1.0);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}

//! Packed 48-bit rotation codec.
//!
//! A rotation is stored in 6 bytes as a little-endian 48-bit integer:
//!
//! ```text
//! bits  0..2   variant (which slot holds the reconstructed component)
//! bits  2..17  a (15-bit fixed point)
//! bits 17..32  b
//! bits 32..47  c
//! ```
//!
//! Each field maps `[0, 32767]` onto `[-1/√2, 1/√2]`. The omitted component is
//! the largest one and is rebuilt from the unit-norm constraint.

use glam::Quat;

/// Size of one packed quaternion in bytes.
pub const PACKED_QUAT_SIZE: usize = 6;

const FIELD_BITS: u32 = 15;
const FIELD_MASK: u64 = (1 << FIELD_BITS) - 1;
const FIELD_CENTER: f32 = 16383.5;
/// `32767 / √2`
const FIELD_SCALE: f32 = 23169.767_578_125;

const SNAP_EPSILON: f32 = 1.0e-4;

fn dequantize(raw: u64) -> f32 {
    ((raw & FIELD_MASK) as f32 - FIELD_CENTER) / FIELD_SCALE
}

fn quantize(v: f32) -> u64 {
    (v * FIELD_SCALE + FIELD_CENTER)
        .round()
        .clamp(0.0, FIELD_MASK as f32) as u64
}

/// Decodes a 6-byte packed rotation into an `(x, y, z, w)` quaternion.
///
/// The packed data must describe a unit quaternion: the reconstructed component is
/// `sqrt(1 - (a² + b² + c²))` with no clamping of the radicand. `x`, `y` and `z`
/// below `1e-4` in magnitude snap to zero; `w` never does.
pub fn decode_packed_quat(bytes: [u8; PACKED_QUAT_SIZE]) -> Quat {
    let mut num = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    let variant = (num & 3) as usize;
    num >>= 2;
    let a = dequantize(num);
    num >>= FIELD_BITS;
    let b = dequantize(num);
    num >>= FIELD_BITS;
    let c = dequantize(num);
    let r = (1.0 - (a * a + b * b + c * c)).sqrt();

    let mut q = match variant {
        0 => [r, c, b, a],
        1 => [c, r, b, a],
        2 => [c, b, r, a],
        _ => [c, b, a, r],
    };
    // Only the vector part snaps; w is kept as decoded.
    for v in &mut q[..3] {
        if v.abs() < SNAP_EPSILON {
            *v = 0.0;
        }
    }
    Quat::from_array(q)
}

/// Packs a unit quaternion into the 6-byte layout read by [`decode_packed_quat`].
///
/// The largest-magnitude component is dropped (after flipping the sign of the whole
/// quaternion so it is positive). Used to author fixtures; the asset format itself is
/// never written by this crate.
pub fn encode_packed_quat(q: Quat) -> [u8; PACKED_QUAT_SIZE] {
    let mut q = q.to_array();
    let variant = q
        .iter()
        .enumerate()
        .fold(0usize, |best, (i, v)| {
            if v.abs() > q[best].abs() { i } else { best }
        });
    if q[variant] < 0.0 {
        for v in &mut q {
            *v = -*v;
        }
    }

    // Slots other than `variant`, in ascending order, hold (c, b, a).
    let mut others = q
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != variant)
        .map(|(_, v)| *v);
    let c = others.next().unwrap_or_default();
    let b = others.next().unwrap_or_default();
    let a = others.next().unwrap_or_default();

    let num = variant as u64
        | (quantize(a) << 2)
        | (quantize(b) << (2 + FIELD_BITS))
        | (quantize(c) << (2 + 2 * FIELD_BITS));

    let mut out = [0u8; PACKED_QUAT_SIZE];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (num >> (8 * i)) as u8;
    }
    out
}

/// Zeroes components of `v` whose magnitude is below `epsilon`.
pub(crate) fn snap<const N: usize>(mut v: [f32; N], epsilon: f32) -> [f32; N] {
    for x in &mut v {
        if x.abs() < epsilon {
            *x = 0.0;
        }
    }
    v
}


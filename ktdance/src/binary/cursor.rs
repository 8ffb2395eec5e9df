use crate::Error;
use crate::codec::{PACKED_QUAT_SIZE, decode_packed_quat};
use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec3, Vec4};
use half::f16;

/// Positional little-endian reader over an immutable byte slice.
///
/// All layouts in this format family are addressed by absolute offsets, so most
/// decoding is `seek` followed by a short run of typed reads.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        if offset > self.bytes.len() {
            return Err(self.out_of_bounds(offset, 0));
        }
        self.cursor = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        let target = self
            .cursor
            .checked_add(n)
            .ok_or_else(|| self.out_of_bounds(self.cursor, n))?;
        if target > self.bytes.len() {
            return Err(self.out_of_bounds(self.cursor, n));
        }
        self.cursor = target;
        Ok(())
    }

    /// Advances to the next multiple of `boundary`; no-op when already aligned.
    pub fn align(&mut self, boundary: usize) -> Result<(), Error> {
        if boundary <= 1 {
            return Ok(());
        }
        let rem = self.cursor % boundary;
        if rem == 0 {
            return Ok(());
        }
        self.skip(boundary - rem)
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::OutOfBounds {
            context: None,
            offset,
            len,
            size: self.bytes.len(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(self.out_of_bounds(self.cursor, len));
        }
        let bytes = self.bytes;
        let out = &bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(out)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads a `u32` offset or count and widens it for indexing.
    pub fn read_offset(&mut self) -> Result<usize, Error> {
        Ok(self.read_u32()? as usize)
    }

    pub fn read_f16(&mut self) -> Result<f32, Error> {
        Ok(f16::from_bits(self.read_u16()?).to_f32())
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, Error> {
        let mut v = [0.0f32; 3];
        LittleEndian::read_f32_into(self.take(12)?, &mut v);
        Ok(Vec3::from_array(v))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4, Error> {
        let mut v = [0.0f32; 4];
        LittleEndian::read_f32_into(self.take(16)?, &mut v);
        Ok(Vec4::from_array(v))
    }

    /// Reads a NUL-terminated string; invalid UTF-8 is replaced, not rejected.
    pub fn read_c_string(&mut self) -> Result<String, Error> {
        let start = self.cursor;
        let Some(len) = self.bytes[start..].iter().position(|&b| b == 0) else {
            return Err(self.out_of_bounds(start, self.remaining() + 1));
        };
        let raw = self.take(len)?;
        self.cursor += 1;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// Three half-precision floats.
    pub fn read_vec3_f16(&mut self) -> Result<Vec3, Error> {
        let x = self.read_f16()?;
        let y = self.read_f16()?;
        let z = self.read_f16()?;
        Ok(Vec3::new(x, y, z))
    }

    /// A 48-bit packed quaternion, see [`decode_packed_quat`].
    pub fn read_packed_quat(&mut self) -> Result<Quat, Error> {
        Ok(decode_packed_quat(self.read_bytes::<PACKED_QUAT_SIZE>()?))
    }
}

//! Loaders for the model (`.model`), motion and camera-motion binaries.
//!
//! The loaders are IO-free: they operate on an in-memory byte slice. All values are
//! little-endian and addressed by absolute offsets.
//!
//! Model header fields used here:
//!
//! ```text
//! 0x18 bone_count u32      0x1C bone_ptr u32
//! 0x20 batch_count u32     0x24 remap_table_ptr i32
//! 0x28 section_count u32   0x34 section_ptr u32
//! ```

mod animation;
mod camera;
mod cursor;
pub(crate) mod mesh;
mod skeleton;

pub use cursor::ByteCursor;

use crate::{Error, Mesh, Skeleton};

pub(crate) const BONE_COUNT_OFFSET: usize = 0x18;
pub(crate) const BATCH_COUNT_OFFSET: usize = 0x20;
pub(crate) const REMAP_TABLE_OFFSET: usize = 0x24;
pub(crate) const SECTION_COUNT_OFFSET: usize = 0x28;
pub(crate) const SECTION_TABLE_OFFSET: usize = 0x34;

/// Size of one bone record (11 × 16 bytes).
pub const BONE_RECORD_SIZE: usize = 176;
pub const SECTION_RECORD_SIZE: usize = 64;
/// The only vertex layout this loader accepts.
pub const VERTEX_STRIDE: usize = 68;

/// Track header `type` of a rotation track. Every other type is a translation.
pub const TRACK_ROTATION: u16 = 28;
/// Translation samples as three half floats.
pub const TRACK_TRANSLATION_F16: u16 = 30;
/// Translation samples as three half floats added to a full-precision base vector.
pub const TRACK_TRANSLATION_F16_BASE: u16 = 31;

/// Skeleton and mesh decoded from the same model file.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ModelAsset {
    pub mesh: Mesh,
    pub skeleton: Skeleton,
}

impl ModelAsset {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let skeleton = Skeleton::from_model_bytes(bytes)?;
        let mesh = Mesh::from_model_bytes(bytes)?;
        check_remap_targets(bytes, &mesh, &skeleton)?;
        Ok(Self { mesh, skeleton })
    }
}

/// Rejects remap entries that name a bone the skeleton does not have.
fn check_remap_targets(bytes: &[u8], mesh: &Mesh, skeleton: &Skeleton) -> Result<(), Error> {
    let mut input = ByteCursor::new(bytes);
    input.seek(REMAP_TABLE_OFFSET)?;
    // Already validated as non-negative by the mesh decoder.
    let table_ptr = input.read_i32()? as usize;

    let mut offset = table_ptr;
    for (batch, globals) in mesh.remap.batches.iter().enumerate() {
        for &global in globals {
            if global >= skeleton.len() {
                return Err(Error::structural(
                    format!("bone remap batch {batch}"),
                    offset,
                    format!(
                        "global bone index {global} outside a skeleton of {} bones",
                        skeleton.len()
                    ),
                ));
            }
            offset += 2;
        }
    }
    Ok(())
}

/// Common 16-byte track header shared by motion and camera files.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct TrackHeader {
    pub(crate) offset: usize,
    pub(crate) kind: u16,
    pub(crate) interpolation: u16,
    pub(crate) count: u16,
    pub(crate) bone: u16,
    pub(crate) unknown: u32,
}

impl TrackHeader {
    /// Reads the header at the cursor and aligns to the payload.
    pub(crate) fn read(input: &mut ByteCursor<'_>) -> Result<Self, Error> {
        let offset = input.position();
        let kind = input.read_u16()?;
        let interpolation = input.read_u16()?;
        let count = input.read_u16()?;
        let bone = input.read_u16()?;
        let _zero = input.read_u32()?;
        let unknown = input.read_u32()?;
        input.align(16)?;
        Ok(Self {
            offset,
            kind,
            interpolation,
            count,
            bone,
            unknown,
        })
    }

    pub(crate) fn is_sparse(&self) -> bool {
        self.interpolation == 0
    }

    /// Reads `count` frame numbers, then aligns to the sample block.
    pub(crate) fn read_frames(&self, input: &mut ByteCursor<'_>) -> Result<Vec<u16>, Error> {
        let frames = (0..self.count)
            .map(|_| input.read_u16())
            .collect::<Result<Vec<_>, _>>()?;
        input.align(16)?;
        Ok(frames)
    }
}

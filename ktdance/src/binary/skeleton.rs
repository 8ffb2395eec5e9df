use super::{BONE_COUNT_OFFSET, BONE_RECORD_SIZE, ByteCursor};
use crate::codec::snap;
use crate::error::ResultExt;
use crate::{BoneData, Error, Skeleton};
use glam::Vec4;

const BASIS_OFFSET: usize = 16;
const BIND_POSITION_OFFSET: usize = 64;
const PARENT_OFFSET: usize = 172;

const BASIS_EPSILON: f32 = 1.0e-5;

impl Skeleton {
    /// Decodes the bone table of a model file.
    pub fn from_model_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = ByteCursor::new(bytes);
        input.seek(BONE_COUNT_OFFSET)?;
        let bone_count = input.read_offset()?;
        let bone_ptr = input.read_offset()?;
        log::debug!("model: {bone_count} bones at {bone_ptr:#x}");

        let mut bones = Vec::with_capacity(bone_count.min(input.len() / BONE_RECORD_SIZE));
        for i in 0..bone_count {
            let bone = read_bone(&mut input, bone_ptr + BONE_RECORD_SIZE * i)
                .within(|| format!("bone {i}"))?;
            bones.push(bone);
        }

        Skeleton::new(bones)
    }
}

fn read_bone(input: &mut ByteCursor<'_>, record: usize) -> Result<BoneData, Error> {
    input.seek(record + BASIS_OFFSET)?;
    let mut basis = [Vec4::ZERO; 4];
    for column in &mut basis {
        *column = Vec4::from_array(snap(input.read_vec4()?.to_array(), BASIS_EPSILON));
    }

    input.seek(record + BIND_POSITION_OFFSET)?;
    let bind_position = input.read_vec3()?;

    input.seek(record + PARENT_OFFSET)?;
    let parent = input.read_i32()?;
    let parent = match parent {
        -1 => None,
        p if p >= 0 => Some(p as usize),
        p => {
            return Err(Error::structural(
                "bone record",
                record + PARENT_OFFSET,
                format!("invalid parent index {p}"),
            ));
        }
    };

    Ok(BoneData {
        name: None,
        parent,
        basis,
        bind_position,
    })
}

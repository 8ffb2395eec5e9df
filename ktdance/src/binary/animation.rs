use super::{
    ByteCursor, TRACK_ROTATION, TRACK_TRANSLATION_F16, TRACK_TRANSLATION_F16_BASE, TrackHeader,
};
use crate::codec::snap;
use crate::error::ResultExt;
use crate::runtime::forward_fill;
use crate::{AnimationClip, BoneTracks, Error, TrackMeta};
use glam::{Quat, Vec3};

const MAX_FRAME_OFFSET: usize = 0x04;
const BONE_COUNT_OFFSET: usize = 0x20;

/// Trailing bones that never carry tracks in this format.
const UNTRACKED_BONES: usize = 3;

pub(crate) const TRANSLATION_EPSILON: f32 = 1.0e-3;

impl AnimationClip {
    /// Decodes every bone track of a motion file.
    ///
    /// Sparse tracks are expanded over `[0, max_frame]` so sampling is a plain index.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = ByteCursor::new(bytes);
        input.seek(MAX_FRAME_OFFSET)?;
        let max_frame = input.read_u32()?;
        // Sparse keys are u16 frame numbers, so nothing past u16::MAX can be keyed.
        if max_frame > u32::from(u16::MAX) {
            return Err(Error::structural(
                "motion header",
                MAX_FRAME_OFFSET,
                format!("max frame {max_frame} exceeds the u16 frame range"),
            ));
        }
        input.seek(BONE_COUNT_OFFSET)?;
        let bone_count = input.read_offset()?;

        let track_count = bone_count
            .checked_sub(UNTRACKED_BONES)
            .map(|n| n * 2)
            .ok_or_else(|| {
                Error::structural(
                    "motion header",
                    BONE_COUNT_OFFSET,
                    format!("bone count {bone_count} leaves no tracked bones"),
                )
            })?;

        input
            .skip(8 + 2 * bone_count)
            .within(|| "motion bone table".to_string())?;
        let section = input.position();
        input.seek(section + 8)?;
        let offsets = (0..track_count)
            .map(|_| input.read_offset())
            .collect::<Result<Vec<_>, _>>()
            .within(|| "motion track directory".to_string())?;
        log::debug!(
            "motion: {bone_count} bones, {track_count} tracks, max frame {max_frame}, section at {section:#x}"
        );

        let mut bones = vec![BoneTracks::default(); bone_count];
        for (i, rel) in offsets.into_iter().enumerate() {
            let offset = section + rel;
            read_track(&mut input, offset, max_frame as usize, &mut bones)
                .within(|| format!("track {i} at {offset:#x}"))?;
        }

        Ok(Self { max_frame, bones })
    }
}

fn read_track(
    input: &mut ByteCursor<'_>,
    offset: usize,
    max_frame: usize,
    bones: &mut [BoneTracks],
) -> Result<(), Error> {
    input.seek(offset)?;
    let header = TrackHeader::read(input)?;
    let bone_count = bones.len();
    let Some(tracks) = bones.get_mut(header.bone as usize) else {
        return Err(Error::structural(
            "track header",
            offset + 6,
            format!(
                "bone {} outside a motion of {bone_count} bones",
                header.bone
            ),
        ));
    };
    log::trace!(
        "track at {offset:#x}: type {} interpolation {} count {} bone {}",
        header.kind,
        header.interpolation,
        header.count,
        header.bone
    );

    if header.kind == TRACK_ROTATION {
        tracks.rotation = read_rotation(input, &header, max_frame)?;
    } else {
        tracks.meta = TrackMeta {
            interpolation: header.interpolation,
            kind: header.kind,
            unknown: header.unknown,
            offset,
        };
        tracks.translation = read_translation(input, &header, max_frame)?;
    }
    Ok(())
}

fn read_rotation(
    input: &mut ByteCursor<'_>,
    header: &TrackHeader,
    max_frame: usize,
) -> Result<Vec<Quat>, Error> {
    if !header.is_sparse() {
        return (0..header.count)
            .map(|_| input.read_packed_quat())
            .collect();
    }

    let frames = header.read_frames(input)?;
    let values = (0..header.count)
        .map(|_| input.read_packed_quat())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(forward_fill(
        frames.into_iter().zip(values),
        max_frame,
        Quat::IDENTITY,
    ))
}

fn read_translation(
    input: &mut ByteCursor<'_>,
    header: &TrackHeader,
    max_frame: usize,
) -> Result<Vec<Vec3>, Error> {
    if !header.is_sparse() {
        // Dense tracks carry no base vector; only type 30 is half precision.
        return (0..header.count)
            .map(|_| -> Result<Vec3, Error> {
                let v = match header.kind {
                    TRACK_TRANSLATION_F16 => input.read_vec3_f16()?,
                    _ => input.read_vec3()?,
                };
                Ok(snap_translation(v))
            })
            .collect();
    }

    let frames = header.read_frames(input)?;
    let base = if header.kind == TRACK_TRANSLATION_F16_BASE {
        input.read_vec3()?
    } else {
        Vec3::ZERO
    };
    let values = (0..header.count)
        .map(|_| -> Result<Vec3, Error> {
            let v = match header.kind {
                TRACK_TRANSLATION_F16 => input.read_vec3_f16()?,
                TRACK_TRANSLATION_F16_BASE => input.read_vec3_f16()? + base,
                _ => input.read_vec3()?,
            };
            Ok(snap_translation(v))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(forward_fill(
        frames.into_iter().zip(values),
        max_frame,
        Vec3::ZERO,
    ))
}

pub(crate) fn snap_translation(v: Vec3) -> Vec3 {
    Vec3::from_array(snap(v.to_array(), TRANSLATION_EPSILON))
}

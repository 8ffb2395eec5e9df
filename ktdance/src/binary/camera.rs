use super::animation::snap_translation;
use super::{ByteCursor, TrackHeader};
use crate::error::ResultExt;
use crate::runtime::forward_fill;
use crate::{CameraClip, Error};
use glam::{Quat, Vec3};

/// The rotation track header sits at a fixed offset; translation follows it.
const ROTATION_TRACK_OFFSET: usize = 0x38;

impl CameraClip {
    /// Decodes the rotation and translation curves of a camera-motion file.
    ///
    /// Unlike bone motion, samples are stored as raw floats and sparse curves are
    /// expanded only up to their last keyed frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = ByteCursor::new(bytes);

        input.seek(ROTATION_TRACK_OFFSET)?;
        let rotation = read_rotation(&mut input).within(|| "camera rotation track".to_string())?;

        input.align(16)?;
        let translation =
            read_translation(&mut input).within(|| "camera translation track".to_string())?;

        log::debug!(
            "camera: {} rotation frames, {} translation frames",
            rotation.len(),
            translation.len()
        );
        Ok(Self {
            translation,
            rotation,
        })
    }
}

fn fill_to_last_key<T: Copy>(frames: Vec<u16>, values: Vec<T>, default: T) -> Vec<T> {
    let Some(&last) = frames.last() else {
        return Vec::new();
    };
    forward_fill(frames.into_iter().zip(values), last as usize, default)
}

fn read_curve<T: Copy>(
    input: &mut ByteCursor<'_>,
    default: T,
    read: fn(&mut ByteCursor<'_>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let header = TrackHeader::read(input)?;
    if !header.is_sparse() {
        return (0..header.count).map(|_| read(input)).collect();
    }
    let frames = header.read_frames(input)?;
    let values = (0..header.count)
        .map(|_| read(input))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fill_to_last_key(frames, values, default))
}

fn read_rotation(input: &mut ByteCursor<'_>) -> Result<Vec<Quat>, Error> {
    read_curve(input, Quat::IDENTITY, |input| Ok(Quat::from_vec4(input.read_vec4()?)))
}

/// Samples are stored as four floats; the fourth is unused.
fn read_translation(input: &mut ByteCursor<'_>) -> Result<Vec<Vec3>, Error> {
    read_curve(input, Vec3::ZERO, |input| {
        let v = input.read_vec3()?;
        let _w = input.read_f32()?;
        Ok(snap_translation(v))
    })
}

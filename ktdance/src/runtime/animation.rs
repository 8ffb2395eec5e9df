use crate::{AnimationClip, AnimationSample, BoneSample, CameraClip, CameraSample};
use glam::{Quat, Vec3};
use std::collections::BTreeMap;

/// Clamps `frame` into `[0, len - 1]`; `None` for an empty track.
pub fn clamp_frame(frame: i32, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    Some(usize::try_from(frame.max(0)).unwrap_or(0).min(last))
}

fn sample_track<T: Copy>(track: &[T], frame: i32, empty: T) -> T {
    clamp_frame(frame, track.len())
        .map(|i| track[i])
        .unwrap_or(empty)
}

/// Expands sparse `(frame, value)` keys into one value per frame over `[0, last_frame]`.
///
/// A later key for the same frame replaces an earlier one. Frame 0 takes `default`
/// when unkeyed; any other unkeyed frame repeats the previous frame. Keys beyond
/// `last_frame` are dropped.
pub fn forward_fill<T: Copy>(
    keys: impl IntoIterator<Item = (u16, T)>,
    last_frame: usize,
    default: T,
) -> Vec<T> {
    let keys: BTreeMap<usize, T> = keys.into_iter().map(|(f, v)| (f as usize, v)).collect();
    let mut out: Vec<T> = Vec::with_capacity(last_frame + 1);
    for frame in 0..=last_frame {
        let value = match keys.get(&frame) {
            Some(v) => *v,
            None => out.last().copied().unwrap_or(default),
        };
        out.push(value);
    }
    out
}

impl AnimationClip {
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Samples one bone. Translation and rotation clamp `frame` independently since
    /// their tracks may differ in length.
    pub fn sample_bone(&self, bone: usize, frame: i32) -> Option<BoneSample> {
        let tracks = self.bones.get(bone)?;
        Some(BoneSample {
            translation: sample_track(&tracks.translation, frame, Vec3::ZERO),
            rotation: sample_track(&tracks.rotation, frame, Quat::IDENTITY),
            translation_frames: tracks.translation.len(),
            meta: tracks.meta,
        })
    }

    pub fn sample(&self, frame: i32) -> AnimationSample {
        let bones = (0..self.bones.len())
            .filter_map(|b| self.sample_bone(b, frame))
            .collect();
        AnimationSample {
            frame,
            max_frame: self.max_frame,
            bones,
        }
    }
}

impl CameraClip {
    pub fn sample(&self, frame: i32) -> CameraSample {
        CameraSample {
            translation: sample_track(&self.translation, frame, Vec3::ZERO),
            rotation: sample_track(&self.rotation, frame, Quat::IDENTITY),
        }
    }
}

//! Typed entry points for a node-graph host.
//!
//! A host evaluates these once per tick. Each file is decoded once and cached; only
//! frame sampling and pose evaluation run per call.

use crate::{
    AnimationClip, AnimationSample, CameraClip, CameraSample, DecodeCache, Error, Mesh,
    ModelAsset, PosedSkeleton, Skeleton,
};
use glam::{Quat, Vec3};
use std::path::Path;
use std::sync::Arc;

/// Supplies the current frame when a call does not request one explicitly.
pub trait FrameSource {
    fn current_frame(&self) -> i32;
}

/// Always reports the same frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FixedFrame(pub i32);

impl FrameSource for FixedFrame {
    fn current_frame(&self) -> i32 {
        self.0
    }
}

impl<F: Fn() -> i32> FrameSource for F {
    fn current_frame(&self) -> i32 {
        self()
    }
}

#[derive(Debug, Default)]
pub struct Host<F = FixedFrame> {
    frames: F,
    models: DecodeCache<ModelAsset>,
    motions: DecodeCache<AnimationClip>,
    cameras: DecodeCache<CameraClip>,
}

impl<F: FrameSource> Host<F> {
    pub fn new(frames: F) -> Self {
        Self {
            frames,
            models: DecodeCache::new(),
            motions: DecodeCache::new(),
            cameras: DecodeCache::new(),
        }
    }

    fn resolve_frame(&self, frame: Option<i32>) -> i32 {
        frame.unwrap_or_else(|| self.frames.current_frame())
    }

    /// Decodes a model file, or the model inside an `.arc` archive.
    pub fn read_model(&self, path: &Path) -> Result<Arc<ModelAsset>, Error> {
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("arc"));
        self.models.get_or_decode(path, |bytes| {
            if is_archive {
                ModelAsset::from_archive(bytes)
            } else {
                ModelAsset::from_bytes(bytes)
            }
        })
    }

    pub fn read_animation(&self, path: &Path, frame: Option<i32>) -> Result<AnimationSample, Error> {
        let clip = self.motions.get_or_decode(path, AnimationClip::from_bytes)?;
        Ok(clip.sample(self.resolve_frame(frame)))
    }

    pub fn read_camera(&self, path: &Path, frame: Option<i32>) -> Result<CameraSample, Error> {
        let clip = self.cameras.get_or_decode(path, CameraClip::from_bytes)?;
        Ok(clip.sample(self.resolve_frame(frame)))
    }

    pub fn evaluate(
        &self,
        mesh: &Mesh,
        skeleton: &Skeleton,
        sample: &AnimationSample,
    ) -> (Mesh, PosedSkeleton) {
        crate::evaluate(mesh, skeleton, sample)
    }

    pub fn rotate_vector(&self, direction: Vec3, rotation: Quat) -> Vec3 {
        crate::rotate_vector(direction, rotation)
    }
}

use crate::{AnimationSample, Mesh, Skeleton};
use glam::{Mat4, Quat, Vec3};

/// World-space bone matrices and posed bone positions for one evaluation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PosedSkeleton {
    pub world: Vec<Mat4>,
    pub positions: Vec<Vec3>,
}

impl Skeleton {
    /// Composes bind bases with `sample` into per-bone world matrices.
    ///
    /// Bones missing from `sample` use the identity local transform.
    pub fn world_matrices(&self, sample: &AnimationSample) -> Vec<Mat4> {
        let bind = self.bind_matrices();
        let mut world = vec![Mat4::IDENTITY; self.len()];

        for &i in self.update_order() {
            let m = bind[i];
            let (t, q) = sample
                .bones
                .get(i)
                .map(|b| (b.translation, b.rotation))
                .unwrap_or((Vec3::ZERO, Quat::IDENTITY));
            let mut local = Mat4::from_translation(t) * Mat4::from_quat(q);

            let parent = self.bones()[i].parent;
            if let Some(p) = parent {
                // Re-express the local transform relative to the parent's basis.
                let correction = (bind[p].inverse() * m).inverse();
                local = correction * local;
            }

            let mut w = m * local * m.inverse();
            if let Some(p) = parent {
                w = world[p] * w;
            }
            world[i] = w;
        }

        world
    }

    pub fn pose(&self, sample: &AnimationSample) -> PosedSkeleton {
        let world = self.world_matrices(sample);
        let positions = self
            .bones()
            .iter()
            .zip(&world)
            .map(|(bone, w)| (*w * bone.bind_position.extend(1.0)).truncate())
            .collect();
        PosedSkeleton { world, positions }
    }
}

impl Mesh {
    /// Linear blend skinning against `world` bone matrices.
    ///
    /// # Panics
    ///
    /// Panics if a vertex references a bone outside `world`.
    pub fn skinned(&self, world: &[Mat4]) -> Mesh {
        let mut out = self.clone();
        for v in &mut out.vertices {
            let mut blend = Mat4::ZERO;
            for (&bone, &weight) in v.bone_indices.iter().zip(&v.bone_weights) {
                let Some(m) = world.get(bone) else {
                    panic!(
                        "vertex references bone {bone} but the pose has {} bones",
                        world.len()
                    );
                };
                blend += *m * weight;
            }
            v.position = (blend * v.position.extend(1.0)).truncate();
            v.normal = (blend * v.normal.extend(0.0)).truncate();
        }
        out
    }
}

/// Poses both the skeleton and the mesh for one animation sample.
pub fn evaluate(
    mesh: &Mesh,
    skeleton: &Skeleton,
    sample: &AnimationSample,
) -> (Mesh, PosedSkeleton) {
    let posed = skeleton.pose(sample);
    let mesh = mesh.skinned(&posed.world);
    (mesh, posed)
}

/// Rotates a direction by `rotation` (w = 0, translation never applies).
pub fn rotate_vector(direction: Vec3, rotation: Quat) -> Vec3 {
    (Mat4::from_quat(rotation) * direction.extend(0.0)).truncate()
}

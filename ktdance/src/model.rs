use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoneData {
    pub name: Option<String>,
    pub parent: Option<usize>,
    /// Bind-pose basis columns `c1..c4`.
    pub basis: [Vec4; 4],
    pub bind_position: Vec3,
}

impl BoneData {
    pub fn bind_matrix(&self) -> Mat4 {
        Mat4::from_cols(self.basis[0], self.basis[1], self.basis[2], self.basis[3])
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// `[u, 1 - v]`
    pub uv: Vec2,
    /// Global skeleton indices once the mesh is fully decoded.
    pub bone_indices: [usize; 4],
    /// `bone_weights[0]` is the complement of the three stored weights.
    pub bone_weights: [f32; 4],
    pub section: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Section {
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub first_triangle: usize,
    pub triangle_count: usize,
    /// Index into [`BoneRemapTable::batches`].
    pub batch: usize,
}

/// Per-batch local → global bone index tables.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoneRemapTable {
    pub batches: Vec<Vec<usize>>,
}

impl BoneRemapTable {
    pub fn resolve(&self, batch: usize, local: usize) -> Option<usize> {
        self.batches.get(batch)?.get(local).copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    /// Indices into `vertices`, already offset by each section's vertex base.
    pub triangles: Vec<[u32; 3]>,
    pub sections: Vec<Section>,
    pub remap: BoneRemapTable,
}

/// Header fields of a bone's translation track, kept for diagnostics.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TrackMeta {
    pub interpolation: u16,
    pub kind: u16,
    pub unknown: u32,
    /// Absolute file offset of the track header.
    pub offset: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoneTracks {
    /// One value per frame (sparse tracks are expanded at decode time).
    pub translation: Vec<Vec3>,
    pub rotation: Vec<Quat>,
    pub meta: TrackMeta,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct AnimationClip {
    pub max_frame: u32,
    pub bones: Vec<BoneTracks>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoneSample {
    pub translation: Vec3,
    pub rotation: Quat,
    /// Length of the translation track the sample came from.
    pub translation_frames: usize,
    pub meta: TrackMeta,
}

impl Default for BoneSample {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            translation_frames: 0,
            meta: TrackMeta::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct AnimationSample {
    pub frame: i32,
    pub max_frame: u32,
    pub bones: Vec<BoneSample>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct CameraClip {
    pub translation: Vec<Vec3>,
    pub rotation: Vec<Quat>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct CameraSample {
    pub translation: Vec3,
    pub rotation: Quat,
}

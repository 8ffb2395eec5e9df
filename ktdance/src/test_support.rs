//! Byte-level fixture writers for the model, motion and camera layouts.

use crate::encode_packed_quat;
use glam::{Mat4, Quat, Vec3};
use half::f16;

pub(crate) fn assert_approx(actual: f32, expected: f32, eps: f32, ctx: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= eps,
        "{ctx}: expected {expected}, got {actual} (diff {diff})"
    );
}

pub(crate) fn assert_vec3_approx(actual: Vec3, expected: Vec3, eps: f32, ctx: &str) {
    for k in 0..3 {
        assert_approx(actual[k], expected[k], eps, &format!("{ctx}[{k}]"));
    }
}

/// Compares rotations up to sign (`q` and `-q` are the same rotation).
pub(crate) fn assert_quat_approx(actual: Quat, expected: Quat, eps: f32, ctx: &str) {
    let expected = if actual.dot(expected) < 0.0 {
        -expected
    } else {
        expected
    };
    for k in 0..4 {
        assert_approx(actual.to_array()[k], expected.to_array()[k], eps, &format!("{ctx}[{k}]"));
    }
}

#[derive(Default)]
pub(crate) struct Writer {
    pub(crate) bytes: Vec<u8>,
}

impl Writer {
    pub(crate) fn pos(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn pad_to(&mut self, offset: usize) {
        assert!(offset >= self.bytes.len(), "pad_to {offset} behind {}", self.bytes.len());
        self.bytes.resize(offset, 0);
    }

    pub(crate) fn align(&mut self, boundary: usize) {
        let len = self.bytes.len().div_ceil(boundary) * boundary;
        self.bytes.resize(len, 0);
    }

    pub(crate) fn push_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub(crate) fn push_u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn push_i16(&mut self, v: i16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn push_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn push_i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn push_f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn push_f16(&mut self, v: f32) {
        self.push_u16(f16::from_f32(v).to_bits());
    }

    pub(crate) fn push_vec3(&mut self, v: Vec3) {
        for x in v.to_array() {
            self.push_f32(x);
        }
    }

    pub(crate) fn push_cstr(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
    }

    pub(crate) fn patch_u32(&mut self, at: usize, v: u32) {
        if self.bytes.len() < at + 4 {
            self.bytes.resize(at + 4, 0);
        }
        self.bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn patch_i32(&mut self, at: usize, v: i32) {
        self.patch_u32(at, v as u32);
    }
}

#[derive(Clone, Debug)]
pub(crate) struct VertexFixture {
    pub(crate) position: Vec3,
    pub(crate) bones: [u8; 4],
    /// Stored weights 1..=3; weight 0 is implied.
    pub(crate) weights: [f32; 3],
    pub(crate) normal: Vec3,
    pub(crate) uv: [f32; 2],
}

impl VertexFixture {
    pub(crate) fn rigid(position: Vec3, bone: u8) -> Self {
        Self {
            position,
            bones: [bone, 0, 0, 0],
            weights: [0.0; 3],
            normal: Vec3::Y,
            uv: [0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SectionFixture {
    pub(crate) vertices: Vec<VertexFixture>,
    pub(crate) triangles: Vec<[u16; 3]>,
}

#[derive(Clone, Debug)]
pub(crate) struct ModelFixture {
    /// Bind basis (columns `c1..c4`; `c4.xyz` doubles as the bind position) and parent.
    pub(crate) bones: Vec<(Mat4, i32)>,
    pub(crate) sections: Vec<SectionFixture>,
    pub(crate) remap: Vec<Vec<i16>>,
    pub(crate) stride: u8,
}

impl Default for ModelFixture {
    fn default() -> Self {
        Self {
            bones: Vec::new(),
            sections: Vec::new(),
            remap: Vec::new(),
            stride: 68,
        }
    }
}

impl ModelFixture {
    pub(crate) fn build(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.pad_to(0x40);

        let bone_ptr = w.pos();
        for (basis, parent) in &self.bones {
            let record = w.pos();
            w.pad_to(record + 16);
            for col in basis.to_cols_array() {
                w.push_f32(col);
            }
            w.pad_to(record + 172);
            w.push_i32(*parent);
        }

        w.align(16);
        let section_ptr = w.pos();
        w.pad_to(section_ptr + 64 * self.sections.len());

        for (i, section) in self.sections.iter().enumerate() {
            let record = section_ptr + 64 * i;

            w.align(16);
            let vert_start = w.pos();
            for v in &section.vertices {
                w.push_vec3(v.position);
                for b in v.bones {
                    w.push_u8(b);
                }
                for x in v.weights {
                    w.push_f32(x);
                }
                w.push_vec3(v.normal);
                w.push_vec3(Vec3::X);
                w.push_vec3(Vec3::Z);
                w.push_f16(v.uv[0]);
                w.push_f16(v.uv[1]);
            }

            w.align(16);
            let face_start = w.pos();
            for t in &section.triangles {
                for idx in t {
                    w.push_u16(*idx);
                }
            }

            w.patch_u32(record, (vert_start - record) as u32);
            w.patch_u32(record + 4, section.vertices.len() as u32);
            w.bytes[record + 9] = self.stride;
            w.patch_u32(record + 32, (face_start - (record + 32)) as u32);
            w.patch_u32(record + 36, (section.triangles.len() * 3) as u32);
        }

        w.align(16);
        let remap_ptr = w.pos();
        for batch in &self.remap {
            for &g in batch {
                w.push_i16(g);
            }
        }
        // Trailing padding keeps the last table read in bounds regardless of its size.
        w.align(16);

        w.patch_u32(0x18, self.bones.len() as u32);
        w.patch_u32(0x1C, bone_ptr as u32);
        w.patch_u32(0x20, self.remap.len() as u32);
        w.patch_i32(0x24, remap_ptr as i32);
        w.patch_u32(0x28, self.sections.len() as u32);
        w.patch_u32(0x34, section_ptr as u32);
        w.bytes
    }
}

#[derive(Clone, Debug)]
pub(crate) enum TrackFixture {
    Rotation {
        bone: u16,
        /// `Some` writes a sparse track.
        frames: Option<Vec<u16>>,
        values: Vec<Quat>,
    },
    Translation {
        bone: u16,
        kind: u16,
        frames: Option<Vec<u16>>,
        base: Vec3,
        values: Vec<Vec3>,
        unknown: u32,
    },
}

impl TrackFixture {
    pub(crate) fn dense_rotation(bone: u16, values: Vec<Quat>) -> Self {
        Self::Rotation {
            bone,
            frames: None,
            values,
        }
    }

    pub(crate) fn sparse_rotation(bone: u16, frames: Vec<u16>, values: Vec<Quat>) -> Self {
        Self::Rotation {
            bone,
            frames: Some(frames),
            values,
        }
    }

    pub(crate) fn dense_translation(bone: u16, kind: u16, values: Vec<Vec3>) -> Self {
        Self::Translation {
            bone,
            kind,
            frames: None,
            base: Vec3::ZERO,
            values,
            unknown: 0,
        }
    }

    pub(crate) fn sparse_translation(
        bone: u16,
        kind: u16,
        frames: Vec<u16>,
        values: Vec<Vec3>,
    ) -> Self {
        Self::Translation {
            bone,
            kind,
            frames: Some(frames),
            base: Vec3::ZERO,
            values,
            unknown: 0,
        }
    }

    fn write_header(w: &mut Writer, kind: u16, sparse: bool, count: usize, bone: u16, unknown: u32) {
        w.push_u16(kind);
        w.push_u16(if sparse { 0 } else { 1 });
        w.push_u16(count as u16);
        w.push_u16(bone);
        w.push_u32(0);
        w.push_u32(unknown);
        w.align(16);
    }

    fn write_frames(w: &mut Writer, frames: &Option<Vec<u16>>) {
        if let Some(frames) = frames {
            for &f in frames {
                w.push_u16(f);
            }
            w.align(16);
        }
    }

    /// Motion-file encoding: packed rotations, typed translations.
    pub(crate) fn write_motion(&self, w: &mut Writer) {
        match self {
            Self::Rotation {
                bone,
                frames,
                values,
            } => {
                Self::write_header(w, 28, frames.is_some(), values.len(), *bone, 0);
                Self::write_frames(w, frames);
                for q in values {
                    w.bytes.extend_from_slice(&encode_packed_quat(*q));
                }
            }
            Self::Translation {
                bone,
                kind,
                frames,
                base,
                values,
                unknown,
            } => {
                Self::write_header(w, *kind, frames.is_some(), values.len(), *bone, *unknown);
                Self::write_frames(w, frames);
                let sparse = frames.is_some();
                if sparse && *kind == 31 {
                    w.push_vec3(*base);
                }
                for v in values {
                    match *kind {
                        30 => v.to_array().into_iter().for_each(|x| w.push_f16(x)),
                        31 if sparse => (*v - *base)
                            .to_array()
                            .into_iter()
                            .for_each(|x| w.push_f16(x)),
                        _ => w.push_vec3(*v),
                    }
                }
            }
        }
    }

    /// Camera-file encoding: raw float quaternions and 4-float translations.
    pub(crate) fn write_camera(&self, w: &mut Writer) {
        match self {
            Self::Rotation {
                bone,
                frames,
                values,
            } => {
                Self::write_header(w, 28, frames.is_some(), values.len(), *bone, 0);
                Self::write_frames(w, frames);
                for q in values {
                    for x in q.to_array() {
                        w.push_f32(x);
                    }
                }
            }
            Self::Translation {
                bone,
                kind,
                frames,
                values,
                unknown,
                ..
            } => {
                Self::write_header(w, *kind, frames.is_some(), values.len(), *bone, *unknown);
                Self::write_frames(w, frames);
                for v in values {
                    w.push_vec3(*v);
                    w.push_f32(1.0);
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MotionFixture {
    pub(crate) max_frame: u32,
    pub(crate) bone_count: u32,
    /// Must hold exactly `2 * (bone_count - 3)` tracks.
    pub(crate) tracks: Vec<TrackFixture>,
}

impl MotionFixture {
    /// Returns the file and the absolute offset of each track header.
    pub(crate) fn build_with_offsets(&self) -> (Vec<u8>, Vec<usize>) {
        let mut w = Writer::default();
        w.patch_u32(0x04, self.max_frame);
        w.patch_u32(0x20, self.bone_count);
        let section = 0x24 + 8 + 2 * self.bone_count as usize;
        let directory = section + 8;
        w.pad_to(directory + 4 * self.tracks.len());

        let mut offsets = Vec::with_capacity(self.tracks.len());
        for (i, track) in self.tracks.iter().enumerate() {
            w.align(16);
            let at = w.pos();
            w.patch_u32(directory + 4 * i, (at - section) as u32);
            track.write_motion(&mut w);
            offsets.push(at);
        }
        w.align(16);
        (w.bytes, offsets)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        self.build_with_offsets().0
    }
}

pub(crate) fn camera_file(rotation: &TrackFixture, translation: &TrackFixture) -> Vec<u8> {
    let mut w = Writer::default();
    w.pad_to(0x38);
    rotation.write_camera(&mut w);
    w.align(16);
    translation.write_camera(&mut w);
    w.align(16);
    w.bytes
}

/// Encodes `data` as an all-literal LZ stream followed by the end token.
pub(crate) fn lz_literals(data: &[u8]) -> Vec<u8> {
    let mut items: Vec<Option<u8>> = data.iter().copied().map(Some).collect();
    items.push(None);

    let mut out = Vec::new();
    for group in items.chunks(8) {
        let control = group
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_some())
            .fold(0u8, |acc, (i, _)| acc | (1 << i));
        out.push(control);
        for item in group {
            match item {
                Some(b) => out.push(*b),
                None => out.extend_from_slice(&[0, 0]),
            }
        }
    }
    out
}

pub(crate) struct ArchiveFile<'a> {
    pub(crate) name: &'a str,
    pub(crate) data: Vec<u8>,
    pub(crate) compress: bool,
}

pub(crate) fn archive_file(files: &[ArchiveFile<'_>]) -> Vec<u8> {
    let mut w = Writer::default();
    w.push_u32(u32::from_le_bytes(*b"ARC\0"));
    w.push_u32(3);
    w.push_u32(files.len() as u32);
    w.pad_to(0x10 + 16 * files.len());

    let mut name_offsets = Vec::with_capacity(files.len());
    for file in files {
        name_offsets.push(w.pos());
        w.push_cstr(file.name);
    }

    for (i, file) in files.iter().enumerate() {
        w.align(16);
        let offset = w.pos();
        let stored = if file.compress {
            lz_literals(&file.data)
        } else {
            file.data.clone()
        };
        w.bytes.extend_from_slice(&stored);

        let entry = 0x10 + 16 * i;
        w.patch_u32(entry, name_offsets[i] as u32);
        w.patch_u32(entry + 4, offset as u32);
        w.patch_u32(entry + 8, file.data.len() as u32);
        w.patch_u32(entry + 12, stored.len() as u32);
    }
    w.bytes
}

/// A `.b2it` table listing `names` in file order, each stored for bone `slots[i]`.
pub(crate) fn bone_name_table(names: &[&str], slots: &[u32]) -> Vec<u8> {
    let mut w = Writer::default();
    w.patch_u32(0x10, names.len() as u32);
    w.pad_to(0x20 + 4 * names.len());

    let mut starts = Vec::with_capacity(names.len());
    for name in names {
        starts.push(w.pos());
        w.push_cstr(name);
    }
    w.align(4);
    let index_ptr = w.pos();
    for &slot in slots {
        w.push_u32(slot);
    }

    w.patch_u32(0x18, index_ptr as u32);
    for (i, start) in starts.into_iter().enumerate() {
        w.patch_u32(0x20 + 4 * i, start as u32);
    }
    w.bytes
}

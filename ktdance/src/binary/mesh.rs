use super::{
    BATCH_COUNT_OFFSET, ByteCursor, REMAP_TABLE_OFFSET, SECTION_COUNT_OFFSET,
    SECTION_RECORD_SIZE, SECTION_TABLE_OFFSET, VERTEX_STRIDE,
};
use crate::error::ResultExt;
use crate::{BoneRemapTable, Error, Mesh, MeshVertex, Section};
use glam::Vec2;
use std::collections::BTreeSet;

/// Offset of the triangle data base inside a section record.
const FACE_BASE: usize = 32;
const TRIANGLE_SIZE: usize = 6;

#[derive(Copy, Clone, Debug)]
struct SectionRecord {
    offset: usize,
    vert_offset: usize,
    vert_count: usize,
    face_offset: usize,
    triangle_count: usize,
}

impl SectionRecord {
    fn read(input: &mut ByteCursor<'_>, offset: usize) -> Result<Self, Error> {
        input.seek(offset)?;
        let vert_offset = input.read_offset()?;
        let vert_count = input.read_offset()?;
        let _ = input.read_u8()?;
        let stride = input.read_u8()? as usize;
        if stride != VERTEX_STRIDE {
            return Err(Error::structural(
                "section record",
                offset + 9,
                format!("vertex stride {stride}, expected {VERTEX_STRIDE}"),
            ));
        }
        input.skip(22)?;
        let face_offset = input.read_offset()?;
        let index_count = input.read_offset()?;
        Ok(Self {
            offset,
            vert_offset,
            vert_count,
            face_offset,
            triangle_count: index_count / 3,
        })
    }

    fn vertex_start(&self, j: usize) -> usize {
        self.offset + self.vert_offset + j * VERTEX_STRIDE
    }

    fn triangle_start(&self, j: usize) -> usize {
        self.offset + FACE_BASE + self.face_offset + j * TRIANGLE_SIZE
    }
}

/// Groups sections into bone remap batches.
///
/// A section whose distinct local index set is `{0, .., n - 1}` (checked as
/// `max == len - 1`) opens a new batch. Every section joins the latest batch and adds
/// its indices to it.
#[derive(Debug, Default)]
pub(crate) struct BatchBuilder {
    batches: Vec<BTreeSet<u8>>,
}

impl BatchBuilder {
    pub(crate) fn starts_batch(indices: &BTreeSet<u8>) -> bool {
        indices
            .last()
            .is_some_and(|&max| max as usize == indices.len() - 1)
    }

    /// Returns the batch the section was assigned to, or `None` when no batch has
    /// been opened yet.
    pub(crate) fn push(&mut self, indices: &BTreeSet<u8>) -> Option<usize> {
        if Self::starts_batch(indices) {
            self.batches.push(BTreeSet::new());
        }
        let batch = self.batches.last_mut()?;
        batch.extend(indices.iter().copied());
        Some(self.batches.len() - 1)
    }

    pub(crate) fn table_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.batches.iter().map(BTreeSet::len)
    }
}

impl Mesh {
    /// Decodes all sections of a model file into one flat vertex and triangle buffer
    /// with global bone indices.
    pub fn from_model_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = ByteCursor::new(bytes);

        input.seek(SECTION_COUNT_OFFSET)?;
        let section_count = input.read_offset()?;
        input.seek(SECTION_TABLE_OFFSET)?;
        let section_ptr = input.read_offset()?;

        let records = (0..section_count)
            .map(|i| {
                SectionRecord::read(&mut input, section_ptr + SECTION_RECORD_SIZE * i)
                    .within(|| format!("section {i}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let vertex_total: usize = records.iter().map(|r| r.vert_count).sum();
        let triangle_total: usize = records.iter().map(|r| r.triangle_count).sum();
        log::debug!(
            "model: {section_count} sections at {section_ptr:#x}, {vertex_total} vertices, {triangle_total} triangles"
        );

        let mut mesh = Mesh {
            vertices: Vec::with_capacity(vertex_total.min(input.len() / VERTEX_STRIDE)),
            triangles: Vec::with_capacity(triangle_total.min(input.len() / TRIANGLE_SIZE)),
            sections: Vec::with_capacity(records.len()),
            remap: BoneRemapTable::default(),
        };

        let mut batches = BatchBuilder::default();
        for (i, record) in records.iter().enumerate() {
            let section = decode_section(&mut input, &mut mesh, record, i, &mut batches)
                .within(|| format!("section {i}"))?;
            mesh.sections.push(section);
        }

        input.seek(BATCH_COUNT_OFFSET)?;
        let declared = input.read_offset()?;
        if declared != batches.batches.len() {
            log::warn!(
                "model declares {declared} bone remap batches, sections produced {}",
                batches.batches.len()
            );
        }

        mesh.remap = read_remap_table(&mut input, &batches)?;
        globalize_bone_indices(&mut mesh, &records)?;
        Ok(mesh)
    }
}

fn decode_section(
    input: &mut ByteCursor<'_>,
    mesh: &mut Mesh,
    record: &SectionRecord,
    index: usize,
    batches: &mut BatchBuilder,
) -> Result<Section, Error> {
    let first_vertex = mesh.vertices.len();
    let first_triangle = mesh.triangles.len();
    let base = first_vertex as u32;

    for j in 0..record.triangle_count {
        input.seek(record.triangle_start(j))?;
        let a = input.read_u16()? as u32 + base;
        let b = input.read_u16()? as u32 + base;
        let c = input.read_u16()? as u32 + base;
        mesh.triangles.push([a, b, c]);
    }

    let mut local_indices = BTreeSet::new();
    for j in 0..record.vert_count {
        input.seek(record.vertex_start(j))?;
        let position = input.read_vec3()?;
        let slots: [u8; 4] = input.read_bytes()?;
        local_indices.insert(slots[0]);
        local_indices.extend(slots[1..].iter().copied().filter(|&b| b != 0));

        let w = input.read_vec3()?;
        let normal = input.read_vec3()?;
        let _tangent = input.read_vec3()?;
        let _bitangent = input.read_vec3()?;
        let u = input.read_f16()?;
        let v = input.read_f16()?;

        mesh.vertices.push(MeshVertex {
            position,
            normal,
            uv: Vec2::new(u, 1.0 - v),
            bone_indices: slots.map(usize::from),
            bone_weights: [1.0 - w.x - w.y - w.z, w.x, w.y, w.z],
            section: index as u32,
        });
    }

    let batch = batches.push(&local_indices).ok_or_else(|| {
        Error::structural(
            format!("section {index}"),
            record.offset,
            format!("bone index set {local_indices:?} does not open a remap batch and no batch is open"),
        )
    })?;
    log::trace!(
        "section {index}: {} vertices, {} triangles, batch {batch}, local bones {local_indices:?}",
        record.vert_count,
        record.triangle_count
    );

    Ok(Section {
        first_vertex,
        vertex_count: record.vert_count,
        first_triangle,
        triangle_count: record.triangle_count,
        batch,
    })
}

fn read_remap_table(
    input: &mut ByteCursor<'_>,
    batches: &BatchBuilder,
) -> Result<BoneRemapTable, Error> {
    input.seek(REMAP_TABLE_OFFSET)?;
    let table_ptr = input.read_i32()?;
    let table_ptr = usize::try_from(table_ptr).map_err(|_| {
        Error::structural(
            "model header",
            REMAP_TABLE_OFFSET,
            format!("negative bone remap table pointer {table_ptr}"),
        )
    })?;
    input.seek(table_ptr).within(|| "bone remap table".to_string())?;

    let mut table = BoneRemapTable::default();
    for (batch, size) in batches.table_sizes().enumerate() {
        let mut globals = Vec::with_capacity(size);
        for _ in 0..size {
            let offset = input.position();
            let global = input
                .read_i16()
                .within(|| format!("bone remap batch {batch}"))?;
            let global = usize::try_from(global).map_err(|_| {
                Error::structural(
                    format!("bone remap batch {batch}"),
                    offset,
                    format!("negative global bone index {global}"),
                )
            })?;
            globals.push(global);
        }
        table.batches.push(globals);
    }
    Ok(table)
}

fn globalize_bone_indices(mesh: &mut Mesh, records: &[SectionRecord]) -> Result<(), Error> {
    for (i, (section, record)) in mesh.sections.iter().zip(records).enumerate() {
        let vertices = &mut mesh.vertices[section.first_vertex..][..section.vertex_count];
        for (j, vertex) in vertices.iter_mut().enumerate() {
            for slot in &mut vertex.bone_indices {
                let local = *slot;
                *slot = mesh.remap.resolve(section.batch, local).ok_or_else(|| {
                    Error::structural(
                        format!("section {i}, vertex {j}"),
                        record.vertex_start(j) + 12,
                        format!(
                            "local bone index {local} outside remap batch {} ({} entries)",
                            section.batch,
                            mesh.remap.batches[section.batch].len()
                        ),
                    )
                })?;
            }
        }
    }
    Ok(())
}

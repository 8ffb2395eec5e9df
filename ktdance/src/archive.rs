//! `.arc` containers and `.b2it` bone-name tables.
//!
//! Archives bundle a model with its bone names and textures. Entries are either
//! stored or compressed with a byte-oriented LZ scheme:
//!
//! ```text
//! control byte: 8 flags, least significant first
//!   flag 1 -> copy one literal byte
//!   flag 0 -> u16 big-endian token; 0 ends the stream, otherwise
//!             distance = token >> 4, length = (token & 0xF) + 3
//! ```

use crate::binary::ByteCursor;
use crate::{Error, ModelAsset};
use byteorder::{BigEndian, ByteOrder};
use std::borrow::Cow;

const ENTRY_TABLE_OFFSET: usize = 0x10;

const NAME_COUNT_OFFSET: usize = 0x10;
const NAME_INDEX_OFFSET: usize = 0x18;
const NAME_TABLE_OFFSET: usize = 0x20;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub offset: usize,
    /// Unpacked size.
    pub size: usize,
    /// Stored size; equal to `size` for uncompressed entries.
    pub packed_size: usize,
}

impl ArchiveEntry {
    pub fn is_compressed(&self) -> bool {
        self.size != self.packed_size
    }
}

#[derive(Clone, Debug)]
pub struct Archive<'a> {
    bytes: &'a [u8],
    pub version: u32,
    pub entries: Vec<ArchiveEntry>,
}

impl<'a> Archive<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        let mut input = ByteCursor::new(bytes);
        let _magic = input.read_u32()?;
        let version = input.read_u32()?;
        let file_count = input.read_offset()?;
        input.seek(ENTRY_TABLE_OFFSET)?;

        let mut raw = Vec::with_capacity(file_count.min(input.remaining() / 16));
        for _ in 0..file_count {
            let name_offset = input.read_offset()?;
            let offset = input.read_offset()?;
            let size = input.read_offset()?;
            let packed_size = input.read_offset()?;
            raw.push((name_offset, offset, size, packed_size));
        }

        let mut entries = Vec::with_capacity(raw.len());
        for (name_offset, offset, size, packed_size) in raw {
            input.seek(name_offset)?;
            let name = input.read_c_string()?;
            if offset.checked_add(packed_size).is_none_or(|end| end > bytes.len()) {
                return Err(Error::ArchiveParse {
                    message: format!(
                        "entry '{name}' ({packed_size} bytes at {offset:#x}) exceeds archive of {} bytes",
                        bytes.len()
                    ),
                });
            }
            entries.push(ArchiveEntry {
                name,
                offset,
                size,
                packed_size,
            });
        }
        log::debug!("archive v{version}: {} entries", entries.len());

        Ok(Self {
            bytes,
            version,
            entries,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// First entry whose name ends with `suffix` (e.g. `".model"`).
    pub fn entry_with_suffix(&self, suffix: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name.ends_with(suffix))
    }

    /// Returns the entry contents, decompressing when needed.
    pub fn read(&self, entry: &ArchiveEntry) -> Result<Cow<'a, [u8]>, Error> {
        let bytes: &'a [u8] = self.bytes;
        let stored = entry
            .offset
            .checked_add(entry.packed_size)
            .and_then(|end| bytes.get(entry.offset..end))
            .ok_or_else(|| Error::ArchiveParse {
                message: format!(
                    "entry '{}' ({} bytes at {:#x}) exceeds archive of {} bytes",
                    entry.name,
                    entry.packed_size,
                    entry.offset,
                    bytes.len()
                ),
            })?;
        if !entry.is_compressed() {
            return Ok(Cow::Borrowed(stored));
        }
        decompress(stored, entry.size)
            .map(Cow::Owned)
            .map_err(|e| match e {
                Error::ArchiveParse { message } => Error::ArchiveParse {
                    message: format!("entry '{}': {message}", entry.name),
                },
                other => other,
            })
    }
}

/// Expands an LZ-compressed entry; the result must be exactly `size` bytes.
pub fn decompress(data: &[u8], size: usize) -> Result<Vec<u8>, Error> {
    let eof = |at: usize| Error::ArchiveParse {
        message: format!("compressed stream ends early at {at:#x}"),
    };

    let mut out = Vec::with_capacity(size);
    let mut pos = 0usize;
    let mut control: u16 = 0;
    while pos < data.len() {
        if control & 0x100 == 0 {
            control = u16::from(data[pos]) | 0xFF00;
            pos += 1;
        }
        if control & 1 != 0 {
            out.push(*data.get(pos).ok_or_else(|| eof(pos))?);
            pos += 1;
        } else {
            let token = data.get(pos..pos + 2).ok_or_else(|| eof(pos))?;
            let token = BigEndian::read_u16(token);
            pos += 2;
            if token == 0 {
                break;
            }
            let distance = usize::from(token >> 4);
            let length = usize::from(token & 0xF) + 3;
            if distance == 0 {
                return Err(Error::ArchiveParse {
                    message: format!("zero back-reference distance at {:#x}", pos - 2),
                });
            }
            for _ in 0..length {
                // References before the start of the output read as zero.
                let byte = out
                    .len()
                    .checked_sub(distance)
                    .map(|i| out[i])
                    .unwrap_or(0);
                out.push(byte);
            }
        }
        control >>= 1;
    }

    if out.len() != size {
        return Err(Error::ArchiveParse {
            message: format!("decompressed {} bytes, expected {size}", out.len()),
        });
    }
    Ok(out)
}

/// Parses a `.b2it` table into bone names ordered by bone index.
pub fn parse_bone_names(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let mut input = ByteCursor::new(bytes);
    input.seek(NAME_COUNT_OFFSET)?;
    let count = input.read_offset()?;
    input.seek(NAME_INDEX_OFFSET)?;
    let index_ptr = input.read_offset()?;

    input.seek(NAME_TABLE_OFFSET)?;
    let starts = (0..count)
        .map(|_| input.read_offset())
        .collect::<Result<Vec<_>, _>>()?;
    let names = starts
        .into_iter()
        .map(|start| {
            input.seek(start)?;
            input.read_c_string()
        })
        .collect::<Result<Vec<_>, _>>()?;

    input.seek(index_ptr)?;
    let mut out = vec![String::new(); count];
    for name in names {
        let slot = input.read_offset()?;
        let Some(dst) = out.get_mut(slot) else {
            return Err(Error::structural(
                "bone name table",
                input.position() - 4,
                format!("bone slot {slot} outside a table of {count} names"),
            ));
        };
        *dst = name;
    }
    Ok(out)
}

impl ModelAsset {
    /// Decodes the `.model` entry of an archive and names its bones from the
    /// `.b2it` entry when one is present.
    pub fn from_archive(bytes: &[u8]) -> Result<Self, Error> {
        let archive = Archive::parse(bytes)?;
        let model = archive
            .entry_with_suffix(".model")
            .ok_or_else(|| Error::ArchiveParse {
                message: "archive has no .model entry".to_string(),
            })?;
        let mut asset = ModelAsset::from_bytes(&archive.read(model)?)?;

        if let Some(names) = archive.entry_with_suffix(".b2it") {
            let names = parse_bone_names(&archive.read(names)?)?;
            if names.len() != asset.skeleton.len() {
                log::warn!(
                    "bone name table has {} names for {} bones",
                    names.len(),
                    asset.skeleton.len()
                );
            }
            asset.skeleton = asset.skeleton.with_names(names);
        }
        Ok(asset)
    }
}

//! Key-level metadata encoding.
//!
//! Metadata attached to a ledger key (endorsement policies and the like) is
//! a list of named byte blobs. The state database stores the list as one
//! opaque value, so equal entry sets must always encode to identical bytes:
//! entries are sorted by name before encoding, and duplicate names are
//! rejected.
//!
//! ## Wire format (little-endian)
//!
//! ```text
//!   [entry_count: u32]
//!   per entry, in name order:
//!     [name_len: u32][name: utf8 bytes]
//!     [value_len: u32][value: bytes]
//! ```

use osprey_common::error::MetadataError;

/// One named metadata blob attached to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub name: String,
    pub value: Vec<u8>,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Encode an entry list to the canonical byte form stored in the state
/// database. Entry order in the input is irrelevant.
pub fn serialize(entries: &[MetadataEntry]) -> Result<Vec<u8>, MetadataError> {
    let mut sorted: Vec<&MetadataEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for pair in sorted.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(MetadataError::DuplicateEntry(pair[0].name.clone()));
        }
    }

    let mut buf = Vec::with_capacity(4 + entries.len() * 16);
    buf.extend_from_slice(&(sorted.len() as u32).to_le_bytes());
    for entry in sorted {
        if entry.name.is_empty() {
            return Err(MetadataError::EmptyName);
        }
        buf.extend_from_slice(&(entry.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(entry.name.as_bytes());
        buf.extend_from_slice(&(entry.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&entry.value);
    }
    Ok(buf)
}

/// Decode a metadata blob previously produced by [`serialize`].
pub fn deserialize(raw: &[u8]) -> Result<Vec<MetadataEntry>, MetadataError> {
    let mut cursor = Cursor { raw, pos: 0 };
    let count = cursor.read_u32()? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let name_bytes = cursor.read_blob()?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| MetadataError::InvalidName)?
            .to_string();
        let value = cursor.read_blob()?.to_vec();
        entries.push(MetadataEntry { name, value });
    }
    Ok(entries)
}

struct Cursor<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_u32(&mut self) -> Result<u32, MetadataError> {
        let end = self.pos + 4;
        let bytes: [u8; 4] = self
            .raw
            .get(self.pos..end)
            .and_then(|b| b.try_into().ok())
            .ok_or(MetadataError::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_blob(&mut self) -> Result<&'a [u8], MetadataError> {
        let len = self.read_u32()? as usize;
        let end = self.pos + len;
        let bytes = self
            .raw
            .get(self.pos..end)
            .ok_or(MetadataError::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(bytes)
    }
}

//! In-memory named-entry archive with file I/O.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use bevy::log::info;

use super::format::{EntryRecord, Header, MAX_NAME_LEN};
use crate::error::{SimError, SimResult};

/// Pseudo entry name used for errors about the archive itself.
pub const ARCHIVE_ENTRY: &str = "<archive>";

/// Named binary entries, kept sorted by name so writes are reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapArchive {
  seed: u64,
  entries: BTreeMap<String, Vec<u8>>,
}

fn truncated(e: io::Error) -> SimError {
  if e.kind() == io::ErrorKind::UnexpectedEof {
    SimError::corrupt(ARCHIVE_ENTRY, "truncated archive")
  } else {
    SimError::corrupt(ARCHIVE_ENTRY, e)
  }
}

impl MapArchive {
  pub fn new(seed: u64) -> Self {
    Self {
      seed,
      entries: BTreeMap::new(),
    }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn set_seed(&mut self, seed: u64) {
    self.seed = seed;
  }

  /// Stores `data` under `name`, replacing any previous payload.
  pub fn insert(&mut self, name: &str, data: Vec<u8>) -> SimResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
      return Err(SimError::corrupt(name, "entry name must be 1-255 bytes"));
    }
    self.entries.insert(name.to_string(), data);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&[u8]> {
    self.entries.get(name).map(Vec::as_slice)
  }

  /// Payload of `name`, or [`SimError::CorruptMapData`] if absent.
  pub fn entry(&self, name: &str) -> SimResult<&[u8]> {
    self
      .get(name)
      .ok_or_else(|| SimError::corrupt(name, "entry not found"))
  }

  pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
    self.entries.remove(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Serializes header, entry table and data region.
  pub fn write_to<W: Write>(&self, writer: &mut W) -> SimResult<()> {
    let mut records = Vec::with_capacity(self.entries.len());
    let mut offset = 0u64;
    for (name, data) in &self.entries {
      records.push(EntryRecord::new(name, offset, data));
      offset += data.len() as u64;
    }
    let table_size: usize = records.iter().map(EntryRecord::encoded_len).sum();

    let mut header = Header::new(self.seed);
    header.entry_count = records.len() as u32;
    header.table_size = table_size as u32;
    header.data_offset = (Header::SIZE + table_size) as u64;

    header.write_to(writer)?;
    for record in &records {
      record.write_to(writer)?;
    }
    for data in self.entries.values() {
      writer.write_all(data)?;
    }
    Ok(())
  }

  /// Parses an archive, verifying every entry checksum.
  pub fn read_from<R: Read>(reader: &mut R) -> SimResult<Self> {
    let header = Header::read_from(reader).map_err(truncated)?;
    header
      .validate()
      .map_err(|e| SimError::corrupt(ARCHIVE_ENTRY, e))?;

    // Header sizes are untrusted, so nothing is reserved from them up front.
    if header.entry_count as usize > header.table_size as usize / EntryRecord::FIXED {
      return Err(SimError::corrupt(
        ARCHIVE_ENTRY,
        format!(
          "{} entries cannot fit a {} byte table",
          header.entry_count, header.table_size
        ),
      ));
    }
    let mut table = Vec::new();
    reader
      .by_ref()
      .take(header.table_size as u64)
      .read_to_end(&mut table)
      .map_err(truncated)?;
    if table.len() != header.table_size as usize {
      return Err(SimError::corrupt(ARCHIVE_ENTRY, "truncated archive"));
    }
    let mut cursor = Cursor::new(table.as_slice());
    let mut records = Vec::new();
    for _ in 0..header.entry_count {
      records.push(EntryRecord::read_from(&mut cursor).map_err(truncated)?);
    }

    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut entries = BTreeMap::new();
    for record in records {
      let start = record.offset as usize;
      let end = start.saturating_add(record.size as usize);
      let payload = data
        .get(start..end)
        .ok_or_else(|| SimError::corrupt(&record.name, "payload outside data region"))?;
      if !record.validate_checksum(payload) {
        return Err(SimError::corrupt(&record.name, "checksum mismatch"));
      }
      entries.insert(record.name, payload.to_vec());
    }

    Ok(Self {
      seed: header.seed,
      entries,
    })
  }

  /// Reads an archive file.
  pub fn open(path: &Path) -> SimResult<Self> {
    let bytes = fs::read(path)?;
    let archive = Self::read_from(&mut Cursor::new(bytes))?;
    info!(
      "Opened archive {} ({} entries)",
      path.display(),
      archive.len()
    );
    Ok(archive)
  }

  /// Writes the archive to `path` through a sibling temp file, so a failed
  /// write never leaves a half-written archive behind.
  pub fn save(&self, path: &Path) -> SimResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    let mut bytes = Vec::new();
    self.write_to(&mut bytes)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    info!("Saved archive {} ({} bytes)", path.display(), bytes.len());
    Ok(())
  }
}

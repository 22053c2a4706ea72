//! Binary format types for map archives.
//!
//! Defines the on-disk layout of an archive file:
//! - [`Header`]: 32-byte file header with magic, version and table metadata
//! - [`EntryRecord`]: variable-size table record mapping an entry name to its
//!   payload range
//!
//! All integers are little-endian.

use std::io::{self, Read, Write};

/// Magic bytes identifying a sandbox archive ("SBXA").
pub const MAGIC: u32 = 0x4158_4253;

/// Current format version.
pub const VERSION: u16 = 1;

/// Longest entry name in bytes.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

fn le<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
  let mut out = [0u8; N];
  out.copy_from_slice(&buf[at..at + N]);
  out
}

/// File header (32 bytes, fixed size).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
  /// Magic number (0x41584253 = "SBXA").
  pub magic: u32,
  /// Format version for migration.
  pub version: u16,
  /// Feature flags, currently unused.
  pub flags: u16,
  /// Number of table records.
  pub entry_count: u32,
  /// Bytes occupied by the entry table.
  pub table_size: u32,
  /// File offset where the data region starts.
  pub data_offset: u64,
  /// Session seed the archived map was generated with.
  pub seed: u64,
}

impl Header {
  /// Header size in bytes.
  pub const SIZE: usize = 32;

  pub fn new(seed: u64) -> Self {
    Self {
      magic: MAGIC,
      version: VERSION,
      flags: 0,
      entry_count: 0,
      table_size: 0,
      data_offset: Self::SIZE as u64,
      seed,
    }
  }

  pub fn validate(&self) -> Result<(), HeaderError> {
    if self.magic != MAGIC {
      return Err(HeaderError::InvalidMagic(self.magic));
    }
    if self.version == 0 || self.version > VERSION {
      return Err(HeaderError::UnsupportedVersion(self.version));
    }
    let expected = Self::SIZE as u64 + self.table_size as u64;
    if self.data_offset != expected {
      return Err(HeaderError::BadDataOffset {
        found: self.data_offset,
        expected,
      });
    }
    Ok(())
  }

  pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
    writer.write_all(&self.magic.to_le_bytes())?;
    writer.write_all(&self.version.to_le_bytes())?;
    writer.write_all(&self.flags.to_le_bytes())?;
    writer.write_all(&self.entry_count.to_le_bytes())?;
    writer.write_all(&self.table_size.to_le_bytes())?;
    writer.write_all(&self.data_offset.to_le_bytes())?;
    writer.write_all(&self.seed.to_le_bytes())?;
    Ok(())
  }

  pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
    let mut buf = [0u8; Self::SIZE];
    reader.read_exact(&mut buf)?;

    Ok(Self {
      magic: u32::from_le_bytes(le(&buf, 0)),
      version: u16::from_le_bytes(le(&buf, 4)),
      flags: u16::from_le_bytes(le(&buf, 6)),
      entry_count: u32::from_le_bytes(le(&buf, 8)),
      table_size: u32::from_le_bytes(le(&buf, 12)),
      data_offset: u64::from_le_bytes(le(&buf, 16)),
      seed: u64::from_le_bytes(le(&buf, 24)),
    })
  }
}

/// Header validation errors.
#[derive(Debug)]
pub enum HeaderError {
  InvalidMagic(u32),
  UnsupportedVersion(u16),
  BadDataOffset { found: u64, expected: u64 },
}

impl std::fmt::Display for HeaderError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::InvalidMagic(m) => write!(f, "invalid magic number: 0x{:08X}", m),
      Self::UnsupportedVersion(v) => write!(f, "unsupported version: {}", v),
      Self::BadDataOffset { found, expected } => {
        write!(f, "data region at {}, expected {}", found, expected)
      }
    }
  }
}

impl std::error::Error for HeaderError {}

/// Updates a CRC8 value with a new byte using polynomial 0x07 (CRC-8-CCITT).
fn crc8_update(crc: &mut u8, byte: u8) {
  *crc ^= byte;
  for _ in 0..8 {
    *crc = if *crc & 0x80 != 0 {
      (*crc << 1) ^ 0x07
    } else {
      *crc << 1
    };
  }
}

/// CRC8 of a byte slice.
pub fn crc8(data: &[u8]) -> u8 {
  let mut crc = 0;
  for &byte in data {
    crc8_update(&mut crc, byte);
  }
  crc
}

/// Entry table record: `name_len u8, name, offset u64, size u32, crc u8`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRecord {
  pub name: String,
  /// Offset into the data region.
  pub offset: u64,
  /// Payload size in bytes.
  pub size: u32,
  /// CRC8 of the payload.
  pub checksum: u8,
}

impl EntryRecord {
  /// Fixed bytes besides the name.
  pub const FIXED: usize = 1 + 8 + 4 + 1;

  pub fn new(name: &str, offset: u64, payload: &[u8]) -> Self {
    Self {
      name: name.to_string(),
      offset,
      size: payload.len() as u32,
      checksum: crc8(payload),
    }
  }

  /// Serialized size of this record.
  pub fn encoded_len(&self) -> usize {
    Self::FIXED + self.name.len()
  }

  pub fn validate_checksum(&self, payload: &[u8]) -> bool {
    payload.len() == self.size as usize && crc8(payload) == self.checksum
  }

  pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
    if self.name.len() > MAX_NAME_LEN {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("entry name {:?} longer than {} bytes", self.name, MAX_NAME_LEN),
      ));
    }
    writer.write_all(&[self.name.len() as u8])?;
    writer.write_all(self.name.as_bytes())?;
    writer.write_all(&self.offset.to_le_bytes())?;
    writer.write_all(&self.size.to_le_bytes())?;
    writer.write_all(&[self.checksum])?;
    Ok(())
  }

  pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
    let mut len = [0u8; 1];
    reader.read_exact(&mut len)?;
    let mut name = vec![0u8; len[0] as usize];
    reader.read_exact(&mut name)?;
    let name = String::from_utf8(name)
      .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut buf = [0u8; Self::FIXED - 1];
    reader.read_exact(&mut buf)?;
    Ok(Self {
      name,
      offset: u64::from_le_bytes(le(&buf, 0)),
      size: u32::from_le_bytes(le(&buf, 8)),
      checksum: buf[12],
    })
  }
}

//! Encoding of a map buffer as an archive entry.
//!
//! Layout: a 16-byte [`MapEntryHeader`] followed by the LZ4 block (size
//! prepended) of the pixel rows. Rows are stored bottom-up and padded to a
//! 4-byte aligned stride, one byte per pixel.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::error::{SimError, SimResult};
use crate::map::MapBuffer;
use crate::map::descriptor::MAX_MAP_DIMENSION;

/// Default entry name of the landscape map.
pub const MAP_ENTRY: &str = "Map";

/// Magic bytes of a map entry ("MAP8").
pub const MAP_MAGIC: u32 = 0x3850_414D;

/// Rounds a row width up to the next multiple of four bytes.
#[inline]
pub fn aligned_stride(width: u32) -> u32 {
  width.div_ceil(4) * 4
}

/// Map entry header (16 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapEntryHeader {
  pub magic: u32,
  /// Signed so that corrupt negative sizes can be reported as such.
  pub width: i32,
  pub height: i32,
  /// Bytes per stored row.
  pub stride: u32,
}

impl MapEntryHeader {
  pub const SIZE: usize = 16;

  pub fn new(width: u32, height: u32) -> Self {
    Self {
      magic: MAP_MAGIC,
      width: width as i32,
      height: height as i32,
      stride: aligned_stride(width),
    }
  }

  pub fn to_bytes(&self) -> [u8; Self::SIZE] {
    let mut out = [0u8; Self::SIZE];
    out[0..4].copy_from_slice(&self.magic.to_le_bytes());
    out[4..8].copy_from_slice(&self.width.to_le_bytes());
    out[8..12].copy_from_slice(&self.height.to_le_bytes());
    out[12..16].copy_from_slice(&self.stride.to_le_bytes());
    out
  }

  pub fn from_bytes(entry: &str, bytes: &[u8]) -> SimResult<Self> {
    if bytes.len() < Self::SIZE {
      return Err(SimError::corrupt(entry, "truncated map header"));
    }
    let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
    Ok(Self {
      magic: u32::from_le_bytes(word(0)),
      width: i32::from_le_bytes(word(4)),
      height: i32::from_le_bytes(word(8)),
      stride: u32::from_le_bytes(word(12)),
    })
  }

  /// Checks magic, dimensions and stride.
  pub fn validate(&self, entry: &str) -> SimResult<()> {
    if self.magic != MAP_MAGIC {
      return Err(SimError::corrupt(
        entry,
        format!("invalid map magic 0x{:08X}", self.magic),
      ));
    }
    if self.width <= 0 || self.height <= 0 {
      return Err(SimError::corrupt(
        entry,
        format!("non-positive map size {}x{}", self.width, self.height),
      ));
    }
    if self.width as u32 > MAX_MAP_DIMENSION || self.height as u32 > MAX_MAP_DIMENSION {
      return Err(SimError::corrupt(
        entry,
        format!(
          "map size {}x{} exceeds {} pixels per edge",
          self.width, self.height, MAX_MAP_DIMENSION
        ),
      ));
    }
    if self.stride < self.width as u32 {
      return Err(SimError::corrupt(
        entry,
        format!("row stride {} below width {}", self.stride, self.width),
      ));
    }
    if self.stride > aligned_stride(MAX_MAP_DIMENSION) {
      return Err(SimError::corrupt(
        entry,
        format!("row stride {} is too large", self.stride),
      ));
    }
    Ok(())
  }
}

/// Encodes the visible pixels of `buffer`.
pub fn encode_map(buffer: &MapBuffer) -> Vec<u8> {
  let header = MapEntryHeader::new(buffer.width(), buffer.height());
  let stride = header.stride as usize;
  let mut rows = vec![0u8; stride * buffer.height() as usize];
  for (i, y) in (0..buffer.height()).rev().enumerate() {
    let dst = &mut rows[i * stride..i * stride + buffer.width() as usize];
    dst.copy_from_slice(buffer.row(y));
  }

  let mut out = header.to_bytes().to_vec();
  out.extend_from_slice(&compress_prepend_size(&rows));
  out
}

/// Decodes a map entry into a buffer with a 4-byte aligned stride.
///
/// Pixel values are taken as stored; use
/// [`validate_texture_indices`](crate::map::validate_texture_indices) before
/// trusting them.
pub fn decode_map(entry: &str, bytes: &[u8]) -> SimResult<MapBuffer> {
  let header = MapEntryHeader::from_bytes(entry, bytes)?;
  header.validate(entry)?;

  let width = header.width as u32;
  let height = header.height as u32;
  let src_stride = header.stride as usize;
  let expected = src_stride
    .checked_mul(height as usize)
    .ok_or_else(|| SimError::corrupt(entry, "map size overflows"))?;
  // The block claims its own decompressed size; check it before allocating.
  let block = &bytes[MapEntryHeader::SIZE..];
  let claimed = block
    .get(..4)
    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    .ok_or_else(|| SimError::corrupt(entry, "truncated pixel block"))?;
  if claimed != expected {
    return Err(SimError::corrupt(
      entry,
      format!("{} pixel bytes, expected {}", claimed, expected),
    ));
  }
  let rows = decompress_size_prepended(block)
    .map_err(|e| SimError::corrupt(entry, format!("decompression failed: {}", e)))?;
  if rows.len() != expected {
    return Err(SimError::corrupt(
      entry,
      format!("{} pixel bytes, expected {}", rows.len(), expected),
    ));
  }

  let stride = aligned_stride(width) as usize;
  let mut data = vec![0u8; stride * height as usize];
  for (i, src) in rows.chunks_exact(src_stride).enumerate() {
    let y = height as usize - 1 - i;
    data[y * stride..y * stride + width as usize].copy_from_slice(&src[..width as usize]);
  }
  MapBuffer::from_raw(width, height, stride as u32, data)
    .ok_or_else(|| SimError::corrupt(entry, "inconsistent map layout"))
}

//! Map persistence: named-entry archives and the map entry codec.
//!
//! An archive holds any number of named binary entries. The landscape map is
//! stored under [`MAP_ENTRY`] as an indexed-pixel grid, see [`map_entry`].

pub mod archive;
pub mod format;
pub mod map_entry;

pub use archive::{ARCHIVE_ENTRY, MapArchive};
pub use map_entry::{MAP_ENTRY, aligned_stride, decode_map, encode_map};

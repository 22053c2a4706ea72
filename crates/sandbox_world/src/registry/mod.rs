//! Material and texture registry.
//!
//! [`Materials`] holds material properties; [`TextureMap`] assigns the packed
//! 7-bit indices stored in map pixels and resolves them back to materials.

pub mod material;
pub mod texture;

pub use material::{Incineration, Material, Materials, MaterialsConfig, Solidity};
pub use texture::{DEFAULT_TEXTURE, TextureEntry, TextureMap, TextureMapConfig};

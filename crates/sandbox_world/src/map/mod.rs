//! Landscape map: pixel buffer, descriptor, generation and loading.

pub mod buffer;
pub mod creator;
pub mod descriptor;
pub mod surface;
pub mod validate;

pub use buffer::{BoundsPolicy, MapBuffer};
pub use creator::{CreateOptions, GeneratedMap, LoadedMap, MapCreator, MapLayers};
pub use descriptor::{LandscapeDescriptor, LayerRule, Plane, RectSpec, RuleShape, SurfaceSpec};
pub use validate::{ValidationReport, validate_texture_indices};

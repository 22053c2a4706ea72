//! Sandbox World - landscape generation and object scheduling for a 2D
//! physics sandbox, with a Bevy plugin to run it.
//!
//! The map is an indexed pixel grid resolved through a texture/material
//! registry. Objects are driven by a tick scheduler of effects and actions;
//! interaction rules return requests that the scheduler applies.

pub mod config;
pub mod coords;
pub mod error;
pub mod hash;
pub mod interaction;
pub mod landscape;
pub mod map;
pub mod persistence;
pub mod plugin;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod simulation;

pub use config::{ArchiveConfig, SessionConfig};
pub use coords::{IFT_BIT, MAX_TEX_INDEX, MapPixel, MaterialId, TexIndex};
pub use error::{SimError, SimResult};
pub use interaction::{
  Capabilities, CollectDecision, ContactResponse, InteractionRequest, InventoryRules,
  PowerGenerator, RejectReason, check_collect, contact_response, resolve_contact,
};
pub use landscape::{DEFAULT_MAP_ZOOM, Landscape};
pub use map::{
  BoundsPolicy, CreateOptions, GeneratedMap, LandscapeDescriptor, LayerRule, LoadedMap, MapBuffer,
  MapCreator, MapLayers, Plane, RuleShape, SurfaceSpec, ValidationReport, validate_texture_indices,
};
pub use persistence::{MAP_ENTRY, MapArchive};
pub use plugin::{SandboxSet, SandboxWorldPlugin};
pub use registry::{Material, Materials, MaterialsConfig, TextureMap, TextureMapConfig};
pub use scheduler::{
  ClassRegistry, EffectControl, EffectHandler, EffectId, ObjectClass, ObjectId, ObjectState,
  Scheduler, World,
};
pub use session::{MapSource, SessionControl, SessionState};
pub use simulation::Simulation;

//! Error taxonomy for landscape and scheduling operations.

use std::fmt;

use crate::scheduler::ObjectId;

/// Errors produced by the registry, map, persistence and scheduler layers.
#[derive(Debug)]
pub enum SimError {
  /// A material or texture name has no registration.
  UnknownMaterial { name: String },
  /// A texture index has no registration.
  UnknownTexIndex { index: u8 },
  /// Buffer access outside `width x height` under the strict bounds policy.
  OutOfBounds {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
  },
  /// A persisted map entry is absent, malformed or has bad dimensions.
  CorruptMapData { entry: String, reason: String },
  /// An action table references an undefined action or is malformed.
  InvalidActionState { class: String, action: String },
  /// No object class of this name is registered.
  UnknownClass { name: String },
  /// The object an effect or action was addressed to no longer exists.
  EffectHostGone { object: ObjectId },
  /// The landscape descriptor cannot produce a map.
  InvalidDescriptor { reason: String },
  /// A configuration file does not parse or serialize.
  InvalidConfig { reason: String },
  /// Underlying I/O failure.
  Io(std::io::Error),
}

impl SimError {
  pub(crate) fn corrupt(entry: &str, reason: impl fmt::Display) -> Self {
    Self::CorruptMapData {
      entry: entry.to_string(),
      reason: reason.to_string(),
    }
  }

  pub(crate) fn unknown_material(name: impl Into<String>) -> Self {
    Self::UnknownMaterial { name: name.into() }
  }

  pub(crate) fn invalid_descriptor(reason: impl Into<String>) -> Self {
    Self::InvalidDescriptor {
      reason: reason.into(),
    }
  }
}

impl fmt::Display for SimError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UnknownMaterial { name } => write!(f, "unknown material: {}", name),
      Self::UnknownTexIndex { index } => write!(f, "unknown material: texture index {}", index),
      Self::OutOfBounds {
        x,
        y,
        width,
        height,
      } => write!(f, "pixel ({}, {}) out of bounds for {}x{} map", x, y, width, height),
      Self::CorruptMapData { entry, reason } => {
        write!(f, "corrupt map data in entry {:?}: {}", entry, reason)
      }
      Self::InvalidActionState { class, action } => {
        write!(f, "invalid action state {:?} for class {:?}", action, class)
      }
      Self::UnknownClass { name } => write!(f, "unknown object class: {}", name),
      Self::EffectHostGone { object } => write!(f, "host object {} is gone", object),
      Self::InvalidDescriptor { reason } => write!(f, "invalid landscape descriptor: {}", reason),
      Self::InvalidConfig { reason } => write!(f, "invalid configuration: {}", reason),
      Self::Io(e) => write!(f, "i/o error: {}", e),
    }
  }
}

impl std::error::Error for SimError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<toml::de::Error> for SimError {
  fn from(e: toml::de::Error) -> Self {
    Self::InvalidConfig {
      reason: e.to_string(),
    }
  }
}

impl From<toml::ser::Error> for SimError {
  fn from(e: toml::ser::Error) -> Self {
    Self::InvalidConfig {
      reason: e.to_string(),
    }
  }
}

impl From<std::io::Error> for SimError {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

pub type SimResult<T> = Result<T, SimError>;

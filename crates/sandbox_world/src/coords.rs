//! Index types shared by the registry, map buffer and persistence layers.

use serde::{Deserialize, Serialize};

/// Highest texture index a map pixel can carry (7 bits).
pub const MAX_TEX_INDEX: u8 = 0x7F;

/// Bit marking a map pixel as interior material (tunnel background behind
/// it once dug out).
pub const IFT_BIT: u8 = 0x80;

/// Position of a material in the [`Materials`](crate::Materials) table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct MaterialId(pub u8);

impl MaterialId {
  /// The sky material, always registered first.
  pub const SKY: Self = Self(0);
}

/// Texture-map entry index (0..=127). Index 0 is the sky sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct TexIndex(pub u8);

impl TexIndex {
  pub const SKY: Self = Self(0);

  #[inline]
  pub fn is_sky(self) -> bool {
    self.0 == 0
  }
}

/// One map pixel: texture index in the low 7 bits, IFT flag in the high bit.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MapPixel(pub u8);

impl MapPixel {
  /// Background sentinel used for reset and out-of-bounds reads.
  pub const SKY: Self = Self(0);

  /// Creates a pixel from a texture index and IFT flag.
  #[inline]
  pub fn new(tex: TexIndex, ift: bool) -> Self {
    let bits = tex.0 & MAX_TEX_INDEX;
    Self(if ift { bits | IFT_BIT } else { bits })
  }

  /// Texture index with the IFT bit stripped.
  #[inline]
  pub fn tex(self) -> TexIndex {
    TexIndex(self.0 & MAX_TEX_INDEX)
  }

  #[inline]
  pub fn is_ift(self) -> bool {
    self.0 & IFT_BIT != 0
  }

  #[inline]
  pub fn is_sky(self) -> bool {
    self.tex().is_sky()
  }

  /// Returns the same pixel with the IFT bit set or cleared.
  #[inline]
  pub fn with_ift(self, ift: bool) -> Self {
    Self::new(self.tex(), ift)
  }
}

impl From<TexIndex> for MapPixel {
  fn from(tex: TexIndex) -> Self {
    Self::new(tex, false)
  }
}

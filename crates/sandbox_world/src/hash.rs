//! Deterministic hash functions and the counter-based map generator RNG.
//!
//! Every random decision in map generation flows through these functions so
//! that all participants of a multiplayer session produce bit-identical
//! landscapes from the same seed. No platform float math is involved.
//!
//! Naming follows `hash{inputs}{outputs}uu64`: unsigned 64-bit in and out.

/// FNV-1a style mixing for 64-bit values.
#[inline]
fn mix64(mut h: u64) -> u64 {
  h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
  h ^= h >> 32;
  h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
  h ^= h >> 32;
  h
}

#[inline]
pub fn hash11uu64(a: u64) -> u64 {
  mix64(a)
}

#[inline]
pub fn hash21uu64(a: u64, b: u64) -> u64 {
  mix64(a ^ b.rotate_left(32))
}

#[inline]
pub fn hash31uu64(a: u64, b: u64, c: u64) -> u64 {
  mix64(a ^ b.rotate_left(21) ^ c.rotate_left(42))
}

#[inline]
pub fn hash41uu64(a: u64, b: u64, c: u64, d: u64) -> u64 {
  mix64(a ^ b.rotate_left(16) ^ c.rotate_left(32) ^ d.rotate_left(48))
}

/// Counter-based generator: value `n` is `hash(seed, stream, n)`.
///
/// Independent streams (one per descriptor rule) keep a rule's output stable
/// when rules before it change their random draw count.
#[derive(Clone, Debug)]
pub struct MapRng {
  seed: u64,
  stream: u64,
  counter: u64,
}

impl MapRng {
  pub fn new(seed: u64) -> Self {
    Self::with_stream(seed, 0)
  }

  pub fn with_stream(seed: u64, stream: u64) -> Self {
    Self {
      seed,
      stream,
      counter: 0,
    }
  }

  /// Derives an independent generator for a sub-task.
  pub fn fork(&self, stream: u64) -> Self {
    Self::with_stream(hash21uu64(self.seed, self.stream), stream)
  }

  #[inline]
  pub fn next_u64(&mut self) -> u64 {
    let value = hash31uu64(self.seed, self.stream, self.counter);
    self.counter = self.counter.wrapping_add(1);
    value
  }

  /// Uniform value in `0..n`. Returns 0 when `n <= 0`.
  #[inline]
  pub fn below(&mut self, n: i32) -> i32 {
    if n <= 0 {
      // Keep the draw count independent of the argument.
      self.next_u64();
      return 0;
    }
    (self.next_u64() % n as u64) as i32
  }

  /// Uniform value in `lo..=hi` (bounds may be given in either order).
  #[inline]
  pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    lo + self.below(hi - lo + 1)
  }
}

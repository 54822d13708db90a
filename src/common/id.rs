//! Ring identifiers and the modular identifier space they live in.
use std::fmt::{self, Debug, Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The widest identifier space supported, identifiers are stored in a `u64`.
pub const MAX_BITS: u32 = 64;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// A peer identifier or a hashed lookup key on the ring.
///
/// Ordering is plain integer ordering, circular ordering is measured through
/// [IdSpace::distance_forward].
pub struct Id(pub u64);

impl Id {
    /// Returns the raw integer value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Id(value)
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
/// Modular identifier space of size `2^m`.
pub struct IdSpace {
    bits: u32,
    mask: u64,
}

impl IdSpace {
    /// Create a space of `bits` bits. Returns Err if `bits` is not in `1..=64`.
    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > MAX_BITS {
            return Err(Error::InvalidBitWidth(bits));
        }

        let mask = if bits == MAX_BITS {
            u64::MAX
        } else {
            (1 << bits) - 1
        };

        Ok(IdSpace { bits, mask })
    }

    // === Getters ===

    /// Bit width `m` of this space, also the length of every finger table.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of identifiers in the space, `2^m`.
    pub fn size(&self) -> u128 {
        1u128 << self.bits
    }

    /// Largest identifier in the space.
    pub fn max_id(&self) -> Id {
        Id(self.mask)
    }

    // === Public Methods ===

    /// Reduce any integer into the space, `x mod 2^m`.
    pub fn reduce(&self, x: u64) -> Id {
        Id(x & self.mask)
    }

    /// Forward (clockwise) distance from `a` to `b`, `(b - a) mod 2^m`.
    ///
    /// Distance to self is 0.
    pub fn distance_forward(&self, a: Id, b: Id) -> u64 {
        b.0.wrapping_sub(a.0) & self.mask
    }

    /// Target of the `i`-th finger of `n`, `(n + 2^i) mod 2^m`.
    ///
    /// `2^64` is a multiple of `2^m`, so wrapping addition followed by the mask is exact.
    pub fn finger_target(&self, n: Id, i: u32) -> Id {
        debug_assert!(i < self.bits);
        self.reduce(n.0.wrapping_add(1u64 << i))
    }

    /// Returns a uniformly random identifier in this space.
    pub fn random_id(&self) -> Id {
        let mut rng = rand::thread_rng();
        self.reduce(rng.gen())
    }
}

impl Debug for IdSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "IdSpace(2^{})", self.bits)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_bit_width() {
        assert!(matches!(IdSpace::new(0), Err(Error::InvalidBitWidth(0))));
        assert!(matches!(IdSpace::new(65), Err(Error::InvalidBitWidth(65))));
        assert!(IdSpace::new(1).is_ok());
        assert!(IdSpace::new(64).is_ok());
    }

    #[test]
    fn reduce() {
        let space = IdSpace::new(7).unwrap();

        assert_eq!(space.size(), 128);
        assert_eq!(space.reduce(144), Id(16));
        assert_eq!(space.reduce(127), Id(127));
        assert_eq!(space.reduce(128), Id(0));
        assert_eq!(space.max_id(), Id(127));
    }

    #[test]
    fn distance_forward() {
        let space = IdSpace::new(7).unwrap();

        assert_eq!(space.distance_forward(Id(80), Id(80)), 0);
        assert_eq!(space.distance_forward(Id(80), Id(96)), 16);
        // Wraps around the top of the ring.
        assert_eq!(space.distance_forward(Id(112), Id(16)), 32);
        assert_eq!(space.distance_forward(Id(16), Id(112)), 96);
    }

    #[test]
    fn finger_target_wraps() {
        let space = IdSpace::new(7).unwrap();

        assert_eq!(space.finger_target(Id(80), 0), Id(81));
        assert_eq!(space.finger_target(Id(80), 5), Id(112));
        assert_eq!(space.finger_target(Id(80), 6), Id(16));
    }

    #[test]
    fn full_width_space() {
        let space = IdSpace::new(64).unwrap();

        assert_eq!(space.size(), 1u128 << 64);
        assert_eq!(space.reduce(u64::MAX), Id(u64::MAX));
        assert_eq!(space.distance_forward(Id(u64::MAX), Id(1)), 2);
        assert_eq!(space.finger_target(Id(u64::MAX), 63), Id((1 << 63) - 1));
    }

    #[test]
    fn random_id_in_range() {
        let space = IdSpace::new(9).unwrap();

        for _ in 0..1000 {
            assert!(space.random_id().value() < 512);
        }
    }
}

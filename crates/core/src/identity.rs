#![warn(missing_docs)]

//! This module defines the identity of an overlay node and the circular
//! space identities live in.
//!
//! An [Identity] is the pair `(locality, local_key)`. The locality is the
//! coarse, high-order component and lies in `[0, L)`. The local key is a
//! fixed-point fraction of the per-locality key space: the real number
//! `local_key / 2^64` scaled to `[0, K)`. Arithmetic on local keys is
//! therefore plain wrapping `u64` arithmetic.
//!
//! ## Circular model
//!
//! The position of an identity is `locality * 2^64 + local_key`, a point on a
//! circle of size `S = L * 2^64`. Every metric of the overlay is derived from
//! this one circle:
//!
//! * [IdentitySpace::clockwise] is the directed offset `(b - a) mod S`, used by
//!   ring insertion to decide whether a node falls between two neighbours.
//! * [IdentitySpace::distance] is the shortest signed offset from `a` to `b`,
//!   in `(-S/2, S/2]`. Greedy routing minimises its absolute value.
//! * [IdentitySpace::order] is the sign of the distance, so the two never
//!   disagree.
//! * Chord targets are computed by rotating a position around the circle.
//!
//! The exact antipode of `a` is at distance `+S/2` from `a` and `a` is at
//! distance `+S/2` from it, so `order` is `1` in both directions there.

use std::str::FromStr;

use rand::Rng;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::consts::DEFAULT_LOCALITIES;
use crate::error::Error;
use crate::error::Result;

/// Identity of a node, totally ordered by `(locality, local_key)`.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Hash)]
pub struct Identity {
    /// Coarse component in `[0, L)`.
    pub locality: u32,
    /// Fine component, a fixed-point fraction of the local key space.
    pub local_key: u64,
}

impl Identity {
    /// Create an identity from its two components.
    pub fn new(locality: u32, local_key: u64) -> Self {
        Self {
            locality,
            local_key,
        }
    }

    /// Position on the identity circle, `locality * 2^64 + local_key`.
    pub fn position(&self) -> u128 {
        ((self.locality as u128) << 64) | self.local_key as u128
    }

    /// Big-endian bytes of the identity, locality first.
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[..4].copy_from_slice(&self.locality.to_be_bytes());
        buf[4..].copy_from_slice(&self.local_key.to_be_bytes());
        buf
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{:016x}", self.locality, self.local_key)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (locality, local_key) = s
            .split_once(':')
            .ok_or_else(|| Error::IdentityParse(s.to_string()))?;
        let locality = locality
            .parse::<u32>()
            .map_err(|_| Error::BadLocalityInIdentity(s.to_string()))?;
        let local_key = u64::from_str_radix(local_key, 16)
            .map_err(|_| Error::BadHexInIdentity(s.to_string()))?;
        Ok(Self::new(locality, local_key))
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Identity::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The circle all identities of one overlay live on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdentitySpace {
    localities: u32,
}

impl Default for IdentitySpace {
    fn default() -> Self {
        Self {
            localities: DEFAULT_LOCALITIES,
        }
    }
}

impl IdentitySpace {
    /// Create a space with `localities` coarse buckets. Zero is rejected.
    pub fn new(localities: u32) -> Result<Self> {
        if localities == 0 {
            return Err(Error::InvalidConfig(
                "localities must be greater than zero".to_string(),
            ));
        }
        Ok(Self { localities })
    }

    /// Number of localities `L`.
    pub fn localities(&self) -> u32 {
        self.localities
    }

    /// Size of the circle, `L * 2^64`.
    pub fn size(&self) -> u128 {
        (self.localities as u128) << 64
    }

    /// Whether `id` is a point of this space.
    pub fn contains(&self, id: &Identity) -> bool {
        id.locality < self.localities
    }

    /// Draw a uniform random identity.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Identity {
        let locality = rng.gen_range(0..self.localities);
        self.generate_in(locality, rng)
    }

    /// Draw a uniform random identity inside the given locality.
    pub fn generate_in<R: Rng + ?Sized>(&self, locality: u32, rng: &mut R) -> Identity {
        Identity::new(locality % self.localities, rng.gen())
    }

    /// Map an arbitrary position back onto the circle.
    pub fn at(&self, position: u128) -> Identity {
        let p = position % self.size();
        Identity::new((p >> 64) as u32, p as u64)
    }

    /// Directed clockwise offset from `a` to `b`, in `[0, S)`.
    pub fn clockwise(&self, a: &Identity, b: &Identity) -> u128 {
        let size = self.size();
        (b.position() % size + size - a.position() % size) % size
    }

    /// Shortest signed offset of `b` relative to `a`, in `(-S/2, S/2]`.
    pub fn distance(&self, a: &Identity, b: &Identity) -> i128 {
        let size = self.size();
        let cw = self.clockwise(a, b);
        if cw > size / 2 {
            -((size - cw) as i128)
        } else {
            cw as i128
        }
    }

    /// Sign of [IdentitySpace::distance]: `1` when `b` lies ahead of `a`,
    /// `-1` when it lies behind, `0` when they are equal.
    pub fn order(&self, a: &Identity, b: &Identity) -> i8 {
        self.distance(a, b).signum() as i8
    }

    /// Test `x` lies strictly inside the clockwise arc `(a, b)`.
    /// When `a == b` the arc is the whole circle except `a`.
    pub fn in_arc(&self, x: &Identity, a: &Identity, b: &Identity) -> bool {
        if x == a {
            return false;
        }
        if a == b {
            return true;
        }
        self.clockwise(a, x) < self.clockwise(a, b)
    }

    /// Sort identities clockwise starting right after `base`.
    pub fn sort_clockwise(&self, ids: &mut [Identity], base: &Identity) {
        ids.sort_by_key(|x| self.clockwise(base, x));
    }

    /// Long-range targets spread over the whole circle: the antipode, then
    /// `±S/2^(i+1)` for `i` in `1..count`.
    pub fn global_chords(&self, id: &Identity, count: usize) -> Vec<Identity> {
        let size = self.size();
        let pos = id.position();
        let offsets = (0..count).map(|i| size >> (i + 1));
        self.chords(id, offsets, |off, forward| {
            if forward {
                self.at(pos + off)
            } else {
                self.at(pos + size - off)
            }
        })
    }

    /// Targets inside the locality of `id`, built the same way in the local
    /// key dimension.
    pub fn local_chords(&self, id: &Identity, count: usize) -> Vec<Identity> {
        let offsets = (0..count.min(64)).map(|i| (1u128 << 64) >> (i + 1));
        self.chords(id, offsets, |off, forward| {
            let off = off as u64;
            let local_key = if forward {
                id.local_key.wrapping_add(off)
            } else {
                id.local_key.wrapping_sub(off)
            };
            Identity::new(id.locality, local_key)
        })
    }

    fn chords<I, F>(&self, id: &Identity, offsets: I, rotate: F) -> Vec<Identity>
    where
        I: Iterator<Item = u128>,
        F: Fn(u128, bool) -> Identity,
    {
        let mut targets = vec![];
        for (i, off) in offsets.enumerate() {
            if off == 0 {
                break;
            }
            let candidates = if i == 0 {
                vec![rotate(off, true)]
            } else {
                vec![rotate(off, true), rotate(off, false)]
            };
            for t in candidates {
                if t != *id && !targets.contains(&t) {
                    targets.push(t);
                }
            }
        }
        targets
    }
}

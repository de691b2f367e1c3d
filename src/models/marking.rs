// Markings - token distributions over the places of a net

//! # Markings
//!
//! A marking is the state of a Petri net: a total function from place id to
//! a non-negative token count. Absent entries are zero, and the
//! representation enforces that - a count of zero is never stored - so two
//! markings are extensionally equal exactly when their stored maps are
//! equal, and hashing is consistent with that equality.
//!
//! ## Representation
//!
//! The API-level marking is sparse: a `BTreeMap<PlaceId, u32>` of the
//! non-zero entries. The ordered map gives deterministic iteration, JSON
//! with sorted keys, and a derived `Hash`/`Ord` that match extensional
//! equality. The validator and simulator convert to a dense `Vec<u32>`
//! (indexed by place number) internally for speed; that representation
//! lives in the engine, not here.
//!
//! ## Rust Learning Notes:
//!
//! ### Why BTreeMap and Not HashMap
//! `HashMap` has no `Hash` impl (iteration order is unspecified), so a
//! marking stored in one could not itself be a set member. Reachability
//! exploration keeps a visited *set of markings*, which is exactly that.

use super::place::PlaceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// **Marking** - token count per place, zeros elided
///
/// Serializes as a plain `{place_id: count}` JSON object with zero entries
/// omitted, per the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking {
    tokens: BTreeMap<PlaceId, u32>,
}

impl Marking {
    /// The empty marking (every place at zero)
    pub fn empty() -> Self {
        Marking::default()
    }

    /// Build a marking from `(place, count)` pairs; zero counts are dropped
    pub fn from_pairs<I, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, u32)>,
        P: Into<PlaceId>,
    {
        let mut marking = Marking::empty();
        for (place, count) in pairs {
            marking.set(place.into(), count);
        }
        marking
    }

    /// Token count at `place`; zero for absent entries
    pub fn get(&self, place: &PlaceId) -> u32 {
        self.tokens.get(place).copied().unwrap_or(0)
    }

    /// Set the token count at `place`, removing the entry when zero
    pub fn set(&mut self, place: PlaceId, count: u32) {
        if count == 0 {
            self.tokens.remove(&place);
        } else {
            self.tokens.insert(place, count);
        }
    }

    /// Add `count` tokens at `place`
    pub fn add(&mut self, place: &PlaceId, count: u32) {
        if count == 0 {
            return;
        }
        *self.tokens.entry(place.clone()).or_insert(0) += count;
    }

    /// Remove `count` tokens at `place`
    ///
    /// Returns `false` (and leaves the marking untouched) when fewer than
    /// `count` tokens are present. Firing uses this to stay atomic.
    pub fn remove(&mut self, place: &PlaceId, count: u32) -> bool {
        let current = self.get(place);
        if current < count {
            return false;
        }
        self.set(place.clone(), current - count);
        true
    }

    /// Total number of tokens across all places
    pub fn total_tokens(&self) -> u64 {
        self.tokens.values().map(|&c| c as u64).sum()
    }

    /// Whether no place holds a token
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate the non-zero entries in ascending place-id order
    pub fn iter(&self) -> impl Iterator<Item = (&PlaceId, u32)> {
        self.tokens.iter().map(|(p, &c)| (p, c))
    }

    /// Places with at least one token, ascending
    pub fn marked_places(&self) -> impl Iterator<Item = &PlaceId> {
        self.tokens.keys()
    }

    /// Canonical string key: sorted `id:count` pairs joined by `,`
    ///
    /// Used wherever a marking must be rendered into a stable, hashable,
    /// human-scannable token - deadlock witnesses, log lines, test
    /// fixtures. Extensionally equal markings always produce the same key.
    pub fn canonical_key(&self) -> String {
        let mut out = String::new();
        for (place, count) in self.iter() {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(place.as_str());
            out.push(':');
            out.push_str(&count.to_string());
        }
        out
    }
}

impl<P: Into<PlaceId>> FromIterator<(P, u32)> for Marking {
    fn from_iter<I: IntoIterator<Item = (P, u32)>>(iter: I) -> Self {
        Marking::from_pairs(iter)
    }
}

impl std::fmt::Display for Marking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.canonical_key())
    }
}

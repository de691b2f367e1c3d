// Petri net places and element identifiers - the passive half of the net

//! # Places and Identifiers
//!
//! This module defines the identifier newtypes used throughout the crate and
//! the `Place` value type, the passive half of a Petri net.
//!
//! ## Petri Net Theory
//!
//! A Petri net is a bipartite graph of **places** and **transitions**:
//!
//! - **Places** hold tokens. A place represents a condition that currently
//!   holds: "lint finished", "waiting for both branches", "pipeline done".
//! - **Transitions** consume tokens from their input places and produce
//!   tokens in their output places. They are defined in the sibling
//!   [`transition`](super::transition) module.
//!
//! The net state is a *marking* - a token count per place - defined in
//! [`marking`](super::marking).
//!
//! ## Identifiers Instead of References
//!
//! Every net element refers to other elements by string id, never by Rust
//! reference. Arcs store a pair of ids, markings key on `PlaceId`, and the
//! DAG projection keys on `TransitionId`. This avoids cyclic ownership,
//! makes equality extensional, and keeps the JSON wire format trivial.
//! The net maintains id-to-index tables for O(1) lookup where it matters.
//!
//! ## Rust Learning Notes:
//!
//! ### Newtype Pattern
//! `PlaceId` and `TransitionId` wrap a `String` in a distinct type. The
//! compiler then refuses to pass a transition id where a place id is
//! expected, even though both are "just strings" on the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// **Place identifier** - names a place within a single net
///
/// Ids are synthesized deterministically by the builder
/// (`place::{step}::pre`, `place::{step}::post`, ...) so that repeated
/// builds of the same intent are byte-identical.
///
/// ## Rust Learning Notes:
///
/// The derive list gives this newtype everything an id needs: value
/// equality, hashing for map keys, and a total order so that iteration
/// over sorted ids is reproducible across runs and platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceId(pub String);

impl PlaceId {
    /// Create a new place id from any string-like input
    pub fn new<S: Into<String>>(id: S) -> Self {
        PlaceId(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlaceId {
    fn from(s: &str) -> Self {
        PlaceId(s.to_string())
    }
}

impl From<String> for PlaceId {
    fn from(s: String) -> Self {
        PlaceId(s)
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// **Transition identifier** - names a transition within a single net
///
/// Transition ids double as DAG node ids after projection, so they must be
/// unique not only among transitions but also disjoint from the place ids
/// of the same net. The builder guarantees this by construction; nets
/// deserialized from JSON are checked by
/// [`PetriNet::validate_structure`](super::net::PetriNet::validate_structure).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub String);

impl TransitionId {
    /// Create a new transition id from any string-like input
    pub fn new<S: Into<String>>(id: S) -> Self {
        TransitionId(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransitionId {
    fn from(s: &str) -> Self {
        TransitionId(s.to_string())
    }
}

impl From<String> for TransitionId {
    fn from(s: String) -> Self {
        TransitionId(s)
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generic metadata attached to net elements
///
/// The builder uses this for bookkeeping that is not part of the formal
/// semantics: `generated: true` on synthesized joins, `step: "<id>"` when
/// debug metadata is enabled, the `sinks` list on the net itself.
pub type ElementMetadata = HashMap<String, serde_json::Value>;

/// **Petri net place** - a state where tokens can reside
///
/// A place is purely passive: it holds tokens and constrains the
/// transitions around it. The interesting structure lives in the arcs.
///
/// ## Capacity
///
/// `capacity` is an optional upper bound on the tokens this place may hold.
/// `None` means unbounded. The builder never sets a capacity; the validator
/// checks a configurable global bound instead (safe nets by default), but
/// the field is honored by the boundedness check when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Stable identifier, unique within the owning net
    pub id: PlaceId,

    /// Human-readable display name
    pub name: String,

    /// Optional token capacity; `None` is unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    /// Free-form metadata, not part of the formal semantics
    #[serde(default, skip_serializing_if = "ElementMetadata::is_empty")]
    pub metadata: ElementMetadata,
}

impl Place {
    /// Create a place with no capacity bound and empty metadata
    pub fn new<I: Into<PlaceId>, N: Into<String>>(id: I, name: N) -> Self {
        Place {
            id: id.into(),
            name: name.into(),
            capacity: None,
            metadata: ElementMetadata::new(),
        }
    }

    /// Create a place with a token capacity bound
    pub fn with_capacity<I: Into<PlaceId>, N: Into<String>>(id: I, name: N, capacity: u32) -> Self {
        Place {
            id: id.into(),
            name: name.into(),
            capacity: Some(capacity),
            metadata: ElementMetadata::new(),
        }
    }

    /// Attach a metadata entry, consuming and returning the place
    ///
    /// Builder-style chaining keeps construction sites compact:
    /// `Place::new(id, name).with_metadata("generated", json!(true))`.
    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_id_conversions() {
        let a = PlaceId::from("place::lint::pre");
        let b = PlaceId::from("place::lint::pre".to_string());
        let c = PlaceId::new("place::lint::pre");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "place::lint::pre");
        assert_eq!(a.to_string(), "place::lint::pre");
    }

    #[test]
    fn test_transition_id_conversions() {
        let a = TransitionId::from("transition::deploy");
        let b = TransitionId::new("transition::deploy".to_string());

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "transition::deploy");
    }

    #[test]
    fn test_id_ordering_is_lexicographic() {
        // The engine fires and iterates in ascending id order; the newtype
        // must preserve plain string ordering for that to be reproducible.
        let mut ids = vec![
            TransitionId::from("transition::decide::ok"),
            TransitionId::from("transition::decide::fail"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "transition::decide::fail");
    }

    #[test]
    fn test_place_construction() {
        let plain = Place::new("place::build::post", "build done");
        assert!(plain.capacity.is_none());
        assert!(plain.metadata.is_empty());

        let bounded = Place::with_capacity("place::queue", "queue", 3);
        assert_eq!(bounded.capacity, Some(3));

        let tagged = Place::new("place::sync::post", "sync done")
            .with_metadata("generated", serde_json::json!(true));
        assert_eq!(tagged.metadata["generated"], serde_json::json!(true));
    }

    #[test]
    fn test_place_serialization_elides_empty_fields() {
        let place = Place::new("place::a::pre", "entry");
        let json = serde_json::to_value(&place).unwrap();
        assert!(json.get("capacity").is_none());
        assert!(json.get("metadata").is_none());
    }
}

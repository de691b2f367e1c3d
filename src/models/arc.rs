// Weighted arcs - the edges of the bipartite net graph

//! # Arcs
//!
//! An arc connects a place to a transition or a transition to a place,
//! never place-to-place or transition-to-transition. The bipartite
//! constraint is what makes the firing rule well defined: input arcs of a
//! transition are exactly the arcs whose target is that transition, and
//! their sources are all places.
//!
//! Arcs store raw string ids for both endpoints. Which endpoint is the
//! place and which is the transition is determined against a concrete net;
//! [`PetriNet::validate_structure`](super::net::PetriNet::validate_structure)
//! rejects any arc whose endpoints do not resolve to exactly one of each.

use serde::{Deserialize, Serialize};

fn default_weight() -> u32 {
    1
}

fn is_default_weight(w: &u32) -> bool {
    *w == 1
}

/// **Weighted arc** between a place and a transition
///
/// The weight is the number of tokens consumed (place -> transition) or
/// produced (transition -> place) when the transition fires. Weight zero is
/// rejected by structural validation; the default is 1 and weight-1 arcs
/// serialize without the field.
///
/// Named `NetArc` to stay clear of `std::sync::Arc` at use sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetArc {
    /// Id of the source element (a place id or a transition id)
    pub source: String,

    /// Id of the target element (the opposite kind from `source`)
    pub target: String,

    /// Number of tokens moved along this arc per firing; must be >= 1
    #[serde(default = "default_weight", skip_serializing_if = "is_default_weight")]
    pub weight: u32,
}

impl NetArc {
    /// Create a weight-1 arc
    pub fn new<S: Into<String>, T: Into<String>>(source: S, target: T) -> Self {
        NetArc {
            source: source.into(),
            target: target.into(),
            weight: 1,
        }
    }

    /// Create an arc with an explicit weight
    pub fn with_weight<S: Into<String>, T: Into<String>>(source: S, target: T, weight: u32) -> Self {
        NetArc {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

// Display is used in diagnostics ("place::a -> transition::b (x2)").
impl std::fmt::Display for NetArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.weight == 1 {
            write!(f, "{} -> {}", self.source, self.target)
        } else {
            write!(f, "{} -> {} (x{})", self.source, self.target, self.weight)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight_is_one() {
        let arc = NetArc::new("place::a::post", "transition::b");
        assert_eq!(arc.weight, 1);
    }

    #[test]
    fn test_weight_one_elided_in_json() {
        let arc = NetArc::new("place::a::post", "transition::b");
        let json = serde_json::to_value(&arc).unwrap();
        assert!(json.get("weight").is_none());

        let heavy = NetArc::with_weight("place::a::post", "transition::b", 2);
        let json = serde_json::to_value(&heavy).unwrap();
        assert_eq!(json["weight"], 2);
    }

    #[test]
    fn test_missing_weight_deserializes_to_one() {
        let arc: NetArc =
            serde_json::from_str(r#"{"source":"place::x","target":"transition::y"}"#).unwrap();
        assert_eq!(arc.weight, 1);
    }

    #[test]
    fn test_display() {
        let arc = NetArc::new("place::a", "transition::b");
        assert_eq!(arc.to_string(), "place::a -> transition::b");

        let heavy = NetArc::with_weight("transition::b", "place::c", 3);
        assert_eq!(heavy.to_string(), "transition::b -> place::c (x3)");
    }
}

// Petri net aggregate - places, transitions, arcs and the initial marking

//! # The Petri Net
//!
//! `PetriNet` is the central value of the crate: the output of the builder,
//! the input of the validator, the simulator and the projector. It owns its
//! places, transitions and arcs exclusively; everything else refers to the
//! net's elements by id only.
//!
//! ## Structural Invariants
//!
//! A well-formed net satisfies:
//!
//! - place ids are unique, transition ids are unique, and the two id sets
//!   are disjoint
//! - every arc connects exactly one place and one transition, both known
//! - arc weights are at least one
//! - there is at least one transition
//! - no arc is a self-loop (impossible in a bipartite net with disjoint id
//!   sets, but checked explicitly so a hand-written JSON net gets a clear
//!   message rather than a confusing downstream failure)
//! - the initial marking only marks known places
//!
//! [`PetriNet::validate_structure`] checks all of the above. The engine's
//! validator layers the behavioral checks (deadlock, reachability,
//! boundedness, liveness, kind shapes) on top.
//!
//! ## Rust Learning Notes:
//!
//! ### Scan-Based Accessors
//! The accessors below scan the arc list instead of holding index maps.
//! The net is an immutable wire-format value; the engine compiles it once
//! into a dense, indexed form before any hot loop runs (see
//! `engine::compiled`). Keeping this struct plain keeps serialization and
//! equality trivial.

use super::arc::NetArc;
use super::marking::Marking;
use super::place::{ElementMetadata, Place, PlaceId, TransitionId};
use super::transition::Transition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// **Petri net** - the complete workflow net
///
/// Serializes with a top-level `schemaVersion` field per the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetriNet {
    /// Wire-format schema version
    #[serde(rename = "schemaVersion", default = "super::default_schema_version")]
    pub schema_version: String,

    /// Stable identifier for this net
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// All places of the net
    pub places: Vec<Place>,

    /// All transitions of the net
    pub transitions: Vec<Transition>,

    /// All arcs of the net
    pub arcs: Vec<NetArc>,

    /// Token distribution the net starts from
    pub initial_marking: Marking,

    /// Net-level metadata; the builder records the `sinks` list here
    #[serde(default, skip_serializing_if = "ElementMetadata::is_empty")]
    pub metadata: ElementMetadata,
}

impl PetriNet {
    /// Assemble a net from parts
    ///
    /// Does not validate; call [`validate_structure`](Self::validate_structure)
    /// to check the invariants. The builder always does.
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        places: Vec<Place>,
        transitions: Vec<Transition>,
        arcs: Vec<NetArc>,
        initial_marking: Marking,
    ) -> Self {
        PetriNet {
            schema_version: super::default_schema_version(),
            id: id.into(),
            name: name.into(),
            places,
            transitions,
            arcs,
            initial_marking,
            metadata: ElementMetadata::new(),
        }
    }

    /// Look up a place by id
    pub fn place(&self, id: &PlaceId) -> Option<&Place> {
        self.places.iter().find(|p| &p.id == id)
    }

    /// Look up a transition by id
    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    /// Whether `id` names a place of this net
    pub fn is_place(&self, id: &str) -> bool {
        self.places.iter().any(|p| p.id.as_str() == id)
    }

    /// Whether `id` names a transition of this net
    pub fn is_transition(&self, id: &str) -> bool {
        self.transitions.iter().any(|t| t.id.as_str() == id)
    }

    /// Input arcs of a transition: `(place, weight)` pairs
    pub fn inputs_of(&self, transition: &TransitionId) -> Vec<(PlaceId, u32)> {
        self.arcs
            .iter()
            .filter(|a| a.target == transition.as_str())
            .map(|a| (PlaceId::from(a.source.clone()), a.weight))
            .collect()
    }

    /// Output arcs of a transition: `(place, weight)` pairs
    pub fn outputs_of(&self, transition: &TransitionId) -> Vec<(PlaceId, u32)> {
        self.arcs
            .iter()
            .filter(|a| a.source == transition.as_str())
            .map(|a| (PlaceId::from(a.target.clone()), a.weight))
            .collect()
    }

    /// Transitions producing into a place, in arc order
    pub fn producers_of(&self, place: &PlaceId) -> Vec<TransitionId> {
        self.arcs
            .iter()
            .filter(|a| a.target == place.as_str())
            .map(|a| TransitionId::from(a.source.clone()))
            .collect()
    }

    /// Transitions consuming from a place, in arc order
    pub fn consumers_of(&self, place: &PlaceId) -> Vec<TransitionId> {
        self.arcs
            .iter()
            .filter(|a| a.source == place.as_str())
            .map(|a| TransitionId::from(a.target.clone()))
            .collect()
    }

    /// Places without outgoing arcs, ascending by id
    pub fn sinks(&self) -> Vec<&PlaceId> {
        let mut sinks: Vec<&PlaceId> = self
            .places
            .iter()
            .map(|p| &p.id)
            .filter(|id| !self.arcs.iter().any(|a| a.source == id.as_str()))
            .collect();
        sinks.sort();
        sinks
    }

    /// Places without incoming arcs, ascending by id
    pub fn sources(&self) -> Vec<&PlaceId> {
        let mut sources: Vec<&PlaceId> = self
            .places
            .iter()
            .map(|p| &p.id)
            .filter(|id| !self.arcs.iter().any(|a| a.target == id.as_str()))
            .collect();
        sources.sort();
        sources
    }

    /// Whether `transition` is enabled at `marking`
    ///
    /// Enabled means every input place holds at least the arc weight.
    pub fn is_enabled(&self, marking: &Marking, transition: &TransitionId) -> bool {
        let inputs = self.inputs_of(transition);
        !inputs.is_empty() && inputs.iter().all(|(place, weight)| marking.get(place) >= *weight)
    }

    /// All transitions enabled at `marking`, ascending by id
    ///
    /// The ascending order is part of the engine contract: the simulator
    /// indexes into this list, and the validator fires in this order, so
    /// witnesses and traces are reproducible.
    pub fn enabled_at(&self, marking: &Marking) -> Vec<TransitionId> {
        let mut enabled: Vec<TransitionId> = self
            .transitions
            .iter()
            .filter(|t| self.is_enabled(marking, &t.id))
            .map(|t| t.id.clone())
            .collect();
        enabled.sort();
        enabled
    }

    /// Fire `transition` at `marking`, returning the successor marking
    ///
    /// Returns `None` when the transition is unknown or not enabled.
    /// Firing is atomic: input tokens are consumed and output tokens
    /// produced in one step, with no observable intermediate state.
    pub fn fire(&self, marking: &Marking, transition: &TransitionId) -> Option<Marking> {
        if !self.is_enabled(marking, transition) {
            return None;
        }
        let mut next = marking.clone();
        for (place, weight) in self.inputs_of(transition) {
            // Cannot fail: enabledness was just checked.
            next.remove(&place, weight);
        }
        for (place, weight) in self.outputs_of(transition) {
            next.add(&place, weight);
        }
        Some(next)
    }

    /// Whether `marking` is a final marking of this net
    ///
    /// Final means: at least one token, and every marked place is a sink.
    /// This is deliberately weaker than "every sink holds exactly one
    /// token": an XOR choice only ever runs one of its branches, so the
    /// branches it did not take leave their sinks empty.
    pub fn is_final_marking(&self, marking: &Marking) -> bool {
        if marking.is_empty() {
            return false;
        }
        let sinks: HashSet<&PlaceId> = self.sinks().into_iter().collect();
        marking.marked_places().all(|p| sinks.contains(p))
    }

    /// Collect every structural violation, with one message per problem
    pub fn structure_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        // Unique place ids. Ordered maps keep the violation list (and the
        // "first violation" short-circuit) deterministic.
        let mut place_ids: BTreeMap<&str, u32> = BTreeMap::new();
        for place in &self.places {
            *place_ids.entry(place.id.as_str()).or_insert(0) += 1;
        }
        for (id, count) in place_ids.iter().filter(|(_, &c)| c > 1) {
            violations.push(format!("duplicate place id '{}' ({} occurrences)", id, count));
        }

        // Unique transition ids, disjoint from place ids
        let mut transition_ids: BTreeMap<&str, u32> = BTreeMap::new();
        for transition in &self.transitions {
            *transition_ids.entry(transition.id.as_str()).or_insert(0) += 1;
        }
        for (id, count) in transition_ids.iter().filter(|(_, &c)| c > 1) {
            violations.push(format!(
                "duplicate transition id '{}' ({} occurrences)",
                id, count
            ));
        }
        for id in transition_ids.keys() {
            if place_ids.contains_key(id) {
                violations.push(format!("id '{}' names both a place and a transition", id));
            }
        }

        // At least one transition
        if self.transitions.is_empty() {
            violations.push("net has no transitions".to_string());
        }

        // Arcs: bipartite, resolvable, positive weight, no self-loops
        for arc in &self.arcs {
            if arc.weight == 0 {
                violations.push(format!("arc {} has zero weight", arc));
            }
            if arc.source == arc.target {
                violations.push(format!("arc {} is a self-loop", arc));
                continue;
            }
            let source_place = place_ids.contains_key(arc.source.as_str());
            let source_transition = transition_ids.contains_key(arc.source.as_str());
            let target_place = place_ids.contains_key(arc.target.as_str());
            let target_transition = transition_ids.contains_key(arc.target.as_str());

            if !source_place && !source_transition {
                violations.push(format!("arc {} has unknown source '{}'", arc, arc.source));
            } else if !target_place && !target_transition {
                violations.push(format!("arc {} has unknown target '{}'", arc, arc.target));
            } else if source_place == target_place {
                violations.push(format!(
                    "arc {} must connect one place and one transition",
                    arc
                ));
            }
        }

        // Initial marking refers to known places
        for place in self.initial_marking.marked_places() {
            if !place_ids.contains_key(place.as_str()) {
                violations.push(format!(
                    "initial marking references unknown place '{}'",
                    place
                ));
            }
        }

        violations
    }

    /// Check the structural invariants, failing on the first violation
    pub fn validate_structure(&self) -> Result<(), String> {
        match self.structure_violations().into_iter().next() {
            None => Ok(()),
            Some(first) => Err(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transition::TransitionKind;

    /// p0 -> a -> p1 -> b -> p2, one token on p0
    fn chain_net() -> PetriNet {
        PetriNet::new(
            "net::chain",
            "chain",
            vec![
                Place::new("p0", "start"),
                Place::new("p1", "middle"),
                Place::new("p2", "end"),
            ],
            vec![Transition::new("a", "a"), Transition::new("b", "b")],
            vec![
                NetArc::new("p0", "a"),
                NetArc::new("a", "p1"),
                NetArc::new("p1", "b"),
                NetArc::new("b", "p2"),
            ],
            Marking::from_pairs([("p0", 1u32)]),
        )
    }

    #[test]
    fn test_chain_net_is_structurally_valid() {
        assert!(chain_net().validate_structure().is_ok());
    }

    #[test]
    fn test_enabled_and_fire() {
        let net = chain_net();
        let m0 = net.initial_marking.clone();

        assert_eq!(net.enabled_at(&m0), vec![TransitionId::from("a")]);
        assert!(!net.is_enabled(&m0, &TransitionId::from("b")));

        let m1 = net.fire(&m0, &TransitionId::from("a")).unwrap();
        assert_eq!(m1, Marking::from_pairs([("p1", 1u32)]));

        // Not enabled anymore - firing again returns None.
        assert!(net.fire(&m1, &TransitionId::from("a")).is_none());

        let m2 = net.fire(&m1, &TransitionId::from("b")).unwrap();
        assert!(net.is_final_marking(&m2));
        assert!(net.enabled_at(&m2).is_empty());
    }

    #[test]
    fn test_sinks_and_sources() {
        let net = chain_net();
        assert_eq!(net.sinks(), vec![&PlaceId::from("p2")]);
        assert_eq!(net.sources(), vec![&PlaceId::from("p0")]);
    }

    #[test]
    fn test_final_marking_ignores_untaken_branches() {
        // p0 -> x -> p1 ; p0 -> y -> p2 : an XOR between two sinks.
        let net = PetriNet::new(
            "net::xor",
            "xor",
            vec![
                Place::new("p0", "start"),
                Place::new("p1", "left"),
                Place::new("p2", "right"),
            ],
            vec![
                Transition::with_kind("x", "x", TransitionKind::Choice),
                Transition::with_kind("y", "y", TransitionKind::Choice),
            ],
            vec![
                NetArc::new("p0", "x"),
                NetArc::new("x", "p1"),
                NetArc::new("p0", "y"),
                NetArc::new("y", "p2"),
            ],
            Marking::from_pairs([("p0", 1u32)]),
        );

        let left = net.fire(&net.initial_marking, &TransitionId::from("x")).unwrap();
        // Only one of the two sinks is marked, and that is still final.
        assert!(net.is_final_marking(&left));
        // The empty marking is not final.
        assert!(!net.is_final_marking(&Marking::empty()));
        // A token resting on a non-sink place is not final.
        assert!(!net.is_final_marking(&net.initial_marking));
    }

    #[test]
    fn test_structure_violations_are_reported() {
        let mut net = chain_net();
        net.arcs.push(NetArc::new("p0", "p1")); // place-to-place
        net.arcs.push(NetArc::new("ghost", "a")); // unknown source
        net.arcs.push(NetArc::with_weight("p2", "b", 0)); // zero weight
        net.places.push(Place::new("p0", "dup")); // duplicate id

        let violations = net.structure_violations();
        assert!(violations.iter().any(|v| v.contains("one place and one transition")));
        assert!(violations.iter().any(|v| v.contains("unknown source")));
        assert!(violations.iter().any(|v| v.contains("zero weight")));
        assert!(violations.iter().any(|v| v.contains("duplicate place id 'p0'")));
        assert!(net.validate_structure().is_err());
    }

    #[test]
    fn test_net_json_carries_schema_version() {
        let json = serde_json::to_value(chain_net()).unwrap();
        assert_eq!(json["schemaVersion"], "1.0");
        assert_eq!(json["initial_marking"], serde_json::json!({"p0": 1}));
    }
}

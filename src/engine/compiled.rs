// Dense, indexed view of a net for the hot exploration loops

//! # Compiled Nets
//!
//! The wire-level [`PetriNet`] stores sparse markings and string-keyed
//! arcs - convenient for serialization, hopeless for a reachability search
//! that touches every transition at every state. `CompiledNet` is the
//! dense view the validator and simulator share:
//!
//! - places get consecutive indices; a marking becomes a `Vec<u32>`
//! - each transition's input and output arcs become `(place_index, weight)`
//!   lists, pre-resolved and pre-sorted
//! - transitions are ordered ascending by id, so "fire in id order" is a
//!   plain indexed loop and selection by index is reproducible
//!
//! Conversion back to the sparse [`Marking`] happens only at the API
//! boundary (reports, traces, witnesses).

use crate::models::{Marking, PetriNet, PlaceId, TransitionId, TransitionKind};
use std::collections::HashMap;

/// One transition with arcs resolved to dense place indices
#[derive(Debug, Clone)]
pub struct CompiledTransition {
    /// Source transition id
    pub id: TransitionId,
    /// Control-flow kind, copied for cheap access in check loops
    pub kind: TransitionKind,
    /// `(place_index, weight)` per input arc, ascending by place index
    pub inputs: Vec<(usize, u32)>,
    /// `(place_index, weight)` per output arc, ascending by place index
    pub outputs: Vec<(usize, u32)>,
}

/// Dense, indexed view of a structurally valid net
#[derive(Debug, Clone)]
pub struct CompiledNet {
    /// Place ids in index order (net declaration order)
    pub place_ids: Vec<PlaceId>,
    /// Per-place capacity bound, `None` = unbounded
    pub capacities: Vec<Option<u32>>,
    /// `true` for places with no outgoing arcs
    pub sink_mask: Vec<bool>,
    /// Transitions ascending by id
    pub transitions: Vec<CompiledTransition>,
    /// Dense rendering of the net's initial marking
    pub initial: Vec<u32>,
}

impl CompiledNet {
    /// Compile a net into the dense view
    ///
    /// Fails with a message when an arc or the initial marking references
    /// an unknown id - the same conditions `validate_structure` reports,
    /// repeated here so the engine never indexes out of bounds even on a
    /// net that skipped validation.
    pub fn compile(net: &PetriNet) -> Result<CompiledNet, String> {
        let place_ids: Vec<PlaceId> = net.places.iter().map(|p| p.id.clone()).collect();
        let index: HashMap<&str, usize> = place_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let capacities: Vec<Option<u32>> = net.places.iter().map(|p| p.capacity).collect();

        let mut transitions: Vec<CompiledTransition> = Vec::with_capacity(net.transitions.len());
        for transition in &net.transitions {
            transitions.push(CompiledTransition {
                id: transition.id.clone(),
                kind: transition.kind,
                inputs: Vec::new(),
                outputs: Vec::new(),
            });
        }
        transitions.sort_by(|a, b| a.id.cmp(&b.id));
        // Owned keys: the arc loop below mutates `transitions` while this
        // index is still in use.
        let transition_index: HashMap<String, usize> = transitions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str().to_string(), i))
            .collect();

        for arc in &net.arcs {
            match (
                index.get(arc.source.as_str()),
                transition_index.get(arc.target.as_str()),
            ) {
                (Some(&place), Some(&transition)) => {
                    transitions[transition].inputs.push((place, arc.weight));
                    continue;
                }
                _ => {}
            }
            match (
                transition_index.get(arc.source.as_str()),
                index.get(arc.target.as_str()),
            ) {
                (Some(&transition), Some(&place)) => {
                    transitions[transition].outputs.push((place, arc.weight));
                }
                _ => {
                    return Err(format!(
                        "arc '{} -> {}' does not connect a known place and transition",
                        arc.source, arc.target
                    ))
                }
            }
        }
        for transition in &mut transitions {
            transition.inputs.sort_unstable();
            transition.outputs.sort_unstable();
        }

        let mut sink_mask = vec![true; place_ids.len()];
        for transition in &transitions {
            for &(place, _) in &transition.inputs {
                sink_mask[place] = false;
            }
        }

        let mut initial = vec![0u32; place_ids.len()];
        for (place, count) in net.initial_marking.iter() {
            match index.get(place.as_str()) {
                Some(&i) => initial[i] = count,
                None => {
                    return Err(format!(
                        "initial marking references unknown place '{}'",
                        place
                    ))
                }
            }
        }

        Ok(CompiledNet {
            place_ids,
            capacities,
            sink_mask,
            transitions,
            initial,
        })
    }

    /// Whether transition `t` is enabled at `marking`
    pub fn is_enabled(&self, marking: &[u32], t: usize) -> bool {
        let transition = &self.transitions[t];
        !transition.inputs.is_empty()
            && transition
                .inputs
                .iter()
                .all(|&(place, weight)| marking[place] >= weight)
    }

    /// Indices of all enabled transitions, ascending (= id order)
    pub fn enabled(&self, marking: &[u32]) -> Vec<usize> {
        (0..self.transitions.len())
            .filter(|&t| self.is_enabled(marking, t))
            .collect()
    }

    /// Fire transition `t`, returning the successor marking
    ///
    /// Caller must ensure `t` is enabled; debug builds assert it.
    pub fn fire(&self, marking: &[u32], t: usize) -> Vec<u32> {
        debug_assert!(self.is_enabled(marking, t));
        let mut next = marking.to_vec();
        for &(place, weight) in &self.transitions[t].inputs {
            next[place] -= weight;
        }
        for &(place, weight) in &self.transitions[t].outputs {
            next[place] += weight;
        }
        next
    }

    /// Whether `marking` is final: non-empty and every token on a sink
    pub fn is_final(&self, marking: &[u32]) -> bool {
        let mut any = false;
        for (place, &count) in marking.iter().enumerate() {
            if count > 0 {
                if !self.sink_mask[place] {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    /// Convert a dense marking back to the sparse wire form
    pub fn to_sparse(&self, marking: &[u32]) -> Marking {
        Marking::from_pairs(
            marking
                .iter()
                .enumerate()
                .filter(|(_, &count)| count > 0)
                .map(|(place, &count)| (self.place_ids[place].clone(), count)),
        )
    }

    /// Index of a place id, if known
    pub fn place_index(&self, id: &PlaceId) -> Option<usize> {
        self.place_ids.iter().position(|p| p == id)
    }

    /// Index of a transition id, if known
    pub fn transition_index(&self, id: &TransitionId) -> Option<usize> {
        self.transitions
            .binary_search_by(|t| t.id.cmp(id))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetArc, Place, Transition};

    /// p0 -> a -> p1 -> b -> p2, one token on p0
    fn chain() -> PetriNet {
        PetriNet::new(
            "net::chain",
            "chain",
            vec![
                Place::new("p0", "p0"),
                Place::new("p1", "p1"),
                Place::new("p2", "p2"),
            ],
            vec![Transition::new("b", "b"), Transition::new("a", "a")],
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
    fn test_transitions_are_sorted_by_id() {
        let compiled = CompiledNet::compile(&chain()).unwrap();
        let ids: Vec<&str> = compiled.transitions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_dense_fire_matches_sparse_fire() {
        let net = chain();
        let compiled = CompiledNet::compile(&net).unwrap();

        let enabled = compiled.enabled(&compiled.initial);
        assert_eq!(enabled, vec![0]); // only "a"

        let next = compiled.fire(&compiled.initial, 0);
        let sparse = net
            .fire(&net.initial_marking, &TransitionId::from("a"))
            .unwrap();
        assert_eq!(compiled.to_sparse(&next), sparse);
    }

    #[test]
    fn test_sink_mask_and_final() {
        let compiled = CompiledNet::compile(&chain()).unwrap();
        assert_eq!(compiled.sink_mask, vec![false, false, true]);

        assert!(!compiled.is_final(&compiled.initial));
        assert!(compiled.is_final(&[0, 0, 1]));
        assert!(!compiled.is_final(&[0, 0, 0]));
    }

    #[test]
    fn test_compile_rejects_unknown_marking_place() {
        let mut net = chain();
        net.initial_marking = Marking::from_pairs([("ghost", 1u32)]);
        let err = CompiledNet::compile(&net).unwrap_err();
        assert!(err.contains("unknown place 'ghost'"));
    }

    #[test]
    fn test_compile_rejects_unresolvable_arc() {
        let mut net = chain();
        net.arcs.push(NetArc::new("p0", "p1"));
        assert!(CompiledNet::compile(&net).is_err());
    }
}

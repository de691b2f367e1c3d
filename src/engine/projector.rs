// Net-to-DAG lowering - single-producer/single-consumer projection

//! # Projector
//!
//! Lowers a validated net onto a causal DAG of its transitions. The
//! lowering keeps exactly the orderings that are unambiguous:
//!
//! - **Node rule** - every transition becomes a node; the node id is the
//!   transition id and the action label falls back from the transition's
//!   action to its name to the constant `execute`.
//! - **Edge rule** - for every place with exactly one producing and one
//!   consuming transition, emit `producer -> consumer` tagged with the
//!   place. A place with several producers or consumers encodes choice or
//!   fork semantics a DAG cannot express, so no edge passes through it.
//!
//! Post-processing deduplicates parallel edges (merging their via-place
//! lists) and applies a transitive reduction, visiting edges in
//! lexicographic order so the output is reproducible. The reduction of a
//! DAG is unique, so the order only fixes tie-breaking in intermediate
//! states, not the result.
//!
//! Each node also records its incoming edges with the places they
//! traversed, so a UI can highlight the corresponding net elements from a
//! DAG selection.

use crate::models::{Dag, DagEdge, DagNode, IncomingEdge, PetriNet, PlaceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Projection failure modes
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProjectionError {
    /// The source net violates its structural invariants
    #[error("invalid source net: {detail}")]
    InvalidNet { detail: String },

    /// The place-mediated ordering relation is cyclic; no DAG exists
    #[error("net has a place-mediated cycle through '{transition}'")]
    CyclicNet { transition: String },
}

impl ProjectionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ProjectionError::InvalidNet { .. } => "projection::invalid_net",
            ProjectionError::CyclicNet { .. } => "projection::cyclic_net",
        }
    }
}

/// Lower `net` to its causal DAG
pub fn project(net: &PetriNet) -> Result<Dag, ProjectionError> {
    net.validate_structure()
        .map_err(|detail| ProjectionError::InvalidNet { detail })?;

    // Edge rule with parallel-edge deduplication: (from, to) -> via places.
    let mut edges: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    let mut place_ids: Vec<&PlaceId> = net.places.iter().map(|p| &p.id).collect();
    place_ids.sort();
    for place in place_ids {
        let producers = net.producers_of(place);
        let consumers = net.consumers_of(place);
        if let ([producer], [consumer]) = (producers.as_slice(), consumers.as_slice()) {
            edges
                .entry((
                    producer.as_str().to_string(),
                    consumer.as_str().to_string(),
                ))
                .or_default()
                .insert(place.as_str().to_string());
        }
    }

    let keys: Vec<(String, String)> = edges.keys().cloned().collect();
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (from, to) in &keys {
        adjacency
            .entry(from.as_str())
            .or_default()
            .insert(to.as_str());
    }
    if let Some(on_cycle) = find_cycle_member(&adjacency) {
        return Err(ProjectionError::CyclicNet {
            transition: on_cycle,
        });
    }

    // Transitive reduction, lexicographic edge order. An edge is dropped
    // when a longer path connects its endpoints without it.
    let mut dropped: BTreeSet<(String, String)> = BTreeSet::new();
    for (from, to) in &keys {
        adjacency
            .get_mut(from.as_str())
            .expect("edge endpoints are in the adjacency")
            .remove(to.as_str());
        if reaches(&adjacency, from, to) {
            dropped.insert((from.clone(), to.clone()));
        } else {
            adjacency
                .get_mut(from.as_str())
                .expect("just removed from here")
                .insert(to.as_str());
        }
    }
    for key in &dropped {
        edges.remove(key);
    }

    // Nodes, ascending by id, with incoming-edge metadata.
    let mut transitions: Vec<_> = net.transitions.iter().collect();
    transitions.sort_by(|a, b| a.id.cmp(&b.id));
    let nodes: Vec<DagNode> = transitions
        .iter()
        .map(|t| DagNode {
            id: t.id.as_str().to_string(),
            action: t.action_label().to_string(),
            petri_transition_id: t.id.as_str().to_string(),
            petri_transition_name: t.name.clone(),
            incoming_edges: edges
                .iter()
                .filter(|((_, to), _)| to == t.id.as_str())
                .map(|((from, _), via)| IncomingEdge {
                    from: from.clone(),
                    via_places: via.iter().cloned().collect(),
                })
                .collect(),
        })
        .collect();

    let edges: Vec<DagEdge> = edges
        .into_iter()
        .map(|((from, to), via)| DagEdge {
            from,
            to,
            via_places: via.into_iter().collect(),
        })
        .collect();

    debug!(nodes = nodes.len(), edges = edges.len(), net = %net.id, "projected net");
    Ok(Dag {
        schema_version: crate::models::default_schema_version(),
        derived_from_petri_net_id: net.id.clone(),
        nodes,
        edges,
    })
}

/// Depth-first reachability over the adjacency map
fn reaches(adjacency: &BTreeMap<&str, BTreeSet<&str>>, from: &str, to: &str) -> bool {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&str> = adjacency
        .get(from)
        .map(|next| next.iter().copied().collect())
        .unwrap_or_default();
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if seen.insert(node) {
            if let Some(next) = adjacency.get(node) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}

/// Kahn's algorithm; returns a node on a cycle, if any
fn find_cycle_member(adjacency: &BTreeMap<&str, BTreeSet<&str>>) -> Option<String> {
    let mut nodes: BTreeSet<&str> = BTreeSet::new();
    for (from, tos) in adjacency {
        nodes.insert(from);
        nodes.extend(tos.iter().copied());
    }
    let mut indegree: BTreeMap<&str, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    for tos in adjacency.values() {
        for to in tos {
            *indegree.get_mut(to).expect("counted above") += 1;
        }
    }

    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut removed = 0usize;
    while let Some(node) = ready.pop() {
        removed += 1;
        if let Some(next) = adjacency.get(node) {
            for &to in next {
                let d = indegree.get_mut(to).expect("counted above");
                *d -= 1;
                if *d == 0 {
                    ready.push(to);
                }
            }
        }
    }
    if removed == nodes.len() {
        None
    } else {
        indegree
            .iter()
            .find(|(_, &d)| d > 0)
            .map(|(&n, _)| n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builder::{BuildConfig, NetBuilder};
    use crate::models::{IntentSpec, IntentStep, Marking, NetArc, Place, Transition};

    fn diamond_net() -> PetriNet {
        let intent = IntentSpec::new(
            "pipeline",
            vec![
                IntentStep::action("lint", "lint"),
                IntentStep::action("test", "test").depends(vec!["lint"]),
                IntentStep::action("build", "build").depends(vec!["lint", "test"]),
                IntentStep::action("deploy", "deploy").depends(vec!["build"]),
            ],
        );
        NetBuilder::from_intent(&intent, &BuildConfig::default())
            .build()
            .unwrap()
    }

    #[test]
    fn test_node_per_transition_with_provenance() {
        let net = diamond_net();
        let dag = project(&net).unwrap();

        assert_eq!(dag.nodes.len(), net.transitions.len());
        assert_eq!(dag.derived_from_petri_net_id, net.id);
        let node = dag.node("transition::lint").unwrap();
        assert_eq!(node.petri_transition_id, "transition::lint");
        assert_eq!(node.action, "lint");
    }

    #[test]
    fn test_transitive_reduction_drops_implied_edge() {
        let dag = project(&diamond_net()).unwrap();

        // lint -> build is implied by lint -> test -> build.
        assert!(dag.has_edge("transition::lint", "transition::test"));
        assert!(dag.has_edge("transition::test", "transition::build"));
        assert!(dag.has_edge("transition::build", "transition::deploy"));
        assert!(!dag.has_edge("transition::lint", "transition::build"));
        assert_eq!(dag.edges.len(), 3);
    }

    #[test]
    fn test_no_edges_through_contested_places() {
        // An XOR choice: the shared place has two consumers, so no DAG
        // edge may pass through it.
        let intent = IntentSpec::new(
            "xor",
            vec![
                IntentStep::action("probe", "probe"),
                IntentStep::choice("decide", "decide", vec!["ok".into(), "fail".into()])
                    .depends(vec!["probe"]),
            ],
        );
        let net = NetBuilder::from_intent(&intent, &BuildConfig::default())
            .build()
            .unwrap();
        let dag = project(&net).unwrap();

        assert!(!dag.has_edge("transition::probe", "transition::decide::ok"));
        assert!(!dag.has_edge("transition::probe", "transition::decide::fail"));
        assert!(dag.edges.is_empty());
    }

    #[test]
    fn test_incoming_edges_carry_via_places() {
        let dag = project(&diamond_net()).unwrap();
        let build = dag.node("transition::build").unwrap();
        assert_eq!(build.incoming_edges.len(), 1);
        assert_eq!(build.incoming_edges[0].from, "transition::test");
        assert_eq!(
            build.incoming_edges[0].via_places,
            vec!["place::test::post".to_string()]
        );
    }

    #[test]
    fn test_edges_sorted_lexicographically() {
        let dag = project(&diamond_net()).unwrap();
        let pairs: Vec<(&str, &str)> = dag
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        let mut sorted = pairs.clone();
        sorted.sort();
        assert_eq!(pairs, sorted);
    }

    #[test]
    fn test_cyclic_net_is_rejected() {
        // a -> p1 -> b -> p2 -> a: a perfectly valid Petri net (a revision
        // loop) that has no DAG projection.
        let net = PetriNet::new(
            "net::loop",
            "loop",
            vec![
                Place::new("p0", "p0"),
                Place::new("p1", "p1"),
                Place::new("p2", "p2"),
            ],
            vec![Transition::new("a", "a"), Transition::new("b", "b")],
            vec![
                NetArc::new("p0", "a"),
                NetArc::new("a", "p1"),
                NetArc::new("p1", "b"),
                NetArc::new("b", "p2"),
                NetArc::new("p2", "a"),
            ],
            Marking::from_pairs([("p0", 1u32)]),
        );
        let err = project(&net).unwrap_err();
        assert_eq!(err.code(), "projection::cyclic_net");
    }

    #[test]
    fn test_invalid_net_is_rejected() {
        let mut net = diamond_net();
        net.arcs.push(NetArc::new("ghost", "transition::lint"));
        let err = project(&net).unwrap_err();
        assert_eq!(err.code(), "projection::invalid_net");
    }

    #[test]
    fn test_projection_is_deterministic() {
        let net = diamond_net();
        let a = serde_json::to_string(&project(&net).unwrap()).unwrap();
        let b = serde_json::to_string(&project(&net).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}

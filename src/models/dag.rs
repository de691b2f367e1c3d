// Causal DAG - the projection target for downstream executors

//! # DAG Projection Output
//!
//! The projector lowers a net to a directed acyclic graph of its
//! transitions: one node per transition, one edge per place-mediated
//! strict ordering. Places that encode choice or fork semantics do not
//! survive the lowering - a DAG cannot express them - so the projection is
//! intentionally lossy about branching while preserving causal order.
//!
//! ## Cross-Highlighting
//!
//! The DAG is built for UIs that render it next to the source net. Every
//! node keeps the source transition's id and name, plus an
//! `incoming_edges` list naming the places each incoming edge traversed,
//! so selecting a DAG node can highlight the corresponding places and arcs
//! on the net. The DAG itself borrows nothing from the net but its id,
//! carried in `derived_from_petri_net_id`.

use super::place::TransitionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming-edge record kept on a node for cross-highlighting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEdge {
    /// Id of the upstream node (= source transition id)
    pub from: String,

    /// Places the merged edge traversed, ascending
    pub via_places: Vec<String>,
}

/// One DAG node, standing for one transition of the source net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagNode {
    /// Node id; equals the source transition id
    pub id: String,

    /// Action label (transition action, else name, else `execute`)
    pub action: String,

    /// Source transition id, kept explicitly for cross-highlighting
    pub petri_transition_id: String,

    /// Source transition display name
    pub petri_transition_name: String,

    /// Incoming edges with the places they traversed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming_edges: Vec<IncomingEdge>,
}

/// One DAG edge: a strict place-mediated ordering between two transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    /// Upstream node id
    pub from: String,

    /// Downstream node id
    pub to: String,

    /// Places this edge traversed; more than one after parallel-edge
    /// deduplication merged duplicates
    pub via_places: Vec<String>,
}

/// **Causal DAG** derived from a Petri net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dag {
    /// Wire-format schema version
    #[serde(rename = "schemaVersion", default = "super::default_schema_version")]
    pub schema_version: String,

    /// Id of the net this DAG was derived from
    pub derived_from_petri_net_id: String,

    /// Nodes, one per source transition, ascending by id
    pub nodes: Vec<DagNode>,

    /// Edges after deduplication and transitive reduction, in
    /// lexicographic `(from, to)` order
    pub edges: Vec<DagEdge>,
}

impl Dag {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&DagNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether the DAG contains the edge `from -> to`
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    /// Direct successors of a node, in edge order
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Nodes in a topological order (ties broken by ascending id)
    ///
    /// The acyclicity invariant is established by the projector; on a
    /// hand-modified cyclic edge set this returns fewer nodes than the
    /// DAG holds, which callers can use as a cheap integrity probe.
    pub fn topological_order(&self) -> Vec<TransitionId> {
        let mut indegree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        for edge in &self.edges {
            if let Some(d) = indegree.get_mut(edge.to.as_str()) {
                *d += 1;
            }
        }

        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&next) = ready.first() {
            ready.remove(0);
            order.push(TransitionId::from(next));
            for succ in self.successors(next) {
                let d = indegree.get_mut(succ).expect("edge targets known node");
                *d -= 1;
                if *d == 0 {
                    // Insert preserving ascending order for deterministic ties.
                    let pos = ready.binary_search(&succ).unwrap_or_else(|p| p);
                    ready.insert(pos, succ);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Dag {
        let node = |id: &str| DagNode {
            id: id.to_string(),
            action: id.to_string(),
            petri_transition_id: format!("transition::{}", id),
            petri_transition_name: id.to_string(),
            incoming_edges: Vec::new(),
        };
        let edge = |from: &str, to: &str| DagEdge {
            from: from.to_string(),
            to: to.to_string(),
            via_places: vec![format!("place::{}::out::{}", from, to)],
        };
        Dag {
            schema_version: crate::models::default_schema_version(),
            derived_from_petri_net_id: "net::diamond".to_string(),
            nodes: vec![node("a"), node("b"), node("c"), node("d")],
            edges: vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
        }
    }

    #[test]
    fn test_edge_queries() {
        let dag = diamond();
        assert!(dag.has_edge("a", "b"));
        assert!(!dag.has_edge("b", "a"));
        assert_eq!(dag.successors("a"), vec!["b", "c"]);
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let dag = diamond();
        let order: Vec<String> = dag
            .topological_order()
            .into_iter()
            .map(|t| t.0)
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_cycle_yields_truncated_order() {
        let mut dag = diamond();
        dag.edges.push(DagEdge {
            from: "d".to_string(),
            to: "a".to_string(),
            via_places: vec![],
        });
        assert!(dag.topological_order().is_empty());
    }

    #[test]
    fn test_json_carries_provenance() {
        let json = serde_json::to_value(diamond()).unwrap();
        assert_eq!(json["schemaVersion"], "1.0");
        assert_eq!(json["derived_from_petri_net_id"], "net::diamond");
    }
}

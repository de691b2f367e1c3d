// Transition definitions - the active half of the net

//! # Transitions
//!
//! This module defines the active half of a Petri net. A transition consumes
//! tokens from its input places and produces tokens in its output places;
//! which places those are is recorded on the arcs, not here.
//!
//! ## Transition Kinds
//!
//! The builder classifies transitions by the control-flow construct they
//! implement. The kind is a **tagged variant**, not a subclass hierarchy:
//! all variant data lives in the same value, and downstream code matches on
//! the enum.
//!
//! - `Plain` - ordinary sequential work
//! - `Fork` - distributes tokens to parallel branches (>= 2 outputs)
//! - `Join` - collects tokens from parallel branches (>= 2 inputs)
//! - `Choice` - competes with siblings for a shared input place (XOR-split),
//!   or carries a `when` guard selecting one branch of an upstream choice
//!
//! The validator enforces the structural shape each kind implies.
//!
//! ## Guards Are Labels
//!
//! A guard is an opaque string. The engine never evaluates it as an
//! expression; it is a label that selection (deterministic hash, an
//! interactive caller, or branch wiring in the builder) can use to pick
//! among competing choice transitions.

use super::place::{ElementMetadata, TransitionId};
use serde::{Deserialize, Serialize};

/// Control-flow classification of a transition
///
/// ## Rust Learning Notes:
///
/// ### Unit Enums with Serde
/// `#[serde(rename_all = "lowercase")]` makes the JSON wire form
/// `"plain" | "fork" | "join" | "choice"` - stable and language-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Ordinary sequential transition
    Plain,
    /// Distributes one input token into every branch place
    Fork,
    /// Waits for a token in every input place, then emits one token
    Join,
    /// Competes with sibling choice transitions on a shared input place
    Choice,
}

impl Default for TransitionKind {
    fn default() -> Self {
        TransitionKind::Plain
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransitionKind::Plain => "plain",
            TransitionKind::Fork => "fork",
            TransitionKind::Join => "join",
            TransitionKind::Choice => "choice",
        };
        write!(f, "{}", s)
    }
}

/// **Petri net transition** - an atomic state change
///
/// Firing a transition consumes `weight` tokens along every input arc and
/// produces `weight` tokens along every output arc, atomically. A transition
/// with no enabled input marking simply cannot fire; there is no partial
/// firing.
///
/// The `action` label survives into the DAG projection as the node's action;
/// when absent the projector falls back to `name`, then to the constant
/// `execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Stable identifier, unique within the net and disjoint from place ids
    pub id: TransitionId,

    /// Human-readable display name
    pub name: String,

    /// Opaque guard label; present on choice transitions built from
    /// `when` clauses or branch paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    /// Action label carried into the DAG projection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Control-flow classification
    #[serde(default)]
    pub kind: TransitionKind,

    /// Free-form metadata; `generated: true` marks synthesized joins
    #[serde(default, skip_serializing_if = "ElementMetadata::is_empty")]
    pub metadata: ElementMetadata,
}

impl Transition {
    /// Create a plain transition with no guard, action or metadata
    pub fn new<I: Into<TransitionId>, N: Into<String>>(id: I, name: N) -> Self {
        Transition {
            id: id.into(),
            name: name.into(),
            guard: None,
            action: None,
            kind: TransitionKind::Plain,
            metadata: ElementMetadata::new(),
        }
    }

    /// Create a transition of a specific kind
    pub fn with_kind<I: Into<TransitionId>, N: Into<String>>(
        id: I,
        name: N,
        kind: TransitionKind,
    ) -> Self {
        Transition {
            kind,
            ..Transition::new(id, name)
        }
    }

    /// Set the guard label, consuming and returning the transition
    pub fn with_guard<G: Into<String>>(mut self, guard: G) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Set the action label, consuming and returning the transition
    pub fn with_action<A: Into<String>>(mut self, action: A) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Attach a metadata entry, consuming and returning the transition
    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this transition was synthesized by a rule-engine pass
    /// rather than written by the intent author
    pub fn is_generated(&self) -> bool {
        self.metadata
            .get("generated")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// The label the DAG projection will use for this transition's node
    pub fn action_label(&self) -> &str {
        match &self.action {
            Some(action) => action.as_str(),
            None if !self.name.is_empty() => self.name.as_str(),
            None => "execute",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_transition_defaults() {
        let t = Transition::new("transition::lint", "lint");
        assert_eq!(t.kind, TransitionKind::Plain);
        assert!(t.guard.is_none());
        assert!(t.action.is_none());
        assert!(!t.is_generated());
    }

    #[test]
    fn test_kind_round_trips_lowercase() {
        let t = Transition::with_kind("transition::par", "par", TransitionKind::Fork);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["kind"], "fork");

        let back: Transition = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, TransitionKind::Fork);
    }

    #[test]
    fn test_guarded_choice() {
        let t = Transition::with_kind("transition::deploy", "deploy", TransitionKind::Choice)
            .with_guard("ok");
        assert_eq!(t.guard.as_deref(), Some("ok"));
        assert_eq!(t.kind, TransitionKind::Choice);
    }

    #[test]
    fn test_generated_marker() {
        let t = Transition::with_kind("transition::par::join", "join", TransitionKind::Join)
            .with_metadata("generated", serde_json::json!(true));
        assert!(t.is_generated());
    }

    #[test]
    fn test_action_label_fallback_chain() {
        let with_action = Transition::new("t::a", "a").with_action("run tests");
        assert_eq!(with_action.action_label(), "run tests");

        let with_name = Transition::new("t::b", "b");
        assert_eq!(with_name.action_label(), "b");

        let bare = Transition::new("t::c", "");
        assert_eq!(bare.action_label(), "execute");
    }
}

// Core domain models - the immutable value types of the engine

//! # Domain Models
//!
//! Every value the engine produces or consumes lives here: identifiers,
//! places, transitions, arcs, markings, whole nets, intent specifications
//! and the DAG projection output. All of them are plain immutable values -
//! produced by pure constructors, serialized with serde, compared
//! extensionally, never mutated after return.
//!
//! The modules are deliberately free of engine logic. Construction lives
//! in `engine::builder`, behavioral analysis in `engine::validator`,
//! execution in `engine::simulator`, lowering in `engine::projector`.

/// Identifier newtypes and the `Place` value type
pub mod place;

/// Transitions and their control-flow kinds
pub mod transition;

/// Weighted bipartite arcs
pub mod arc;

/// Token distributions over places
pub mod marking;

/// The Petri net aggregate and its structural invariants
pub mod net;

/// Workflow intent specifications (builder input)
pub mod intent;

/// Causal DAG (projector output)
pub mod dag;

// Re-export the model types at `models::` for clean call sites.
pub use arc::NetArc;
pub use dag::{Dag, DagEdge, DagNode, IncomingEdge};
pub use intent::{IntentSpec, IntentStep, StepKind};
pub use marking::Marking;
pub use net::PetriNet;
pub use place::{ElementMetadata, Place, PlaceId, TransitionId};
pub use transition::{Transition, TransitionKind};

/// Schema version stamped on every top-level wire document
pub(crate) fn default_schema_version() -> String {
    "1.0".to_string()
}

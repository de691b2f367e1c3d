// Engine layer - construction, verification, simulation and projection

//! # Engine Module
//!
//! This module contains the four engines that operate on the domain
//! models, plus their shared plumbing. The engine layer sits between the
//! pure value types in `models` and the outside world (the CLI binary, or
//! any embedding application):
//!
//! - **Builder** (`builder` + `rules`) - compiles an `IntentSpec` into a
//!   `PetriNet` through the construction grammar and the rule-engine
//!   post-passes.
//! - **Validator** (`validator`) - structural checks plus bounded
//!   reachability search; produces a `ValidationReport` value, never an
//!   error.
//! - **Simulator** (`simulator`) - deterministic or interactive token
//!   play, producing a replayable `Trace`.
//! - **Projector** (`projector`) - lowers a net onto a causal `Dag`.
//!
//! Every engine call is a synchronous pure function of its inputs (plus
//! the cancellation token and wall clock for the bounded searches). No
//! global state, no suspension points; concurrent calls share nothing.

/// Intent-to-net construction grammar and the staged builder
pub mod builder;

/// Rule-engine post-passes applied by the builder
pub mod rules;

/// Structural and behavioral verification
pub mod validator;

/// Deterministic and interactive token simulation
pub mod simulator;

/// Net-to-DAG lowering
pub mod projector;

/// Dense compiled view of a net, shared by validator and simulator
pub mod compiled;

/// Cooperative cancellation and wall-clock budgets
pub mod cancel;

// Re-export the engine API at `engine::` for clean call sites.
pub use builder::{BuildConfig, ConstructionError, NamingStrategy, NetBuilder};
pub use cancel::{CancellationToken, Deadline};
pub use projector::{project, ProjectionError};
pub use simulator::{
    Selection, SimulationConfig, SimulationError, SimulationMode, Simulator, TerminationReason,
    Trace, TraceEvent, TransitionSelector,
};
pub use validator::{
    CheckKind, CheckResult, CheckStatus, ReportStatus, ValidationConfig, ValidationReport,
    Validator, Witness,
};

// PetriFlow - workflow-to-Petri-net compiler, verifier, simulator, projector

//! # PetriFlow Library
//!
//! PetriFlow turns workflow descriptions into formal Petri nets, verifies
//! the nets statically, simulates token flow into reproducible traces, and
//! projects the nets onto causal DAGs for downstream execution or
//! visualization. This file is the **library root**: it declares the
//! module tree and re-exports the public API.
//!
//! ## The Pipeline
//!
//! ```text
//! YAML workflow          IntentSpec            PetriNet
//!      │   parse_workflow_yaml │   NetBuilder      │
//!      └──────────────────────►└──────────────────►├── Validator ──► ValidationReport
//!                                                  ├── Simulator ──► Trace
//!                                                  └── project  ───► Dag
//! ```
//!
//! Every stage is a synchronous pure function: same inputs, same bytes
//! out, on every platform. Validation failures are *values* inside the
//! report - `fail` and `inconclusive` are ordinary outcomes, not errors.
//!
//! ## Usage Example
//!
//! ```rust
//! use petriflow::{
//!     parse_workflow_yaml, project, BuildConfig, NetBuilder, ReportStatus, SimulationConfig,
//!     Simulator, ValidationConfig, Validator,
//! };
//!
//! let yaml = "\
//! jobs:
//!   lint: {}
//!   test:
//!     needs: lint
//! ";
//! let intent = parse_workflow_yaml(yaml, "ci.yml").unwrap();
//! let net = NetBuilder::from_intent(&intent, &BuildConfig::default())
//!     .build()
//!     .unwrap();
//!
//! let report = Validator::new(&ValidationConfig::default()).validate(&net);
//! assert_eq!(report.status, ReportStatus::Pass);
//!
//! let trace = Simulator::new(&SimulationConfig::default()).run(&net).unwrap();
//! assert_eq!(trace.steps, 2);
//!
//! let dag = project(&net).unwrap();
//! assert!(dag.has_edge("transition::lint", "transition::test"));
//! ```
//!
//! ## Rust Learning Notes:
//!
//! ### Module System
//! Each `pub mod` below pulls in a directory with a `mod.rs` root. The
//! `pub use` re-exports flatten the hierarchy so callers write
//! `petriflow::PetriNet` instead of `petriflow::models::net::PetriNet`.

// Core domain models (pure value types)
pub mod models;

// Workflow YAML front-end
pub mod parser;

// Construction, validation, simulation, projection engines
pub mod engine;

// Re-export the model types for easy access
pub use models::{
    Dag,           // Causal DAG projection output
    DagEdge,       // One strict ordering in the DAG
    DagNode,       // One transition as a DAG node
    IntentSpec,    // Normalized workflow description
    IntentStep,    // One step of an intent
    Marking,       // Token distribution over places
    NetArc,        // Weighted place/transition arc
    PetriNet,      // The workflow net itself
    Place,         // Passive net element
    PlaceId,       // Place identifier newtype
    StepKind,      // action | choice | parallel | sync
    Transition,    // Active net element
    TransitionId,  // Transition identifier newtype
    TransitionKind, // plain | fork | join | choice
};

// Re-export the front-end
pub use parser::{
    parse_workflow_yaml, parse_workflow_yaml_with_warnings, ParseError, ParseErrorKind,
    ParseWarning,
};

// Re-export the engine API
pub use engine::{
    project,            // Net -> DAG lowering
    BuildConfig,        // Builder configuration
    CancellationToken,  // Cooperative cancellation handle
    CheckKind,          // Individual validator checks
    CheckStatus,        // Per-check outcome
    ConstructionError,  // Builder failure modes
    NamingStrategy,     // Id synthesis scheme
    NetBuilder,         // Staged intent-to-net builder
    ProjectionError,    // Projector failure modes
    ReportStatus,       // Overall validation verdict
    Selection,          // Interactive simulation decision
    SimulationConfig,   // Simulator configuration
    SimulationError,    // Simulator failure modes
    SimulationMode,     // deterministic | interactive
    Simulator,          // Token simulator
    TerminationReason,  // Why a simulation ended
    Trace,              // Replayable firing trace
    TraceEvent,         // One firing with its markings
    TransitionSelector, // Interactive selection callback
    ValidationConfig,   // Validator configuration
    ValidationReport,   // The validator's verdict
    Validator,          // Structural + behavioral verifier
    Witness,            // Concrete evidence for failures
};

// Core error types
// Using the `thiserror` crate to make error handling easier
use thiserror::Error;

/// Umbrella error for embedding applications and the CLI
///
/// The engine APIs return their specific error types; this enum exists so
/// a caller driving the whole pipeline can use one `Result` type and `?`
/// throughout. Validation outcomes are deliberately absent - a `fail`
/// report is a successful validation run.
#[derive(Error, Debug)]
pub enum PetriFlowError {
    /// Workflow document could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Intent could not be compiled into a net
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Simulation could not run
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Net could not be projected
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// JSON serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File system access failed (CLI paths)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PetriFlowError {
    /// Stable machine-readable code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            PetriFlowError::Parse(e) => e.code(),
            PetriFlowError::Construction(e) => e.code(),
            PetriFlowError::Simulation(e) => e.code(),
            PetriFlowError::Projection(e) => e.code(),
            PetriFlowError::Serialization(_) => "serialization::json",
            PetriFlowError::Io(_) => "io::error",
        }
    }
}

/// Type alias for Results that use the umbrella error type
pub type Result<T> = std::result::Result<T, PetriFlowError>;

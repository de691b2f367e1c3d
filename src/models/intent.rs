// Intent specifications - the workflow description the grammar compiles

//! # Intent Specifications
//!
//! An `IntentSpec` is the normalized workflow description that the grammar
//! compiles into a Petri net. Both front-ends produce it: the YAML parser
//! maps every GitHub-Actions job to an `action` step, and programmatic
//! callers assemble steps directly.
//!
//! ## Step Kinds
//!
//! - `Action` - one unit of work; becomes a single transition
//! - `Choice` - an XOR-split; each `paths` label becomes a competing
//!   choice transition
//! - `Parallel` - an AND-split; a fork transition distributes tokens to
//!   one branch per `branches` label
//! - `Sync` - an AND-join; collects the branches of the parallel step (or
//!   arbitrary steps) it depends on
//!
//! Per-kind attributes live in the same value as the kind tag - `paths`
//! for choices, `branches` for parallels - rather than in a trait
//! hierarchy. A parallel step must name its branches explicitly; the
//! builder rejects a parallel step with an empty branch list rather than
//! guessing branches from downstream dependencies.
//!
//! ## Ordering Invariant
//!
//! Steps are ordered and each step's dependencies must reference earlier
//! steps, so the dependency graph is acyclic by construction. The YAML
//! front-end topologically sorts jobs before emitting steps; programmatic
//! specs are checked by [`IntentSpec::validate`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification of an intent step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// One unit of work
    Action,
    /// XOR-split across `paths` labels
    Choice,
    /// AND-split across `branches` labels
    Parallel,
    /// AND-join over the dependencies
    Sync,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepKind::Action => "action",
            StepKind::Choice => "choice",
            StepKind::Parallel => "parallel",
            StepKind::Sync => "sync",
        };
        write!(f, "{}", s)
    }
}

/// One step of an intent specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentStep {
    /// Unique identifier within the spec
    pub id: String,

    /// Step classification
    pub kind: StepKind,

    /// Human-readable description; becomes the transition display name
    #[serde(default)]
    pub description: String,

    /// Ids of steps this step depends on; must reference earlier steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Optional guard label
    ///
    /// On an action step this makes the transition a guarded choice; when
    /// the step depends on a choice step and the guard equals one of its
    /// path labels, the step is wired to that branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Branch labels of a choice step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    /// Branch labels of a parallel step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
}

impl IntentStep {
    /// Create an action step with no dependencies
    pub fn action<I: Into<String>, D: Into<String>>(id: I, description: D) -> Self {
        IntentStep {
            id: id.into(),
            kind: StepKind::Action,
            description: description.into(),
            depends_on: Vec::new(),
            when: None,
            paths: Vec::new(),
            branches: Vec::new(),
        }
    }

    /// Create a choice step over `paths`
    pub fn choice<I: Into<String>, D: Into<String>>(
        id: I,
        description: D,
        paths: Vec<String>,
    ) -> Self {
        IntentStep {
            kind: StepKind::Choice,
            paths,
            ..IntentStep::action(id, description)
        }
    }

    /// Create a parallel step over `branches`
    pub fn parallel<I: Into<String>, D: Into<String>>(
        id: I,
        description: D,
        branches: Vec<String>,
    ) -> Self {
        IntentStep {
            kind: StepKind::Parallel,
            branches,
            ..IntentStep::action(id, description)
        }
    }

    /// Create a sync step joining `depends_on`
    pub fn sync<I: Into<String>, D: Into<String>>(
        id: I,
        description: D,
        depends_on: Vec<String>,
    ) -> Self {
        IntentStep {
            kind: StepKind::Sync,
            depends_on,
            ..IntentStep::action(id, description)
        }
    }

    /// Add dependencies, consuming and returning the step
    pub fn depends<S: Into<String>>(mut self, deps: Vec<S>) -> Self {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Set the guard label, consuming and returning the step
    pub fn when_label<W: Into<String>>(mut self, when: W) -> Self {
        self.when = Some(when.into());
        self
    }
}

/// A complete workflow intent: ordered steps plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSpec {
    /// Wire-format schema version
    #[serde(rename = "schemaVersion", default = "super::default_schema_version")]
    pub schema_version: String,

    /// Workflow name; becomes the net name
    pub name: String,

    /// Ordered steps; dependencies reference earlier steps only
    pub steps: Vec<IntentStep>,

    /// The natural-language prompt this spec was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_prompt: Option<String>,

    /// Template the prompt was matched against, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl IntentSpec {
    /// Create a spec from ordered steps
    pub fn new<N: Into<String>>(name: N, steps: Vec<IntentStep>) -> Self {
        IntentSpec {
            schema_version: super::default_schema_version(),
            name: name.into(),
            steps,
            origin_prompt: None,
            template_id: None,
        }
    }

    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&IntentStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Ids of steps that depend on `id`, in spec order
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.depends_on.iter().any(|d| d == id))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Check the spec invariants
    ///
    /// - step ids are unique
    /// - every dependency references an *earlier* step (which also makes
    ///   the dependency graph acyclic)
    pub fn validate(&self) -> Result<(), String> {
        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(format!("duplicate step id '{}'", step.id));
            }
            for dep in &step.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(format!(
                        "step '{}' depends on '{}' which is not an earlier step",
                        step.id, dep
                    ));
                }
            }
        }
        Ok(())
    }
}

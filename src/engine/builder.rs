// Intent-to-net grammar - compiles an IntentSpec into a Petri net

//! # Net Builder
//!
//! The builder maps every intent step to a small place/transition sub-graph
//! and wires the sub-graphs together along the dependency edges. A
//! rule-engine pipeline (in [`rules`](super::rules)) then post-processes
//! the result: matching forks with joins, merging choice branches,
//! optionally collapsing sequential chains, computing the initial marking
//! and recording the sinks.
//!
//! ## Sub-Graph per Step Kind
//!
//! - **Action** `s`: one transition `transition::{s}`. With a `when`
//!   guard the transition kind is `choice` and carries the guard verbatim.
//! - **Choice** `s` with paths `l1..ln`: one choice transition
//!   `transition::{s}::{li}` per label, all sharing the step's input
//!   place(s) - the free-choice XOR construct.
//! - **Parallel** `s` with branches `b1..bk`: a fork transition, one
//!   branch head place, branch transition and branch terminal (`::done`)
//!   place per label. The matching join consumes the terminals.
//! - **Sync** `s`: one join transition. Parallel dependencies are wired to
//!   the fork's branch terminals by the parallel-join rule; other
//!   dependencies are joined through their output ports directly.
//!
//! ## Wiring and Token Fan-Out
//!
//! A step with a single dependent exposes one output port
//! (`place::{s}::post`) that the dependent consumes directly. A step with
//! several dependents exposes one port **per dependent**
//! (`place::{s}::out::{d}`) and its transition produces a token into each:
//! every dependent must observe the completion, so the token is duplicated
//! at the producer, never shared. A shared post place would deadlock the
//! net the moment two dependents competed for one token, and would also
//! erase the per-edge causality the DAG projection reads off the places.
//!
//! A step with several dependencies consumes each dependency's port
//! directly through its own transition - the transition *is* the implicit
//! join. Standalone join transitions only appear for explicit sync steps
//! and for synthesized parallel joins.
//!
//! ## Determinism
//!
//! Every synthesized id is a pure function of the step ids involved, so
//! building the same intent twice yields byte-identical nets. Places and
//! transitions are emitted sorted by id and arcs are canonically sorted
//! before the net is assembled.

use crate::models::{
    ElementMetadata, IntentSpec, Marking, NetArc, PetriNet, Place, PlaceId, StepKind, Transition,
    TransitionId, TransitionKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Identifier synthesis scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// Namespaced ids: `place::{step}::pre`, `transition::{step}`
    Default,
    /// Compact ids: `{step}.pre`, transition id = step id
    Minimal,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy::Default
    }
}

/// Build-time configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Collapse single-producer/single-consumer chains (rule 3); off by
    /// default because the fused net no longer maps one transition per
    /// step
    pub optimize_sequential: bool,

    /// Stamp every element with the id of the step that produced it
    pub add_debug_metadata: bool,

    /// Identifier synthesis scheme
    pub naming: NamingStrategy,

    /// Synthesize a join for forks without a matching sync step (rule 1);
    /// disable to hand unmatched forks to the validator instead
    pub synthesize_joins: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            optimize_sequential: false,
            add_debug_metadata: false,
            naming: NamingStrategy::Default,
            synthesize_joins: true,
        }
    }
}

/// Failure modes of net construction
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConstructionError {
    /// The spec has no steps at all
    #[error("intent spec has no steps")]
    EmptySpec,

    /// Two steps share an id
    #[error("duplicate step id '{step}'")]
    DuplicateStepId { step: String },

    /// A dependency does not resolve to an earlier step
    #[error("step '{step}' depends on '{dependency}' which is not an earlier step")]
    DanglingDependency { step: String, dependency: String },

    /// A choice has no paths / a parallel has no branches
    #[error("{kind} step '{step}' declares no branch labels")]
    MissingBranches { step: String, kind: String },

    /// A sync step with nothing to join
    #[error("sync step '{step}' has no dependencies to join")]
    EmptyJoin { step: String },

    /// More than one place would receive an initial token
    #[error("net has multiple entry points: {}", places.join(", "))]
    MultipleEntryPoints { places: Vec<String> },

    /// No place would receive an initial token
    #[error("net has no entry point")]
    NoEntryPoint,
}

impl ConstructionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ConstructionError::EmptySpec => "construction::empty_spec",
            ConstructionError::DuplicateStepId { .. } => "construction::duplicate_id",
            ConstructionError::DanglingDependency { .. } => "construction::dangling_reference",
            ConstructionError::MissingBranches { .. } => "construction::missing_branches",
            ConstructionError::EmptyJoin { .. } => "construction::empty_join",
            ConstructionError::MultipleEntryPoints { .. } => {
                "construction::multiple_entry_points"
            }
            ConstructionError::NoEntryPoint => "construction::no_entry_point",
        }
    }
}

/// Pre-resolved view of one step, shared by emission and the rule passes
#[derive(Debug, Clone)]
pub(crate) struct StepInfo {
    pub id: String,
    pub kind: StepKind,
    pub description: String,
    pub when: Option<String>,
    pub paths: Vec<String>,
    pub branches: Vec<String>,
    /// Dependencies, deduplicated, declaration order
    pub deps: Vec<String>,
    /// Steps depending on this one, spec order
    pub dependents: Vec<String>,
}

/// A fork awaiting its join (consumed by the parallel-join rule)
#[derive(Debug, Clone)]
pub(crate) struct ForkRecord {
    pub step: String,
    pub fork: TransitionId,
    /// Branch terminal places, branch declaration order
    pub terminals: Vec<PlaceId>,
}

/// A choice with dependents that did not name a branch (choice-merge rule)
#[derive(Debug, Clone)]
pub(crate) struct ChoiceRecord {
    pub step: String,
    pub branch_transitions: Vec<TransitionId>,
}

/// Mutable construction state threaded through emission and rule passes
#[derive(Debug, Clone)]
pub(crate) struct BuilderState {
    pub config: BuildConfig,
    pub net_id: String,
    pub net_name: String,
    /// Steps by id
    pub steps: BTreeMap<String, StepInfo>,
    /// Step ids in spec order
    pub order: Vec<String>,
    pub places: BTreeMap<PlaceId, Place>,
    pub transitions: BTreeMap<TransitionId, Transition>,
    pub arcs: Vec<NetArc>,
    pub forks: Vec<ForkRecord>,
    pub choices: Vec<ChoiceRecord>,
    /// (sync step id, parallel step id) joins deferred to rule 1
    pub pending_joins: Vec<(String, String)>,
    /// Set by the initial-marking rule pass
    pub initial_marking: Option<Marking>,
    /// Net-level metadata accumulated by the rule passes (`sinks`)
    pub net_metadata: ElementMetadata,
}

impl BuilderState {
    /// Insert a place if absent, tagging it with the originating step
    /// when debug metadata is enabled
    pub fn ensure_place(&mut self, id: PlaceId, name: String, step: &str) {
        if self.places.contains_key(&id) {
            return;
        }
        let mut place = Place::new(id.clone(), name);
        if self.config.add_debug_metadata {
            place
                .metadata
                .insert("step".to_string(), serde_json::json!(step));
        }
        self.places.insert(id, place);
    }

    /// Insert a transition; ids are synthesized uniquely so a collision is
    /// a programming error, not an input error
    pub fn insert_transition(&mut self, mut transition: Transition, step: &str) {
        if self.config.add_debug_metadata {
            transition
                .metadata
                .insert("step".to_string(), serde_json::json!(step));
        }
        let replaced = self.transitions.insert(transition.id.clone(), transition);
        debug_assert!(replaced.is_none(), "transition ids are unique by synthesis");
    }

    pub fn add_arc<S: Into<String>, T: Into<String>>(&mut self, source: S, target: T) {
        self.arcs.push(NetArc::new(source, target));
    }

    /// Namer shorthands; all id synthesis funnels through these.
    pub fn entry_place(&self, step: &str) -> PlaceId {
        self.named(&format!("place::{}::pre", step), &format!("{}.pre", step))
    }
    pub fn post_place(&self, step: &str) -> PlaceId {
        self.named(&format!("place::{}::post", step), &format!("{}.post", step))
    }
    pub fn out_place(&self, step: &str, dependent: &str) -> PlaceId {
        self.named(
            &format!("place::{}::out::{}", step, dependent),
            &format!("{}.out.{}", step, dependent),
        )
    }
    pub fn branch_place(&self, step: &str, label: &str) -> PlaceId {
        self.named(
            &format!("place::{}::{}", step, label),
            &format!("{}.{}.post", step, label),
        )
    }
    pub fn branch_out_place(&self, step: &str, label: &str, dependent: &str) -> PlaceId {
        self.named(
            &format!("place::{}::{}::out::{}", step, label, dependent),
            &format!("{}.{}.out.{}", step, label, dependent),
        )
    }
    pub fn branch_head_place(&self, step: &str, label: &str) -> PlaceId {
        self.named(
            &format!("place::{}::{}", step, label),
            &format!("{}.{}.head", step, label),
        )
    }
    pub fn branch_done_place(&self, step: &str, label: &str) -> PlaceId {
        self.named(
            &format!("place::{}::{}::done", step, label),
            &format!("{}.{}.done", step, label),
        )
    }
    pub fn merge_place(&self, step: &str) -> PlaceId {
        self.named(
            &format!("place::{}::merge", step),
            &format!("{}.merge", step),
        )
    }
    pub fn merge_out_place(&self, step: &str, dependent: &str) -> PlaceId {
        self.named(
            &format!("place::{}::merge::out::{}", step, dependent),
            &format!("{}.merge.out.{}", step, dependent),
        )
    }
    pub fn step_transition(&self, step: &str) -> TransitionId {
        TransitionId::from(match self.config.naming {
            NamingStrategy::Default => format!("transition::{}", step),
            NamingStrategy::Minimal => step.to_string(),
        })
    }
    pub fn branch_transition(&self, step: &str, label: &str) -> TransitionId {
        TransitionId::from(match self.config.naming {
            NamingStrategy::Default => format!("transition::{}::{}", step, label),
            NamingStrategy::Minimal => format!("{}.{}", step, label),
        })
    }
    pub fn join_transition(&self, step: &str) -> TransitionId {
        TransitionId::from(match self.config.naming {
            NamingStrategy::Default => format!("transition::{}::join", step),
            NamingStrategy::Minimal => format!("{}.join", step),
        })
    }

    fn named(&self, namespaced: &str, minimal: &str) -> PlaceId {
        PlaceId::from(match self.config.naming {
            NamingStrategy::Default => namespaced,
            NamingStrategy::Minimal => minimal,
        })
    }

    /// Dependents that consume this step's output ports
    ///
    /// Sync dependents of a parallel step consume the fork's branch
    /// terminals instead of a port, so they are excluded there.
    pub fn port_dependents(&self, step: &str) -> Vec<&str> {
        let info = &self.steps[step];
        info.dependents
            .iter()
            .filter(|d| {
                info.kind != StepKind::Parallel || self.steps[d.as_str()].kind != StepKind::Sync
            })
            .map(|d| d.as_str())
            .collect()
    }

    /// Output ports of a step: `post` for zero or one consumer, one
    /// `out::{dependent}` place per consumer otherwise
    pub fn out_ports(&self, step: &str) -> Vec<PlaceId> {
        let dependents = self.port_dependents(step);
        match dependents.len() {
            0 | 1 => vec![self.post_place(step)],
            _ => dependents
                .iter()
                .map(|d| self.out_place(step, d))
                .collect(),
        }
    }

    /// Dependents of a choice bound to branch `label` via `when`
    pub fn matched_dependents(&self, choice: &str, label: &str) -> Vec<&str> {
        self.steps[choice]
            .dependents
            .iter()
            .filter(|d| self.steps[d.as_str()].when.as_deref() == Some(label))
            .map(|d| d.as_str())
            .collect()
    }

    /// Dependents of a choice not bound to any branch label
    pub fn unmatched_dependents(&self, choice: &str) -> Vec<&str> {
        let info = &self.steps[choice];
        info.dependents
            .iter()
            .filter(|d| match self.steps[d.as_str()].when.as_deref() {
                Some(label) => !info.paths.iter().any(|p| p == label),
                None => true,
            })
            .map(|d| d.as_str())
            .collect()
    }

    /// The place `consumer` reads to observe completion of `dep`
    pub fn input_port(&self, dep: &str, consumer: &str) -> PlaceId {
        let dep_info = &self.steps[dep];
        match dep_info.kind {
            StepKind::Action | StepKind::Sync | StepKind::Parallel => {
                if self.port_dependents(dep).len() <= 1 {
                    self.post_place(dep)
                } else {
                    self.out_place(dep, consumer)
                }
            }
            StepKind::Choice => {
                let when = self.steps[consumer].when.clone();
                match when.as_deref().filter(|w| dep_info.paths.iter().any(|p| p == w)) {
                    Some(label) => {
                        if self.matched_dependents(dep, label).len() <= 1 {
                            self.branch_place(dep, label)
                        } else {
                            self.branch_out_place(dep, label, consumer)
                        }
                    }
                    None => {
                        if self.unmatched_dependents(dep).len() <= 1 {
                            self.merge_place(dep)
                        } else {
                            self.merge_out_place(dep, consumer)
                        }
                    }
                }
            }
        }
    }
}

/// Staged builder: `from_intent` captures the inputs, `build` runs the
/// grammar and the rule pipeline and finalizes the invariants
#[derive(Debug, Clone)]
pub struct NetBuilder {
    intent: IntentSpec,
    config: BuildConfig,
}

impl NetBuilder {
    /// Capture an intent and a configuration
    pub fn from_intent(intent: &IntentSpec, config: &BuildConfig) -> Self {
        NetBuilder {
            intent: intent.clone(),
            config: config.clone(),
        }
    }

    /// Compile the captured intent into a well-formed net
    pub fn build(self) -> Result<PetriNet, ConstructionError> {
        let mut state = self.check_and_index()?;

        for step_id in state.order.clone() {
            emit_step(&mut state, &step_id)?;
        }

        // Rule-engine pipeline; each pass consumes and returns the state.
        let state = super::rules::parallel_join_rule(state)?;
        let state = super::rules::choice_merge_rule(state)?;
        let state = super::rules::sequential_chain_rule(state)?;
        let state = super::rules::initial_marking_rule(state)?;
        let mut state = super::rules::sink_rule(state)?;

        let initial_marking = state.initial_marking.take().expect("set by rule pass");
        let metadata = std::mem::take(&mut state.net_metadata);

        let mut arcs = state.arcs;
        arcs.sort_by(|a, b| {
            (a.source.as_str(), a.target.as_str()).cmp(&(b.source.as_str(), b.target.as_str()))
        });

        let mut net = PetriNet::new(
            state.net_id,
            state.net_name,
            state.places.into_values().collect(),
            state.transitions.into_values().collect(),
            arcs,
            initial_marking,
        );
        net.metadata = metadata;

        debug!(
            places = net.places.len(),
            transitions = net.transitions.len(),
            arcs = net.arcs.len(),
            "built net"
        );
        debug_assert!(net.validate_structure().is_ok());
        Ok(net)
    }

    /// Validate the intent and build the step table
    fn check_and_index(&self) -> Result<BuilderState, ConstructionError> {
        if self.intent.steps.is_empty() {
            return Err(ConstructionError::EmptySpec);
        }

        let mut steps: BTreeMap<String, StepInfo> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.intent.steps.len());
        for step in &self.intent.steps {
            if steps.contains_key(&step.id) {
                return Err(ConstructionError::DuplicateStepId {
                    step: step.id.clone(),
                });
            }
            // Deduplicate dependencies, preserving first occurrence.
            let mut seen = HashSet::new();
            let deps: Vec<String> = step
                .depends_on
                .iter()
                .filter(|d| seen.insert(d.as_str()))
                .cloned()
                .collect();
            for dep in &deps {
                if !steps.contains_key(dep) {
                    return Err(ConstructionError::DanglingDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            for dep in &deps {
                steps
                    .get_mut(dep)
                    .expect("checked above")
                    .dependents
                    .push(step.id.clone());
            }
            order.push(step.id.clone());
            steps.insert(
                step.id.clone(),
                StepInfo {
                    id: step.id.clone(),
                    kind: step.kind,
                    description: step.description.clone(),
                    when: step.when.clone(),
                    paths: step.paths.clone(),
                    branches: step.branches.clone(),
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        Ok(BuilderState {
            config: self.config.clone(),
            net_id: format!("net::{}", self.intent.name),
            net_name: self.intent.name.clone(),
            steps,
            order,
            places: BTreeMap::new(),
            transitions: BTreeMap::new(),
            arcs: Vec::new(),
            forks: Vec::new(),
            choices: Vec::new(),
            pending_joins: Vec::new(),
            initial_marking: None,
            net_metadata: ElementMetadata::new(),
        })
    }
}

/// Emit the sub-graph of one step and wire it to its dependencies
fn emit_step(state: &mut BuilderState, step_id: &str) -> Result<(), ConstructionError> {
    let info = state.steps[step_id].clone();

    // Input side: an entry place for root steps, otherwise one port per
    // dependency. Sync steps defer parallel dependencies to rule 1.
    let mut inputs: Vec<PlaceId> = Vec::new();
    if info.deps.is_empty() {
        if info.kind == StepKind::Sync {
            return Err(ConstructionError::EmptyJoin {
                step: step_id.to_string(),
            });
        }
        let entry = state.entry_place(step_id);
        state.ensure_place(entry.clone(), format!("{} ready", step_id), step_id);
        inputs.push(entry);
    } else {
        for dep in &info.deps {
            if info.kind == StepKind::Sync && state.steps[dep].kind == StepKind::Parallel {
                state
                    .pending_joins
                    .push((step_id.to_string(), dep.clone()));
                continue;
            }
            let port = state.input_port(dep, step_id);
            state.ensure_place(port.clone(), format!("{} done", dep), dep);
            inputs.push(port);
        }
    }

    match info.kind {
        StepKind::Action => emit_action(state, &info, &inputs),
        StepKind::Choice => emit_choice(state, &info, &inputs)?,
        StepKind::Parallel => emit_parallel(state, &info, &inputs)?,
        StepKind::Sync => emit_sync(state, &info, &inputs),
    }
    Ok(())
}

fn emit_action(state: &mut BuilderState, info: &StepInfo, inputs: &[PlaceId]) {
    let tid = state.step_transition(&info.id);
    let mut transition = Transition::new(tid.clone(), info.id.clone());
    if let Some(when) = &info.when {
        transition.kind = TransitionKind::Choice;
        transition.guard = Some(when.clone());
    }
    if !info.description.is_empty() {
        transition.action = Some(info.description.clone());
    }
    state.insert_transition(transition, &info.id);

    for input in inputs {
        state.add_arc(input.as_str().to_string(), tid.as_str().to_string());
    }
    for port in state.out_ports(&info.id) {
        state.ensure_place(port.clone(), format!("{} done", info.id), &info.id);
        state.add_arc(tid.as_str().to_string(), port.as_str().to_string());
    }
}

fn emit_choice(
    state: &mut BuilderState,
    info: &StepInfo,
    inputs: &[PlaceId],
) -> Result<(), ConstructionError> {
    if info.paths.is_empty() {
        return Err(ConstructionError::MissingBranches {
            step: info.id.clone(),
            kind: "choice".to_string(),
        });
    }

    let unmatched = !state.unmatched_dependents(&info.id).is_empty();
    let mut branch_transitions = Vec::with_capacity(info.paths.len());

    for label in &info.paths {
        let tid = state.branch_transition(&info.id, label);
        let transition = Transition::with_kind(tid.clone(), label.clone(), TransitionKind::Choice)
            .with_guard(label.clone());
        state.insert_transition(transition, &info.id);
        branch_transitions.push(tid.clone());

        // Every branch competes for the same input tokens: the XOR-split.
        for input in inputs {
            state.add_arc(input.as_str().to_string(), tid.as_str().to_string());
        }

        let matched = state.matched_dependents(&info.id, label);
        let ports: Vec<PlaceId> = match matched.len() {
            0 if unmatched => Vec::new(), // merge pass supplies the output
            0 | 1 => vec![state.branch_place(&info.id, label)],
            _ => matched
                .iter()
                .map(|d| state.branch_out_place(&info.id, label, d))
                .collect(),
        };
        for port in ports {
            state.ensure_place(port.clone(), format!("{} {}", info.id, label), &info.id);
            state.add_arc(tid.as_str().to_string(), port.as_str().to_string());
        }
    }

    if unmatched {
        state.choices.push(ChoiceRecord {
            step: info.id.clone(),
            branch_transitions,
        });
    }
    Ok(())
}

fn emit_parallel(
    state: &mut BuilderState,
    info: &StepInfo,
    inputs: &[PlaceId],
) -> Result<(), ConstructionError> {
    if info.branches.is_empty() {
        return Err(ConstructionError::MissingBranches {
            step: info.id.clone(),
            kind: "parallel".to_string(),
        });
    }

    let fork = state.step_transition(&info.id);
    let mut transition = Transition::with_kind(fork.clone(), info.id.clone(), TransitionKind::Fork);
    if !info.description.is_empty() {
        transition.action = Some(info.description.clone());
    }
    state.insert_transition(transition, &info.id);
    for input in inputs {
        state.add_arc(input.as_str().to_string(), fork.as_str().to_string());
    }

    let mut terminals = Vec::with_capacity(info.branches.len());
    for label in &info.branches {
        let head = state.branch_head_place(&info.id, label);
        state.ensure_place(head.clone(), format!("{} {}", info.id, label), &info.id);
        state.add_arc(fork.as_str().to_string(), head.as_str().to_string());

        let tid = state.branch_transition(&info.id, label);
        state.insert_transition(Transition::new(tid.clone(), label.clone()), &info.id);
        state.add_arc(head.as_str().to_string(), tid.as_str().to_string());

        let done = state.branch_done_place(&info.id, label);
        state.ensure_place(done.clone(), format!("{} {} done", info.id, label), &info.id);
        state.add_arc(tid.as_str().to_string(), done.as_str().to_string());
        terminals.push(done);
    }

    state.forks.push(ForkRecord {
        step: info.id.clone(),
        fork,
        terminals,
    });
    Ok(())
}

fn emit_sync(state: &mut BuilderState, info: &StepInfo, inputs: &[PlaceId]) {
    let tid = state.step_transition(&info.id);
    let mut transition = Transition::with_kind(tid.clone(), info.id.clone(), TransitionKind::Join);
    if !info.description.is_empty() {
        transition.action = Some(info.description.clone());
    }
    state.insert_transition(transition, &info.id);

    for input in inputs {
        state.add_arc(input.as_str().to_string(), tid.as_str().to_string());
    }
    for port in state.out_ports(&info.id) {
        state.ensure_place(port.clone(), format!("{} done", info.id), &info.id);
        state.add_arc(tid.as_str().to_string(), port.as_str().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntentStep;

    fn build(intent: &IntentSpec) -> PetriNet {
        NetBuilder::from_intent(intent, &BuildConfig::default())
            .build()
            .expect("intent should build")
    }

    #[test]
    fn test_single_action_is_two_places_one_transition() {
        let intent = IntentSpec::new("solo", vec![IntentStep::action("work", "do the work")]);
        let net = build(&intent);

        assert_eq!(net.places.len(), 2);
        assert_eq!(net.transitions.len(), 1);
        assert_eq!(net.initial_marking.total_tokens(), 1);
        assert_eq!(
            net.initial_marking.get(&PlaceId::from("place::work::pre")),
            1
        );
        assert!(net.validate_structure().is_ok());
    }

    #[test]
    fn test_fan_out_duplicates_tokens_per_dependent() {
        // a has two dependents -> one out place per dependent, and a's
        // transition produces into both.
        let intent = IntentSpec::new(
            "fanout",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::action("b", "b").depends(vec!["a"]),
                IntentStep::action("c", "c").depends(vec!["a"]),
            ],
        );
        let net = build(&intent);

        let t_a = TransitionId::from("transition::a");
        let outputs = net.outputs_of(&t_a);
        assert_eq!(outputs.len(), 2);
        assert!(net.is_place("place::a::out::b"));
        assert!(net.is_place("place::a::out::c"));

        // Each out place has exactly one consumer.
        assert_eq!(net.consumers_of(&PlaceId::from("place::a::out::b")).len(), 1);
    }

    #[test]
    fn test_multi_dependency_step_joins_in_its_own_transition() {
        let intent = IntentSpec::new(
            "join",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::action("b", "b").depends(vec!["a"]),
                IntentStep::action("c", "c").depends(vec!["a", "b"]),
            ],
        );
        let net = build(&intent);

        // No standalone join transition was synthesized.
        assert_eq!(net.transitions.len(), 3);
        let t_c = TransitionId::from("transition::c");
        assert_eq!(net.inputs_of(&t_c).len(), 2);
    }

    #[test]
    fn test_when_guard_makes_choice_kind() {
        let intent = IntentSpec::new(
            "guarded",
            vec![
                IntentStep::action("gate", "gate"),
                {
                    let mut s = IntentStep::action("ship", "ship").depends(vec!["gate"]);
                    s.when = Some("main-branch".to_string());
                    s
                },
            ],
        );
        let net = build(&intent);
        let ship = net.transition(&TransitionId::from("transition::ship")).unwrap();
        assert_eq!(ship.kind, TransitionKind::Choice);
        assert_eq!(ship.guard.as_deref(), Some("main-branch"));
    }

    #[test]
    fn test_choice_branches_share_input_place() {
        let intent = IntentSpec::new(
            "xor",
            vec![
                IntentStep::action("probe", "probe"),
                IntentStep::choice("decide", "decide", vec!["ok".into(), "fail".into()])
                    .depends(vec!["probe"]),
            ],
        );
        let net = build(&intent);

        let shared = PlaceId::from("place::probe::post");
        let consumers = net.consumers_of(&shared);
        assert_eq!(consumers.len(), 2);
        for consumer in &consumers {
            assert_eq!(net.transition(consumer).unwrap().kind, TransitionKind::Choice);
        }
        // Dead-end branches keep their posts as sinks.
        assert!(net.is_place("place::decide::ok"));
        assert!(net.is_place("place::decide::fail"));
    }

    #[test]
    fn test_empty_spec_rejected() {
        let err = NetBuilder::from_intent(&IntentSpec::new("none", vec![]), &BuildConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "construction::empty_spec");
    }

    #[test]
    fn test_duplicate_and_dangling_steps_rejected() {
        let dup = IntentSpec::new(
            "dup",
            vec![IntentStep::action("a", "a"), IntentStep::action("a", "a")],
        );
        assert_eq!(
            NetBuilder::from_intent(&dup, &BuildConfig::default())
                .build()
                .unwrap_err()
                .code(),
            "construction::duplicate_id"
        );

        let dangling = IntentSpec::new(
            "dangling",
            vec![IntentStep::action("a", "a").depends(vec!["ghost"])],
        );
        assert_eq!(
            NetBuilder::from_intent(&dangling, &BuildConfig::default())
                .build()
                .unwrap_err()
                .code(),
            "construction::dangling_reference"
        );
    }

    #[test]
    fn test_parallel_without_branches_rejected() {
        let intent = IntentSpec::new(
            "nobranch",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::parallel("par", "par", vec![]).depends(vec!["a"]),
            ],
        );
        let err = NetBuilder::from_intent(&intent, &BuildConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "construction::missing_branches");
    }

    #[test]
    fn test_two_root_steps_are_multiple_entry_points() {
        let intent = IntentSpec::new(
            "tworoots",
            vec![IntentStep::action("a", "a"), IntentStep::action("b", "b")],
        );
        let err = NetBuilder::from_intent(&intent, &BuildConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "construction::multiple_entry_points");
    }

    #[test]
    fn test_repeated_builds_are_identical() {
        let intent = IntentSpec::new(
            "repeat",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::parallel("par", "par", vec!["x".into(), "y".into()])
                    .depends(vec!["a"]),
                IntentStep::sync("gather", "gather", vec!["par".into()]),
            ],
        );
        let first = build(&intent);
        let second = build(&intent);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_minimal_naming_strategy() {
        let intent = IntentSpec::new(
            "mini",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::action("b", "b").depends(vec!["a"]),
            ],
        );
        let config = BuildConfig {
            naming: NamingStrategy::Minimal,
            ..BuildConfig::default()
        };
        let net = NetBuilder::from_intent(&intent, &config).build().unwrap();
        assert!(net.is_transition("a"));
        assert!(net.is_place("a.pre"));
        assert!(net.is_place("a.post"));
    }

    #[test]
    fn test_debug_metadata_stamps_origin_step() {
        let intent = IntentSpec::new("meta", vec![IntentStep::action("a", "a")]);
        let config = BuildConfig {
            add_debug_metadata: true,
            ..BuildConfig::default()
        };
        let net = NetBuilder::from_intent(&intent, &config).build().unwrap();
        let place = net.place(&PlaceId::from("place::a::pre")).unwrap();
        assert_eq!(place.metadata["step"], serde_json::json!("a"));
    }
}

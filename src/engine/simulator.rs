// Token simulation - deterministic and interactive firing traces

//! # Simulator
//!
//! The simulator plays tokens through a net and records every firing as a
//! trace event. Two modes:
//!
//! - **Deterministic** - at every step the enabled transitions are sorted
//!   by id and one is picked by a seeded hash of `(seed, step)`. The same
//!   net, seed and configuration always produce the bit-identical trace,
//!   on every platform.
//! - **Interactive** - the enabled set is handed to a caller-supplied
//!   [`TransitionSelector`]; the caller picks the next firing or stops
//!   the run. The CLI backs this with a terminal prompt.
//!
//! ## The Selection Hash
//!
//! Selection uses the `(step+1)`-th output of a splitmix64 stream seeded
//! with the configured seed: `mix64(seed, step) % enabled.len()`. The
//! constants are part of the wire contract - traces are reproducible
//! artifacts, so the mix can never change.
//!
//! ## Replay Invariant
//!
//! For every event, firing `fired` against `marking_before` yields
//! `marking_after` exactly. [`Trace::verify_replay`] re-checks this
//! against a net; the simulator itself records each event from the same
//! dense marking it fires on, with no batching or reordering.

use super::cancel::{CancellationToken, Deadline};
use super::compiled::CompiledNet;
use crate::models::{Marking, PetriNet, TransitionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Golden-ratio increment of the splitmix64 stream
const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

/// The `(step+1)`-th output of a splitmix64 generator seeded with `seed`
///
/// Fixed forever: deterministic traces are part of the wire contract.
pub(crate) fn mix64(seed: u64, step: u64) -> u64 {
    let mut z = seed.wrapping_add(step.wrapping_add(1).wrapping_mul(GOLDEN));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Simulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Seeded hash selection
    Deterministic,
    /// Caller-driven selection via a [`TransitionSelector`]
    Interactive,
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub mode: SimulationMode,

    /// Seed of the deterministic selection stream
    pub seed: u64,

    /// Firing budget; exceeding it terminates with `step_limit`
    pub max_steps: u32,

    /// Optional pause between steps (demo pacing for the CLI)
    pub step_delay_ms: Option<u64>,

    /// Record per-step events; the final marking is kept either way
    pub trace: bool,

    /// Optional wall-clock budget
    pub max_millis: Option<u64>,

    /// Optional cooperative cancellation handle
    pub cancellation: Option<CancellationToken>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            mode: SimulationMode::Deterministic,
            seed: 0,
            max_steps: 1000,
            step_delay_ms: None,
            trace: true,
            max_millis: None,
            cancellation: None,
        }
    }
}

/// Why a simulation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No transition enabled and the marking is final
    NormalTermination,
    /// No transition enabled and the marking is not final
    Deadlock,
    /// The step budget ran out
    StepLimit,
    /// The wall-clock budget ran out
    TimeLimit,
    /// The cancellation token fired or the selector stopped the run
    Cancelled,
}

/// One firing, with the markings around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Zero-based step index
    pub step: u32,

    /// The transition that fired
    pub fired: TransitionId,

    /// Marking the firing consumed from
    pub marking_before: Marking,

    /// Marking the firing produced
    pub marking_after: Marking,

    /// All transitions enabled before the firing, ascending by id
    pub enabled_before: Vec<TransitionId>,
}

/// A complete simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Wire-format schema version
    #[serde(rename = "schemaVersion", default = "crate::models::default_schema_version")]
    pub schema_version: String,

    /// Id of the simulated net
    pub net_id: String,

    /// Seed of the selection stream; absent for interactive runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Firing events in order; empty when tracing was disabled
    pub events: Vec<TraceEvent>,

    /// Number of firings performed (tracked even with tracing off)
    pub steps: u32,

    /// Marking when the run ended
    pub final_marking: Marking,

    /// Why the run ended
    pub termination: TerminationReason,
}

impl Trace {
    /// Re-fire every event against `net` and check the replay invariant
    pub fn verify_replay(&self, net: &PetriNet) -> Result<(), String> {
        let mut expected_before: Option<&Marking> = None;
        for event in &self.events {
            if let Some(previous_after) = expected_before {
                if previous_after != &event.marking_before {
                    return Err(format!(
                        "step {}: marking_before does not chain from the previous event",
                        event.step
                    ));
                }
            }
            let fired = net.fire(&event.marking_before, &event.fired).ok_or_else(|| {
                format!("step {}: '{}' was not enabled", event.step, event.fired)
            })?;
            if fired != event.marking_after {
                return Err(format!(
                    "step {}: firing '{}' diverges from the recorded marking",
                    event.step, event.fired
                ));
            }
            expected_before = Some(&event.marking_after);
        }
        if let Some(last) = self.events.last() {
            if last.marking_after != self.final_marking {
                return Err("final marking does not match the last event".to_string());
            }
        }
        Ok(())
    }
}

/// Simulation failure modes
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimulationError {
    /// The net or its initial marking cannot be simulated
    #[error("invalid initial marking: {detail}")]
    InvalidInitialMarking { detail: String },

    /// An interactive selection named a transition that is not enabled
    #[error("transition '{transition}' is not enabled (step {step})")]
    UnknownTransition { transition: String, step: u32 },

    /// Interactive mode requires a selector; use `run_with`
    #[error("interactive mode requires a transition selector")]
    SelectorRequired,
}

impl SimulationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SimulationError::InvalidInitialMarking { .. } => "simulation::invalid_initial_marking",
            SimulationError::UnknownTransition { .. } => "simulation::unknown_transition",
            SimulationError::SelectorRequired => "simulation::selector_required",
        }
    }
}

/// The caller's decision at an interactive step
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Fire this transition (must be in the enabled set)
    Fire(TransitionId),
    /// End the run; the trace terminates with `cancelled`
    Stop,
}

/// Caller-supplied chooser for interactive simulation
pub trait TransitionSelector {
    /// Pick among the enabled transitions at `step`
    fn select(&mut self, step: u32, enabled: &[TransitionId], marking: &Marking) -> Selection;
}

/// The simulator; construct once, run many nets
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Simulator {
            config: config.clone(),
        }
    }

    /// Run a deterministic simulation
    ///
    /// Fails with [`SimulationError::SelectorRequired`] when the
    /// configuration asks for interactive mode.
    pub fn run(&self, net: &PetriNet) -> Result<Trace, SimulationError> {
        match self.config.mode {
            SimulationMode::Deterministic => self.run_inner(net, None),
            SimulationMode::Interactive => Err(SimulationError::SelectorRequired),
        }
    }

    /// Run with a selector; required for interactive mode
    ///
    /// A deterministic configuration ignores the selector.
    pub fn run_with(
        &self,
        net: &PetriNet,
        selector: &mut dyn TransitionSelector,
    ) -> Result<Trace, SimulationError> {
        match self.config.mode {
            SimulationMode::Deterministic => self.run_inner(net, None),
            SimulationMode::Interactive => self.run_inner(net, Some(selector)),
        }
    }

    fn run_inner(
        &self,
        net: &PetriNet,
        mut selector: Option<&mut dyn TransitionSelector>,
    ) -> Result<Trace, SimulationError> {
        let compiled = CompiledNet::compile(net).map_err(|detail| {
            SimulationError::InvalidInitialMarking { detail }
        })?;
        if compiled.initial.iter().all(|&c| c == 0) {
            return Err(SimulationError::InvalidInitialMarking {
                detail: "initial marking is empty".to_string(),
            });
        }

        let deadline = self
            .config
            .max_millis
            .map(Deadline::after_millis)
            .unwrap_or_else(Deadline::never);

        let mut marking = compiled.initial.clone();
        let mut events = Vec::new();
        let mut steps = 0u32;
        let termination;

        loop {
            if steps >= self.config.max_steps {
                termination = TerminationReason::StepLimit;
                break;
            }
            if self.cancelled() {
                termination = TerminationReason::Cancelled;
                break;
            }
            if deadline.expired() {
                termination = TerminationReason::TimeLimit;
                break;
            }

            let enabled = compiled.enabled(&marking);
            if enabled.is_empty() {
                termination = if compiled.is_final(&marking) {
                    TerminationReason::NormalTermination
                } else {
                    TerminationReason::Deadlock
                };
                break;
            }

            let enabled_ids: Vec<TransitionId> = enabled
                .iter()
                .map(|&t| compiled.transitions[t].id.clone())
                .collect();

            let chosen = match selector.as_deref_mut() {
                None => enabled[(mix64(self.config.seed, steps as u64) % enabled.len() as u64)
                    as usize],
                Some(selector) => {
                    let sparse = compiled.to_sparse(&marking);
                    match selector.select(steps, &enabled_ids, &sparse) {
                        Selection::Stop => {
                            termination = TerminationReason::Cancelled;
                            break;
                        }
                        Selection::Fire(id) => compiled
                            .transition_index(&id)
                            .filter(|t| enabled.contains(t))
                            .ok_or(SimulationError::UnknownTransition {
                                transition: id.as_str().to_string(),
                                step: steps,
                            })?,
                    }
                }
            };

            let next = compiled.fire(&marking, chosen);
            if self.config.trace {
                events.push(TraceEvent {
                    step: steps,
                    fired: compiled.transitions[chosen].id.clone(),
                    marking_before: compiled.to_sparse(&marking),
                    marking_after: compiled.to_sparse(&next),
                    enabled_before: enabled_ids,
                });
            }
            debug!(step = steps, fired = %compiled.transitions[chosen].id, "fired");

            marking = next;
            steps += 1;

            if let Some(delay) = self.config.step_delay_ms {
                std::thread::sleep(std::time::Duration::from_millis(delay));
            }
        }

        Ok(Trace {
            schema_version: crate::models::default_schema_version(),
            net_id: net.id.clone(),
            seed: match self.config.mode {
                SimulationMode::Deterministic => Some(self.config.seed),
                SimulationMode::Interactive => None,
            },
            events,
            steps,
            final_marking: compiled.to_sparse(&marking),
            termination,
        })
    }

    fn cancelled(&self) -> bool {
        self.config
            .cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }
}

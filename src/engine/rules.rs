// Rule engine - post-construction passes over the builder state

//! # Rule Engine
//!
//! After the per-step sub-graphs are emitted, a fixed pipeline of rule
//! passes finishes the net. Each pass is an independent function that
//! consumes the builder state and returns the next state - no shared
//! registries, no mutable globals - and the pipeline order is part of the
//! construction contract:
//!
//! 1. **Parallel-join rule** - every fork is matched with exactly one join
//!    consuming its branch terminals: an explicit sync step when one
//!    exists, a synthesized join (`generated: true`) otherwise.
//! 2. **Choice-merge rule** - dependents of a choice that did not name a
//!    branch draw from a merge place fed by every branch transition.
//! 3. **Sequential-chain optimization** - optional fusion of
//!    single-producer/single-consumer chains; disabled by default.
//! 4. **Initial marking** - the unique entry place receives one token.
//! 5. **Sink identification** - sink places are recorded in net metadata.

use super::builder::{BuilderState, ConstructionError};
use crate::models::{Marking, PlaceId, Transition, TransitionId, TransitionKind};
use tracing::{debug, warn};

/// Rule 1: match every fork with exactly one join
///
/// A sync step that depends on the parallel step is the author's join; its
/// transition consumes the fork's branch terminals. Without one, a join is
/// synthesized (metadata `generated: true`) unless the configuration
/// disables synthesis, in which case the fork is left unmatched for the
/// validator to flag.
pub(crate) fn parallel_join_rule(
    mut state: BuilderState,
) -> Result<BuilderState, ConstructionError> {
    for fork in state.forks.clone() {
        let syncs: Vec<String> = state
            .pending_joins
            .iter()
            .filter(|(_, parallel)| parallel == &fork.step)
            .map(|(sync, _)| sync.clone())
            .collect();

        if !syncs.is_empty() {
            for sync in &syncs {
                let join = state.step_transition(sync);
                for terminal in &fork.terminals {
                    state.add_arc(terminal.as_str().to_string(), join.as_str().to_string());
                }
            }
            // Steps that depend on the parallel step directly (not via the
            // sync) still need completion tokens; the sync's join produces
            // them alongside its own output ports.
            if !state.port_dependents(&fork.step).is_empty() {
                let join = state.step_transition(&syncs[0]);
                for port in state.out_ports(&fork.step) {
                    state.ensure_place(port.clone(), format!("{} done", fork.step), &fork.step);
                    state.add_arc(join.as_str().to_string(), port.as_str().to_string());
                }
            }
            debug!(fork = %fork.fork, step = %fork.step, "fork matched by sync step");
        } else if state.config.synthesize_joins {
            let join = state.join_transition(&fork.step);
            let transition =
                Transition::with_kind(join.clone(), format!("{} join", fork.step), TransitionKind::Join)
                    .with_metadata("generated", serde_json::json!(true));
            state.insert_transition(transition, &fork.step);
            for terminal in &fork.terminals {
                state.add_arc(terminal.as_str().to_string(), join.as_str().to_string());
            }
            for port in state.out_ports(&fork.step) {
                state.ensure_place(port.clone(), format!("{} done", fork.step), &fork.step);
                state.add_arc(join.as_str().to_string(), port.as_str().to_string());
            }
            debug!(fork = %fork.fork, join = %join, "synthesized join for fork");
        } else {
            warn!(fork = %fork.fork, "fork left without a join (synthesis disabled)");
        }
    }
    Ok(state)
}

/// Rule 2: merge choice branches for dependents that did not pick one
///
/// Every branch transition of the choice produces a token into the merge
/// port(s), so the dependent proceeds no matter which branch fired - the
/// XOR-join dual of the XOR-split.
pub(crate) fn choice_merge_rule(
    mut state: BuilderState,
) -> Result<BuilderState, ConstructionError> {
    for record in state.choices.clone() {
        let unmatched: Vec<String> = state
            .unmatched_dependents(&record.step)
            .into_iter()
            .map(|d| d.to_string())
            .collect();
        if unmatched.is_empty() {
            continue;
        }

        let ports: Vec<PlaceId> = if unmatched.len() == 1 {
            vec![state.merge_place(&record.step)]
        } else {
            unmatched
                .iter()
                .map(|d| state.merge_out_place(&record.step, d))
                .collect()
        };

        for port in ports {
            state.ensure_place(port.clone(), format!("{} merged", record.step), &record.step);
            for branch in &record.branch_transitions {
                state.add_arc(branch.as_str().to_string(), port.as_str().to_string());
            }
        }
        debug!(choice = %record.step, dependents = unmatched.len(), "merged choice branches");
    }
    Ok(state)
}

/// Rule 3: collapse sequential chains (configurable, off by default)
///
/// Fuses `A -> p -> B` when `p` has exactly one producer and one consumer,
/// both plain transitions, `A` has no other output and `B` no other input,
/// and nothing else references `p`. `B`'s outputs are grafted onto `A` and
/// the fused ids are recorded under `A.metadata.fused`.
pub(crate) fn sequential_chain_rule(
    mut state: BuilderState,
) -> Result<BuilderState, ConstructionError> {
    if !state.config.optimize_sequential {
        return Ok(state);
    }

    while let Some((place, producer, consumer)) = find_fusable_chain(&state) {
        debug!(%place, %producer, %consumer, "collapsing sequential chain");

        // Drop the chain arcs and every arc leaving the consumer gets
        // re-sourced onto the producer.
        state.arcs.retain(|a| {
            !(a.source == producer.as_str() && a.target == place.as_str())
                && !(a.source == place.as_str() && a.target == consumer.as_str())
        });
        for arc in state.arcs.iter_mut() {
            if arc.source == consumer.as_str() {
                arc.source = producer.as_str().to_string();
            }
        }

        let fused_tail: Vec<serde_json::Value> = state
            .transitions
            .remove(&consumer)
            .map(|t| {
                let mut ids = vec![serde_json::json!(t.id.as_str())];
                if let Some(serde_json::Value::Array(prior)) = t.metadata.get("fused") {
                    ids.extend(prior.clone());
                }
                ids
            })
            .unwrap_or_default();
        state.places.remove(&place);

        let producer_entry = state
            .transitions
            .get_mut(&producer)
            .expect("producer exists");
        let fused = producer_entry
            .metadata
            .entry("fused".to_string())
            .or_insert_with(|| serde_json::json!([]));
        if let serde_json::Value::Array(list) = fused {
            list.extend(fused_tail);
        }
    }
    Ok(state)
}

/// Locate the first fusable `A -> p -> B` chain, in place-id order
fn find_fusable_chain(state: &BuilderState) -> Option<(PlaceId, TransitionId, TransitionId)> {
    for place in state.places.keys() {
        let producers: Vec<&str> = state
            .arcs
            .iter()
            .filter(|a| a.target == place.as_str() && a.weight == 1)
            .map(|a| a.source.as_str())
            .collect();
        let consumers: Vec<&str> = state
            .arcs
            .iter()
            .filter(|a| a.source == place.as_str() && a.weight == 1)
            .map(|a| a.target.as_str())
            .collect();
        let (&producer, &consumer) = match (producers.as_slice(), consumers.as_slice()) {
            ([p], [c]) if p != c => (p, c),
            _ => continue,
        };

        let producer_id = TransitionId::from(producer);
        let consumer_id = TransitionId::from(consumer);
        let plain = |id: &TransitionId| {
            state
                .transitions
                .get(id)
                .map(|t| t.kind == TransitionKind::Plain)
                .unwrap_or(false)
        };
        if !plain(&producer_id) || !plain(&consumer_id) {
            continue;
        }
        // A must have no other output; B no other input.
        let producer_outputs = state.arcs.iter().filter(|a| a.source == producer).count();
        let consumer_inputs = state.arcs.iter().filter(|a| a.target == consumer).count();
        if producer_outputs == 1 && consumer_inputs == 1 {
            return Some((place.clone(), producer_id, consumer_id));
        }
    }
    None
}

/// Rule 4: derive the initial marking from the entry places
///
/// Exactly one place may be left without incoming arcs; it receives one
/// token. Anything else means the intent was ill-formed.
pub(crate) fn initial_marking_rule(
    mut state: BuilderState,
) -> Result<BuilderState, ConstructionError> {
    let entries: Vec<PlaceId> = state
        .places
        .keys()
        .filter(|p| !state.arcs.iter().any(|a| a.target == p.as_str()))
        .cloned()
        .collect();

    match entries.as_slice() {
        [] => Err(ConstructionError::NoEntryPoint),
        [entry] => {
            state.initial_marking = Some(Marking::from_pairs([(entry.clone(), 1u32)]));
            Ok(state)
        }
        many => Err(ConstructionError::MultipleEntryPoints {
            places: many.iter().map(|p| p.as_str().to_string()).collect(),
        }),
    }
}

/// Rule 5: record the sink places in net metadata
pub(crate) fn sink_rule(mut state: BuilderState) -> Result<BuilderState, ConstructionError> {
    let sinks: Vec<&str> = state
        .places
        .keys()
        .filter(|p| !state.arcs.iter().any(|a| a.source == p.as_str()))
        .map(|p| p.as_str())
        .collect();
    state
        .net_metadata
        .insert("sinks".to_string(), serde_json::json!(sinks));
    Ok(state)
}

#[cfg(test)]
mod tests {
    use crate::engine::builder::{BuildConfig, NetBuilder};
    use crate::models::{IntentSpec, IntentStep, PetriNet, PlaceId, TransitionId, TransitionKind};

    fn parallel_intent(with_sync: bool) -> IntentSpec {
        let mut steps = vec![
            IntentStep::action("warmup", "warm up"),
            IntentStep::parallel("drill", "drills", vec!["pass".into(), "shoot".into()])
                .depends(vec!["warmup"]),
        ];
        if with_sync {
            steps.push(IntentStep::sync("gather", "gather", vec!["drill".into()]));
        }
        IntentSpec::new("training", steps)
    }

    fn build_with(intent: &IntentSpec, config: &BuildConfig) -> PetriNet {
        NetBuilder::from_intent(intent, config).build().unwrap()
    }

    #[test]
    fn test_explicit_sync_consumes_branch_terminals() {
        let net = build_with(&parallel_intent(true), &BuildConfig::default());

        let join = TransitionId::from("transition::gather");
        let inputs = net.inputs_of(&join);
        assert_eq!(inputs.len(), 2);
        assert!(inputs
            .iter()
            .any(|(p, _)| p.as_str() == "place::drill::pass::done"));
        assert!(inputs
            .iter()
            .any(|(p, _)| p.as_str() == "place::drill::shoot::done"));

        // No synthesized join alongside the explicit one.
        assert!(!net.is_transition("transition::drill::join"));
        assert_eq!(net.transition(&join).unwrap().kind, TransitionKind::Join);
    }

    #[test]
    fn test_missing_sync_synthesizes_generated_join() {
        let net = build_with(&parallel_intent(false), &BuildConfig::default());

        let join = TransitionId::from("transition::drill::join");
        let transition = net.transition(&join).expect("synthesized join exists");
        assert_eq!(transition.kind, TransitionKind::Join);
        assert!(transition.is_generated());
        assert_eq!(net.inputs_of(&join).len(), 2);

        // The join's post place is the net's only sink.
        assert_eq!(net.sinks(), vec![&PlaceId::from("place::drill::post")]);
    }

    #[test]
    fn test_synthesis_disabled_leaves_fork_unmatched() {
        let config = BuildConfig {
            synthesize_joins: false,
            ..BuildConfig::default()
        };
        let net = build_with(&parallel_intent(false), &config);

        assert!(!net.is_transition("transition::drill::join"));
        // Branch terminals dangle as sinks; the validator flags this.
        let sinks = net.sinks();
        assert_eq!(sinks.len(), 2);
        assert!(sinks
            .iter()
            .all(|p| p.as_str().ends_with("::done")));
    }

    #[test]
    fn test_choice_merge_feeds_unlabelled_dependent() {
        let intent = IntentSpec::new(
            "merge",
            vec![
                IntentStep::action("probe", "probe"),
                IntentStep::choice("decide", "decide", vec!["ok".into(), "fail".into()])
                    .depends(vec!["probe"]),
                IntentStep::action("report", "report").depends(vec!["decide"]),
            ],
        );
        let net = build_with(&intent, &BuildConfig::default());

        let merge = PlaceId::from("place::decide::merge");
        // Fed by both branch transitions, drained by the one dependent.
        assert_eq!(net.producers_of(&merge).len(), 2);
        let consumers = net.consumers_of(&merge);
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].as_str(), "transition::report");
    }

    #[test]
    fn test_sequential_chain_fusion() {
        let intent = IntentSpec::new(
            "chain",
            vec![
                IntentStep::action("a", "a"),
                IntentStep::action("b", "b").depends(vec!["a"]),
                IntentStep::action("c", "c").depends(vec!["b"]),
            ],
        );
        let config = BuildConfig {
            optimize_sequential: true,
            ..BuildConfig::default()
        };
        let net = build_with(&intent, &config);

        // The whole chain collapses into a's transition.
        assert_eq!(net.transitions.len(), 1);
        let a = net.transition(&TransitionId::from("transition::a")).unwrap();
        let fused = a.metadata["fused"].as_array().unwrap();
        assert_eq!(fused.len(), 2);

        // Default config leaves the chain alone.
        let plain = build_with(&intent, &BuildConfig::default());
        assert_eq!(plain.transitions.len(), 3);
    }

    #[test]
    fn test_sink_metadata_matches_computed_sinks() {
        let net = build_with(&parallel_intent(true), &BuildConfig::default());
        let recorded: Vec<String> = net.metadata["sinks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        let computed: Vec<String> =
            net.sinks().iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(recorded, computed);
    }

    #[test]
    fn test_initial_marking_is_single_entry_token() {
        let net = build_with(&parallel_intent(true), &BuildConfig::default());
        assert_eq!(net.initial_marking.total_tokens(), 1);
        assert_eq!(
            net.initial_marking.get(&PlaceId::from("place::warmup::pre")),
            1
        );
    }
}

// GitHub-Actions-style workflow parsing

//! # Workflow YAML Parsing
//!
//! The parse pipeline is three stages, each feeding the next:
//!
//! 1. **Syntax** - the document is read into a generic
//!    `serde_yaml::Value`. Any YAML error here is surfaced with the
//!    parser's own line/column.
//! 2. **Shape** - the root must be a mapping with a non-empty `jobs`
//!    mapping. Unknown top-level keys are recorded as warnings. Job ids
//!    are checked against the reserved-keyword table; each job's `needs:`
//!    is normalized (GitHub accepts both a scalar and a sequence).
//! 3. **Dependencies** - the `needs:` relation is validated: every
//!    reference must resolve and the relation must be acyclic. Steps are
//!    then emitted in stable topological order.
//!
//! A side-car [`LineIndex`] maps job ids and their `needs:` keys back to
//! source lines so semantic errors can point at the right spot even
//! though the YAML tree itself carries no spans.

use super::deps::DependencyGraph;
use super::{ParseError, ParseErrorKind, ParseWarning};
use crate::models::{IntentSpec, IntentStep};
use lazy_static::lazy_static;
use std::collections::HashSet;
use tracing::debug;

lazy_static! {
    /// Workflow keywords that can never be job ids
    static ref RESERVED_KEYWORDS: HashSet<&'static str> = [
        "on", "jobs", "name", "env", "defaults", "permissions", "concurrency",
    ]
    .into_iter()
    .collect();

    /// Top-level keys we understand; anything else becomes a warning
    static ref KNOWN_TOP_LEVEL: HashSet<&'static str> = [
        "name", "run-name", "on", "jobs", "env", "defaults", "permissions", "concurrency",
    ]
    .into_iter()
    .collect();
}

/// Best-effort map from syntactic landmarks to 1-based line numbers
///
/// Built by scanning the raw text once. YAML block structure puts each
/// job id on its own line under `jobs:`, and each `needs:` on its own
/// line under its job, so a plain scan is reliable for the documents this
/// front-end accepts; for anything exotic the index degrades to 0
/// ("unknown") rather than guessing.
struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        LineIndex {
            lines: text.lines().collect(),
        }
    }

    /// Line of the first occurrence of `key:` at any indentation
    fn key_line(&self, key: &str) -> usize {
        self.lines
            .iter()
            .position(|l| {
                let trimmed = l.trim_start();
                trimmed.starts_with(key)
                    && trimmed[key.len()..].trim_start().starts_with(':')
            })
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Line of the `needs:` key belonging to `job`
    ///
    /// Scans forward from the job's own key line until the next line at
    /// the job's indentation level (the next job) or the end of input.
    fn needs_line(&self, job: &str) -> usize {
        let start = self.key_line(job);
        if start == 0 {
            return 0;
        }
        let job_indent = indent_of(self.lines[start - 1]);
        for (offset, line) in self.lines[start..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let indent = indent_of(line);
            if indent <= job_indent {
                break; // left this job's block
            }
            let trimmed = line.trim_start();
            if trimmed.starts_with("needs") && trimmed["needs".len()..].trim_start().starts_with(':')
            {
                return start + offset + 1;
            }
        }
        0
    }

    /// Column (1-based) of the key on `line`, 0 when unknown
    fn column_on(&self, line: usize) -> usize {
        if line == 0 || line > self.lines.len() {
            return 0;
        }
        indent_of(self.lines[line - 1]) + 1
    }

    /// Up to three source lines around `line`
    fn context(&self, line: usize) -> Vec<String> {
        if line == 0 {
            return Vec::new();
        }
        let lo = line.saturating_sub(2).max(1);
        let hi = (line + 1).min(self.lines.len());
        (lo..=hi)
            .map(|n| format!("{:>4} | {}", n, self.lines[n - 1]))
            .collect()
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Fetch a mapping entry by string key
fn map_key<'a>(mapping: &'a serde_yaml::Mapping, key: &str) -> Option<&'a serde_yaml::Value> {
    mapping
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Parse a workflow document into an [`IntentSpec`], dropping warnings
pub fn parse_workflow_yaml(text: &str, path: &str) -> Result<IntentSpec, ParseError> {
    parse_workflow_yaml_with_warnings(text, path).map(|(spec, _)| spec)
}

/// Parse a workflow document, also returning non-fatal warnings
pub fn parse_workflow_yaml_with_warnings(
    text: &str,
    path: &str,
) -> Result<(IntentSpec, Vec<ParseWarning>), ParseError> {
    let index = LineIndex::new(text);
    let err_at = |kind: ParseErrorKind, line: usize, fix_hint: Option<String>| ParseError {
        kind,
        path: path.to_string(),
        line,
        column: index.column_on(line),
        context: index.context(line),
        fix_hint,
    };

    // Stage 1: syntax. An empty document and a document with no jobs are
    // the same failure from the caller's point of view.
    if text.trim().is_empty() {
        return Err(err_at(ParseErrorKind::MissingJobs, 0, Some(
            "Add a top-level 'jobs:' mapping with at least one job".to_string(),
        )));
    }
    let root: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((0, 0));
        ParseError {
            kind: ParseErrorKind::MalformedYaml {
                detail: e.to_string(),
            },
            path: path.to_string(),
            line,
            column,
            context: index.context(line),
            fix_hint: None,
        }
    })?;

    // Stage 2: shape.
    let mapping = match root.as_mapping() {
        Some(m) => m,
        None => {
            return Err(err_at(
                ParseErrorKind::MissingJobs,
                0,
                Some("The workflow root must be a mapping containing 'jobs:'".to_string()),
            ))
        }
    };

    let mut warnings = Vec::new();
    for key in mapping.keys() {
        if let Some(key) = key.as_str() {
            if !KNOWN_TOP_LEVEL.contains(key) {
                warnings.push(ParseWarning {
                    message: format!("unknown top-level key '{}'", key),
                    line: index.key_line(key),
                });
            }
        }
    }

    let jobs = map_key(mapping, "jobs")
        .and_then(|j| j.as_mapping())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            err_at(
                ParseErrorKind::MissingJobs,
                index.key_line("jobs"),
                Some("Add a top-level 'jobs:' mapping with at least one job".to_string()),
            )
        })?;

    let mut graph = DependencyGraph::new();
    let mut parsed_jobs: Vec<(String, String, Option<String>)> = Vec::new(); // (id, description, when)

    for (key, definition) in jobs {
        let job_id = match key.as_str() {
            Some(id) => id.to_string(),
            None => {
                return Err(err_at(
                    ParseErrorKind::InvalidJob {
                        job: format!("{:?}", key),
                        detail: "job ids must be strings".to_string(),
                    },
                    index.key_line("jobs"),
                    None,
                ))
            }
        };

        if RESERVED_KEYWORDS.contains(job_id.as_str()) {
            let line = index.key_line(&job_id);
            return Err(err_at(
                ParseErrorKind::ReservedKeyword { job: job_id.clone() },
                line,
                Some(format!("Rename job '{}' to a non-reserved id", job_id)),
            ));
        }

        let body = match definition.as_mapping() {
            Some(m) => m,
            None if definition.is_null() => {
                // `job_id:` with an empty body is accepted; it simply has
                // no needs and no metadata.
                graph.add_job(job_id.clone(), Vec::new());
                parsed_jobs.push((job_id.clone(), job_id.clone(), None));
                continue;
            }
            None => {
                return Err(err_at(
                    ParseErrorKind::InvalidJob {
                        job: job_id.clone(),
                        detail: "job definition must be a mapping".to_string(),
                    },
                    index.key_line(&job_id),
                    None,
                ))
            }
        };

        let needs = match map_key(body, "needs") {
            None => Vec::new(),
            Some(serde_yaml::Value::String(single)) => vec![single.clone()],
            Some(serde_yaml::Value::Sequence(list)) => {
                let mut needs = Vec::with_capacity(list.len());
                for entry in list {
                    match entry.as_str() {
                        Some(s) => needs.push(s.to_string()),
                        None => {
                            return Err(err_at(
                                ParseErrorKind::InvalidJob {
                                    job: job_id.clone(),
                                    detail: "'needs' entries must be job ids".to_string(),
                                },
                                index.needs_line(&job_id),
                                None,
                            ))
                        }
                    }
                }
                needs
            }
            Some(_) => {
                return Err(err_at(
                    ParseErrorKind::InvalidJob {
                        job: job_id.clone(),
                        detail: "'needs' must be a job id or a list of job ids".to_string(),
                    },
                    index.needs_line(&job_id),
                    None,
                ))
            }
        };

        let description = map_key(body, "name")
            .and_then(|v| v.as_str())
            .unwrap_or(&job_id)
            .to_string();
        let when = map_key(body, "if")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        graph.add_job(job_id.clone(), needs);
        parsed_jobs.push((job_id, description, when));
    }

    // Stage 3: dependency validation.
    if let Some((job, missing)) = graph.first_missing_reference() {
        let line = index.needs_line(job);
        return Err(err_at(
            ParseErrorKind::MissingDependency {
                job: job.to_string(),
                missing: missing.to_string(),
            },
            line,
            Some(format!("Add job '{}' or remove the reference", missing)),
        ));
    }

    if let Some(cycle) = graph.find_cycle() {
        let line = index.needs_line(&cycle[0]);
        return Err(err_at(
            ParseErrorKind::CircularDependency { cycle: cycle.clone() },
            line,
            Some("Break the cycle by removing one of these 'needs' entries".to_string()),
        ));
    }

    // Emit steps in stable topological order so the IntentSpec ordering
    // invariant holds even when a job references a later-declared job.
    let order = graph.topological_order();
    debug!(jobs = order.len(), path, "parsed workflow");

    let steps = order
        .iter()
        .map(|id| {
            let (_, description, when) = parsed_jobs
                .iter()
                .find(|(job, _, _)| job == id)
                .expect("topological order only contains declared jobs");
            let mut step = IntentStep::action(id.clone(), description.clone())
                .depends(graph.deps_of(id).to_vec());
            step.when = when.clone();
            step
        })
        .collect();

    let name = map_key(mapping, "name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| workflow_name_from_path(path));

    Ok((IntentSpec::new(name, steps), warnings))
}

/// Derive a workflow name from the logical path ("ci.yml" -> "ci")
fn workflow_name_from_path(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
    if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepKind;
    use test_case::test_case;

    const PIPELINE: &str = "\
name: pipeline
on: push
jobs:
  lint:
    runs-on: ubuntu-latest
  test:
    needs: lint
  build:
    needs: [lint, test]
  deploy:
    needs: build
";

    #[test]
    fn test_linear_pipeline_parses() {
        let spec = parse_workflow_yaml(PIPELINE, "ci.yml").unwrap();
        assert_eq!(spec.name, "pipeline");
        assert_eq!(spec.steps.len(), 4);
        assert!(spec.steps.iter().all(|s| s.kind == StepKind::Action));
        assert_eq!(spec.step("build").unwrap().depends_on, vec!["lint", "test"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_scalar_and_sequence_needs_both_accepted() {
        let spec = parse_workflow_yaml(PIPELINE, "ci.yml").unwrap();
        assert_eq!(spec.step("test").unwrap().depends_on, vec!["lint"]);
        assert_eq!(spec.step("deploy").unwrap().depends_on, vec!["build"]);
    }

    #[test]
    fn test_forward_reference_is_reordered() {
        let yaml = "\
jobs:
  deploy:
    needs: build
  build: {}
";
        let spec = parse_workflow_yaml(yaml, "ci.yml").unwrap();
        let ids: Vec<&str> = spec.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["build", "deploy"]);
        assert!(spec.validate().is_ok());
    }

    #[test_case("" ; "empty document")]
    #[test_case("name: empty\non: push\n" ; "no jobs key")]
    #[test_case("name: empty\njobs: {}\n" ; "zero jobs")]
    fn test_missing_jobs(yaml: &str) {
        let err = parse_workflow_yaml(yaml, "ci.yml").unwrap_err();
        assert_eq!(err.code(), "parse::missing_jobs");
    }

    #[test]
    fn test_malformed_yaml_reports_location() {
        let err = parse_workflow_yaml("jobs:\n  a: [unclosed\n", "ci.yml").unwrap_err();
        assert_eq!(err.code(), "parse::malformed_yaml");
        assert!(err.line > 0);
    }

    #[test]
    fn test_missing_dependency_hint() {
        let yaml = "\
jobs:
  deploy:
    needs: build
";
        let err = parse_workflow_yaml(yaml, "ci.yml").unwrap_err();
        assert_eq!(err.code(), "parse::missing_dependency");
        assert_eq!(
            err.fix_hint.as_deref(),
            Some("Add job 'build' or remove the reference")
        );
        assert_eq!(err.line, 3); // the needs: line
    }

    #[test_case("on" ; "on is reserved")]
    #[test_case("env" ; "env is reserved")]
    #[test_case("concurrency" ; "concurrency is reserved")]
    fn test_reserved_job_ids(id: &str) {
        let yaml = format!("jobs:\n  {}:\n    runs-on: ubuntu-latest\n", id);
        let err = parse_workflow_yaml(&yaml, "ci.yml").unwrap_err();
        assert_eq!(err.code(), "parse::reserved_keyword");
    }

    #[test]
    fn test_cycle_reports_members_and_lines() {
        let yaml = "\
jobs:
  a:
    needs: c
  b:
    needs: a
  c:
    needs: b
";
        let err = parse_workflow_yaml(yaml, "ci.yml").unwrap_err();
        match &err.kind {
            ParseErrorKind::CircularDependency { cycle } => {
                let set: std::collections::HashSet<&str> =
                    cycle.iter().map(|s| s.as_str()).collect();
                assert_eq!(set, ["a", "b", "c"].into_iter().collect());
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
        assert!(err.line > 0);
        assert!(!err.context.is_empty());
    }

    #[test]
    fn test_unknown_top_level_keys_are_warnings() {
        let yaml = "\
name: odd
jobs:
  only: {}
custom-thing: 1
";
        let (spec, warnings) = parse_workflow_yaml_with_warnings(yaml, "ci.yml").unwrap();
        assert_eq!(spec.steps.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("custom-thing"));
        assert_eq!(warnings[0].line, 4);
    }

    #[test]
    fn test_if_clause_becomes_when() {
        let yaml = "\
jobs:
  gate: {}
  deploy:
    needs: gate
    if: ok
";
        let spec = parse_workflow_yaml(yaml, "ci.yml").unwrap();
        assert_eq!(spec.step("deploy").unwrap().when.as_deref(), Some("ok"));
    }

    #[test]
    fn test_name_falls_back_to_path_stem() {
        let spec = parse_workflow_yaml("jobs:\n  a: {}\n", "flows/release.yml").unwrap();
        assert_eq!(spec.name, "release");
    }

    #[test]
    fn test_round_trip_reserialization_is_stable() {
        // Canonical re-serialization of the IntentSpec and a re-parse of
        // the original document agree.
        let spec = parse_workflow_yaml(PIPELINE, "ci.yml").unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let back: IntentSpec = serde_json::from_str(&json).unwrap();
        let again = parse_workflow_yaml(PIPELINE, "ci.yml").unwrap();
        assert_eq!(back, spec);
        assert_eq!(again, spec);
    }
}

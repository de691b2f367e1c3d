// Workflow front-end - GitHub-Actions-style YAML to IntentSpec

//! # YAML Front-End
//!
//! This module turns a GitHub-Actions-style workflow document into an
//! [`IntentSpec`](crate::models::IntentSpec): every job becomes one
//! `action` step whose dependencies come from the job's `needs:` list.
//!
//! The front-end is strict about the things the grammar downstream cannot
//! repair - missing jobs, dangling `needs:` references, dependency cycles,
//! reserved ids - and lenient about everything else: unknown top-level
//! keys are collected as warnings, never errors.
//!
//! ## Diagnostics
//!
//! Every error carries a machine-readable code, a 1-based line/column, a
//! snippet of the surrounding source, and a one-line fix hint where a fix
//! is obvious. Line numbers for YAML syntax errors come from the yaml
//! parser itself; line numbers for semantic errors (a bad `needs:` entry,
//! a reserved job id) come from a plain-text line index built alongside
//! parsing, which is best effort - `0` means unknown.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod deps;
pub mod yaml;

pub use deps::DependencyGraph;
pub use yaml::{parse_workflow_yaml, parse_workflow_yaml_with_warnings};

/// What went wrong, as a closed taxonomy
///
/// ## Rust Learning Notes:
///
/// ### Tagged Union with Serde
/// `#[serde(tag = "type")]` gives flat JSON objects with a `type`
/// discriminator, so error payloads are self-describing on the wire.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParseErrorKind {
    /// The document is not valid YAML at all
    #[error("malformed YAML: {detail}")]
    MalformedYaml { detail: String },

    /// The document has no (non-empty) `jobs` mapping
    #[error("workflow has no jobs")]
    MissingJobs,

    /// A job definition is not usable (wrong shape, bad `needs` type, ...)
    #[error("invalid definition for job '{job}': {detail}")]
    InvalidJob { job: String, detail: String },

    /// A `needs:` entry references a job that does not exist
    #[error("job '{job}' needs unknown job '{missing}'")]
    MissingDependency { job: String, missing: String },

    /// A reserved workflow keyword was used as a job id
    #[error("'{job}' is a reserved keyword and cannot be used as a job id")]
    ReservedKeyword { job: String },

    /// The `needs:` relation contains a cycle
    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

impl ParseErrorKind {
    /// Stable machine-readable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::MalformedYaml { .. } => "parse::malformed_yaml",
            ParseErrorKind::MissingJobs => "parse::missing_jobs",
            ParseErrorKind::InvalidJob { .. } => "parse::invalid_job",
            ParseErrorKind::MissingDependency { .. } => "parse::missing_dependency",
            ParseErrorKind::ReservedKeyword { .. } => "parse::reserved_keyword",
            ParseErrorKind::CircularDependency { .. } => "parse::circular_dependency",
        }
    }
}

/// A parse failure with source coordinates and a fix hint
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind} ({path}:{line}:{column})")]
pub struct ParseError {
    /// Failure taxonomy entry
    pub kind: ParseErrorKind,

    /// Logical path of the document, for diagnostics only
    pub path: String,

    /// 1-based line of the offending construct; 0 when unknown
    pub line: usize,

    /// 1-based column; 0 when unknown
    pub column: usize,

    /// Up to three surrounding source lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// One-line suggestion, when an obvious fix exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl ParseError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// A non-fatal observation made while parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    /// Human-readable message
    pub message: String,

    /// 1-based line; 0 when unknown
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ParseErrorKind::MissingJobs.code(), "parse::missing_jobs");
        assert_eq!(
            ParseErrorKind::CircularDependency { cycle: vec![] }.code(),
            "parse::circular_dependency"
        );
    }

    #[test]
    fn test_display_includes_coordinates() {
        let err = ParseError {
            kind: ParseErrorKind::ReservedKeyword { job: "env".into() },
            path: "ci.yml".into(),
            line: 7,
            column: 3,
            context: vec![],
            fix_hint: None,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("ci.yml:7:3"));
        assert!(rendered.contains("reserved keyword"));
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let kind = ParseErrorKind::MissingDependency {
            job: "deploy".into(),
            missing: "build".into(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "MissingDependency");
        assert_eq!(json["missing"], "build");
    }
}

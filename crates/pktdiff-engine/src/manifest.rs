//! The test manifest: the user-supplied, schema-validated description of a
//! differential run.
//!
//! The manifest is structured configuration, never executable code: program
//! identifiers, one or more target/relation pairs, and an optional alphabet
//! for pattern-driven cases. Anything outside the schema is rejected before
//! the orchestrator starts.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relation::RelationSpec;
use crate::stream::MAX_PATTERN_REPEAT;
use pktdiff_spec::ast::Predicate;

/// Current schema version for test manifests.
pub const TEST_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A differential test suite for one pair of candidate programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestManifest {
    /// Schema version (must be exactly 1).
    pub schema_version: u32,
    /// The baseline program identifier.
    pub program_a: String,
    /// The candidate program identifier.
    pub program_b: String,
    /// Character-to-predicate mapping for pattern cases.
    #[serde(default)]
    pub alphabet: IndexMap<char, Predicate>,
    /// Ordered test cases.
    pub cases: Vec<TestCase>,
}

/// One declared test: a target (predicate or pattern) and its relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Optional human-readable name; defaults to the case index.
    #[serde(default)]
    pub name: Option<String>,
    pub target: CaseTarget,
    pub relation: RelationSpec,
}

/// What a test case exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseTarget {
    /// Solve the predicate against every enumerated path (and its negation
    /// against the default relation).
    Predicate(Predicate),
    /// Generate a packet stream from a regular expression over the alphabet.
    Pattern(String),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("test manifest is not valid JSON")]
    Decode(#[from] serde_json::Error),

    #[error("manifest schema_version must be {TEST_MANIFEST_SCHEMA_VERSION}, got {got}")]
    SchemaVersion { got: u32 },

    #[error("program identifiers must be non-empty")]
    EmptyProgramName,

    #[error("program identifiers must be distinct, both are '{0}'")]
    IdenticalPrograms(String),

    #[error("manifest declares no test cases")]
    NoCases,

    #[error("case '{case}' uses a pattern but the manifest declares no alphabet")]
    MissingAlphabet { case: String },

    #[error("case '{case}' has an invalid pattern '{pattern}'")]
    BadPattern {
        case: String,
        pattern: String,
        #[source]
        source: rand_regex::Error,
    },
}

impl TestManifest {
    /// Decode a manifest from JSON and validate it.
    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        let manifest: TestManifest = serde_json::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Enforce the schema contract beyond what serde checks.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.schema_version != TEST_MANIFEST_SCHEMA_VERSION {
            return Err(ManifestError::SchemaVersion {
                got: self.schema_version,
            });
        }
        if self.program_a.is_empty() || self.program_b.is_empty() {
            return Err(ManifestError::EmptyProgramName);
        }
        if self.program_a == self.program_b {
            return Err(ManifestError::IdenticalPrograms(self.program_a.clone()));
        }
        if self.cases.is_empty() {
            return Err(ManifestError::NoCases);
        }
        for (index, case) in self.cases.iter().enumerate() {
            if let CaseTarget::Pattern(pattern) = &case.target {
                let case_name = case.display_name(index);
                if self.alphabet.is_empty() {
                    return Err(ManifestError::MissingAlphabet { case: case_name });
                }
                rand_regex::Regex::compile(pattern, MAX_PATTERN_REPEAT).map_err(|source| {
                    ManifestError::BadPattern {
                        case: case_name,
                        pattern: pattern.clone(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }
}

impl TestCase {
    /// The case's reporting name: its declared name or its index.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("case-{index}"),
        }
    }
}

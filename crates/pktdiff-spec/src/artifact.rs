//! The condition artifact produced by the external extraction tool.
//!
//! The artifact is an opaque supplied document: the engine never generates
//! it, only decodes and validates it before any solving starts. Validation
//! is strict — every formula must parse and every condition the tree
//! references must have a formula entry — so malformed artifacts fail before
//! a solver session exists.

use std::collections::{HashMap, HashSet};

use pktdiff_smt::parser::parse_term;
use pktdiff_smt::terms::SmtTerm;
use serde::{Deserialize, Serialize};

use crate::errors::ArtifactError;
use crate::tree::CondTree;

/// Extracted branch conditions for one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionArtifact {
    /// Branch tree text, in the grammar of [`CondTree::parse`].
    #[serde(rename = "AST")]
    pub ast: String,
    /// Formula text for each condition id appearing in the tree.
    pub conditions: Vec<ConditionEntry>,
    /// Every program input variable, declared per solver session.
    pub variables: Vec<String>,
}

/// One condition id with its solver-level formula text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionEntry {
    pub condition: String,
    pub smtlib: String,
}

impl ConditionArtifact {
    /// Decode an artifact from JSON and validate it.
    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let artifact: ConditionArtifact = serde_json::from_str(raw)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Enforce the schema contract beyond what serde checks.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.conditions.iter().enumerate() {
            if entry.condition.is_empty() {
                return Err(ArtifactError::EmptyConditionId { index });
            }
            if !seen.insert(entry.condition.as_str()) {
                return Err(ArtifactError::DuplicateConditionId(entry.condition.clone()));
            }
            parse_term(&entry.smtlib).map_err(|source| ArtifactError::InvalidFormula {
                condition: entry.condition.clone(),
                source,
            })?;
        }

        let mut seen_vars = HashSet::new();
        for (index, var) in self.variables.iter().enumerate() {
            if var.is_empty() {
                return Err(ArtifactError::EmptyVariableName { index });
            }
            if !seen_vars.insert(var.as_str()) {
                return Err(ArtifactError::DuplicateVariable(var.clone()));
            }
        }

        let tree = self.tree()?;
        let mut stack = vec![&tree];
        while let Some(node) = stack.pop() {
            if let CondTree::Branch {
                condition,
                on_true,
                on_false,
            } = node
            {
                if !seen.contains(condition.as_str()) {
                    return Err(ArtifactError::UnknownCondition(condition.clone()));
                }
                stack.push(on_true);
                stack.push(on_false);
            }
        }
        Ok(())
    }

    /// Parse the branch tree text.
    pub fn tree(&self) -> Result<CondTree, ArtifactError> {
        Ok(CondTree::parse(&self.ast)?)
    }

    /// Parse every condition formula into a lookup table.
    pub fn formula_table(&self) -> Result<HashMap<String, SmtTerm>, ArtifactError> {
        let mut table = HashMap::with_capacity(self.conditions.len());
        for entry in &self.conditions {
            let term =
                parse_term(&entry.smtlib).map_err(|source| ArtifactError::InvalidFormula {
                    condition: entry.condition.clone(),
                    source,
                })?;
            table.insert(entry.condition.clone(), term);
        }
        Ok(table)
    }
}

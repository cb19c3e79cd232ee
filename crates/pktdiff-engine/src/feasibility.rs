//! Path feasibility solving.
//!
//! Each enumerated root-to-leaf path becomes one scoped solver query: the
//! program variables are declared, every condition formula is asserted (its
//! negation where the branch is not taken), and satisfiability decides
//! whether the path is reachable. An unsatisfiable path is dead code — a
//! normal outcome surfaced to the report, not an error.

use std::collections::HashMap;

use pktdiff_smt::solver::{Model, SatResult, SmtSolver};
use pktdiff_smt::sorts::SmtSort;
use pktdiff_smt::terms::SmtTerm;
use pktdiff_spec::artifact::ConditionArtifact;
use pktdiff_spec::errors::ArtifactError;
use pktdiff_spec::tree::Path;
use thiserror::Error;
use tracing::debug;

use crate::packet::field_domain;

/// Classification of one path.
#[derive(Debug, Clone)]
pub enum PathOutcome {
    /// Reachable: a witness input can be derived from the model.
    Feasible(Model),
    /// Dead code: no input drives execution down this path.
    Infeasible,
}

#[derive(Debug, Error)]
pub enum FeasibilityError<E: std::error::Error + 'static> {
    #[error("solver failure")]
    Solver(#[source] E),
    #[error("path references unknown condition '{0}'")]
    UnknownCondition(String),
    #[error("solver was inconclusive: {0}")]
    Inconclusive(String),
}

/// Solves enumerated paths against one program's condition artifact.
pub struct PathSolver<'a> {
    variables: &'a [String],
    formulas: HashMap<String, SmtTerm>,
}

impl<'a> PathSolver<'a> {
    /// Compile the artifact's formula table once for the whole run.
    pub fn new(artifact: &'a ConditionArtifact) -> Result<Self, ArtifactError> {
        Ok(PathSolver {
            variables: &artifact.variables,
            formulas: artifact.formula_table()?,
        })
    }

    /// Solve one path, optionally conjoined with an extra constraint term.
    ///
    /// The query runs in its own push/pop scope on the supplied solver:
    /// asserted conditions from one path are invalid for another, so no
    /// state survives the call.
    pub fn solve<S: SmtSolver>(
        &self,
        solver: &mut S,
        path: &Path,
        extra: Option<&SmtTerm>,
    ) -> Result<PathOutcome, FeasibilityError<S::Error>> {
        solver.push().map_err(FeasibilityError::Solver)?;
        let outcome = self.solve_in_scope(solver, path, extra);
        solver.pop().map_err(FeasibilityError::Solver)?;
        outcome
    }

    fn solve_in_scope<S: SmtSolver>(
        &self,
        solver: &mut S,
        path: &Path,
        extra: Option<&SmtTerm>,
    ) -> Result<PathOutcome, FeasibilityError<S::Error>> {
        for var in self.variables {
            solver
                .declare_var(var, &SmtSort::Int)
                .map_err(FeasibilityError::Solver)?;
            solver
                .assert(&field_domain(var))
                .map_err(FeasibilityError::Solver)?;
        }

        for step in &path.steps {
            let formula = self
                .formulas
                .get(&step.condition)
                .ok_or_else(|| FeasibilityError::UnknownCondition(step.condition.clone()))?;
            let asserted = if step.taken {
                formula.clone()
            } else {
                formula.clone().not()
            };
            solver.assert(&asserted).map_err(FeasibilityError::Solver)?;
        }

        if let Some(term) = extra {
            solver.assert(term).map_err(FeasibilityError::Solver)?;
        }

        let var_refs: Vec<(&str, &SmtSort)> = self
            .variables
            .iter()
            .map(|v| (v.as_str(), &SmtSort::Int))
            .collect();
        let (result, model) = solver
            .check_sat_with_model(&var_refs)
            .map_err(FeasibilityError::Solver)?;

        match result {
            SatResult::Sat => {
                debug!(%path, "path is feasible");
                let model = model.ok_or_else(|| {
                    FeasibilityError::Inconclusive("sat result carried no model".into())
                })?;
                Ok(PathOutcome::Feasible(model))
            }
            SatResult::Unsat => {
                debug!(%path, "path is dead code");
                Ok(PathOutcome::Infeasible)
            }
            SatResult::Unknown(reason) => Err(FeasibilityError::Inconclusive(reason)),
        }
    }
}

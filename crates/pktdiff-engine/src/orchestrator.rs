//! The differential test orchestrator.
//!
//! For every feasible unit — a (path, predicate) combination or a pattern —
//! the orchestrator synthesizes the witness input, feeds the identical
//! stream to both candidate programs, and evaluates the declared relation
//! over their outputs. On the complementary (negated-predicate) side the
//! default structural-equality relation applies. The run is fail-fast: the
//! first violated relation aborts it with both programs' literal outputs.

use thiserror::Error;
use tracing::{info, warn};

use pktdiff_smt::solver::SmtSolver;
use pktdiff_smt::terms::SmtTerm;
use pktdiff_spec::artifact::ConditionArtifact;
use pktdiff_spec::encode::{encode, EncodeError};
use pktdiff_spec::errors::ArtifactError;
use pktdiff_spec::tree::Path;

use crate::feasibility::{FeasibilityError, PathOutcome, PathSolver};
use crate::manifest::{CaseTarget, ManifestError, TestManifest};
use crate::packet::{Packet, SynthesisError};
use crate::relation::{default_relation, Relation};
use crate::report::{RunReport, UnitReport, UnitStatus};
use crate::runner::{ProgramRunner, RunnerError};
use crate::stream::{AlphabetError, StreamError, StreamGenerator};
use crate::trace::InputTrace;

#[derive(Debug, Error)]
pub enum DiffError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Alphabet(#[from] AlphabetError),
    #[error("case '{case}' has an invalid predicate")]
    Encode {
        case: String,
        #[source]
        source: EncodeError,
    },
    #[error(transparent)]
    Feasibility(#[from] FeasibilityError<E>),
    #[error(transparent)]
    Stream(#[from] StreamError<E>),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("program '{program}' could not be executed")]
    Runner {
        program: String,
        #[source]
        source: RunnerError,
    },
}

/// Result of driving both programs: outputs, or a per-unit failure reason
/// (an execution timeout is a unit failure, not an orchestrator crash).
enum Drive {
    Outputs(Vec<Packet>, Vec<Packet>),
    UnitFailure(String),
}

/// Drives the end-to-end differential protocol for one artifact/manifest pair.
pub struct DiffTester<'a, R: ProgramRunner> {
    runner: &'a R,
    artifact: &'a ConditionArtifact,
    manifest: &'a TestManifest,
}

impl<'a, R: ProgramRunner> DiffTester<'a, R> {
    pub fn new(
        runner: &'a R,
        artifact: &'a ConditionArtifact,
        manifest: &'a TestManifest,
    ) -> Self {
        DiffTester {
            runner,
            artifact,
            manifest,
        }
    }

    /// Run every declared case; fail-fast on the first violated relation.
    pub fn run<S: SmtSolver>(&self, solver: &mut S) -> Result<RunReport, DiffError<S::Error>> {
        self.manifest.validate()?;
        self.artifact.validate()?;

        let path_solver = PathSolver::new(self.artifact)?;
        let paths: Vec<Path> = self.artifact.tree()?.paths().collect();
        let generator = if self.manifest.alphabet.is_empty() {
            None
        } else {
            Some(StreamGenerator::new(&self.manifest.alphabet)?)
        };
        let mut rng = rand::thread_rng();

        let mut report = RunReport {
            program_a: self.manifest.program_a.clone(),
            program_b: self.manifest.program_b.clone(),
            units: Vec::new(),
        };

        for (index, case) in self.manifest.cases.iter().enumerate() {
            let case_name = case.display_name(index);
            let relation = case.relation.compile();

            match &case.target {
                CaseTarget::Predicate(predicate) => {
                    let encoded = encode(predicate).map_err(|source| DiffError::Encode {
                        case: case_name.clone(),
                        source,
                    })?;
                    let negated = encoded.clone().not();
                    let complement = default_relation();

                    for path in &paths {
                        // The declared relation on the predicate side, the
                        // default relation on the complementary side.
                        let units = [
                            ("predicate", &encoded, &relation),
                            ("complement", &negated, &complement),
                        ];
                        for (phase, term, relation) in units {
                            let failed = self.run_path_unit(
                                solver,
                                &path_solver,
                                path,
                                term,
                                relation,
                                &case_name,
                                phase,
                                &mut report,
                            )?;
                            if failed {
                                return Ok(report);
                            }
                        }
                    }
                }
                CaseTarget::Pattern(pattern) => {
                    let generator =
                        generator
                            .as_ref()
                            .ok_or_else(|| ManifestError::MissingAlphabet {
                                case: case_name.clone(),
                            })?;
                    let packets = generator.generate(solver, pattern, &mut rng)?;
                    let input = InputTrace::from_packets(&packets);
                    let status = match self.drive(&input)? {
                        Drive::UnitFailure(reason) => UnitStatus::Failed {
                            left: Vec::new(),
                            right: Vec::new(),
                            reason,
                        },
                        Drive::Outputs(left, right) => {
                            if relation.holds(&left, &right) {
                                UnitStatus::Validated
                            } else {
                                UnitStatus::Failed {
                                    left,
                                    right,
                                    reason: format!("relation '{}' violated", case.relation),
                                }
                            }
                        }
                    };
                    let failed = matches!(status, UnitStatus::Failed { .. });
                    if failed {
                        warn!(case = %case_name, %pattern, "pattern unit failed");
                    } else {
                        info!(case = %case_name, %pattern, "pattern unit validated");
                    }
                    report.units.push(UnitReport {
                        case: case_name.clone(),
                        unit: format!("pattern '{pattern}'"),
                        status,
                    });
                    if failed {
                        return Ok(report);
                    }
                }
            }
        }

        info!(
            validated = report.validated_units(),
            dead = report.dead_units(),
            "differential run passed"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_path_unit<S: SmtSolver>(
        &self,
        solver: &mut S,
        path_solver: &PathSolver<'_>,
        path: &Path,
        term: &SmtTerm,
        relation: &Relation,
        case_name: &str,
        phase: &str,
        report: &mut RunReport,
    ) -> Result<bool, DiffError<S::Error>> {
        let unit_name = format!("{phase} @ {path}");

        let status = match path_solver.solve(solver, path, Some(term))? {
            PathOutcome::Infeasible => {
                info!(case = %case_name, unit = %unit_name, "dead path");
                UnitStatus::Infeasible
            }
            PathOutcome::Feasible(model) => {
                let witness = Packet::synthesize(&model)?;
                let input = InputTrace::from_packets(&[witness]);
                match self.drive(&input)? {
                    Drive::UnitFailure(reason) => UnitStatus::Failed {
                        left: Vec::new(),
                        right: Vec::new(),
                        reason,
                    },
                    Drive::Outputs(left, right) => {
                        if relation.holds(&left, &right) {
                            UnitStatus::Validated
                        } else {
                            UnitStatus::Failed {
                                left,
                                right,
                                reason: "relation violated".into(),
                            }
                        }
                    }
                }
            }
        };

        let failed = matches!(status, UnitStatus::Failed { .. });
        if failed {
            warn!(case = %case_name, unit = %unit_name, "unit failed");
        }
        report.units.push(UnitReport {
            case: case_name.to_string(),
            unit: unit_name,
            status,
        });
        Ok(failed)
    }

    /// Feed the identical input to both programs.
    fn drive<E: std::error::Error + 'static>(
        &self,
        input: &InputTrace,
    ) -> Result<Drive, DiffError<E>> {
        let left = match self.runner.run(&self.manifest.program_a, input) {
            Ok(out) => out,
            Err(RunnerError::Timeout) => {
                return Ok(Drive::UnitFailure(format!(
                    "program '{}' timed out",
                    self.manifest.program_a
                )))
            }
            Err(source) => {
                return Err(DiffError::Runner {
                    program: self.manifest.program_a.clone(),
                    source,
                })
            }
        };
        let right = match self.runner.run(&self.manifest.program_b, input) {
            Ok(out) => out,
            Err(RunnerError::Timeout) => {
                return Ok(Drive::UnitFailure(format!(
                    "program '{}' timed out",
                    self.manifest.program_b
                )))
            }
            Err(source) => {
                return Err(DiffError::Runner {
                    program: self.manifest.program_b.clone(),
                    source,
                })
            }
        };
        Ok(Drive::Outputs(left, right))
    }
}

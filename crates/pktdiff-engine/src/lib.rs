#![doc = include_str!("../README.md")]

//! Differential test generation and validation.
//!
//! The pipeline: enumerate a program's branch paths (or sample a pattern),
//! solve each unit's constraints in an isolated solver scope, synthesize
//! witness packets, drive both candidate programs with the identical input
//! stream, and evaluate the declared relation over their outputs —
//! fail-fast on the first violation.

pub mod feasibility;
pub mod manifest;
pub mod orchestrator;
pub mod packet;
pub mod relation;
pub mod report;
pub mod runner;
pub mod stream;
pub mod trace;

pub use feasibility::{PathOutcome, PathSolver};
pub use manifest::TestManifest;
pub use orchestrator::DiffTester;
pub use packet::Packet;
pub use relation::{default_relation, Relation, RelationSpec};
pub use report::{RunReport, UnitReport, UnitStatus};
pub use runner::{InterpreterRunner, ProgramRunner};
pub use stream::StreamGenerator;
pub use trace::InputTrace;

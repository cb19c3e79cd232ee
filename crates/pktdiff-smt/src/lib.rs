#![doc = include_str!("../README.md")]

//! Constraint solving for differential packet-test generation.
//!
//! This crate provides the abstract term model shared by the predicate
//! encoder and the path feasibility solver, a textual SMT-LIB2 printer and
//! parser for the formulas carried by extracted condition artifacts, and a
//! Z3 backend behind the [`solver::SmtSolver`] contract.

pub mod backends;
pub mod parser;
pub mod solver;
pub mod sorts;
pub mod terms;

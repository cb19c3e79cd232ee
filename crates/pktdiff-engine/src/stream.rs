//! Pattern-driven packet stream generation.
//!
//! A regular expression over a finite alphabet plus a character-to-predicate
//! mapping yields a concrete input stream: sample one string matching the
//! pattern (an arbitrary valid choice, not exhaustive or uniform), then
//! solve each character's predicate independently and synthesize one packet
//! per character, in string order.

use indexmap::IndexMap;
use rand::distributions::Distribution;
use rand::Rng;
use thiserror::Error;

use pktdiff_smt::solver::{SatResult, SmtSolver};
use pktdiff_smt::sorts::SmtSort;
use pktdiff_smt::terms::SmtTerm;
use pktdiff_spec::ast::Predicate;
use pktdiff_spec::encode::{encode, EncodeError};

use crate::packet::{field_domain, Packet, SynthesisError, DST_VAR, PORT_VAR, SRC_VAR};

/// Bound on unbounded repetition operators (`*`, `+`) when sampling.
pub const MAX_PATTERN_REPEAT: u32 = 100;

#[derive(Debug, Error)]
#[error("alphabet symbol '{symbol}' has an invalid predicate")]
pub struct AlphabetError {
    pub symbol: char,
    #[source]
    pub source: EncodeError,
}

#[derive(Debug, Error)]
pub enum StreamError<E: std::error::Error + 'static> {
    #[error("pattern does not compile")]
    BadPattern(#[source] rand_regex::Error),
    #[error("pattern character '{0}' is not in the alphabet")]
    UnknownSymbol(char),
    #[error("alphabet symbol '{0}' has an unsatisfiable predicate")]
    UnsatisfiableSymbol(char),
    #[error("solver was inconclusive for symbol '{symbol}': {reason}")]
    Inconclusive { symbol: char, reason: String },
    #[error("solver failure")]
    Solver(#[source] E),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// Generates witness streams from patterns over a predicate alphabet.
pub struct StreamGenerator {
    symbols: IndexMap<char, SmtTerm>,
}

impl StreamGenerator {
    /// Encode every alphabet predicate once up front.
    pub fn new(alphabet: &IndexMap<char, Predicate>) -> Result<Self, AlphabetError> {
        let mut symbols = IndexMap::with_capacity(alphabet.len());
        for (&symbol, predicate) in alphabet {
            let term = encode(predicate).map_err(|source| AlphabetError { symbol, source })?;
            symbols.insert(symbol, term);
        }
        Ok(StreamGenerator { symbols })
    }

    /// Produce one packet per character of a string matching `pattern`.
    ///
    /// Each character is solved in its own push/pop scope: no constraint
    /// carries over from one character to the next.
    pub fn generate<S: SmtSolver, R: Rng + ?Sized>(
        &self,
        solver: &mut S,
        pattern: &str,
        rng: &mut R,
    ) -> Result<Vec<Packet>, StreamError<S::Error>> {
        let compiled = rand_regex::Regex::compile(pattern, MAX_PATTERN_REPEAT)
            .map_err(StreamError::BadPattern)?;
        let concrete: String = compiled.sample(rng);

        let mut stream = Vec::with_capacity(concrete.len());
        for symbol in concrete.chars() {
            let term = self
                .symbols
                .get(&symbol)
                .ok_or(StreamError::UnknownSymbol(symbol))?;
            stream.push(self.solve_symbol(solver, symbol, term)?);
        }
        Ok(stream)
    }

    fn solve_symbol<S: SmtSolver>(
        &self,
        solver: &mut S,
        symbol: char,
        term: &SmtTerm,
    ) -> Result<Packet, StreamError<S::Error>> {
        solver.push().map_err(StreamError::Solver)?;
        let packet = self.solve_in_scope(solver, symbol, term);
        solver.pop().map_err(StreamError::Solver)?;
        packet
    }

    fn solve_in_scope<S: SmtSolver>(
        &self,
        solver: &mut S,
        symbol: char,
        term: &SmtTerm,
    ) -> Result<Packet, StreamError<S::Error>> {
        for var in [SRC_VAR, DST_VAR, PORT_VAR] {
            solver
                .declare_var(var, &SmtSort::Int)
                .map_err(StreamError::Solver)?;
            solver
                .assert(&field_domain(var))
                .map_err(StreamError::Solver)?;
        }
        solver.assert(term).map_err(StreamError::Solver)?;

        let vars = [
            (SRC_VAR, &SmtSort::Int),
            (DST_VAR, &SmtSort::Int),
            (PORT_VAR, &SmtSort::Int),
        ];
        let (result, model) = solver
            .check_sat_with_model(&vars)
            .map_err(StreamError::Solver)?;
        match result {
            SatResult::Sat => {
                let model = model.ok_or_else(|| StreamError::Inconclusive {
                    symbol,
                    reason: "sat result carried no model".into(),
                })?;
                Ok(Packet::synthesize(&model)?)
            }
            SatResult::Unsat => Err(StreamError::UnsatisfiableSymbol(symbol)),
            SatResult::Unknown(reason) => Err(StreamError::Inconclusive { symbol, reason }),
        }
    }
}

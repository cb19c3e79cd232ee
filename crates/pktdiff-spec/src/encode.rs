use pktdiff_smt::terms::SmtTerm;
use thiserror::Error;

use crate::ast::Predicate;

/// Address width in bits for this deployment.
pub const ADDR_WIDTH: u32 = 32;

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("prefix length {got} is outside [0, {ADDR_WIDTH}]")]
    InvalidPrefixLength { got: i64 },
    #[error("prefix base address {got} is outside [0, 2^{ADDR_WIDTH} - 1]")]
    BaseOutOfRange { got: i64 },
    #[error("in_prefix operand '{field}' must be {expected}, found '{found}'")]
    PrefixOperandShape {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
}

/// Translate a predicate into a solver term.
///
/// Structural recursion over the predicate; the only non-trivial case is
/// `InPrefix`, which becomes the interval bound
/// `addr >= min && addr <= max` with `min` the aligned network base address
/// and `max = min + 2^(ADDR_WIDTH - prefix_len) - 1`. The arithmetic is done
/// in `u64` so a zero prefix length (the full address space) never shifts a
/// 32-bit value by 32 bits. Operand shapes and prefix bounds are validated
/// here, before anything reaches the solver.
pub fn encode(pred: &Predicate) -> Result<SmtTerm, EncodeError> {
    match pred {
        Predicate::And(l, r) => Ok(SmtTerm::and(vec![encode(l)?, encode(r)?])),
        Predicate::Or(l, r) => Ok(SmtTerm::or(vec![encode(l)?, encode(r)?])),
        Predicate::Eq(l, r) => Ok(encode(l)?.eq(encode(r)?)),
        Predicate::Le(l, r) => Ok(encode(l)?.le(encode(r)?)),
        Predicate::Ge(l, r) => Ok(encode(l)?.ge(encode(r)?)),
        Predicate::Int(n) => Ok(SmtTerm::int(*n)),
        Predicate::Var(name) => Ok(SmtTerm::var(name.clone())),
        Predicate::InPrefix {
            addr,
            base,
            prefix_len,
        } => encode_in_prefix(addr, base, prefix_len),
    }
}

fn encode_in_prefix(
    addr: &Predicate,
    base: &Predicate,
    prefix_len: &Predicate,
) -> Result<SmtTerm, EncodeError> {
    let addr_name = match addr {
        Predicate::Var(name) => name.clone(),
        other => {
            return Err(EncodeError::PrefixOperandShape {
                field: "addr",
                expected: "a variable",
                found: other.to_string(),
            })
        }
    };
    let base = match base {
        Predicate::Int(n) => *n,
        other => {
            return Err(EncodeError::PrefixOperandShape {
                field: "base",
                expected: "an integer literal",
                found: other.to_string(),
            })
        }
    };
    let prefix_len = match prefix_len {
        Predicate::Int(n) => *n,
        other => {
            return Err(EncodeError::PrefixOperandShape {
                field: "prefix_len",
                expected: "an integer literal",
                found: other.to_string(),
            })
        }
    };

    if !(0..=ADDR_WIDTH as i64).contains(&prefix_len) {
        return Err(EncodeError::InvalidPrefixLength { got: prefix_len });
    }
    if !(0..=u32::MAX as i64).contains(&base) {
        return Err(EncodeError::BaseOutOfRange { got: base });
    }

    let host_bits = ADDR_WIDTH - prefix_len as u32;
    let num_addrs = 1u64 << host_bits;
    let min_val = ((base as u64) >> host_bits) << host_bits;
    let max_val = min_val + num_addrs - 1;

    Ok(SmtTerm::and(vec![
        SmtTerm::var(addr_name.clone()).ge(SmtTerm::int(min_val as i64)),
        SmtTerm::var(addr_name).le(SmtTerm::int(max_val as i64)),
    ]))
}

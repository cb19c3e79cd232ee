use pktdiff_smt::solver::Model;
use pktdiff_smt::terms::SmtTerm;
use thiserror::Error;

/// Variable names for the fixed packet fields, shared between predicates,
/// condition artifacts, and witness synthesis.
pub const SRC_VAR: &str = "src_ip";
pub const DST_VAR: &str = "dst_ip";
pub const PORT_VAR: &str = "port";

/// A concrete witness input: one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub src_addr: u32,
    pub dst_addr: u32,
    pub port: u16,
}

#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    #[error("model value {value} for '{var}' does not fit the packet field")]
    ValueOutOfRange { var: &'static str, value: i64 },
}

impl Packet {
    /// Build a packet from a satisfying assignment.
    ///
    /// A variable absent from the model defaults to 0: an unconstrained
    /// field has no "correct" witness value, and tests that rely on a
    /// specific value must constrain the field in their predicate. A value
    /// that is present but does not fit the field width is an error.
    pub fn synthesize(model: &Model) -> Result<Packet, SynthesisError> {
        Ok(Packet {
            src_addr: field::<u32>(model, SRC_VAR)?,
            dst_addr: field::<u32>(model, DST_VAR)?,
            port: field::<u16>(model, PORT_VAR)?,
        })
    }
}

fn field<T: TryFrom<i64> + Default>(
    model: &Model,
    var: &'static str,
) -> Result<T, SynthesisError> {
    match model.get_int(var) {
        None => Ok(T::default()),
        Some(value) => {
            T::try_from(value).map_err(|_| SynthesisError::ValueOutOfRange { var, value })
        }
    }
}

/// Domain constraint for a declared program variable.
///
/// Input variables denote fixed-width packet fields, so every solver session
/// bounds them to their width: without this, the negation of a predicate
/// like "any address" would be satisfied by witnesses no packet can carry.
pub fn field_domain(var: &str) -> SmtTerm {
    let max = if var == PORT_VAR {
        u16::MAX as i64
    } else {
        u32::MAX as i64
    };
    SmtTerm::and(vec![
        SmtTerm::var(var).ge(SmtTerm::int(0)),
        SmtTerm::var(var).le(SmtTerm::int(max)),
    ])
}

/// Render a 32-bit address as a dotted quad.
pub fn format_addr(addr: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (addr >> 24) & 0xff,
        (addr >> 16) & 0xff,
        (addr >> 8) & 0xff,
        addr & 0xff
    )
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(src={}, dst={}, port={})",
            format_addr(self.src_addr),
            format_addr(self.dst_addr),
            self.port
        )
    }
}

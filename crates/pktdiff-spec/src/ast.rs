use serde::{Deserialize, Serialize};

/// A logical predicate over program input variables.
///
/// This is the declarative form carried by test manifests: a closed,
/// recursive sum type, deserialized from JSON and translated into solver
/// constraints by [`crate::encode::encode`]. Variables are identified by
/// name; `InPrefix` expresses IP-prefix membership and is expanded into an
/// interval bound at encode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Eq(Box<Predicate>, Box<Predicate>),
    Le(Box<Predicate>, Box<Predicate>),
    Ge(Box<Predicate>, Box<Predicate>),
    Int(i64),
    Var(String),
    /// `addr` must be a `Var`, `base` and `prefix_len` must be `Int`s;
    /// the encoder rejects any other operand shape.
    InPrefix {
        addr: Box<Predicate>,
        base: Box<Predicate>,
        prefix_len: Box<Predicate>,
    },
}

#[allow(clippy::should_implement_trait)]
impl Predicate {
    pub fn var(name: impl Into<String>) -> Self {
        Predicate::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Predicate::Int(n)
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Predicate) -> Self {
        Predicate::Eq(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Predicate) -> Self {
        Predicate::Le(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Predicate) -> Self {
        Predicate::Ge(Box::new(self), Box::new(other))
    }

    /// Membership of the variable `addr` in the prefix `base/prefix_len`.
    pub fn in_prefix(addr: impl Into<String>, base: u32, prefix_len: u8) -> Self {
        Predicate::InPrefix {
            addr: Box::new(Predicate::var(addr)),
            base: Box::new(Predicate::int(base as i64)),
            prefix_len: Box::new(Predicate::int(prefix_len as i64)),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::And(l, r) => write!(f, "({l} and {r})"),
            Predicate::Or(l, r) => write!(f, "({l} or {r})"),
            Predicate::Eq(l, r) => write!(f, "({l} == {r})"),
            Predicate::Le(l, r) => write!(f, "({l} <= {r})"),
            Predicate::Ge(l, r) => write!(f, "({l} >= {r})"),
            Predicate::Int(n) => write!(f, "{n}"),
            Predicate::Var(name) => write!(f, "{name}"),
            Predicate::InPrefix {
                addr,
                base,
                prefix_len,
            } => write!(f, "{addr} in {base}/{prefix_len}"),
        }
    }
}

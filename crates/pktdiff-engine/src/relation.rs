//! Relations over the two programs' output sequences.
//!
//! A relation is an injected strategy with a fixed signature; the manifest
//! declares relations as data ([`RelationSpec`]) and compiles them, while
//! programmatic callers may supply arbitrary closures via [`Relation::new`].

use serde::{Deserialize, Serialize};

use crate::packet::Packet;

/// A declared acceptance check between two programs' outputs.
pub struct Relation(Box<dyn Fn(&[Packet], &[Packet]) -> bool + Send + Sync>);

impl Relation {
    pub fn new(f: impl Fn(&[Packet], &[Packet]) -> bool + Send + Sync + 'static) -> Self {
        Relation(Box::new(f))
    }

    pub fn holds(&self, left: &[Packet], right: &[Packet]) -> bool {
        (self.0)(left, right)
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Relation(..)")
    }
}

/// The default relation, applied on the complementary (negated-predicate)
/// case: both outputs must match exactly on address and port fields.
pub fn default_relation() -> Relation {
    Relation::new(|left, right| left == right)
}

/// Declarative relation form carried by test manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationSpec {
    /// Outputs match exactly on src/dst/port.
    StructuralEq,
    /// Same length, and ports agree packet by packet.
    PortEq,
    /// Every output packet of each program carries the given port.
    PortExpect { left: u16, right: u16 },
    /// Each program emits the given number of packets on `port`.
    PortCountExpect { port: u16, left: usize, right: usize },
}

impl RelationSpec {
    pub fn compile(&self) -> Relation {
        match self {
            RelationSpec::StructuralEq => default_relation(),
            RelationSpec::PortEq => Relation::new(|left, right| {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(a, b)| a.port == b.port)
            }),
            RelationSpec::PortExpect { left, right } => {
                let (want_left, want_right) = (*left, *right);
                Relation::new(move |left, right| {
                    !left.is_empty()
                        && !right.is_empty()
                        && left.iter().all(|p| p.port == want_left)
                        && right.iter().all(|p| p.port == want_right)
                })
            }
            RelationSpec::PortCountExpect { port, left, right } => {
                let (port, want_left, want_right) = (*port, *left, *right);
                Relation::new(move |left, right| {
                    let count = |pkts: &[Packet]| pkts.iter().filter(|p| p.port == port).count();
                    count(left) == want_left && count(right) == want_right
                })
            }
        }
    }
}

impl std::fmt::Display for RelationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationSpec::StructuralEq => write!(f, "structural-eq"),
            RelationSpec::PortEq => write!(f, "port-eq"),
            RelationSpec::PortExpect { left, right } => {
                write!(f, "port-expect({left}, {right})")
            }
            RelationSpec::PortCountExpect { port, left, right } => {
                write!(f, "port-count-expect(port={port}, {left}, {right})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkt(dst_addr: u32, port: u16) -> Packet {
        Packet {
            src_addr: 0,
            dst_addr,
            port,
        }
    }

    #[test]
    fn default_relation_is_structural_equality() {
        let rel = default_relation();
        let a = [pkt(1, 0), pkt(2, 1)];
        assert!(rel.holds(&a, &a.clone()));
        assert!(!rel.holds(&a, &[pkt(1, 0), pkt(2, 2)]));
        assert!(!rel.holds(&a, &[pkt(1, 0)]));
    }

    #[test]
    fn port_eq_ignores_addresses() {
        let rel = RelationSpec::PortEq.compile();
        assert!(rel.holds(&[pkt(1, 0)], &[pkt(99, 0)]));
        assert!(!rel.holds(&[pkt(1, 0)], &[pkt(1, 1)]));
        assert!(!rel.holds(&[pkt(1, 0)], &[]));
    }

    #[test]
    fn port_expect_checks_each_side() {
        let rel = RelationSpec::PortExpect { left: 2, right: 1 }.compile();
        assert!(rel.holds(&[pkt(1, 2)], &[pkt(1, 1)]));
        assert!(!rel.holds(&[pkt(1, 1)], &[pkt(1, 2)]));
        assert!(!rel.holds(&[], &[pkt(1, 1)]));
    }

    #[test]
    fn port_count_expect_counts_matching_packets() {
        let rel = RelationSpec::PortCountExpect {
            port: 0,
            left: 4,
            right: 3,
        }
        .compile();
        let four = [pkt(1, 0), pkt(2, 0), pkt(3, 0), pkt(4, 0), pkt(5, 1)];
        let three = [pkt(1, 0), pkt(2, 0), pkt(3, 0), pkt(4, 1)];
        assert!(rel.holds(&four, &three));
        assert!(!rel.holds(&three, &four));
    }

    #[test]
    fn spec_json_roundtrip() {
        let specs = [
            RelationSpec::StructuralEq,
            RelationSpec::PortEq,
            RelationSpec::PortExpect { left: 2, right: 1 },
            RelationSpec::PortCountExpect {
                port: 0,
                left: 4,
                right: 3,
            },
        ];
        for spec in specs {
            let raw = serde_json::to_string(&spec).unwrap();
            let back: RelationSpec = serde_json::from_str(&raw).unwrap();
            assert_eq!(back, spec);
        }
    }

    #[test]
    fn custom_closures_are_first_class() {
        let rel = Relation::new(|left, right| left.len() + 1 == right.len());
        assert!(rel.holds(&[pkt(1, 0)], &[pkt(1, 0), pkt(2, 0)]));
        assert!(!rel.holds(&[pkt(1, 0)], &[pkt(1, 0)]));
    }
}

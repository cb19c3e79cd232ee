//! Run reports: per-unit outcomes and the overall verdict.

use crate::packet::Packet;

/// Terminal state of one test unit.
///
/// A unit starts pending, classifies as feasible or infeasible, and a
/// feasible unit either validates or fails. `Infeasible` and `Validated`
/// are both successful terminal states; `Failed` aborts the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
    /// Dead code: no input reaches this unit.
    Infeasible,
    /// Both programs were driven and the relation held.
    Validated,
    /// The relation was violated (or execution failed); both programs'
    /// literal outputs are retained for diagnosis.
    Failed {
        left: Vec<Packet>,
        right: Vec<Packet>,
        reason: String,
    },
}

/// Outcome of one unit (a path/predicate combination, or a pattern).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    /// The manifest case this unit belongs to.
    pub case: String,
    /// Unit identity: the walked path and phase, or the pattern.
    pub unit: String,
    pub status: UnitStatus,
}

/// Aggregate result of a differential run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub program_a: String,
    pub program_b: String,
    /// Per-unit outcomes in execution order. Fail-fast: a failed unit is
    /// always the last entry.
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.failure().is_none()
    }

    pub fn failure(&self) -> Option<&UnitReport> {
        self.units
            .iter()
            .find(|u| matches!(u.status, UnitStatus::Failed { .. }))
    }

    /// Number of units classified as dead code.
    pub fn dead_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::Infeasible)
            .count()
    }

    pub fn validated_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::Validated)
            .count()
    }
}

fn format_packets(packets: &[Packet]) -> String {
    let inner: Vec<String> = packets.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner.join(", "))
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.failure() {
            None => {
                writeln!(f, "RESULT: PASS")?;
                write!(
                    f,
                    "Validated {} unit(s); {} dead path(s).",
                    self.validated_units(),
                    self.dead_units()
                )
            }
            Some(unit) => {
                let UnitStatus::Failed {
                    left,
                    right,
                    reason,
                } = &unit.status
                else {
                    unreachable!("failure() only returns failed units");
                };
                writeln!(f, "RESULT: FAIL")?;
                writeln!(f, "Case '{}', unit {}: {}", unit.case, unit.unit, reason)?;
                writeln!(f, "{} => {}", self.program_a, format_packets(left))?;
                write!(f, "{} => {}", self.program_b, format_packets(right))
            }
        }
    }
}

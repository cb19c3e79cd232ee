//! End-to-end differential protocol: enumerate paths, synthesize witnesses,
//! drive two in-process candidate programs, and check relations.

use indexmap::IndexMap;

use pktdiff_engine::manifest::{CaseTarget, TestCase, TestManifest};
use pktdiff_engine::packet::Packet;
use pktdiff_engine::relation::RelationSpec;
use pktdiff_engine::report::UnitStatus;
use pktdiff_engine::runner::{ProgramRunner, RunnerError};
use pktdiff_engine::trace::InputTrace;
use pktdiff_engine::DiffTester;
use pktdiff_smt::backends::Z3Solver;
use pktdiff_spec::artifact::{ConditionArtifact, ConditionEntry};
use pktdiff_spec::ast::Predicate;

/// In-process candidate programs keyed by name.
struct TableRunner {
    programs: Vec<(String, fn(&InputTrace) -> Vec<Packet>)>,
}

impl ProgramRunner for TableRunner {
    fn run(&self, program: &str, input: &InputTrace) -> Result<Vec<Packet>, RunnerError> {
        let handler = self
            .programs
            .iter()
            .find(|(name, _)| name == program)
            .map(|(_, f)| f)
            .ok_or_else(|| RunnerError::Failed {
                stderr: format!("unknown program '{program}'"),
            })?;
        Ok(handler(input))
    }
}

fn input_packets(input: &InputTrace) -> Vec<Packet> {
    input
        .events
        .iter()
        .map(|event| Packet {
            src_addr: event.args[0] as u32,
            dst_addr: event.args[1] as u32,
            port: 0,
        })
        .collect()
}

/// Forwards every packet on port 0.
fn forward_on_zero(input: &InputTrace) -> Vec<Packet> {
    input_packets(input)
}

/// Forwards every packet on port 1.
fn forward_on_one(input: &InputTrace) -> Vec<Packet> {
    input_packets(input)
        .into_iter()
        .map(|pkt| Packet { port: 1, ..pkt })
        .collect()
}

fn artifact() -> ConditionArtifact {
    ConditionArtifact {
        ast: "x(y(,)(,))()".to_string(),
        conditions: vec![
            ConditionEntry {
                condition: "x".into(),
                smtlib: "(>= dst_ip 200)".into(),
            },
            ConditionEntry {
                condition: "y".into(),
                smtlib: "(= port 0)".into(),
            },
        ],
        variables: vec!["src_ip".into(), "dst_ip".into(), "port".into()],
    }
}

fn manifest(cases: Vec<TestCase>) -> TestManifest {
    TestManifest {
        schema_version: 1,
        program_a: "old_program".into(),
        program_b: "new_program".into(),
        alphabet: IndexMap::new(),
        cases,
    }
}

fn predicate_case(predicate: Predicate, relation: RelationSpec) -> TestCase {
    TestCase {
        name: None,
        target: CaseTarget::Predicate(predicate),
        relation,
    }
}

#[test]
fn agreeing_programs_pass_a_port_relation_on_the_full_prefix() {
    // Both programs emit port 0 for every destination in 0.0.0.0/0.
    let runner = TableRunner {
        programs: vec![
            ("old_program".into(), forward_on_zero),
            ("new_program".into(), forward_on_zero),
        ],
    };
    let art = artifact();
    let man = manifest(vec![predicate_case(
        Predicate::in_prefix("dst_ip", 0, 0),
        RelationSpec::PortEq,
    )]);

    let tester = DiffTester::new(&runner, &art, &man);
    let mut solver = Z3Solver::new();
    let report = tester.run(&mut solver).unwrap();

    assert!(report.passed(), "expected pass, got:\n{report}");
    // Every feasible predicate unit validated; the complement of the full
    // address space is dead on every path.
    assert!(report.validated_units() >= 3);
    assert_eq!(report.dead_units(), 3);
}

#[test]
fn diverging_programs_fail_with_both_literal_outputs() {
    let runner = TableRunner {
        programs: vec![
            ("old_program".into(), forward_on_zero),
            ("new_program".into(), forward_on_one),
        ],
    };
    let art = artifact();
    let man = manifest(vec![predicate_case(
        Predicate::in_prefix("dst_ip", 0, 0),
        RelationSpec::PortEq,
    )]);

    let tester = DiffTester::new(&runner, &art, &man);
    let mut solver = Z3Solver::new();
    let report = tester.run(&mut solver).unwrap();

    assert!(!report.passed());
    let failure = report.failure().unwrap();
    let UnitStatus::Failed {
        left,
        right,
        reason,
    } = &failure.status
    else {
        panic!("failure() must return a failed unit");
    };
    assert_eq!(reason, "relation violated");
    assert_eq!(left.len(), 1);
    assert_eq!(right.len(), 1);
    assert_eq!(left[0].port, 0);
    assert_eq!(right[0].port, 1);
    assert_eq!(left[0].dst_addr, right[0].dst_addr);

    // Fail-fast: the failed unit is the last one recorded.
    assert!(matches!(
        report.units.last().unwrap().status,
        UnitStatus::Failed { .. }
    ));

    let rendered = report.to_string();
    assert!(rendered.contains("RESULT: FAIL"));
    assert!(rendered.contains("old_program => ["));
    assert!(rendered.contains("new_program => ["));
}

#[test]
fn timeouts_fail_the_unit_and_abort_the_run() {
    struct TimeoutRunner;
    impl ProgramRunner for TimeoutRunner {
        fn run(&self, program: &str, input: &InputTrace) -> Result<Vec<Packet>, RunnerError> {
            if program == "new_program" {
                Err(RunnerError::Timeout)
            } else {
                Ok(forward_on_zero(input))
            }
        }
    }

    let art = artifact();
    let man = manifest(vec![predicate_case(
        Predicate::in_prefix("dst_ip", 0, 0),
        RelationSpec::PortEq,
    )]);
    let tester = DiffTester::new(&TimeoutRunner, &art, &man);
    let mut solver = Z3Solver::new();
    let report = tester.run(&mut solver).unwrap();

    assert!(!report.passed());
    let failure = report.failure().unwrap();
    let UnitStatus::Failed { reason, .. } = &failure.status else {
        panic!("failure() must return a failed unit");
    };
    assert!(reason.contains("timed out"), "got reason: {reason}");
}

#[test]
fn pattern_cases_drive_a_whole_stream_through_both_programs() {
    let runner = TableRunner {
        programs: vec![
            ("old_program".into(), forward_on_zero),
            ("new_program".into(), forward_on_zero),
        ],
    };
    let art = artifact();

    let mut alphabet = IndexMap::new();
    alphabet.insert(
        'a',
        Predicate::in_prefix("dst_ip", 252, 30)
            .and(Predicate::var("port").eq(Predicate::int(0))),
    );
    alphabet.insert('b', Predicate::var("port").eq(Predicate::int(1)));

    let mut man = manifest(vec![TestCase {
        name: Some("stream".into()),
        target: CaseTarget::Pattern(r"a{2}b".into()),
        // Both programs re-emit all 3 packets on port 0.
        relation: RelationSpec::PortCountExpect {
            port: 0,
            left: 3,
            right: 3,
        },
    }]);
    man.alphabet = alphabet;

    let tester = DiffTester::new(&runner, &art, &man);
    let mut solver = Z3Solver::new();
    let report = tester.run(&mut solver).unwrap();

    assert!(report.passed(), "expected pass, got:\n{report}");
    assert_eq!(report.units.len(), 1);
    assert_eq!(report.units[0].unit, "pattern 'a{2}b'");
}

#[test]
fn declared_relation_applies_to_the_predicate_and_default_to_the_complement() {
    // Programs agree only on port 0 traffic: old forwards everything on
    // port 0, new flips to port 1 for destinations below 200 (which is
    // exactly the complement of condition x's region on the x=false path).
    fn new_program(input: &InputTrace) -> Vec<Packet> {
        input_packets(input)
            .into_iter()
            .map(|pkt| {
                if pkt.dst_addr >= 200 {
                    pkt
                } else {
                    Packet { port: 1, ..pkt }
                }
            })
            .collect()
    }

    let runner = TableRunner {
        programs: vec![
            ("old_program".into(), forward_on_zero),
            ("new_program".into(), new_program),
        ],
    };
    let art = artifact();
    // Predicate restricts witnesses to dst >= 200 where both agree; the
    // complement (dst < 200) diverges and the default structural relation
    // must catch it.
    let man = manifest(vec![predicate_case(
        Predicate::var("dst_ip").ge(Predicate::int(200)),
        RelationSpec::PortEq,
    )]);

    let tester = DiffTester::new(&runner, &art, &man);
    let mut solver = Z3Solver::new();
    let report = tester.run(&mut solver).unwrap();

    assert!(!report.passed());
    let failure = report.failure().unwrap();
    assert!(failure.unit.starts_with("complement @"));
}

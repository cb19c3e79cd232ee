//! The program execution boundary.
//!
//! The orchestrator depends only on [`ProgramRunner`]: feed one input trace
//! to a named program, get its ordered output packets back. The subprocess
//! implementation drives the dataplane interpreter with an explicitly
//! injected executable path and working directory — the core performs no
//! filesystem search for its collaborators.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::packet::Packet;
use crate::trace::{parse_output_events, InputTrace, TraceError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("program execution timed out")]
    Timeout,
    #[error("program execution failed: {stderr}")]
    Failed { stderr: String },
    #[error("could not encode the input trace")]
    InputEncode(#[from] serde_json::Error),
    #[error("program output is malformed")]
    Output(#[from] TraceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Executes one candidate program against a generated input stream.
pub trait ProgramRunner {
    fn run(&self, program: &str, input: &InputTrace) -> Result<Vec<Packet>, RunnerError>;
}

/// Runs programs through the external dataplane interpreter.
pub struct InterpreterRunner {
    interpreter: PathBuf,
    work_dir: PathBuf,
    timeout: Duration,
}

impl InterpreterRunner {
    pub fn new(
        interpreter: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        InterpreterRunner {
            interpreter: interpreter.into(),
            work_dir: work_dir.into(),
            timeout,
        }
    }
}

impl ProgramRunner for InterpreterRunner {
    fn run(&self, program: &str, input: &InputTrace) -> Result<Vec<Packet>, RunnerError> {
        let mut input_file = tempfile::Builder::new()
            .prefix("pktdiff-input-")
            .suffix(".json")
            .tempfile()?;
        input_file.write_all(input.to_json()?.as_bytes())?;
        input_file.flush()?;

        let mut child = Command::new(&self.interpreter)
            .arg(program)
            .arg(input_file.path())
            .arg("-i")
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes concurrently: a program emitting more than one
        // pipe buffer of output would otherwise block on write and never
        // exit, turning a healthy run into a spurious timeout.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if Instant::now() >= deadline {
                        child.kill().ok();
                        child.wait().ok();
                        // The kill closes the pipes, so the readers finish.
                        stdout_reader.join().ok();
                        stderr_reader.join().ok();
                        return Err(RunnerError::Timeout);
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        };

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;
        if !status.success() {
            return Err(RunnerError::Failed {
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(parse_output_events(&stdout)?)
    }
}

fn spawn_reader<P: Read + Send + 'static>(
    pipe: Option<P>,
) -> JoinHandle<std::io::Result<String>> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<std::io::Result<String>>) -> Result<String, RunnerError> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(RunnerError::Io(std::io::Error::other(
            "output reader thread panicked",
        ))),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script_runner(body: &str, timeout: Duration) -> (InterpreterRunner, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-interpreter.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let runner = InterpreterRunner::new(&script, dir.path(), timeout);
        (runner, dir)
    }

    fn one_packet_input() -> InputTrace {
        InputTrace::from_packets(&[Packet {
            src_addr: 1,
            dst_addr: 200,
            port: 0,
        }])
    }

    #[test]
    fn collects_output_events_from_stdout() {
        let body = r#"echo '{"name": "ip_pkt", "args": [1, 200], "locations": ["0:2"], "timestamp": 0}'"#;
        let (runner, _dir) = script_runner(body, Duration::from_secs(5));
        let out = runner.run("prog.dpt", &one_packet_input()).unwrap();
        assert_eq!(
            out,
            vec![Packet {
                src_addr: 1,
                dst_addr: 200,
                port: 2
            }]
        );
    }

    #[test]
    fn input_trace_is_passed_as_a_readable_file() {
        // The fake interpreter echoes the first input event's args back.
        let body = r#"grep -c '"ip_pkt"' "$2" > /dev/null && echo '{"name": "ip_pkt", "args": [0, 0], "locations": ["0:0"], "timestamp": 0}'"#;
        let (runner, _dir) = script_runner(body, Duration::from_secs(5));
        let out = runner.run("prog.dpt", &one_packet_input()).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn output_larger_than_the_pipe_buffer_is_not_a_timeout() {
        // 2000 lines at ~80 bytes apiece comfortably exceed a 64 KiB pipe.
        let body = concat!(
            "i=0\n",
            "while [ $i -lt 2000 ]; do\n",
            r#"  echo '{"name": "ip_pkt", "args": [1, 2], "locations": ["0:1"], "timestamp": 0}'"#,
            "\n",
            "  i=$((i+1))\n",
            "done",
        );
        let (runner, _dir) = script_runner(body, Duration::from_secs(30));
        let out = runner.run("prog.dpt", &one_packet_input()).unwrap();
        assert_eq!(out.len(), 2000);
        assert!(out.iter().all(|pkt| pkt.port == 1));
    }

    #[test]
    fn slow_programs_time_out() {
        let (runner, _dir) = script_runner("sleep 30", Duration::from_millis(100));
        let err = runner.run("prog.dpt", &one_packet_input()).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout));
    }

    #[test]
    fn nonzero_exit_reports_stderr() {
        let body = "echo boom >&2; exit 3";
        let (runner, _dir) = script_runner(body, Duration::from_secs(5));
        let err = runner.run("prog.dpt", &one_packet_input()).unwrap_err();
        assert!(matches!(err, RunnerError::Failed { stderr } if stderr == "boom"));
    }
}

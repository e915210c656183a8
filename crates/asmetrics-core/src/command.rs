//! Short-lived subprocess helpers for the one-shot host queries.

use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::process::{ChildStdout, Stdio};
use std::time::{Duration, Instant};

/// Poll step while waiting for a child to exit.
const POLL_STEP: Duration = Duration::from_millis(5);

/// Runs `program` and returns its trimmed stdout.
///
/// Returns `None` when the program cannot be started, exits unsuccessfully,
/// prints nothing, or is still running after `timeout` (it is killed).
/// stdout is drained while waiting, so output size is not limited by the
/// pipe buffer.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    log::debug!("running {program} {}", args.join(" "));

    let mut child = std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let mut stdout = child.stdout.take()?;
    if !set_nonblocking(&stdout) {
        log::debug!("could not make {program} stdout non-blocking");
    }
    let mut out = Vec::new();

    let start = Instant::now();
    let status = loop {
        drain(&mut stdout, &mut out);
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    log::warn!("{program} did not finish within {timeout:?}; killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(POLL_STEP);
            }
            Err(_) => return None,
        }
    };

    drain(&mut stdout, &mut out);
    if !status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out).trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn set_nonblocking(stdout: &ChildStdout) -> bool {
    let fd = stdout.as_raw_fd();
    // SAFETY: `fd` is the open read end of the child's stdout pipe, owned
    // by `stdout` for the duration of both calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        flags >= 0 && libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) >= 0
    }
}

/// Appends everything currently readable to `out`. Stops at end of stream
/// or when the pipe is empty.
fn drain(stdout: &mut ChildStdout, out: &mut Vec<u8>) {
    let mut buf = [0u8; 8192];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn run_command_echo() {
        assert_eq!(run_command("echo", &["hello"], TIMEOUT).as_deref(), Some("hello"));
    }

    #[test]
    fn run_command_nonexistent() {
        assert!(run_command("/nonexistent/binary", &[], TIMEOUT).is_none());
    }

    #[test]
    fn run_command_failing_status() {
        assert!(run_command("false", &[], TIMEOUT).is_none());
    }

    #[test]
    fn run_command_empty_output() {
        assert!(run_command("true", &[], TIMEOUT).is_none());
    }

    #[test]
    fn run_command_output_larger_than_pipe_buffer() {
        let out = run_command("seq", &["1", "200000"], TIMEOUT).unwrap();
        assert_eq!(out.lines().count(), 200_000);
        assert_eq!(out.lines().last(), Some("200000"));
    }

    #[test]
    fn run_command_times_out() {
        assert!(run_command("sleep", &["5"], Duration::from_millis(50)).is_none());
    }
}

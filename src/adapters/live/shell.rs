//! Live shell executor using `std::process::Command`.
//!
//! Both output streams are drained on their own threads so a chatty child
//! never blocks on a full pipe, but only the first `max_output_bytes` of each
//! are kept. Once the child is gone the readers get [`DRAIN_GRACE`] to reach
//! end of file. A background process that inherited the pipes can keep them
//! open indefinitely, so after the grace period whatever has been captured
//! is returned and the readers are left to finish on their own.

use std::io::{ErrorKind, Read};
use std::mem;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::ports::shell::{ShellExecutor, ShellOutput, ShellRequest};

const WAIT_POLL: Duration = Duration::from_millis(100);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// How long output readers may keep running after the child has exited.
pub const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Live shell executor that runs commands via the system shell.
pub struct LiveShellExecutor;

impl ShellExecutor for LiveShellExecutor {
    fn run(
        &self,
        request: &ShellRequest,
    ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&request.command)
            .current_dir(&request.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .map(|s| Capture::start(s, request.max_output_bytes));
        let stderr = child
            .stderr
            .take()
            .map(|s| Capture::start(s, request.max_output_bytes));

        let (status, timed_out) = wait(&mut child, request.timeout)?;

        let deadline = Instant::now() + DRAIN_GRACE;
        let (stdout, out_cut) = Capture::finish(stdout, deadline);
        let (stderr, err_cut) = Capture::finish(stderr, deadline);

        Ok(ShellOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            truncated: out_cut || err_cut,
            timed_out,
        })
    }
}

#[derive(Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// One output stream being read on a background thread.
struct Capture {
    shared: Arc<Mutex<Captured>>,
    reader: JoinHandle<()>,
}

impl Capture {
    fn start<R: Read + Send + 'static>(mut source: R, limit: usize) -> Self {
        let shared = Arc::new(Mutex::new(Captured::default()));
        let sink = Arc::clone(&shared);
        let reader = thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match source.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let mut captured = sink.lock().unwrap_or_else(PoisonError::into_inner);
                        let room = limit.saturating_sub(captured.bytes.len());
                        if n > room {
                            captured.truncated = true;
                        }
                        captured.bytes.extend_from_slice(&buf[..n.min(room)]);
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
        });
        Self { shared, reader }
    }

    /// Waits until the reader hits end of file or `deadline` passes, then
    /// takes what it has captured so far.
    fn finish(capture: Option<Self>, deadline: Instant) -> (Vec<u8>, bool) {
        let Some(capture) = capture else {
            return (Vec::new(), false);
        };
        while !capture.reader.is_finished() && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL);
        }
        if !capture.reader.is_finished() {
            debug!("output pipe still open after exit; keeping partial output");
        }
        let mut captured = capture
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (mem::take(&mut captured.bytes), captured.truncated)
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        let now = Instant::now();
        if now >= deadline {
            if let Err(e) = child.kill() {
                debug!("kill after timeout failed: {e}");
            }
            return Ok((child.wait()?, true));
        }
        thread::sleep(WAIT_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str) -> ShellRequest {
        ShellRequest {
            command: command.to_string(),
            workdir: std::env::temp_dir(),
            max_output_bytes: 1024,
            timeout: None,
        }
    }

    #[test]
    fn runs_echo_command() {
        let result = LiveShellExecutor.run(&request("echo hello")).unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn captures_exit_code_and_stderr() {
        let result = LiveShellExecutor
            .run(&request("echo boom >&2; exit 42"))
            .unwrap();

        assert_eq!(result.exit_code, 42);
        assert_eq!(result.stderr.trim(), "boom");
    }

    #[test]
    fn runs_in_requested_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request("pwd");
        req.workdir = dir.path().to_path_buf();

        let result = LiveShellExecutor.run(&req).unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();

        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn truncates_long_output() {
        let mut req = request("printf abcdefghij");
        req.max_output_bytes = 4;

        let result = LiveShellExecutor.run(&req).unwrap();

        assert_eq!(result.stdout, "abcd");
        assert!(result.truncated);
    }

    #[test]
    fn kills_child_after_timeout() {
        let mut req = request("sleep 5");
        req.timeout = Some(Duration::from_millis(200));

        let started = Instant::now();
        let result = LiveShellExecutor.run(&req).unwrap();

        assert!(result.timed_out);
        assert_ne!(result.exit_code, 0);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn keeps_output_written_before_timeout_kill() {
        let mut req = request("echo starting; echo warming up >&2; sleep 5");
        req.timeout = Some(Duration::from_millis(300));

        let result = LiveShellExecutor.run(&req).unwrap();

        assert!(result.timed_out);
        assert_eq!(result.stdout.trim(), "starting");
        assert_eq!(result.stderr.trim(), "warming up");
    }

    #[test]
    fn background_process_holding_pipes_does_not_block() {
        let started = Instant::now();
        let result = LiveShellExecutor
            .run(&request("sleep 5 & echo detached"))
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "detached");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_workdir_is_a_spawn_error() {
        let mut req = request("true");
        req.workdir = "/definitely/not/here".into();

        assert!(LiveShellExecutor.run(&req).is_err());
    }
}

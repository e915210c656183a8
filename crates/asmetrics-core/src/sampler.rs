//! Lifecycle of the external `powermetrics` process.
//!
//! The sampler writes asynchronously to `<base_path><timecode>`; nothing is
//! read from its stdout. Its stderr goes to `<output>.stderr` so an early
//! exit can be explained. Both files carry the output prefix and are
//! cleared by the next start.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::{Elevation, SAMPLERS, SamplerConfig, Timecode};
use crate::error::{MetricsError, Result};

const POLL_STEP: Duration = Duration::from_millis(10);

/// How long `stop` waits after SIGTERM before escalating.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `stop` waits after SIGINT before killing.
const INTERRUPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Substrings of sampler/sudo diagnostics that indicate a privilege problem.
const PRIVILEGE_HINTS: &[&str] = &[
    "superuser",
    "password",
    "sudo",
    "not permitted",
    "permission denied",
];

/// Owns a running sampler process. Dropping it terminates the process.
#[derive(Debug)]
pub struct SamplerSupervisor {
    child: Option<Child>,
    timecode: Timecode,
    output_path: PathBuf,
    stderr_path: PathBuf,
}

/// Full argv for the sampler process.
pub fn command_line(config: &SamplerConfig) -> Vec<String> {
    let mut argv = Vec::with_capacity(14);
    if config.elevation == Elevation::Sudo {
        argv.push("sudo".to_string());
    }
    argv.extend([
        "nice".to_string(),
        "-n".to_string(),
        config.nice.to_string(),
        config.program.clone(),
        "--samplers".to_string(),
        SAMPLERS.join(","),
        "-o".to_string(),
        config.output_path().display().to_string(),
        "-f".to_string(),
        "plist".to_string(),
        "-i".to_string(),
        config.interval_ms.to_string(),
    ]);
    argv
}

/// Deletes every file in the output directory whose name starts with the
/// output prefix. Returns how many were removed.
pub fn clear_stale_outputs(config: &SamplerConfig) -> Result<usize> {
    let dir = config.output_dir();
    let prefix = config.output_prefix();
    if prefix.is_empty() {
        return Ok(0);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(MetricsError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("removed stale sampler output {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                // A previous elevated sampler owns the file.
                if config.elevation == Elevation::Sudo && remove_elevated(&path) {
                    removed += 1;
                    continue;
                }
                return Err(MetricsError::PermissionDenied {
                    detail: format!("cannot remove stale sampler output {}: {e}", path.display()),
                });
            }
            Err(e) => return Err(MetricsError::Io { path, source: e }),
        }
    }
    Ok(removed)
}

/// Removes `path` with `sudo rm -f`. stdin stays attached so sudo can prompt.
fn remove_elevated(path: &Path) -> bool {
    log::info!("removing root-owned {} via sudo", path.display());
    let status = Command::new("sudo")
        .args(["rm", "-f", "--"])
        .arg(path)
        .stdout(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => !path.exists(),
        Ok(status) => {
            log::warn!("sudo rm {} exited with {status}", path.display());
            false
        }
        Err(e) => {
            log::warn!("failed to run sudo rm: {e}");
            false
        }
    }
}

/// `true` when the current process runs with effective uid 0.
pub fn is_superuser() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

fn mentions_privilege(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    PRIVILEGE_HINTS.iter().any(|hint| lower.contains(hint))
}

fn exit_error(status: ExitStatus, stderr: String) -> MetricsError {
    if mentions_privilege(&stderr) {
        MetricsError::PermissionDenied { detail: stderr }
    } else {
        MetricsError::SamplerExited { status, stderr }
    }
}

fn stderr_path_for(output: &Path) -> PathBuf {
    let mut raw = output.as_os_str().to_owned();
    raw.push(".stderr");
    PathBuf::from(raw)
}

/// Sends `signal` to `child` and waits up to `timeout` for it to exit.
fn signal_and_wait(child: &mut Child, signal: libc::c_int, timeout: Duration) -> bool {
    // SAFETY: the pid belongs to our own child, which has not been
    // reaped yet, so it cannot have been recycled.
    unsafe {
        libc::kill(child.id() as libc::pid_t, signal);
    }

    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(Some(_)) = child.try_wait() {
            return true;
        }
        std::thread::sleep(POLL_STEP);
    }
    false
}

impl SamplerSupervisor {
    /// Clears stale output files and spawns the sampler for
    /// `config.timecode`.
    ///
    /// Fails with [`MetricsError::PermissionDenied`] when privileges are
    /// missing; callers must not retry that automatically.
    pub fn start(config: &SamplerConfig) -> Result<Self> {
        if config.elevation == Elevation::None && !is_superuser() {
            return Err(MetricsError::PermissionDenied {
                detail: "elevation is disabled and the process is not running as root".to_string(),
            });
        }
        Self::spawn(config)
    }

    /// `start` without the up-front root check. A sampler lacking
    /// privileges still fails through its stderr classification.
    pub(crate) fn spawn(config: &SamplerConfig) -> Result<Self> {
        let removed = clear_stale_outputs(config)?;
        if removed > 0 {
            log::debug!("cleared {removed} stale output file(s)");
        }

        let output_path = config.output_path();
        let stderr_path = stderr_path_for(&output_path);
        let stderr = File::create(&stderr_path).map_err(|e| MetricsError::Io {
            path: stderr_path.clone(),
            source: e,
        })?;

        let argv = command_line(config);
        log::debug!("spawning {}", argv.join(" "));
        // command_line always starts with `sudo` or `nice`.
        let program = &argv[0];

        let child = Command::new(program)
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => MetricsError::PermissionDenied {
                    detail: format!("cannot execute {program}: {e}"),
                },
                _ => MetricsError::Spawn {
                    program: program.clone(),
                    source: e,
                },
            })?;

        let mut supervisor = Self {
            child: Some(child),
            timecode: config.timecode,
            output_path,
            stderr_path,
        };
        supervisor.await_startup(config.startup_grace)?;

        log::info!(
            "sampler started (pid {}) writing {} every {} ms",
            supervisor.pid().unwrap_or_default(),
            supervisor.output_path.display(),
            config.interval_ms
        );
        Ok(supervisor)
    }

    /// Watches the new process for `grace`; an exit inside the window is
    /// a startup failure.
    fn await_startup(&mut self, grace: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.exit_status() {
                self.child = None;
                return Err(exit_error(status, self.read_stderr()));
            }
            if start.elapsed() >= grace {
                return Ok(());
            }
            std::thread::sleep(POLL_STEP);
        }
    }

    fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.as_mut().and_then(|c| c.try_wait().ok().flatten())
    }

    fn read_stderr(&self) -> String {
        std::fs::read_to_string(&self.stderr_path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    /// File this sampler writes to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn is_running(&mut self) -> bool {
        self.child.is_some() && self.exit_status().is_none()
    }

    /// Errors once the sampler has died or was stopped.
    pub fn check_alive(&mut self) -> Result<()> {
        if self.child.is_none() {
            return Err(MetricsError::NotRunning);
        }
        match self.exit_status() {
            Some(status) => Err(exit_error(status, self.read_stderr())),
            None => Ok(()),
        }
    }

    /// Terminates the sampler: SIGTERM, then SIGINT, then SIGKILL, each
    /// after a timeout. Idempotent.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        // sudo relays SIGTERM and SIGINT to powermetrics but not SIGKILL.
        if signal_and_wait(&mut child, libc::SIGTERM, TERMINATE_TIMEOUT)
            || signal_and_wait(&mut child, libc::SIGINT, INTERRUPT_TIMEOUT)
        {
            log::info!("sampler stopped");
            return;
        }

        let pid = child.id();
        let _ = child.kill();
        let _ = child.wait();
        log::warn!(
            "sampler (pid {pid}) ignored SIGTERM and SIGINT and was killed; \
             an elevated powermetrics below it may still be running"
        );
    }
}

impl Drop for SamplerSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

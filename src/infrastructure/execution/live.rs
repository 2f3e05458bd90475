//! Live execution harness: spawns the solver under a CPU ceiling.
//!
//! The child gets its own session (and so its own process group) and an
//! `RLIMIT_CPU` slightly above the ceiling. The harness additionally samples
//! the group's CPU time from `/proc` and kills the whole group once the
//! ceiling is reached, with a wall-clock backstop for children that block
//! without consuming CPU. Every exit path kills and reaps the group.
//!
//! CPU use is measured per group, never through process-wide counters, so
//! concurrent runs sharing one harness do not charge each other. When the
//! leader exits it is left unreaped until a last sample has been taken.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitid, Id, WaitPidFlag};
use nix::unistd::{setsid, Pid};
use rand::Rng;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::domain::models::{Action, ExecutionConfig, RunResult, RunTermination, Task};
use crate::domain::ports::{ExecutionHarness, HarnessError, SolverCommand, SolverRegistry};
use super::cpu::process_group_cpu_seconds;
use super::output::outcome_for;

/// Kills the child's process group when dropped, unless already killed.
struct ProcessGroupGuard {
    pgid: Option<i32>,
}

impl ProcessGroupGuard {
    /// SIGKILL the group once; later calls are no-ops.
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            // ESRCH just means the group is already gone.
            if let Err(errno) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                if errno != Errno::ESRCH {
                    warn!(pgid, error = %errno, "Failed to kill solver process group");
                }
            }
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// How supervision of a running child ended.
enum Supervision {
    Exited(ExitStatus),
    CeilingReached,
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut stream) = stream {
            // Read errors truncate the output; the parser then sees less.
            let _ = stream.read_to_end(&mut buffer).await;
        }
        buffer
    })
}

/// Block until `pid` has exited, leaving it unreaped so its final CPU
/// counters can still be read.
fn wait_for_exit(pid: Option<i32>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let Some(pid) = pid else { return };
        let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT;
        while waitid(Id::Pid(Pid::from_raw(pid)), flags) == Err(Errno::EINTR) {}
    })
}

async fn collect_output(reader: JoinHandle<Vec<u8>>, grace: Duration) -> Vec<u8> {
    tokio::time::timeout(grace, reader)
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default()
}

/// Runs solvers as child processes.
pub struct LiveHarness {
    registry: Arc<dyn SolverRegistry>,
    config: ExecutionConfig,
    machine_speed: f64,
}

impl LiveHarness {
    /// `machine_speed` scales ceilings handed to the OS: an action with cost
    /// `c` may use `c * machine_speed` CPU seconds on this host.
    pub fn new(
        registry: Arc<dyn SolverRegistry>,
        config: ExecutionConfig,
        machine_speed: f64,
    ) -> Self {
        Self {
            registry,
            config,
            machine_speed,
        }
    }

    #[allow(unsafe_code)]
    fn spawn(command: &SolverCommand, task: &Task, ceiling: f64) -> Result<Child, HarnessError> {
        let limit_secs = ceiling.ceil().max(1.0) as u64;
        let seed: u32 = rand::rng().random_range(0..i32::MAX.unsigned_abs());
        let args = command.render_args(&task.path().to_string_lossy(), seed, limit_secs);
        debug!(program = %command.program, ?args, limit_secs, "Spawning solver");

        let mut cmd = Command::new(&command.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Runs in the forked child before exec; only async-signal-safe calls.
        unsafe {
            cmd.pre_exec(move || {
                setsid().map_err(std::io::Error::from)?;
                setrlimit(Resource::RLIMIT_CPU, limit_secs, limit_secs + 1)
                    .map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        cmd.spawn().map_err(|source| HarnessError::Spawn {
            solver: command.name.clone(),
            source,
        })
    }

    /// Wait for the child, sampling its group's CPU time.
    async fn supervise(
        &self,
        child: &mut Child,
        pgid: Option<i32>,
        ceiling: f64,
    ) -> std::io::Result<(Supervision, f64)> {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        let wall_limit = Duration::try_from_secs_f64(ceiling * self.config.wall_clock_slack)
            .unwrap_or(Duration::MAX)
            .saturating_add(grace);
        let started = Instant::now();
        let mut ticker = tokio::time::interval(poll);
        let mut sampled = 0.0_f64;
        let mut exited = wait_for_exit(pgid);

        loop {
            tokio::select! {
                _ = &mut exited => {
                    // The leader is a zombie now; its counters include the
                    // descendants it reaped.
                    if let Some(used) = pgid.and_then(process_group_cpu_seconds) {
                        sampled = sampled.max(used);
                    }
                    let status = child.wait().await?;
                    return Ok((Supervision::Exited(status), sampled));
                }
                _ = ticker.tick() => {
                    if let Some(used) = pgid.and_then(process_group_cpu_seconds) {
                        sampled = sampled.max(used);
                    }
                    if sampled >= ceiling {
                        debug!(sampled, ceiling, "CPU ceiling reached");
                        return Ok((Supervision::CeilingReached, sampled));
                    }
                    if started.elapsed() >= wall_limit {
                        debug!(elapsed = ?started.elapsed(), "Wall-clock backstop reached");
                        return Ok((Supervision::CeilingReached, sampled));
                    }
                }
            }
        }
    }

    /// Kill the group and wait (bounded) for the child to be reaped.
    async fn kill_and_reap(&self, guard: &mut ProcessGroupGuard, child: &mut Child) {
        guard.kill();
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to reap killed solver"),
            Err(_) => warn!(
                grace_ms = self.config.kill_grace_ms,
                "Killed solver not reaped within grace period"
            ),
        }
    }
}

#[async_trait]
impl ExecutionHarness for LiveHarness {
    fn harness_id(&self) -> &str {
        "live"
    }

    #[instrument(skip(self, action, task), fields(action = %action, task_id = %task.id()))]
    async fn run(&self, action: &Action, task: &Task) -> Result<RunResult, HarnessError> {
        let command = self
            .registry
            .resolve(action.solver())
            .ok_or_else(|| HarnessError::UnknownSolver(action.solver().to_string()))?;
        let ceiling = action.cost() * self.machine_speed;

        let mut child = Self::spawn(&command, task, ceiling)?;
        let pgid = child.id().and_then(|pid| i32::try_from(pid).ok());
        let mut guard = ProcessGroupGuard { pgid };
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let (supervision, used) = match self.supervise(&mut child, pgid, ceiling).await {
            Ok(result) => result,
            Err(source) => {
                self.kill_and_reap(&mut guard, &mut child).await;
                return Err(HarnessError::Wait {
                    solver: action.solver().to_string(),
                    source,
                });
            }
        };

        // Clean up stragglers in the group either way; this also closes
        // pipes held open by grandchildren.
        let status = match supervision {
            Supervision::CeilingReached => {
                self.kill_and_reap(&mut guard, &mut child).await;
                return Ok(RunResult::ceiling_exceeded(action.cost()));
            }
            Supervision::Exited(status) => {
                guard.kill();
                status
            }
        };

        let grace = Duration::from_millis(self.config.kill_grace_ms);
        let mut output = collect_output(stdout, grace).await;
        output.extend(collect_output(stderr, grace).await);
        let output = String::from_utf8_lossy(&output);

        let termination = match (status.code(), status.signal()) {
            (Some(code), _) => RunTermination::Exited { code },
            (None, Some(signal)) => RunTermination::Signaled { signal },
            (None, None) => RunTermination::Signaled { signal: 0 },
        };
        if status.signal() == Some(Signal::SIGXCPU as i32) {
            return Ok(RunResult::ceiling_exceeded(action.cost()));
        }

        // A parsed answer from a finished run stands even when the last
        // sample lands on the ceiling.
        let outcome = outcome_for(command.format, &termination, &output);
        if !outcome.is_solved() && used >= ceiling {
            return Ok(RunResult::ceiling_exceeded(action.cost()));
        }
        debug!(cpu = used, ?termination, outcome = %outcome.kind, "Solver finished");
        Ok(RunResult {
            cost: (used / self.machine_speed).min(action.cost()),
            outcome,
            termination,
        })
    }
}

//! Caller-supplied options (§6 "Options structure") and their normalization
//! into the absolute values [`crate::process::Process::start`] needs.
//!
//! Mirrors the teacher's [`crate::Command::build`] normalization step, but
//! expressed as plain data rather than hidden behind a builder so that
//! [`crate::Process::start`] itself can own the normalization (the teacher's
//! `Command` is kept as sugar on top, see `command.rs`).

use crate::redirect::Redirect;
use std::{ffi::OsString, path::PathBuf, time::Duration};

/// One step of the three-stage [`Stop`] escalation (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    /// Skip to the next action unconditionally.
    Noop,
    /// Send no signal, then wait.
    Wait,
    /// Cooperative shutdown signal (`SIGTERM` / `CTRL_BREAK_EVENT`), then
    /// wait.
    Terminate,
    /// Unconditional termination (`SIGKILL` / `TerminateProcess`), then
    /// wait.
    Kill,
}

/// A single stage: an action paired with how long to wait for it.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub action: StopAction,
    pub timeout: Timeout,
}

impl Stage {
    pub fn new(action: StopAction, timeout: Timeout) -> Self {
        Stage { action, timeout }
    }
}

/// The three-stage escalation sequence invoked by [`crate::Process::stop`]
/// and, implicitly, by [`crate::Process::destroy`] if the process is still
/// running.
#[derive(Debug, Clone, Copy)]
pub struct Stop(pub [Stage; 3]);

impl Default for Stop {
    /// `wait(Infinite)` only — never escalates. Mirrors the conservative
    /// default of doing nothing destructive unless the caller opts in.
    fn default() -> Self {
        Stop([
            Stage::new(StopAction::Wait, Timeout::Infinite),
            Stage::new(StopAction::Noop, Timeout::Duration(Duration::ZERO)),
            Stage::new(StopAction::Noop, Timeout::Duration(Duration::ZERO)),
        ])
    }
}

/// A bound on a single blocking call (§6 constants: `INFINITE = -1`,
/// `DEADLINE = -2`).
///
/// Distinct from [`Deadline`]: a timeout is per-call and reported as the
/// `TimedOut` *error*; a deadline is per-process and reported as the
/// `DEADLINE` *event* (§9 "Deadlines vs. timeouts"). `Timeout::Deadline` is
/// the one explicit bridge between the two: it tells `wait` to substitute
/// `time_until(deadline)` as this call's own timeout (§4.4 "Wait(timeout)"),
/// clamped to zero past the deadline, rather than letting every `wait` call
/// silently race the process's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Duration(Duration),
    Infinite,
    Deadline,
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Duration(d)
    }
}

/// An absolute point in time after which a process is considered overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    At(std::time::Instant),
    Infinite,
}

impl Deadline {
    /// Time remaining until this deadline, clamped to zero if already past,
    /// or `None` if the deadline is `Infinite`.
    pub fn remaining(self) -> Option<Duration> {
        match self {
            Deadline::At(instant) => Some(instant.saturating_duration_since(std::time::Instant::now())),
            Deadline::Infinite => None,
        }
    }

    pub fn is_expired(self) -> bool {
        matches!(self, Deadline::At(at) if at <= std::time::Instant::now())
    }
}

/// Redirections for all three standard streams (§4.2).
#[derive(Debug, Clone, Default)]
pub struct Stdio {
    pub stdin: Redirect,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

/// Options recognized by [`crate::Process::start`] (§6).
#[derive(Debug, Clone)]
pub struct Options {
    /// Replaces the child's environment. `None` inherits the parent's.
    pub environment: Option<Vec<(OsString, OsString)>>,
    /// chdir target in the child before exec. `None` inherits the parent's.
    pub working_directory: Option<PathBuf>,
    pub redirect: Stdio,
    /// Child pipes default to non-blocking mode.
    pub nonblocking: bool,
    /// Bytes written to stdin before exec completes; stdin is closed
    /// afterward (§4.4 step 5).
    pub input: Option<Vec<u8>>,
    /// Stages used implicitly by `destroy` if still running.
    pub stop: Stop,
    /// Relative bound, converted to an absolute `deadline` at `start` time.
    pub timeout: Option<Duration>,
    /// Absolute alternative to `timeout`. If both are set, `deadline` wins.
    pub deadline: Option<std::time::Instant>,
}

impl Default for Options {
    /// Matches §6's options table: child pipes default to non-blocking
    /// mode, everything else is inherited from the parent or left unset.
    fn default() -> Self {
        Options {
            environment: None,
            working_directory: None,
            redirect: Stdio::default(),
            nonblocking: true,
            input: None,
            stop: Stop::default(),
            timeout: None,
            deadline: None,
        }
    }
}

impl Options {
    /// Resolve `timeout`/`deadline` into a single absolute [`Deadline`],
    /// per §4.4 step 7 ("convert an optional relative timeout option into
    /// an absolute deadline").
    pub(crate) fn resolve_deadline(&self, now: std::time::Instant) -> Deadline {
        if let Some(at) = self.deadline {
            Deadline::At(at)
        } else if let Some(timeout) = self.timeout {
            Deadline::At(now + timeout)
        } else {
            Deadline::Infinite
        }
    }
}

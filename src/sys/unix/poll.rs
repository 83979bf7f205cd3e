//! Raw Unix multiplex primitive: a thin, typed wrapper around `poll(2)`
//! (§9 "On Unix, it is a `poll`/`ppoll` over file descriptors").

use crate::{error::Result, handle::Handle};
use std::time::Duration;

/// Which direction of readiness a single watch entry cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    Readable,
    Writable,
}

/// One fd to watch, carrying back an opaque caller-assigned index so the
/// portable `poll` module (`crate::poll`) can map results back to
/// `(source, stream)` without this module knowing about either.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub handle: Handle,
    pub watch: Watch,
}

pub enum Outcome {
    /// `ready[i]` is true iff `targets[i]` was signalled.
    Ready(Vec<bool>),
    TimedOut,
}

/// Waits for any of `targets` to become ready, or `horizon` to elapse.
/// `horizon = None` blocks indefinitely.
pub fn wait_any(targets: &[Target], horizon: Option<Duration>) -> Result<Outcome> {
    let mut pollfds: Vec<libc::pollfd> = targets
        .iter()
        .map(|t| libc::pollfd {
            fd: t.handle.raw(),
            events: match t.watch {
                Watch::Readable => libc::POLLIN,
                Watch::Writable => libc::POLLOUT,
            },
            revents: 0,
        })
        .collect();

    let timeout_ms: libc::c_int = match horizon {
        None => -1,
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    };

    let ret = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms) };
    if ret < 0 {
        let err = nix::Error::Sys(nix::errno::Errno::last());
        if err.as_errno() == Some(nix::errno::Errno::EINTR) {
            // Treat a signal interruption as a spurious empty wakeup; the
            // portable layer will simply be called again by the caller's
            // loop semantics if it cares. Here we report it as a timeout
            // of zero duration elapsed, letting callers re-poll.
            return Ok(Outcome::TimedOut);
        }
        return Err(err.into());
    }
    if ret == 0 {
        return Ok(Outcome::TimedOut);
    }

    let ready = pollfds
        .iter()
        .map(|pfd| pfd.revents & (libc::POLLIN | libc::POLLOUT | libc::POLLHUP | libc::POLLERR) != 0)
        .collect();
    Ok(Outcome::Ready(ready))
}

//! The pipe multiplexer (§4.3): `poll(sources, timeout)` over a
//! heterogeneous set of child streams across multiple processes.

use crate::{
    error::{Error, Result},
    options::{Deadline, Timeout},
    process::Process,
    redirect::Stream,
    sys,
};
use bitflags::bitflags;

bitflags! {
    /// Bitmask of streams a caller is interested in for one [`EventSource`].
    pub struct Interest: u8 {
        const IN   = 0b0001;
        const OUT  = 0b0010;
        const ERR  = 0b0100;
        const EXIT = 0b1000;
    }
}

bitflags! {
    /// Readiness bitmask reported back on one [`EventSource`], plus the
    /// synthetic `DEADLINE` bit that has no corresponding `Interest`.
    pub struct Event: u8 {
        const IN       = 0b00001;
        const OUT      = 0b00010;
        const ERR      = 0b00100;
        const EXIT     = 0b01000;
        const DEADLINE = 0b10000;
    }
}

/// One caller-supplied tuple `{process, interests, events}` (§3 "Event
/// source").
pub struct EventSource<'a> {
    pub process: &'a mut Process,
    pub interests: Interest,
    pub events: Event,
}

impl<'a> EventSource<'a> {
    pub fn new(process: &'a mut Process, interests: Interest) -> Self {
        EventSource {
            process,
            interests,
            events: Event::empty(),
        }
    }
}

fn stream_interest(stream: Stream) -> Interest {
    match stream {
        Stream::In => Interest::IN,
        Stream::Out => Interest::OUT,
        Stream::Err => Interest::ERR,
    }
}

fn stream_event(stream: Stream) -> Event {
    match stream {
        Stream::In => Event::IN,
        Stream::Out => Event::OUT,
        Stream::Err => Event::ERR,
    }
}

fn stream_watch(stream: Stream) -> sys::poll::Watch {
    match stream {
        Stream::In => sys::poll::Watch::Writable,
        Stream::Out | Stream::Err => sys::poll::Watch::Readable,
    }
}

/// `wait_any({interests}, timeout)` over a set of pipe-sets across
/// processes; fills in each source's `events` and returns `Ok(())`, or
/// fails with [`Error::TimedOut`] / [`Error::BrokenPipe`] (§4.3).
pub fn poll(sources: &mut [EventSource], timeout: Timeout) -> Result<()> {
    for source in sources.iter_mut() {
        source.events = Event::empty();
    }

    // Step 1: earliest deadline, short-circuit if already expired.
    let earliest = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| s.process.deadline() != Deadline::Infinite)
        .min_by_key(|(_, s)| match s.process.deadline() {
            Deadline::At(at) => at,
            Deadline::Infinite => unreachable!(),
        });

    if let Some((idx, _)) = earliest {
        if sources[idx].process.deadline().is_expired() {
            sources[idx].events = Event::DEADLINE;
            return Ok(());
        }
    }

    // Step 2: effective horizon. `Timeout::Deadline` is a `wait`-only
    // sentinel (§4.4) substituting a single process's own deadline; `poll`
    // already folds every source's deadline in separately above, so it is
    // treated like no caller-supplied bound here.
    let caller_horizon = match timeout {
        Timeout::Infinite | Timeout::Deadline => None,
        Timeout::Duration(d) => Some(d),
    };
    let deadline_horizon = earliest
        .as_ref()
        .and_then(|&(i, _)| sources[i].process.deadline().remaining());
    let horizon = match (caller_horizon, deadline_horizon) {
        (Some(c), Some(d)) => Some(c.min(d)),
        (Some(c), None) => Some(c),
        (None, Some(d)) => Some(d),
        (None, None) => None,
    };
    let horizon_is_deadline = match (caller_horizon, deadline_horizon) {
        (Some(c), Some(d)) => d <= c,
        (None, Some(_)) => true,
        _ => false,
    };

    // Step 3/4: assemble the platform readiness set.
    let mut targets = Vec::new();
    // (source index, stream-or-exit) for each target, parallel to `targets`.
    let mut owners: Vec<(usize, Option<Stream>)> = Vec::new();

    for (idx, source) in sources.iter().enumerate() {
        for stream in [Stream::In, Stream::Out, Stream::Err] {
            if source.interests.contains(stream_interest(stream)) {
                if let Some(pipe) = source.process.pipe_for(stream) {
                    targets.push(sys::poll::Target {
                        handle: pipe.handle(),
                        watch: stream_watch(stream),
                    });
                    owners.push((idx, Some(stream)));
                }
            }
        }
        if source.interests.contains(Interest::EXIT) {
            if let Some(pipe) = source.process.exit_pipe() {
                targets.push(sys::poll::Target {
                    handle: pipe.handle(),
                    watch: sys::poll::Watch::Readable,
                });
                owners.push((idx, None));
            }
        }
    }

    if targets.is_empty() {
        return Err(Error::BrokenPipe);
    }

    // Step 5: wait.
    match sys::poll::wait_any(&targets, horizon)? {
        sys::poll::Outcome::Ready(ready) => {
            for (i, is_ready) in ready.into_iter().enumerate() {
                if !is_ready {
                    continue;
                }
                let (idx, stream) = owners[i];
                sources[idx].events |= match stream {
                    Some(s) => stream_event(s),
                    None => Event::EXIT,
                };
            }
            Ok(())
        }
        sys::poll::Outcome::TimedOut => {
            if horizon_is_deadline {
                if let Some((idx, _)) = earliest {
                    sources[idx].events = Event::DEADLINE;
                    return Ok(());
                }
            }
            Err(Error::TimedOut)
        }
    }
}

//! The literal end-to-end scenarios and the invariants/boundary properties.

mod common;

use reproc::{poll, Command, Error, Event, EventSource, Interest, Process, Redirect, Stage, StopAction, Stream, Timeout};
use std::time::Duration;

const PAYLOAD: &[u8] = b"reproc stands for REdirected PROCess";

/// Scenario 1: echo-to-stdout round trip.
#[test]
fn scenario_echo_stdout() {
    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(PAYLOAD)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let out = common::read_to_end(&mut process, Stream::Out, Duration::from_secs(5)).unwrap();
    assert_eq!(out, PAYLOAD);
    assert_eq!(process.wait(Timeout::Infinite).unwrap(), 0);
}

/// Scenario 2: same payload, routed to stderr.
#[test]
fn scenario_echo_stderr() {
    let mut process = Command::new(common::echo())
        .arg("stderr")
        .input(PAYLOAD)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Pipe)
        .spawn()
        .expect("spawn failed");

    let err = common::read_to_end(&mut process, Stream::Err, Duration::from_secs(5)).unwrap();
    assert_eq!(err, PAYLOAD);
    assert_eq!(process.wait(Timeout::Infinite).unwrap(), 0);
}

/// Scenario 3: both mode, drained separately, each stream carries the
/// payload once (merged draining of the same payload twice is covered in
/// `redirect.rs`'s stdout/stderr merge test).
#[test]
fn scenario_echo_both() {
    let mut process = Command::new(common::echo())
        .arg("both")
        .input(PAYLOAD)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Pipe)
        .spawn()
        .expect("spawn failed");

    let out = common::read_to_end(&mut process, Stream::Out, Duration::from_secs(5)).unwrap();
    let err = common::read_to_end(&mut process, Stream::Err, Duration::from_secs(5)).unwrap();
    assert_eq!(out, PAYLOAD);
    assert_eq!(err, PAYLOAD);
    assert_eq!(process.wait(Timeout::Infinite).unwrap(), 0);
}

/// Scenario 4: a child that never writes to stdout times out on read, then
/// exits once stdin is closed, after which the next read observes the now-
/// closed pipe.
#[test]
fn scenario_stdout_sleeper_read_timeout_then_close() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut buf = [0u8; 16];
    assert!(matches!(process.read(Stream::Out, &mut buf), Err(Error::TimedOut)));

    process.close(Stream::In).unwrap();
    assert_eq!(process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap(), 0);

    // The library destroys a stream's pipe the moment it observes
    // BrokenPipe; since the child has already exited stdout is closed too.
    assert!(matches!(process.read(Stream::Out, &mut buf), Err(Error::BrokenPipe)));
}

/// Scenario 5: an expired deadline reports as a `DEADLINE` event on `poll`
/// without performing any further I/O wait.
#[test]
fn scenario_deadline_reported_by_poll() {
    let mut options = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .build();
    options.timeout = Some(Duration::from_millis(100));

    let mut process = Process::new();
    process
        .start(common::sleeper(), &[], options)
        .expect("start failed");

    std::thread::sleep(Duration::from_millis(150));

    let mut sources = [EventSource::new(&mut process, Interest::OUT)];
    poll(&mut sources, Timeout::Infinite).expect("poll failed");
    assert_eq!(sources[0].events, Event::DEADLINE);

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

/// Scenario 6: a child that ignores the cooperative shutdown signal is
/// escalated all the way to `Kill`.
#[test]
fn scenario_stop_escalates_to_kill() {
    let mut process = Command::new(common::ignores_terminate())
        .stdin(Redirect::Discard)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let code = process
        .stop_sequence([
            Stage::new(StopAction::Terminate, Duration::from_millis(50).into()),
            Stage::new(StopAction::Kill, Duration::from_millis(50).into()),
            Stage::new(StopAction::Noop, Duration::ZERO.into()),
        ])
        .expect("stop sequence failed");

    #[cfg(unix)]
    assert_eq!(code, 128 + 9);
}

#[test]
fn close_makes_the_stream_permanently_broken() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    process.close(Stream::In).unwrap();
    assert!(matches!(process.write(b"x"), Err(Error::BrokenPipe)));
    // Idempotence of the closed state: a repeated operation on the same
    // stream keeps reporting BrokenPipe rather than reusing a stale handle.
    assert!(matches!(process.write(b"x"), Err(Error::BrokenPipe)));

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

#[test]
fn terminate_and_kill_on_an_exited_process_are_harmless() {
    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(&b""[..])
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let code = process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
    process.terminate().unwrap();
    process.kill().unwrap();
    assert_eq!(process.wait(Timeout::Infinite).unwrap(), code);
}

#[test]
fn write_of_zero_bytes_is_always_a_no_op_success() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    assert_eq!(process.write(&[]).unwrap(), 0);

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

#[test]
fn poll_with_no_valid_pipes_is_a_broken_pipe_error() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Discard)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    // None of the three standard streams were redirected to a pipe, so
    // interest in all of them still resolves to an empty target set.
    let mut sources = [EventSource::new(&mut process, Interest::IN | Interest::OUT | Interest::ERR)];
    assert!(matches!(poll(&mut sources, Timeout::Infinite), Err(Error::BrokenPipe)));

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

#[test]
fn poll_with_zero_timeout_and_nothing_ready_times_out() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut sources = [EventSource::new(&mut process, Interest::OUT)];
    let result = poll(&mut sources, Timeout::Duration(Duration::ZERO));
    assert!(matches!(result, Err(Error::TimedOut)));

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

#[cfg(unix)]
#[test]
fn destroy_leaves_no_handles_open_at_the_os_level() {
    fn fd_count() -> usize {
        std::fs::read_dir("/proc/self/fd").unwrap().count()
    }

    let before = fd_count();
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Pipe)
        .spawn()
        .expect("spawn failed");
    assert!(fd_count() > before);

    // `sleeper` only exits on stdin EOF; close it first so `destroy`'s
    // default `Wait(Infinite)` stop stage resolves instead of blocking
    // forever (its stop sequence sends no signal of its own).
    process.close(Stream::In).unwrap();
    process.destroy();
    assert_eq!(fd_count(), before);
}

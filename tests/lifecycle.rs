//! Exercises the `Process` state machine directly: start preconditions,
//! read/write argument validation, and idempotent destroy.

mod common;

use reproc::{Command, Error, Process, Redirect, Status, Stream, Timeout};
use std::time::Duration;

#[test]
fn fresh_process_is_not_started() {
    let process = Process::new();
    assert_eq!(process.status(), Status::NotStarted);
}

#[test]
fn echo_roundtrips_stdout() {
    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(&b"hello reproc"[..])
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    assert_eq!(process.status(), Status::InProgress);

    let out = common::read_to_end(&mut process, Stream::Out, Duration::from_secs(5)).unwrap();
    assert_eq!(out, b"hello reproc");

    let code = process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
    assert_eq!(code, 0);
    assert_eq!(process.status(), Status::Exited(0));
}

#[test]
fn read_on_stdin_is_invalid_argument() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut buf = [0u8; 1];
    assert!(matches!(process.read(Stream::In, &mut buf), Err(Error::InvalidArgument)));

    process.kill().unwrap();
    process.wait(Timeout::Infinite).unwrap();
}

#[test]
fn write_is_noop_success_on_empty_buffer() {
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
fn destroy_is_idempotent_and_reaps_a_running_child() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    // `sleeper` only exits once it observes EOF on stdin; close it first so
    // `destroy`'s default `Wait(Infinite)` stop stage resolves instead of
    // blocking forever (its stop sequence sends no signal of its own).
    process.close(Stream::In).unwrap();

    // destroy() takes ownership; dropping it a second time (implicitly, via
    // Drop on whatever remains in scope) must not panic or double-free.
    process.destroy();
}

#[test]
fn wait_after_exit_returns_the_cached_code() {
    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(&b""[..])
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let first = process.wait(Timeout::Infinite).unwrap();
    let second = process.wait(Timeout::Infinite).unwrap();
    assert_eq!(first, second);
}

//! Exercises `poll`/`EventSource` multiplexing across more than one
//! process at once.

mod common;

use reproc::{poll, Command, Event, EventSource, Interest, Redirect, Timeout};
use std::time::Duration;

#[test]
fn poll_reports_exit_for_a_finished_process_and_nothing_for_a_running_one() {
    let mut finished = Command::new(common::echo())
        .arg("stdout")
        .input(&b""[..])
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");
    // Give the short-lived child a moment to actually exit before polling.
    finished.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();

    let mut running = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    // `finished` already reaped its exit code via `wait`, so it has no exit
    // pipe left to poll; only assert on the still-running process here.
    let mut sources = [EventSource::new(&mut running, Interest::OUT)];
    let err = poll(&mut sources, Timeout::Duration(Duration::from_millis(100)));
    assert!(matches!(err, Err(reproc::Error::TimedOut)));

    running.kill().unwrap();
    running.wait(Timeout::Infinite).unwrap();
}

#[test]
fn poll_wakes_as_soon_as_any_one_child_exits() {
    let mut slow = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut fast = Command::new(common::echo())
        .arg("stdout")
        .input(&b""[..])
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut sources = [
        EventSource::new(&mut slow, Interest::EXIT),
        EventSource::new(&mut fast, Interest::EXIT),
    ];
    poll(&mut sources, Timeout::Duration(Duration::from_secs(5))).expect("poll failed");

    assert!(sources[0].events.is_empty());
    assert!(sources[1].events.contains(Event::EXIT));

    slow.kill().unwrap();
    slow.wait(Timeout::Infinite).unwrap();
    fast.wait(Timeout::Infinite).unwrap();
}

#[test]
fn poll_reports_writable_stdin_immediately() {
    let mut running = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let mut sources = [EventSource::new(&mut running, Interest::IN)];
    poll(&mut sources, Timeout::Duration(Duration::from_secs(5))).expect("poll failed");
    assert!(sources[0].events.contains(Event::IN));

    running.kill().unwrap();
    running.wait(Timeout::Infinite).unwrap();
}

//! Exercises the three-stage stop escalation: a cooperative child that
//! exits on its own, and one that ignores the cooperative signal and must
//! be escalated all the way to `Kill`.

mod common;

use reproc::{Command, Redirect, Stage, Stop, StopAction, Timeout};
use std::time::Duration;

#[test]
fn closing_stdin_lets_a_cooperative_child_exit() {
    let mut process = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    process.write(b"not read").unwrap();

    // `sleeper` never writes to stdout, so a short read times out.
    let mut buf = [0u8; 1];
    assert!(matches!(process.read(reproc::Stream::Out, &mut buf), Err(reproc::Error::TimedOut)));

    // ...but closing stdin makes it observe EOF and exit on its own.
    process.close(reproc::Stream::In).unwrap();
    let code = process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
    assert_eq!(code, 0);
}

#[test]
fn stop_escalates_past_an_ignored_terminate_to_kill() {
    let mut process = Command::new(common::ignores_terminate())
        .stdin(Redirect::Discard)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let stages = [
        Stage::new(StopAction::Terminate, Duration::from_millis(200).into()),
        Stage::new(StopAction::Kill, Duration::from_secs(5).into()),
        Stage::new(StopAction::Noop, Duration::ZERO.into()),
    ];
    let code = process.stop_sequence(stages).expect("stop sequence failed");

    #[cfg(unix)]
    assert_eq!(code, 128 + libc::SIGKILL as u32);
    #[cfg(windows)]
    assert_eq!(code, 1);
}

#[test]
fn stop_uses_the_process_configured_sequence() {
    let mut options = Command::new(common::sleeper())
        .stdin(Redirect::Pipe)
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .build();
    options.stop = Stop([
        Stage::new(StopAction::Kill, Duration::from_secs(5).into()),
        Stage::new(StopAction::Noop, Duration::ZERO.into()),
        Stage::new(StopAction::Noop, Duration::ZERO.into()),
    ]);

    let mut process = reproc::Process::new();
    process
        .start(common::sleeper(), &[], options)
        .expect("start failed");

    // `destroy` falls back to `stop()`, which now kills immediately instead
    // of waiting forever like the default sequence would.
    process.destroy();
}

#[test]
fn default_stop_sequence_never_escalates() {
    let stop = Stop::default();
    assert_eq!(stop.0[0].action, StopAction::Wait);
    assert_eq!(stop.0[1].action, StopAction::Noop);
    assert_eq!(stop.0[2].action, StopAction::Noop);
}

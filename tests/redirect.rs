//! Exercises each `Redirect` variant, including the stdout/stderr merge
//! recipe (`Redirect::Parent(Stream::Out)`).

mod common;

use reproc::{Command, Redirect, Status, Stream, Timeout};
use std::time::Duration;

#[test]
fn discard_leaves_stream_unreadable() {
    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(&b"ignored"[..])
        .stdout(Redirect::Discard)
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let code = process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
    assert_eq!(code, 0);
}

#[test]
fn stderr_can_be_merged_into_the_stdout_pipe() {
    let mut process = Command::new(common::echo())
        .arg("both")
        .input(&b"merged"[..])
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Parent(Stream::Out))
        .spawn()
        .expect("spawn failed");

    let out = common::read_to_end(&mut process, Stream::Out, Duration::from_secs(5)).unwrap();
    // `echo both` writes the payload to stdout then stderr; merged onto one
    // pipe, the reader sees it twice.
    assert_eq!(out, b"mergedmerged");

    process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
}

#[test]
fn separate_pipes_keep_stdout_and_stderr_independent() {
    let mut process = Command::new(common::echo())
        .arg("both")
        .input(&b"xy"[..])
        .stdout(Redirect::Pipe)
        .stderr(Redirect::Pipe)
        .spawn()
        .expect("spawn failed");

    let out = common::read_to_end(&mut process, Stream::Out, Duration::from_secs(5)).unwrap();
    let err = common::read_to_end(&mut process, Stream::Err, Duration::from_secs(5)).unwrap();
    assert_eq!(out, b"xy");
    assert_eq!(err, b"xy");

    process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
}

#[test]
fn handle_redirect_accepts_a_caller_supplied_handle() {
    // A file opened by the caller can be handed straight through as the
    // child's stdout without the library allocating its own pipe for it.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let file = std::fs::File::create(&path).unwrap();

    #[cfg(unix)]
    let handle = {
        use std::os::unix::io::IntoRawFd;
        reproc::Handle::from_raw(file.into_raw_fd())
    };
    #[cfg(windows)]
    let handle = {
        use std::os::windows::io::IntoRawHandle;
        reproc::Handle::from_raw(file.into_raw_handle())
    };

    let mut process = Command::new(common::echo())
        .arg("stdout")
        .input(&b"to a file"[..])
        .stdout(Redirect::Handle(handle))
        .stderr(Redirect::Discard)
        .spawn()
        .expect("spawn failed");

    let code = process.wait(Timeout::Duration(Duration::from_secs(5))).unwrap();
    assert_eq!(code, 0);
    assert_eq!(process.status(), Status::Exited(0));

    let contents = std::fs::read(&path).unwrap();
    assert_eq!(contents, b"to a file");
}

//! Shared helpers for the integration tests: locating the fixture binaries
//! built by `reproc-test-fixtures` and a couple of small polling idioms the
//! tests repeat.

use reproc::{Process, Result, Stream};
use std::time::{Duration, Instant};

pub fn echo() -> &'static str {
    env!("CARGO_BIN_EXE_echo")
}

pub fn sleeper() -> &'static str {
    env!("CARGO_BIN_EXE_sleeper")
}

pub fn ignores_terminate() -> &'static str {
    env!("CARGO_BIN_EXE_ignores_terminate")
}

/// Reads `stream` until EOF (`BrokenPipe`) or `deadline`, accumulating
/// whatever bytes arrived in between. Tests use this instead of a single
/// `read` call since a child's write can legitimately be split across more
/// than one pipe message.
pub fn read_to_end(process: &mut Process, stream: Stream, deadline: Duration) -> Result<Vec<u8>> {
    let start = Instant::now();
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let remaining = deadline.saturating_sub(start.elapsed());
        match process.read(stream, &mut buf) {
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(reproc::Error::BrokenPipe) => return Ok(out),
            Err(reproc::Error::TimedOut) if remaining > Duration::ZERO => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => return Err(e),
        }
    }
}

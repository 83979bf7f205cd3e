//! Platform backends. Every module here exposes the same narrow surface to
//! the portable core (`pipe`, `process`, `poll`); the core never leaks
//! `libc`/`nix` or `winapi` vocabulary past this boundary (§9 "Multiplex
//! portability").

#[cfg(unix)]
pub mod unix;
#[cfg(unix)]
pub use unix as imp;

#[cfg(windows)]
pub mod windows;
#[cfg(windows)]
pub use self::windows as imp;

pub use imp::{init, pipe, poll, process};

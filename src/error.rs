//! The closed error taxonomy surfaced by every fallible operation in this
//! crate (§4.7 / §7 of the design).

/// Errors reported by this crate.
///
/// Exit codes are *not* represented here: a child's exit code, including the
/// `128 + signal` convention for a signalled exit, is an ordinary `u32`
/// returned from [`crate::Process::wait`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A precondition was violated by the caller: a null buffer where one
    /// was required, a call made in the wrong [`crate::Status`], an unknown
    /// stream selector.
    #[error("invalid argument")]
    InvalidArgument,
    /// Allocation failure while preparing a command line, environment block
    /// or I/O buffer.
    #[error("out of memory")]
    OutOfMemory,
    /// The peer end of a pipe is closed; no further I/O is possible on it.
    /// The affected pipe has already been destroyed by the time this is
    /// returned (invariant 5).
    #[error("broken pipe")]
    BrokenPipe,
    /// A blocking operation did not complete within its timeout. Process
    /// state is left exactly as it was before the call.
    #[error("timed out")]
    TimedOut,
    /// A platform-specific error, surfaced with its raw code and resolvable
    /// message via [`strerror`].
    #[error("system error {code}: {message}")]
    Other { code: i32, message: String },
}

impl Error {
    /// True for errors that represent a real fault as opposed to a
    /// structural condition (`BrokenPipe`, `TimedOut`) that is part of the
    /// ordinary control flow.
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::OutOfMemory | Error::Other { .. })
    }
}

#[cfg(unix)]
impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        match err.as_errno() {
            Some(nix::errno::Errno::EPIPE) => Error::BrokenPipe,
            Some(nix::errno::Errno::EAGAIN) => Error::TimedOut,
            Some(nix::errno::Errno::ENOMEM) => Error::OutOfMemory,
            Some(errno) => Error::Other {
                code: errno as i32,
                message: errno.desc().to_string(),
            },
            None => Error::Other {
                code: -1,
                message: err.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::BrokenPipe => Error::BrokenPipe,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Error::TimedOut,
            ErrorKind::OutOfMemory => Error::OutOfMemory,
            _ => {
                let code = err.raw_os_error().unwrap_or(-1);
                Error::Other {
                    code,
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns a human-readable message for a raw platform error code, the way
/// `errno`'s `strerror` does on Unix and `FormatMessageW` does on Windows.
///
/// This is the one piece of the error story the distilled spec explicitly
/// scopes out ("the string-error lookup table"); it is kept here only as a
/// thin wrapper since `Error::Other` already carries a resolved message and
/// callers otherwise have no way to turn a bare code back into text.
pub fn strerror(code: i32) -> String {
    #[cfg(unix)]
    {
        errno::Errno(code).to_string()
    }
    #[cfg(windows)]
    {
        crate::sys::windows::error::format_message(code as u32)
    }
    #[cfg(not(any(unix, windows)))]
    {
        format!("error {}", code)
    }
}

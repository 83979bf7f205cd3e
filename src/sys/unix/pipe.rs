//! Unix pipe primitives (§4.1), grounded in the teacher's
//! `linux/pipe.rs` (`pipe2`, raw `read`/`write`) generalized to return
//! portable [`Handle`]s and [`Error`]s instead of panicking on every
//! syscall failure.

use crate::{
    error::{Error, Result},
    handle::Handle,
    redirect::Stream,
};
use nix::{
    fcntl::{fcntl, FcntlArg, OFlag},
    unistd,
};
use std::os::unix::io::RawFd;

fn raw(h: Handle) -> RawFd {
    h.raw()
}

/// Creates a `pipe2(O_CLOEXEC)` pair. `O_CLOEXEC` is cleared on the child
/// end right before launch (see `sys::unix::process::spawn`) so that only
/// the intended fd survives into the child; every other fd the parent
/// happens to hold stays close-on-exec, matching invariant 2 ("`pipe.exit`
/// valid") without requiring an explicit fd-closing sweep.
pub fn init() -> Result<(Handle, Handle)> {
    let (read_fd, write_fd) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
    Ok((Handle::from_raw(read_fd), Handle::from_raw(write_fd)))
}

pub fn set_nonblocking(h: Handle, flag: bool) -> Result<()> {
    let current = fcntl(raw(h), FcntlArg::F_GETFL)?;
    let mut flags = OFlag::from_bits_truncate(current);
    flags.set(OFlag::O_NONBLOCK, flag);
    fcntl(raw(h), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

pub fn read(h: Handle, buf: &mut [u8]) -> Result<usize> {
    match unistd::read(raw(h), buf) {
        Ok(0) if !buf.is_empty() => Err(Error::BrokenPipe),
        Ok(n) => Ok(n),
        Err(nix::Error::Sys(nix::errno::Errno::EAGAIN)) => Err(Error::TimedOut),
        Err(e) => Err(e.into()),
    }
}

pub fn write(h: Handle, buf: &[u8]) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    match unistd::write(raw(h), buf) {
        Ok(n) => Ok(n),
        Err(nix::Error::Sys(nix::errno::Errno::EPIPE)) => Err(Error::BrokenPipe),
        Err(nix::Error::Sys(nix::errno::Errno::EAGAIN)) => Err(Error::TimedOut),
        Err(e) => Err(e.into()),
    }
}

pub fn close(h: Handle) {
    if h.is_valid() {
        let _ = unistd::close(raw(h));
    }
}

/// Duplicates fd 0/1/2 (the parent's own standard stream), for `Redirect::Parent`
/// and for the merge recipe used by stderr (§4.2).
pub fn duplicate_stdio(stream: Stream) -> Result<Handle> {
    let fd = match stream {
        Stream::In => libc::STDIN_FILENO,
        Stream::Out => libc::STDOUT_FILENO,
        Stream::Err => libc::STDERR_FILENO,
    };
    let dup = unistd::dup(fd)?;
    Ok(Handle::from_raw(dup))
}

/// Duplicates an arbitrary already-valid handle, used for the
/// `Redirect::Parent(Stream::Out)` stderr-merge recipe where the "parent"
/// being referred to is the stdout pipe's child end just created for this
/// same child, not the grandparent's stdio.
pub fn duplicate(h: Handle) -> Result<Handle> {
    let dup = unistd::dup(raw(h))?;
    Ok(Handle::from_raw(dup))
}

/// Opens `/dev/null` for the direction implied by `stream` (read for stdin,
/// write for stdout/stderr), used by `Redirect::Discard`.
pub fn null_device(stream: Stream) -> Result<Handle> {
    use nix::fcntl::open;
    use nix::sys::stat::Mode;
    let oflag = match stream {
        Stream::In => OFlag::O_RDONLY,
        Stream::Out | Stream::Err => OFlag::O_WRONLY,
    };
    let fd = open("/dev/null", oflag, Mode::empty())?;
    Ok(Handle::from_raw(fd))
}

/// Marks `h` to survive `exec` (clears `FD_CLOEXEC`). Applied to the
/// child-side of every redirected stream right before `spawn`.
pub fn allow_inherit(h: Handle) -> Result<()> {
    fcntl(raw(h), FcntlArg::F_SETFD(nix::fcntl::FdFlag::empty()))?;
    Ok(())
}

//! Pipe primitive (§4.1): a [`Handle`] specialized for byte streams, always
//! unidirectional from the library's point of view.

use crate::{error::Result, handle::Handle, sys};

/// A parent-owned end of a pipe created for a redirected child stream, or
/// the exit-signal pipe.
///
/// `Pipe` owns its handle: dropping it closes the underlying descriptor,
/// matching invariant 5 ("a stdio pipe, once destroyed, stays invalid until
/// the process is destroyed") — [`crate::Process`] keeps pipes as
/// `Option<Pipe>` and takes them out (setting the field to `None`, the
/// struct-level analogue of `Handle::INVALID`) exactly at the points §4.4
/// calls for destruction.
#[derive(Debug)]
pub struct Pipe {
    handle: Handle,
}

impl Pipe {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Pipe { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Switches to non-blocking I/O mode. Used during setup-input writes
    /// that might exceed kernel buffer capacity (§4.1 rationale), and
    /// whenever [`crate::Options::nonblocking`] is set.
    pub fn set_nonblocking(&self, flag: bool) -> Result<()> {
        sys::pipe::set_nonblocking(self.handle, flag)
    }

    /// Reads up to `buf.len()` bytes. Returns `Ok(0)` only when `buf` is
    /// empty; a closed peer is reported as [`crate::Error::BrokenPipe`]
    /// rather than `Ok(0)`, since the library's pipes are never used to
    /// signal EOF through a zero-length read (§4.1).
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        sys::pipe::read(self.handle, buf)
    }

    /// Writes up to `buf.len()` bytes, possibly fewer (a short write).
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        sys::pipe::write(self.handle, buf)
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        if self.handle.is_valid() {
            sys::pipe::close(self.handle);
        }
    }
}

/// Creates a connected parent/child pipe pair (§4.1 `pipe_init`). The
/// returned `child` end is meant to be duplicated into the launched process
/// and then closed in the parent immediately afterward; the returned
/// `parent` end is what callers keep.
pub(crate) fn init() -> Result<(Pipe, Handle)> {
    let (parent, child) = sys::pipe::init()?;
    Ok((Pipe::from_handle(parent), child))
}

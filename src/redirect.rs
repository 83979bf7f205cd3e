//! Redirect policy (§4.2): for each standard stream, produce a
//! (parent-side, child-side) handle pair.

use crate::handle::Handle;

/// Which of the three standard streams a [`Redirect`] is being resolved
/// for, needed because `DISCARD` and `PARENT` behave differently per
/// direction (stdin reads, stdout/stderr write) and because stderr has the
/// special `PARENT(Stream::Out)` merge recipe (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    In,
    Out,
    Err,
}

/// How to connect one of the child's standard streams.
#[derive(Debug, Clone)]
pub enum Redirect {
    /// Parent keeps a pipe to the child end; this is the only redirection
    /// that produces a valid parent-side handle.
    Pipe,
    /// Child end is the parent's own corresponding standard stream.
    Inherit,
    /// Child end is the null device for the stream's direction.
    Discard,
    /// Child end is a duplicate of the parent's stream `s`. Used on stderr
    /// with `s == Stream::Out` to merge stderr into the stdout pipe just
    /// created for this same child.
    Parent(Stream),
    /// Child end is the caller-supplied handle, which must not be reused
    /// afterward.
    Handle(Handle),
}

impl Default for Redirect {
    fn default() -> Self {
        Redirect::Inherit
    }
}

/// The parent/child handle pair produced by resolving one [`Redirect`].
///
/// `parent` is [`Handle::INVALID`] for every redirection except `Pipe`
/// (§4.2 table); `child` is always valid and is closed by the caller
/// immediately after the child has been launched.
pub(crate) struct Resolved {
    pub parent: Handle,
    pub child: Handle,
}

/// Bundles the three resolved redirections plus the owning pipe ends, ready
/// to be handed to the platform launcher. Builders live in
/// `sys::unix::process` / `sys::windows::process` since they need
/// platform-specific pipe/null-device primitives; this module only owns the
/// shared `Stream`/`Redirect` vocabulary and the stdout-merge recipe check.
pub(crate) fn wants_stdout_merge(stderr: &Redirect) -> bool {
    matches!(stderr, Redirect::Parent(Stream::Out))
}

/*!
 * A small, cross-platform library to spawn a child process, talk to it over
 * its standard streams, and stop it with a graceful escalation.
 *
 * The three pieces are:
 * - [`Process`]: lifecycle (`start`, `read`/`write`, `wait`, `terminate`,
 *   `kill`, `stop`, `destroy`).
 * - [`Redirect`] / [`Command`]: how a child's stdin/stdout/stderr are wired
 *   up, and a builder for the common case.
 * - [`poll`] / [`EventSource`]: a multiplexer that waits across many
 *   processes' streams (and process exit) at once.
 *
 * # Platform support
 * Unix backends are implemented directly atop `poll(2)` and `fork`/`exec`.
 * The Windows backend is implemented atop overlapped named pipes and
 * `WaitForMultipleObjects`; see `sys::windows` for the design.
 */

mod command;
mod error;
mod handle;
mod options;
mod pipe;
mod poll;
mod process;
mod redirect;
mod sys;

pub use command::Command;
pub use error::{strerror, Error, Result};
pub use handle::{Handle, Raw};
pub use options::{Deadline, Options, Stage, Stdio, Stop, StopAction, Timeout};
pub use pipe::Pipe;
pub use poll::{poll, Event, EventSource, Interest};
pub use process::{Process, Status};
pub use redirect::{Redirect, Stream};

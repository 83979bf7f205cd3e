//! Windows backend: named pipes, `CreateProcessW`, and a
//! `WaitForMultipleObjects`-based multiplexer (§4.3 "[EXPANDED]").

pub mod error;
pub mod init;
pub mod pipe;
pub mod poll;
pub mod process;

pub use init::init;

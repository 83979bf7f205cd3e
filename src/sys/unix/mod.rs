pub mod init;
pub mod pipe;
pub mod poll;
pub mod process;

pub use init::init;

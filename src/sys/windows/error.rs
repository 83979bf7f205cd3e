//! Win32 error code translation, grounded in the teacher's `windows/error.rs`
//! (`Error::last`, `Cvt`) but mapped onto this crate's closed [`crate::Error`]
//! taxonomy instead of a Windows-specific error type.

use crate::error::Error;
use std::ptr;
use winapi::{
    shared::winerror::{ERROR_BROKEN_PIPE, ERROR_NOT_ENOUGH_MEMORY, ERROR_NO_DATA, ERROR_OUTOFMEMORY},
    um::winbase::{FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS},
};

/// Translates a raw Win32 error code into this crate's error taxonomy.
pub(crate) fn from_code(code: u32) -> Error {
    match code {
        ERROR_BROKEN_PIPE | ERROR_NO_DATA => Error::BrokenPipe,
        ERROR_NOT_ENOUGH_MEMORY | ERROR_OUTOFMEMORY => Error::OutOfMemory,
        _ => Error::Other {
            code: code as i32,
            message: format_message(code),
        },
    }
}

pub(crate) fn last() -> Error {
    from_code(unsafe { winapi::um::errhandlingapi::GetLastError() })
}

/// The Windows counterpart of `errno`'s `strerror`, used by
/// [`crate::strerror`].
pub fn format_message(code: u32) -> String {
    let mut buf: [u16; 512] = [0; 512];
    let len = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            ptr::null(),
            code,
            0,
            buf.as_mut_ptr(),
            buf.len() as u32,
            ptr::null_mut(),
        )
    };
    if len == 0 {
        return format!("unknown error {}", code);
    }
    String::from_utf16_lossy(&buf[..len as usize])
        .trim_end()
        .to_string()
}

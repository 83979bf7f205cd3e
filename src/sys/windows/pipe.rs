//! Windows pipe primitives (§4.1), grounded in the teacher's
//! `windows/pipe.rs` (`CreatePipe`, `ReadFile`/`WriteFile`) but switched to
//! a uniquely-named, server-side-overlapped pipe (`CreateNamedPipeW` with
//! `FILE_FLAG_OVERLAPPED`) paired with a synchronous client handle — the
//! same split the standard library's own Windows backend uses, since a
//! plain `CreatePipe` pair gives no way to detect readability without
//! consuming data (needed by `sys::windows::poll`).

use crate::{
    error::{Error, Result},
    handle::Handle,
    redirect::Stream,
};
use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    ffi::OsStr,
    os::windows::{ffi::OsStrExt, io::RawHandle},
    ptr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};
use winapi::{
    shared::{
        minwindef::{DWORD, FALSE, TRUE},
        winerror::ERROR_IO_PENDING,
    },
    um::{
        errhandlingapi::GetLastError,
        fileapi::{CreateFileW, ReadFile, WriteFile, OPEN_EXISTING},
        handleapi::{CloseHandle, SetHandleInformation, INVALID_HANDLE_VALUE},
        ioapiset::{CancelIoEx, GetOverlappedResult},
        minwinbase::{OVERLAPPED, SECURITY_ATTRIBUTES},
        namedpipeapi::CreateNamedPipeW,
        processenv::GetStdHandle,
        processthreadsapi::GetCurrentProcessId,
        synchapi::{CreateEventW, WaitForSingleObject},
        winbase::{
            FILE_FLAG_FIRST_PIPE_INSTANCE, FILE_FLAG_OVERLAPPED, HANDLE_FLAG_INHERIT,
            PIPE_ACCESS_DUPLEX, PIPE_READMODE_BYTE, PIPE_TYPE_BYTE, PIPE_WAIT,
            STD_ERROR_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, WAIT_OBJECT_0,
        },
        winnt::{GENERIC_READ, GENERIC_WRITE, HANDLE},
    },
};

const BUFFER_SIZE: DWORD = 4096;
static PIPE_COUNTER: AtomicU32 = AtomicU32::new(0);

fn raw(h: Handle) -> HANDLE {
    h.raw() as HANDLE
}

fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

fn security_attributes(inherit: bool) -> SECURITY_ATTRIBUTES {
    SECURITY_ATTRIBUTES {
        nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as DWORD,
        lpSecurityDescriptor: ptr::null_mut(),
        bInheritHandle: if inherit { TRUE } else { FALSE },
    }
}

/// Creates a connected pipe pair: `Handle` #0 is the overlapped server end
/// the parent keeps; `Handle` #1 is the plain, synchronous, inheritable
/// client end passed to the child.
pub fn init() -> Result<(Handle, Handle)> {
    let pid = unsafe { GetCurrentProcessId() };
    let n = PIPE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = wide(&format!(r"\\.\pipe\reproc-{}-{}", pid, n));

    let mut server_sa = security_attributes(false);
    let server = unsafe {
        CreateNamedPipeW(
            name.as_ptr(),
            PIPE_ACCESS_DUPLEX | FILE_FLAG_OVERLAPPED | FILE_FLAG_FIRST_PIPE_INSTANCE,
            PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
            1,
            BUFFER_SIZE,
            BUFFER_SIZE,
            0,
            &mut server_sa,
        )
    };
    if server == INVALID_HANDLE_VALUE {
        return Err(last_error());
    }

    let mut client_sa = security_attributes(true);
    let client = unsafe {
        CreateFileW(
            name.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            0,
            &mut client_sa,
            OPEN_EXISTING,
            0,
            ptr::null_mut(),
        )
    };
    if client == INVALID_HANDLE_VALUE {
        let err = last_error();
        unsafe { CloseHandle(server) };
        return Err(err);
    }

    Ok((
        Handle::from_raw(server as RawHandle),
        Handle::from_raw(client as RawHandle),
    ))
}

fn last_error() -> Error {
    crate::sys::windows::error::last()
}

static NONBLOCKING: Lazy<Mutex<HashMap<usize, bool>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn slot(h: Handle) -> usize {
    h.raw() as usize
}

pub fn set_nonblocking(h: Handle, flag: bool) -> Result<()> {
    NONBLOCKING.lock().unwrap().insert(slot(h), flag);
    Ok(())
}

fn is_nonblocking(h: Handle) -> bool {
    *NONBLOCKING.lock().unwrap().get(&slot(h)).unwrap_or(&false)
}

struct Overlapped {
    raw: OVERLAPPED,
    event: HANDLE,
}

impl Overlapped {
    fn new() -> Result<Self> {
        let event = unsafe { CreateEventW(ptr::null_mut(), TRUE, FALSE, ptr::null()) };
        if event.is_null() {
            return Err(last_error());
        }
        let mut raw: OVERLAPPED = unsafe { std::mem::zeroed() };
        raw.hEvent = event;
        Ok(Overlapped { raw, event })
    }
}

impl Drop for Overlapped {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.event) };
    }
}

/// Waits for `ov` to complete. In blocking mode this simply blocks; in
/// non-blocking mode a still-pending operation is cancelled and reported as
/// [`Error::TimedOut`], matching the pipe's `Redirect`-independent
/// non-blocking contract (§4.1).
fn finish(h: Handle, mut ov: Overlapped, pending: bool, nonblocking: bool) -> Result<DWORD> {
    if pending && nonblocking {
        let ready = unsafe { WaitForSingleObject(ov.event, 0) };
        if ready != WAIT_OBJECT_0 {
            let mut transferred: DWORD = 0;
            unsafe {
                CancelIoEx(raw(h), &mut ov.raw);
                // Even a cancelled operation must be waited on once more so
                // the kernel is done writing into `ov` before it's dropped.
                GetOverlappedResult(raw(h), &mut ov.raw, &mut transferred, TRUE);
            }
            return Err(Error::TimedOut);
        }
    }
    let mut transferred: DWORD = 0;
    let ok = unsafe { GetOverlappedResult(raw(h), &mut ov.raw, &mut transferred, TRUE) };
    if ok == 0 {
        return Err(last_error());
    }
    Ok(transferred)
}

pub fn read(h: Handle, buf: &mut [u8]) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let nonblocking = is_nonblocking(h);
    let mut ov = Overlapped::new()?;
    let mut transferred: DWORD = 0;
    let ok = unsafe {
        ReadFile(
            raw(h),
            buf.as_mut_ptr().cast(),
            buf.len() as DWORD,
            &mut transferred,
            &mut ov.raw,
        )
    };
    let n = if ok != 0 {
        transferred
    } else {
        let err = unsafe { GetLastError() };
        if err != ERROR_IO_PENDING {
            return Err(crate::sys::windows::error::from_code(err));
        }
        finish(h, ov, true, nonblocking)?
    };
    if n == 0 {
        return Err(Error::BrokenPipe);
    }
    Ok(n as usize)
}

pub fn write(h: Handle, buf: &[u8]) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let nonblocking = is_nonblocking(h);
    let mut ov = Overlapped::new()?;
    let mut transferred: DWORD = 0;
    let ok = unsafe {
        WriteFile(
            raw(h),
            buf.as_ptr().cast(),
            buf.len() as DWORD,
            &mut transferred,
            &mut ov.raw,
        )
    };
    let n = if ok != 0 {
        transferred
    } else {
        let err = unsafe { GetLastError() };
        if err != ERROR_IO_PENDING {
            return Err(crate::sys::windows::error::from_code(err));
        }
        finish(h, ov, true, nonblocking)?
    };
    Ok(n as usize)
}

pub fn close(h: Handle) {
    if h.is_valid() {
        NONBLOCKING.lock().unwrap().remove(&slot(h));
        unsafe {
            CloseHandle(raw(h));
        }
    }
}

/// Duplicates the parent's own standard handle, inheritable, for
/// `Redirect::Inherit` / `Redirect::Parent`.
pub fn duplicate_stdio(stream: Stream) -> Result<Handle> {
    let which = match stream {
        Stream::In => STD_INPUT_HANDLE,
        Stream::Out => STD_OUTPUT_HANDLE,
        Stream::Err => STD_ERROR_HANDLE,
    };
    let h = unsafe { GetStdHandle(which) };
    if h.is_null() || h == INVALID_HANDLE_VALUE {
        return Err(last_error());
    }
    duplicate(Handle::from_raw(h as RawHandle))
}

/// Duplicates an arbitrary already-valid handle, inheritable — used both by
/// `Redirect::Handle` callers and by the `Redirect::Parent(Stream::Out)`
/// stderr-merge recipe.
pub fn duplicate(h: Handle) -> Result<Handle> {
    use winapi::um::{handleapi::DuplicateHandle, processthreadsapi::GetCurrentProcess, winnt::DUPLICATE_SAME_ACCESS};
    let mut cloned: HANDLE = ptr::null_mut();
    let ok = unsafe {
        DuplicateHandle(
            GetCurrentProcess(),
            raw(h),
            GetCurrentProcess(),
            &mut cloned,
            0,
            TRUE,
            DUPLICATE_SAME_ACCESS,
        )
    };
    if ok == 0 {
        return Err(last_error());
    }
    Ok(Handle::from_raw(cloned as RawHandle))
}

/// Opens `NUL` with the access mode implied by `stream`, used by
/// `Redirect::Discard`, mirroring `windows/spawn.rs`'s
/// `OutputSpecificationData::Ignore` handling but symmetric for stdin.
pub fn null_device(stream: Stream) -> Result<Handle> {
    let access = match stream {
        Stream::In => GENERIC_READ,
        Stream::Out | Stream::Err => GENERIC_WRITE,
    };
    let name = wide("NUL");
    let mut sa = security_attributes(true);
    let h = unsafe { CreateFileW(name.as_ptr(), access, 0, &mut sa, OPEN_EXISTING, 0, ptr::null_mut()) };
    if h == INVALID_HANDLE_VALUE {
        return Err(last_error());
    }
    Ok(Handle::from_raw(h as RawHandle))
}

/// Marks `h` inheritable via `SetHandleInformation`, the Windows analogue
/// of clearing `FD_CLOEXEC`. Every handle this module hands back for a
/// child is already created inheritable, so this is a defensive no-op in
/// practice but keeps the call site in `process.rs` platform-symmetric.
pub fn allow_inherit(h: Handle) -> Result<()> {
    let ok = unsafe { SetHandleInformation(raw(h), HANDLE_FLAG_INHERIT, HANDLE_FLAG_INHERIT) };
    if ok == 0 {
        return Err(last_error());
    }
    Ok(())
}

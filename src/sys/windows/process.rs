//! Windows process launcher and reaper (§4.4 Start/Wait/Terminate/Kill),
//! grounded in the teacher's `windows/spawn.rs` (`CreateProcessW`,
//! `quote_arg`, `encode_env`) with the sandbox-specific
//! `PROC_THREAD_ATTRIBUTE_LIST`/`SECURITY_CAPABILITIES` machinery dropped,
//! since this crate spawns plain, unconstrained child processes.

use crate::{
    error::Result,
    handle::Handle,
    options::Options,
};
use std::{
    ffi::{OsStr, OsString},
    mem::{size_of, zeroed},
    os::windows::{ffi::OsStrExt, io::RawHandle},
    path::Path,
    ptr,
};
use winapi::{
    shared::minwindef::{DWORD, TRUE},
    um::{
        handleapi::CloseHandle,
        minwinbase::STILL_ACTIVE,
        processthreadsapi::{
            CreateProcessW, GetExitCodeProcess, TerminateProcess, PROCESS_INFORMATION,
            STARTUPINFOW,
        },
        wincon::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT},
        winbase::{CREATE_NEW_PROCESS_GROUP, CREATE_UNICODE_ENVIRONMENT, STARTF_USESTDHANDLES},
        winnt::HANDLE,
    },
};

/// A running child: its process handle plus the pid `GenerateConsoleCtrlEvent`
/// needs (the handle alone isn't enough to target a process group). `reap`
/// closes the handle exactly once, the same way `try_wait` consumes a Unix
/// `Pid` via `waitpid`.
#[derive(Debug, Clone, Copy)]
pub struct ChildId {
    handle: Handle,
    pid: u32,
}

pub struct ChildStdio {
    pub stdin: Handle,
    pub stdout: Handle,
    pub stderr: Handle,
    pub exit_write: Handle,
}

fn raw(h: Handle) -> HANDLE {
    h.raw() as HANDLE
}

fn wide_nul(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(Some(0)).collect()
}

fn quote_arg(out: &mut Vec<u16>, data: &OsStr) {
    // FIXME: doesn't escape embedded quotes, matching the teacher's own
    // acknowledged limitation.
    out.push(b' ' as u16);
    out.push(b'"' as u16);
    out.extend(data.encode_wide());
    out.push(b'"' as u16);
}

fn build_command_line(path: &Path, args: &[OsString]) -> Vec<u16> {
    let mut cmd_line: Vec<u16> = path.as_os_str().encode_wide().collect();
    for arg in args {
        quote_arg(&mut cmd_line, arg);
    }
    cmd_line.push(0);
    cmd_line
}

/// Builds a `CREATE_UNICODE_ENVIRONMENT`-compatible double-null-terminated
/// block from `(key, value)` pairs.
fn encode_env(vars: &[(OsString, OsString)]) -> Vec<u16> {
    let mut out = Vec::new();
    for (key, value) in vars {
        out.extend(key.encode_wide());
        out.push(b'=' as u16);
        out.extend(value.encode_wide());
        out.push(0);
    }
    out.push(0);
    out
}

/// Spawns `path` with `args`. Child-side stdio handles are expected to
/// already be inheritable (§4.2); the caller closes them after this
/// returns, win or lose, per §4.4's closing rule.
pub fn spawn(path: &Path, args: &[OsString], options: &Options, stdio: ChildStdio) -> Result<ChildId> {
    let mut startup_info: STARTUPINFOW = unsafe { zeroed() };
    startup_info.cb = size_of::<STARTUPINFOW>() as DWORD;
    startup_info.dwFlags = STARTF_USESTDHANDLES;
    startup_info.hStdInput = raw(stdio.stdin);
    startup_info.hStdOutput = raw(stdio.stdout);
    startup_info.hStdError = raw(stdio.stderr);
    // exit_write survives via ordinary inheritance (bInheritHandles below);
    // it is not one of the three standard handles.
    let _ = stdio.exit_write;

    let application_name = wide_nul(path.as_os_str());
    let mut command_line = build_command_line(path, args);
    let mut env = options.environment.as_ref().map(|vars| encode_env(vars));
    let cwd = options.working_directory.as_ref().map(|p| wide_nul(p.as_os_str()));

    let creation_flags = CREATE_NEW_PROCESS_GROUP
        | if env.is_some() {
            CREATE_UNICODE_ENVIRONMENT
        } else {
            0
        };

    let mut info: PROCESS_INFORMATION = unsafe { zeroed() };
    let ok = unsafe {
        CreateProcessW(
            application_name.as_ptr(),
            command_line.as_mut_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            TRUE,
            creation_flags,
            env.as_mut()
                .map_or(ptr::null_mut(), |e| e.as_mut_ptr().cast()),
            cwd.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
            &mut startup_info,
            &mut info,
        )
    };
    if ok == 0 {
        return Err(crate::sys::windows::error::last());
    }
    unsafe {
        CloseHandle(info.hThread);
    }
    Ok(ChildId {
        handle: Handle::from_raw(info.hProcess as RawHandle),
        pid: info.dwProcessId,
    })
}

/// Non-blocking reap: `GetExitCodeProcess` without having waited first,
/// matching the contract of Unix's `waitpid(WNOHANG)`.
pub fn try_wait(child: ChildId) -> Result<Option<u32>> {
    let mut code: DWORD = 0;
    let ok = unsafe { GetExitCodeProcess(raw(child.handle), &mut code) };
    if ok == 0 {
        return Err(crate::sys::windows::error::last());
    }
    if code == STILL_ACTIVE {
        return Ok(None);
    }
    unsafe {
        CloseHandle(raw(child.handle));
    }
    Ok(Some(code))
}

/// Cooperative shutdown: `CTRL_BREAK_EVENT` to the child's own process
/// group (every child is created with `CREATE_NEW_PROCESS_GROUP` so this
/// never also signals the parent). A child with no console or no handler
/// installed simply terminates, which is an acceptable outcome for a
/// "cooperative" signal — the caller still falls through the stop
/// escalation to `kill` if it doesn't exit in time (§4.5).
pub fn terminate(child: ChildId) -> Result<()> {
    let ok = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, child.pid) };
    if ok == 0 {
        return Err(crate::sys::windows::error::last());
    }
    Ok(())
}

pub fn kill(child: ChildId) -> Result<()> {
    let ok = unsafe { TerminateProcess(raw(child.handle), 1) };
    if ok == 0 {
        return Err(crate::sys::windows::error::last());
    }
    Ok(())
}

//! Unix process launcher and reaper (§4.4 Start/Wait/Terminate/Kill),
//! grounded in the teacher's `linux/zygote.rs` (`fork`, `dup2`, `execvpe`,
//! `chdir`) but simplified to a plain fork/exec — no zygote, no seccomp, no
//! cgroups, since sandboxing is out of this specification's scope.
//!
//! # Exec failure
//!
//! The spec's `InChild` status (§3) models a forked child that has not yet
//! exec'd. Rather than leaving a live `Process` handle around in that
//! window for arbitrary code to misuse (§9's open question), this
//! implementation uses the classic errno-pipe pattern also used by CPython
//! and glibc's own `posix_spawn`: the child never returns into library code
//! after `fork` except to call `execve` and, on failure, report the errno
//! over a dedicated close-on-exec pipe before calling `_exit`. The parent
//! blocks briefly on that pipe to learn whether exec succeeded. `InChild`
//! therefore stays reachable in the public `Status` enum (for forward
//! compatibility with a hypothetical platform that does return into caller
//! code between fork and exec) but is never constructed by this backend.

use crate::{
    error::{Error, Result},
    handle::Handle,
    options::Options,
};
use nix::unistd::{ForkResult, Pid};
use std::{
    ffi::{CString, OsStr, OsString},
    os::unix::{ffi::OsStrExt, io::RawFd},
    path::Path,
};

pub type ChildId = Pid;

pub const INVALID_CHILD: ChildId = Pid::from_raw(0);

/// The three child-side stdio handles plus the exit-signal pipe's child
/// end, already resolved by `redirect` (§4.2) and ready to be dup2'd onto
/// 0/1/2 in the forked child.
pub struct ChildStdio {
    pub stdin: Handle,
    pub stdout: Handle,
    pub stderr: Handle,
    pub exit_write: Handle,
}

fn to_cstring(s: &OsStr) -> CString {
    CString::new(s.as_bytes()).expect("argument contains an interior nul byte")
}

fn build_argv(path: &Path, args: &[OsString]) -> Vec<CString> {
    let mut argv = Vec::with_capacity(args.len() + 2);
    argv.push(to_cstring(path.as_os_str()));
    for a in args {
        argv.push(to_cstring(a));
    }
    argv
}

fn build_envp(env: &[(OsString, OsString)]) -> Vec<CString> {
    env.iter()
        .map(|(k, v)| {
            let mut buf = k.as_bytes().to_vec();
            buf.push(b'=');
            buf.extend_from_slice(v.as_bytes());
            CString::new(buf).expect("environment entry contains an interior nul byte")
        })
        .collect()
}

fn as_ptrs(strings: &[CString]) -> Vec<*const libc::c_char> {
    let mut ptrs: Vec<*const libc::c_char> = strings.iter().map(|s| s.as_ptr()).collect();
    ptrs.push(std::ptr::null());
    ptrs
}

/// Writes `errno` to the error-report pipe and exits. Never returns.
/// Safety: only ever called in the forked child, which must not touch any
/// non-async-signal-safe state beyond what this function itself does.
unsafe fn report_and_exit(error_write: RawFd, errno: i32) -> ! {
    let bytes = errno.to_ne_bytes();
    libc::write(error_write, bytes.as_ptr() as *const libc::c_void, bytes.len());
    libc::_exit(127);
}

/// Forks and execs `path` with `args`. On success, returns the child's pid;
/// the parent-side stdio pipes are unaffected. `stdio`'s handles are the
/// child-side ends and are always closed by the caller after this returns
/// (success or failure), per §4.4's "child-side stdio ... closed in the
/// parent at the end" rule.
pub fn spawn(
    path: &Path,
    args: &[OsString],
    options: &Options,
    stdio: ChildStdio,
) -> Result<ChildId> {
    let argv = build_argv(path, args);
    let argv_ptrs = as_ptrs(&argv);
    let envp = options.environment.as_ref().map(|env| build_envp(env));
    let envp_ptrs = envp.as_ref().map(|e| as_ptrs(e));
    let exe = to_cstring(path.as_os_str());
    let cwd = options
        .working_directory
        .as_ref()
        .map(|p| to_cstring(p.as_os_str()));

    let (error_read, error_write) = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)?;

    // SAFETY: between `fork` and `execve`/`_exit` the child only calls
    // async-signal-safe functions (dup2, chdir, execve, write, _exit).
    match unsafe { nix::unistd::fork() }? {
        ForkResult::Child => unsafe {
            libc::dup2(stdio.stdin.raw(), libc::STDIN_FILENO);
            libc::dup2(stdio.stdout.raw(), libc::STDOUT_FILENO);
            libc::dup2(stdio.stderr.raw(), libc::STDERR_FILENO);
            // exit_write keeps its own fd number; it must already have
            // FD_CLOEXEC cleared by the caller so it survives into the
            // running child and is closed by the kernel only when the
            // child's whole fd table is torn down at exit.
            let _ = stdio.exit_write;

            if let Some(cwd) = &cwd {
                if libc::chdir(cwd.as_ptr()) != 0 {
                    report_and_exit(error_write, errno::errno().0);
                }
            }

            match &envp_ptrs {
                Some(envp) => {
                    libc::execvpe(exe.as_ptr(), argv_ptrs.as_ptr(), envp.as_ptr());
                }
                None => {
                    libc::execvp(exe.as_ptr(), argv_ptrs.as_ptr());
                }
            }
            // execv* only returns on failure.
            report_and_exit(error_write, errno::errno().0);
        },
        ForkResult::Parent { child } => {
            let _ = nix::unistd::close(error_write);
            let mut buf = [0u8; 4];
            let mut total = 0;
            loop {
                match nix::unistd::read(error_read, &mut buf[total..]) {
                    Ok(0) => break,
                    Ok(n) => {
                        total += n;
                        if total == buf.len() {
                            break;
                        }
                    }
                    Err(nix::Error::Sys(nix::errno::Errno::EINTR)) => continue,
                    Err(e) => {
                        let _ = nix::unistd::close(error_read);
                        return Err(e.into());
                    }
                }
            }
            let _ = nix::unistd::close(error_read);
            if total == buf.len() {
                let errno_value = i32::from_ne_bytes(buf);
                let _ = nix::sys::wait::waitpid(child, None);
                return Err(Error::Other {
                    code: errno_value,
                    message: errno::Errno(errno_value).to_string(),
                });
            }
            Ok(child)
        }
    }
}

/// Non-blocking reap (`WNOHANG`). Returns the exit status already encoded
/// per §3 (`128 + signal` for a signalled exit), or `None` if still
/// running.
pub fn try_wait(child: ChildId) -> Result<Option<u32>> {
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(_, code)) => Ok(Some(code as u32)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Ok(Some(128 + signal as u32)),
        Ok(_) => Ok(None),
        Err(nix::Error::Sys(nix::errno::Errno::ECHILD)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn terminate(child: ChildId) -> Result<()> {
    signal(child, nix::sys::signal::Signal::SIGTERM)
}

pub fn kill(child: ChildId) -> Result<()> {
    signal(child, nix::sys::signal::Signal::SIGKILL)
}

fn signal(child: ChildId, sig: nix::sys::signal::Signal) -> Result<()> {
    match nix::sys::signal::kill(child, sig) {
        Ok(()) => Ok(()),
        Err(nix::Error::Sys(nix::errno::Errno::ESRCH)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

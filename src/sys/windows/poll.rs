//! Windows multiplex primitive (§9 "On ... Windows, it integrates with
//! IOCP/`WaitForMultipleObjects`"). Each readable target gets a persistent
//! zero-length overlapped `ReadFile` — a well-known Windows idiom for
//! edge-triggered readiness that reports completion without consuming any
//! bytes — re-armed across calls via a small side table the way the
//! teacher's `windows/wait.rs` keeps a background thread alive across
//! polls, generalized here to cover many handles with one
//! `WaitForMultipleObjects` instead of one thread per child.
//!
//! Write readiness is not tracked the same way: this crate's pipes are
//! small buffered named pipes, and a write that would block is rare at the
//! sizes this crate moves, so `Watch::Writable` targets are reported ready
//! immediately. A future version could add the same overlapped-write
//! tracking as reads if that assumption stops holding.

use crate::{error::Result, handle::Handle};
use once_cell::sync::Lazy;
use std::{collections::HashMap, ptr, sync::Mutex, time::Duration};
use winapi::{
    shared::{
        minwindef::{FALSE, TRUE},
        winerror::WAIT_TIMEOUT,
    },
    um::{
        fileapi::ReadFile,
        handleapi::CloseHandle,
        ioapiset::GetOverlappedResult,
        minwinbase::OVERLAPPED,
        synchapi::{CreateEventW, WaitForMultipleObjects},
        winbase::WAIT_OBJECT_0,
        winnt::HANDLE,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    Readable,
    Writable,
}

#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub handle: Handle,
    pub watch: Watch,
}

pub enum Outcome {
    Ready(Vec<bool>),
    TimedOut,
}

struct PendingRead {
    overlapped: Box<OVERLAPPED>,
    event: HANDLE,
}

unsafe impl Send for PendingRead {}

static PENDING: Lazy<Mutex<HashMap<usize, PendingRead>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn key(h: Handle) -> usize {
    h.raw() as usize
}

fn arm(h: Handle) -> Result<HANDLE> {
    let mut table = PENDING.lock().unwrap();
    if let Some(entry) = table.get(&key(h)) {
        return Ok(entry.event);
    }
    let event = unsafe { CreateEventW(ptr::null_mut(), TRUE, FALSE, ptr::null()) };
    if event.is_null() {
        return Err(crate::sys::windows::error::last());
    }
    let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { std::mem::zeroed() });
    overlapped.hEvent = event;
    let ok = unsafe {
        ReadFile(
            h.raw() as HANDLE,
            ptr::null_mut(),
            0,
            ptr::null_mut(),
            overlapped.as_mut(),
        )
    };
    if ok == 0 {
        let err = unsafe { winapi::um::errhandlingapi::GetLastError() };
        if err != winapi::shared::winerror::ERROR_IO_PENDING {
            unsafe { CloseHandle(event) };
            // Treat an immediate failure (e.g. the peer already closed)
            // as an immediately-ready readiness notification; the caller's
            // subsequent `Process::read` surfaces the real error.
            return Ok(ptr::null_mut());
        }
    }
    table.insert(key(h), PendingRead { overlapped, event });
    Ok(event)
}

fn disarm(h: Handle) {
    if let Some(entry) = PENDING.lock().unwrap().remove(&key(h)) {
        unsafe {
            CloseHandle(entry.event);
        }
    }
}

/// Waits for any of `targets` to become ready, or `horizon` to elapse.
pub fn wait_any(targets: &[Target], horizon: Option<Duration>) -> Result<Outcome> {
    let mut wait_handles: Vec<HANDLE> = Vec::with_capacity(targets.len());
    let mut immediate_ready = vec![false; targets.len()];
    let mut needs_wait = vec![false; targets.len()];

    for (i, target) in targets.iter().enumerate() {
        match target.watch {
            Watch::Writable => {
                immediate_ready[i] = true;
            }
            Watch::Readable => {
                let event = arm(target.handle)?;
                if event.is_null() {
                    immediate_ready[i] = true;
                } else {
                    needs_wait[i] = true;
                    wait_handles.push(event);
                }
            }
        }
    }

    if immediate_ready.iter().any(|&r| r) {
        return Ok(Outcome::Ready(immediate_ready));
    }

    let timeout_ms = match horizon {
        None => winapi::um::winbase::INFINITE,
        Some(d) => d.as_millis().min(u32::MAX as u128) as u32,
    };

    let ret = unsafe {
        WaitForMultipleObjects(
            wait_handles.len() as u32,
            wait_handles.as_ptr(),
            FALSE,
            timeout_ms,
        )
    };

    if ret == WAIT_TIMEOUT {
        return Ok(Outcome::TimedOut);
    }
    if ret < WAIT_OBJECT_0 || ret >= WAIT_OBJECT_0 + wait_handles.len() as u32 {
        return Err(crate::sys::windows::error::last());
    }

    let signalled_index = (ret - WAIT_OBJECT_0) as usize;
    let mut ready = vec![false; targets.len()];
    let mut wait_cursor = 0;
    for (i, target) in targets.iter().enumerate() {
        if !needs_wait[i] {
            continue;
        }
        if wait_cursor == signalled_index {
            ready[i] = true;
            let mut transferred = 0;
            if let Some(entry) = PENDING.lock().unwrap().get_mut(&key(target.handle)) {
                unsafe {
                    GetOverlappedResult(
                        target.handle.raw() as HANDLE,
                        entry.overlapped.as_mut(),
                        &mut transferred,
                        FALSE,
                    );
                }
            }
            disarm(target.handle);
        }
        wait_cursor += 1;
    }

    Ok(Outcome::Ready(ready))
}

//! Process-global initialization guard (§5 "Shared resources"), symmetric
//! with `sys::unix::init`. Windows needs no process-wide setup either —
//! every primitive used here (`CreateNamedPipeW`, `CreateProcessW`,
//! `WaitForMultipleObjects`) works from a cold start — but the reference
//! count is kept identical across backends.

use once_cell::sync::Lazy;
use std::sync::Mutex;

static REFCOUNT: Lazy<Mutex<usize>> = Lazy::new(|| Mutex::new(0));

#[derive(Debug)]
pub struct Init;

pub fn init() -> Init {
    let mut count = REFCOUNT.lock().unwrap();
    *count += 1;
    Init
}

impl Drop for Init {
    fn drop(&mut self) {
        let mut count = REFCOUNT.lock().unwrap();
        *count -= 1;
    }
}

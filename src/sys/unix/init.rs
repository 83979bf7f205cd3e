//! Process-global initialization guard (§5 "Shared resources", §9 "Global
//! state"). On Unix there is nothing to actually initialize — `fork`/`exec`
//! need no process-wide setup — but the reference count is still
//! maintained so the RAII guard type is identical across platforms and so
//! a future platform need (e.g. installing a `SIGCHLD` handler once) has
//! somewhere to live.

use once_cell::sync::Lazy;
use std::sync::Mutex;

static REFCOUNT: Lazy<Mutex<usize>> = Lazy::new(|| Mutex::new(0));

/// RAII guard: acquired on the first successful `start`, released on
/// `destroy`, exactly as §4.4 step 2 / §4.6 describe.
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

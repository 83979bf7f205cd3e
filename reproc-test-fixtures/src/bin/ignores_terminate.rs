//! Ignores the cooperative shutdown signal (`SIGTERM` on Unix,
//! `CTRL_BREAK_EVENT` on Windows) and loops until killed outright. Used to
//! exercise the `Terminate` stage timing out and escalation to `Kill`.

#[cfg(unix)]
fn ignore_sigterm() {
    unsafe {
        libc::signal(libc::SIGTERM, libc::SIG_IGN);
    }
}

#[cfg(windows)]
fn ignore_sigterm() {
    unsafe extern "system" fn handler(_ctrl_type: u32) -> i32 {
        // Returning TRUE marks the event handled without exiting.
        1
    }
    unsafe {
        winapi::um::wincon::SetConsoleCtrlHandler(Some(handler), 1);
    }
}

fn main() {
    ignore_sigterm();
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}

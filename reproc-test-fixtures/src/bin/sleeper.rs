//! Never writes to stdout; blocks reading stdin until it sees EOF, then
//! exits immediately. Used to exercise a `read(OUT)` timeout followed by a
//! `close(IN)`-triggered exit.

use std::io::{self, Read};

fn main() {
    let mut discard = [0u8; 64];
    loop {
        match io::stdin().read(&mut discard) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
}

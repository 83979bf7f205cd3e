//! Reads all of stdin, then writes it back to stdout, stderr, or both,
//! depending on `argv[1]` (`"stdout"`, `"stderr"`, or `"both"`).

use std::io::{self, Read, Write};

fn main() {
    let mode = std::env::args().nth(1).unwrap_or_else(|| "stdout".into());

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input).expect("failed to read stdin");

    match mode.as_str() {
        "stdout" => {
            io::stdout().write_all(&input).unwrap();
        }
        "stderr" => {
            io::stderr().write_all(&input).unwrap();
        }
        "both" => {
            io::stdout().write_all(&input).unwrap();
            io::stdout().flush().unwrap();
            io::stderr().write_all(&input).unwrap();
        }
        other => panic!("unknown mode: {}", other),
    }
}

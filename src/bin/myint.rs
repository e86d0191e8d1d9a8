//! myint - spin, then interrupt itself.
//!
//! usage: myint <seconds>
//!
//! Sleeps for the given number of seconds and then sends SIGINT to its own
//! process, simulating a foreground job dying from ctrl-c.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd;

fn main() {
    let secs: u64 = match env::args().nth(1).and_then(|arg| arg.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("usage: myint <seconds>");
            process::exit(1);
        }
    };

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }

    if let Err(e) = signal::kill(unistd::getpid(), Signal::SIGINT) {
        eprintln!("myint: kill: {}", e);
        process::exit(1);
    }
}

//! mystop - spin, then stop its whole process group.
//!
//! usage: mystop <seconds>
//!
//! Sleeps for the given number of seconds and then sends SIGTSTP to its own
//! process group (negative pid), simulating a foreground job being
//! suspended with ctrl-z.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::{self, Pid};

fn main() {
    let secs: u64 = match env::args().nth(1).and_then(|arg| arg.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("usage: mystop <seconds>");
            process::exit(1);
        }
    };

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }

    let group = Pid::from_raw(-unistd::getpid().as_raw());
    if let Err(e) = signal::kill(group, Signal::SIGTSTP) {
        eprintln!("mystop: kill: {}", e);
        process::exit(1);
    }
}

//! mysplit - a two-process foreground job.
//!
//! usage: mysplit <seconds>
//!
//! Forks a child that spins for the given number of seconds while the
//! parent waits for it. Because the shell only tracks the parent, this
//! checks that interrupt/suspend forwarding targets the whole process
//! group rather than a single pid.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use nix::sys::wait::wait;
use nix::unistd::{fork, ForkResult};

fn main() {
    let secs: u64 = match env::args().nth(1).and_then(|arg| arg.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("usage: mysplit <seconds>");
            process::exit(1);
        }
    };

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            for _ in 0..secs {
                thread::sleep(Duration::from_secs(1));
            }
        }
        Ok(ForkResult::Parent { .. }) => {
            if let Err(e) = wait() {
                eprintln!("mysplit: wait: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("mysplit: fork: {}", e);
            process::exit(1);
        }
    }
}

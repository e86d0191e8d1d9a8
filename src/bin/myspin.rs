//! myspin - spin for a while, producing no output.
//!
//! usage: myspin <seconds>
//!
//! Sleeps in one-second chunks so signals interrupt it promptly. The
//! simplest target for exercising foreground waits and `jobs`.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let secs: u64 = match env::args().nth(1).and_then(|arg| arg.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("usage: myspin <seconds>");
            process::exit(1);
        }
    };

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }
}

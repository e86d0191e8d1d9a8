//! The process launcher: fork, process-group setup, redirection, exec, and
//! the foreground-wait protocol shared with the `fg` builtin.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::process;

use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};

use crate::jobs::{self, JobState};
use crate::mask;
use crate::parser::CommandLine;

/// Forks `cmd` into its own process group and registers it as a job.
/// Foreground jobs are then waited for; background jobs are announced.
pub fn spawn(cmd: &CommandLine, cmdline: &str) {
    // Close the gate before forking so this child's SIGCHLD cannot arrive
    // before the job is registered.
    mask::block();
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => run_child(cmd),
        Ok(ForkResult::Parent { child }) => {
            let state = if cmd.background {
                JobState::Background
            } else {
                JobState::Foreground
            };
            jobs::with_table(|t| {
                if t.add(child, state, cmdline) && cmd.background {
                    if let Some(job) = t.find_by_pid(child) {
                        println!("[{}] ({}) {}", job.jid, job.pid, job.cmdline());
                    }
                }
            });
            mask::unblock();
            if !cmd.background {
                wait_foreground();
            }
        }
        Err(e) => {
            mask::unblock();
            eprintln!("fork: {}", e);
        }
    }
}

/// Suspends the calling flow until no job is in the foreground state.
///
/// The check runs with the job-control signals blocked, and `sigsuspend`
/// atomically installs the pre-block mask while waiting; a plain
/// unblock-then-wait would lose the wakeup if SIGCHLD landed between the
/// two steps. Only the SIGCHLD handler can satisfy the loop condition;
/// this flow never calls `waitpid`.
pub fn wait_foreground() {
    let prev = mask::block_saving();
    while jobs::with_table(|t| t.fg_pid()).is_some() {
        // Always returns -1 with EINTR once a handler has run.
        unsafe { nix::libc::sigsuspend(prev.as_ref()) };
    }
    mask::restore(&prev);
}

/// Child-side half of `spawn`; never returns to shell code.
fn run_child(cmd: &CommandLine) -> ! {
    mask::unblock();

    // Leave the shell's process group so terminal-generated SIGINT/SIGTSTP
    // reach this job only through the shell's forwarding handlers.
    let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));

    for sig in [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGCHLD] {
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }

    if let Some(path) = &cmd.infile {
        redirect(path, OFlag::O_RDONLY, 0);
    }
    if let Some(path) = &cmd.outfile {
        redirect(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, 1);
    }

    let argv: Vec<CString> = match cmd
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect()
    {
        Ok(argv) => argv,
        Err(_) => {
            eprintln!("{}: invalid argument", cmd.argv[0]);
            process::exit(1);
        }
    };

    let _ = unistd::execvp(&argv[0], &argv);
    println!("{}: Command not found", cmd.argv[0]);
    process::exit(127);
}

fn redirect(path: &str, flags: OFlag, target: RawFd) {
    let fd = match fcntl::open(path, flags, Mode::from_bits_truncate(0o664)) {
        Ok(fd) => fd,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            process::exit(1);
        }
    };
    if let Err(e) = unistd::dup2(fd, target) {
        eprintln!("{}: {}", path, e);
        process::exit(1);
    }
    let _ = unistd::close(fd);
}

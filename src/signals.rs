//! Signal handlers and their installation.
//!
//! Handlers run in true signal context, so they are limited to
//! async-signal-safe operations: syscalls, fixed-buffer formatting through
//! [`crate::utils::SioWriter`], and job-table access through the masked
//! accessors. Each handler is installed with an `sa_mask` covering all
//! three job-control signals, which makes the handlers mutually exclusive
//! with each other; the mask gate makes them mutually exclusive with the
//! command loop's critical sections.

use nix::libc::c_int;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};

use crate::jobs::{self, JobState};
use crate::mask;
use crate::utils::sio_print;

/// Reaps every pending child status change. Multiple children may have
/// changed state before this runs and same-kind signals do not queue, so
/// one invocation drains them all. This is the only place in the shell
/// that calls `waitpid`.
pub extern "C" fn sigchld_handler(_sig: c_int) {
    loop {
        match wait::waitpid(
            Pid::from_raw(-1),
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
        ) {
            Ok(WaitStatus::Stopped(pid, sig)) => {
                let jid = jobs::try_with_table(|t| {
                    t.find_by_pid_mut(pid).map(|job| {
                        job.state = JobState::Stopped;
                        job.jid
                    })
                })
                .flatten();
                if let Some(jid) = jid {
                    sio_print(
                        1,
                        format_args!(
                            "Job [{}] ({}) stopped by signal {}\n",
                            jid,
                            pid,
                            sig as c_int
                        ),
                    );
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _core)) => {
                let jid = jobs::try_with_table(|t| {
                    let jid = t.find_by_pid(pid).map(|job| job.jid);
                    t.remove(pid);
                    jid
                })
                .flatten();
                if let Some(jid) = jid {
                    sio_print(
                        1,
                        format_args!(
                            "Job [{}] ({}) terminated by signal {}\n",
                            jid,
                            pid,
                            sig as c_int
                        ),
                    );
                }
            }
            Ok(WaitStatus::Exited(pid, _status)) => {
                let _ = jobs::try_with_table(|t| t.remove(pid));
            }
            // StillAlive, or ECHILD once every child is reaped.
            _ => break,
        }
    }
}

/// Forwards a terminal-generated signal to the entire foreground process
/// group. The group, not just the tracked pid: a foreground job may have
/// forked children we do not track individually.
fn forward_to_foreground(sig: Signal) {
    let fg = jobs::try_with_table(|t| t.fg_pid()).flatten();
    let Some(fg) = fg else { return };
    let Ok(pgid) = unistd::getpgid(Some(fg)) else {
        return;
    };
    if pgid != unistd::getpid() {
        let _ = signal::kill(Pid::from_raw(-pgid.as_raw()), sig);
    }
}

pub extern "C" fn sigint_handler(_sig: c_int) {
    forward_to_foreground(Signal::SIGINT);
}

pub extern "C" fn sigtstp_handler(_sig: c_int) {
    forward_to_foreground(Signal::SIGTSTP);
}

/// The single termination path: `quit`, end-of-file, and a real SIGQUIT
/// all arrive here.
pub extern "C" fn sigquit_handler(_sig: c_int) {
    sio_print(2, format_args!("Terminating after receipt of SIGQUIT signal\n"));
    unsafe { nix::libc::_exit(0) };
}

/// Installs the shell's handlers. SIGTTIN/SIGTTOU are ignored so that
/// background jobs touching the terminal cannot stop the shell itself.
pub fn install() {
    let handlers: [(Signal, extern "C" fn(c_int)); 4] = [
        (Signal::SIGINT, sigint_handler),
        (Signal::SIGTSTP, sigtstp_handler),
        (Signal::SIGCHLD, sigchld_handler),
        (Signal::SIGQUIT, sigquit_handler),
    ];
    for (sig, handler) in handlers {
        let action = SigAction::new(
            SigHandler::Handler(handler),
            SaFlags::SA_RESTART,
            mask::job_signals(),
        );
        unsafe { signal::sigaction(sig, &action) }.expect("Unable to install signal handler");
    }
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        unsafe { signal::signal(sig, SigHandler::SigIgn) }
            .expect("Unable to ignore terminal signal");
    }
}

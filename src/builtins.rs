//! Built-in commands: `quit`, `jobs`, `bg`, `fg`.

use std::io;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::exec;
use crate::jobs::{self, JobState};
use crate::parser::{Builtin, CommandLine};

/// Executes `cmd` if it is a builtin, returning true when handled.
/// A builtin accompanied by a redirection is not treated as one; the line
/// falls through to the launcher.
pub fn handle_builtin(cmd: &CommandLine) -> bool {
    if cmd.builtin == Builtin::None || cmd.infile.is_some() || cmd.outfile.is_some() {
        return false;
    }
    match cmd.builtin {
        // Raised rather than exiting directly: every termination cause
        // funnels through the SIGQUIT handler.
        Builtin::Quit => {
            let _ = signal::raise(Signal::SIGQUIT);
        }
        Builtin::Jobs => {
            if let Err(e) = jobs::with_table(|t| t.list(&mut io::stdout())) {
                eprintln!("jobs: {}", e);
            }
        }
        Builtin::Bg => do_bgfg(cmd, true),
        Builtin::Fg => do_bgfg(cmd, false),
        Builtin::None => unreachable!(),
    }
    true
}

#[derive(Debug, PartialEq, Eq)]
enum JobRef {
    Jid(i32),
    Pid(i32),
}

/// An argument beginning with `%` names a jid; otherwise it is a literal pid.
fn parse_job_ref(arg: &str) -> Option<JobRef> {
    if let Some(rest) = arg.strip_prefix('%') {
        rest.parse().ok().map(JobRef::Jid)
    } else {
        arg.parse().ok().map(JobRef::Pid)
    }
}

/// Resumes a stopped or backgrounded job, in the background (`bg`) or the
/// foreground (`fg`).
fn do_bgfg(cmd: &CommandLine, to_bg: bool) {
    let name = if to_bg { "bg" } else { "fg" };
    let Some(arg) = cmd.argv.get(1) else {
        println!("{} command requires PID or %jobid argument", name);
        return;
    };
    let Some(target) = parse_job_ref(arg) else {
        println!("No such process found");
        return;
    };

    let resolved = jobs::with_table(|t| {
        let job = match target {
            JobRef::Jid(jid) => t.find_by_jid_mut(jid),
            JobRef::Pid(pid) => t.find_by_pid_mut(Pid::from_raw(pid)),
        };
        job.map(|job| {
            let _ = signal::kill(job.pid, Signal::SIGCONT);
            job.state = if to_bg {
                JobState::Background
            } else {
                JobState::Foreground
            };
            if to_bg {
                println!("[{}] ({}) {}", job.jid, job.pid, job.cmdline());
            }
            job.pid
        })
    });

    match resolved {
        None => println!("No such process found"),
        Some(pid) if !to_bg => {
            exec::wait_foreground();
            // Reap the completed job. One that was stopped again during the
            // wait stays in the table so it can be resumed later.
            jobs::with_table(|t| {
                let stopped =
                    matches!(t.find_by_pid(pid).map(|j| j.state), Some(JobState::Stopped));
                if !stopped {
                    t.remove(pid);
                }
            });
        }
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ref_accepts_pid_and_jid() {
        assert_eq!(parse_job_ref("123"), Some(JobRef::Pid(123)));
        assert_eq!(parse_job_ref("%4"), Some(JobRef::Jid(4)));
    }

    #[test]
    fn job_ref_rejects_garbage() {
        assert_eq!(parse_job_ref("abc"), None);
        assert_eq!(parse_job_ref("%"), None);
        assert_eq!(parse_job_ref("%x"), None);
        assert_eq!(parse_job_ref(""), None);
    }
}

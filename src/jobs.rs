//! The job table: a fixed-capacity registry of tracked commands.
//!
//! Every operation here must run with the signal mask gate closed (see
//! [`crate::mask`]); both the command loop and the signal handlers mutate
//! this state, and blocking is the only thing keeping them apart. Table
//! operations never allocate: the SIGCHLD handler deletes jobs, and the
//! allocator is not async-signal-safe, so command lines live in fixed
//! buffers and slots are cleared in place.

use std::io::{self, Write};
use std::str;

use nix::unistd::Pid;
use once_cell::sync::OnceCell;

use crate::mask::{self, MaskedCell};

/// Maximum number of concurrent jobs.
pub const MAXJOBS: usize = 16;
/// Maximum length of a retained command line, in bytes.
pub const MAXLINE: usize = 1024;

/// State of a job. `Undefined` marks a free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Undefined,
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Undefined => "Undefined",
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

/// Fixed-capacity command-line storage. Copying into it truncates at the
/// last character boundary that fits.
#[derive(Clone, Copy)]
struct CmdBuf {
    buf: [u8; MAXLINE],
    len: usize,
}

impl CmdBuf {
    fn empty() -> Self {
        CmdBuf {
            buf: [0; MAXLINE],
            len: 0,
        }
    }

    fn set(&mut self, s: &str) {
        let mut end = s.len().min(MAXLINE);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        self.len = end;
    }

    fn as_str(&self) -> &str {
        str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

/// One tracked command invocation.
#[derive(Clone, Copy)]
pub struct Job {
    /// Process id of the job leader; equal to the job's process-group id.
    pub pid: Pid,
    /// Small positive job id, unique among live jobs.
    pub jid: i32,
    pub state: JobState,
    cmdline: CmdBuf,
}

impl Job {
    fn empty() -> Self {
        Job {
            pid: Pid::from_raw(0),
            jid: 0,
            state: JobState::Undefined,
            cmdline: CmdBuf::empty(),
        }
    }

    fn clear(&mut self) {
        *self = Job::empty();
    }

    fn is_free(&self) -> bool {
        self.pid.as_raw() == 0
    }

    /// The original input line, retained for display.
    pub fn cmdline(&self) -> &str {
        self.cmdline.as_str()
    }
}

/// The registry itself. All methods assume the gate is closed; debug builds
/// verify that on every entry point.
pub struct JobTable {
    slots: [Job; MAXJOBS],
    next_jid: i32,
    verbose: bool,
}

impl JobTable {
    pub fn new(verbose: bool) -> Self {
        JobTable {
            slots: std::array::from_fn(|_| Job::empty()),
            next_jid: 1,
            verbose,
        }
    }

    /// Registers a new job. Fails if the table is full or `pid` is not a
    /// valid process id.
    pub fn add(&mut self, pid: Pid, state: JobState, cmdline: &str) -> bool {
        mask::debug_assert_blocked();
        if pid.as_raw() < 1 {
            return false;
        }
        for slot in self.slots.iter_mut() {
            if slot.is_free() {
                slot.pid = pid;
                slot.state = state;
                slot.jid = self.next_jid;
                slot.cmdline.set(cmdline);
                self.next_jid += 1;
                if self.next_jid > MAXJOBS as i32 {
                    self.next_jid = 1;
                }
                if self.verbose {
                    println!("Added job [{}] {} {}", slot.jid, slot.pid, slot.cmdline());
                }
                return true;
            }
        }
        println!("Tried to create too many jobs");
        false
    }

    /// Clears the slot owned by `pid`. After a deletion the jid allocator
    /// restarts just past the largest id still in use, so ids are reused
    /// only once all higher ones are free.
    pub fn remove(&mut self, pid: Pid) -> bool {
        mask::debug_assert_blocked();
        if pid.as_raw() < 1 {
            return false;
        }
        for slot in self.slots.iter_mut() {
            if slot.pid == pid {
                slot.clear();
                self.next_jid = self.max_jid() + 1;
                return true;
            }
        }
        false
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        mask::debug_assert_blocked();
        if pid.as_raw() < 1 {
            return None;
        }
        self.slots.iter().find(|j| j.pid == pid)
    }

    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        mask::debug_assert_blocked();
        if pid.as_raw() < 1 {
            return None;
        }
        self.slots.iter_mut().find(|j| j.pid == pid)
    }

    pub fn find_by_jid_mut(&mut self, jid: i32) -> Option<&mut Job> {
        mask::debug_assert_blocked();
        if jid < 1 {
            return None;
        }
        self.slots.iter_mut().find(|j| !j.is_free() && j.jid == jid)
    }

    /// Process id of the unique foreground job, if one exists.
    pub fn fg_pid(&self) -> Option<Pid> {
        mask::debug_assert_blocked();
        self.slots
            .iter()
            .find(|j| j.state == JobState::Foreground)
            .map(|j| j.pid)
    }

    /// Serializes all occupied slots, one line per job.
    pub fn list(&self, out: &mut dyn Write) -> io::Result<()> {
        mask::debug_assert_blocked();
        for job in self.slots.iter().filter(|j| !j.is_free()) {
            writeln!(
                out,
                "[{}] ({}) {:<11}{}",
                job.jid,
                job.pid,
                job.state.label(),
                job.cmdline()
            )?;
        }
        Ok(())
    }

    fn max_jid(&self) -> i32 {
        self.slots.iter().map(|j| j.jid).max().unwrap_or(0)
    }
}

// The single process-wide cell holding the table. Set once in main, before
// any signal handler is installed; handlers reach it through try_with only.
static TABLE: OnceCell<MaskedCell<JobTable>> = OnceCell::new();

/// Initializes the process-wide job table. Must run before handler
/// installation; a second call is ignored.
pub fn init(verbose: bool) {
    let _ = TABLE.set(MaskedCell::new(JobTable::new(verbose)));
}

/// Runs `f` on the job table inside a masked critical section. Main-flow
/// entry point; the table must have been initialized.
pub fn with_table<R>(f: impl FnOnce(&mut JobTable) -> R) -> R {
    try_with_table(f).expect("job table not initialized")
}

/// Handler-side entry point: silently does nothing before initialization.
pub fn try_with_table<R>(f: impl FnOnce(&mut JobTable) -> R) -> Option<R> {
    TABLE.get().map(|cell| cell.with(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked_table() -> JobTable {
        // Table entry points assert the gate is closed in debug builds.
        mask::block();
        JobTable::new(false)
    }

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn add_then_find_round_trip() {
        let mut t = blocked_table();
        assert!(t.add(pid(100), JobState::Background, "sleep 5 &"));
        let (jid, state, line) = {
            let job = t.find_by_pid(pid(100)).unwrap();
            (job.jid, job.state, job.cmdline().to_string())
        };
        assert_eq!(jid, 1);
        assert_eq!(state, JobState::Background);
        assert_eq!(line, "sleep 5 &");
        let by_jid = t.find_by_jid_mut(jid).unwrap();
        assert_eq!(by_jid.pid, pid(100));
        assert_eq!(by_jid.cmdline(), "sleep 5 &");
    }

    #[test]
    fn rejects_invalid_pid() {
        let mut t = blocked_table();
        assert!(!t.add(pid(0), JobState::Background, "x"));
        assert!(!t.add(pid(-3), JobState::Background, "x"));
        assert!(t.find_by_pid(pid(0)).is_none());
    }

    #[test]
    fn jid_reused_after_deleting_highest() {
        let mut t = blocked_table();
        for n in 1..=4 {
            assert!(t.add(pid(100 + n), JobState::Background, "job"));
        }
        assert!(t.remove(pid(104))); // jid 4, the maximum
        assert!(t.add(pid(200), JobState::Background, "job"));
        assert_eq!(t.find_by_pid(pid(200)).unwrap().jid, 4);
    }

    #[test]
    fn jid_not_reused_while_higher_live() {
        let mut t = blocked_table();
        for n in 1..=3 {
            assert!(t.add(pid(100 + n), JobState::Background, "job"));
        }
        assert!(t.remove(pid(101))); // jid 1; jids 2 and 3 still live
        assert!(t.add(pid(200), JobState::Background, "job"));
        assert_eq!(t.find_by_pid(pid(200)).unwrap().jid, 4);
    }

    #[test]
    fn jids_stay_unique_after_allocator_wrap_and_delete() {
        let mut t = blocked_table();
        // Filling the table wraps the allocator back to 1.
        for n in 0..MAXJOBS as i32 {
            assert!(t.add(pid(1000 + n), JobState::Background, "job"));
        }
        assert!(t.remove(pid(1000))); // jid 1; 2..=16 still live
        assert!(t.add(pid(2000), JobState::Background, "job"));
        let mut jids: Vec<i32> = (0..MAXJOBS as i32)
            .skip(1)
            .filter_map(|n| t.find_by_pid(pid(1000 + n)).map(|j| j.jid))
            .collect();
        jids.push(t.find_by_pid(pid(2000)).unwrap().jid);
        let live = jids.len();
        jids.sort_unstable();
        jids.dedup();
        assert_eq!(jids.len(), live, "duplicate jid after wrap: {:?}", jids);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut t = blocked_table();
        assert!(t.add(pid(100), JobState::Foreground, "cat"));
        assert!(t.remove(pid(100)));
        assert!(!t.remove(pid(100)));
        assert!(t.find_by_pid(pid(100)).is_none());
    }

    #[test]
    fn add_refused_at_capacity() {
        let mut t = blocked_table();
        for n in 0..MAXJOBS as i32 {
            assert!(t.add(pid(1000 + n), JobState::Background, "job"));
        }
        assert!(!t.add(pid(9999), JobState::Background, "one too many"));
        assert!(t.find_by_pid(pid(9999)).is_none());
        for n in 0..MAXJOBS as i32 {
            assert!(t.find_by_pid(pid(1000 + n)).is_some());
        }
    }

    #[test]
    fn fg_pid_finds_the_foreground_job() {
        let mut t = blocked_table();
        assert!(t.add(pid(100), JobState::Background, "a &"));
        assert_eq!(t.fg_pid(), None);
        assert!(t.add(pid(101), JobState::Foreground, "b"));
        assert_eq!(t.fg_pid(), Some(pid(101)));
        t.find_by_pid_mut(pid(101)).unwrap().state = JobState::Stopped;
        assert_eq!(t.fg_pid(), None);
    }

    #[test]
    fn list_formats_states() {
        let mut t = blocked_table();
        assert!(t.add(pid(100), JobState::Background, "sleep 5 &"));
        assert!(t.add(pid(101), JobState::Stopped, "vim notes"));
        let mut out = Vec::new();
        t.list(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "[1] (100) Running    sleep 5 &\n[2] (101) Stopped    vim notes\n"
        );
    }

    #[test]
    fn long_command_line_is_truncated_not_lost() {
        let mut t = blocked_table();
        let long = "x".repeat(MAXLINE + 100);
        assert!(t.add(pid(100), JobState::Background, &long));
        assert_eq!(t.find_by_pid(pid(100)).unwrap().cmdline().len(), MAXLINE);
    }
}

//! The signal mask gate: the shell's only mutual-exclusion mechanism.
//!
//! The job table has exactly two kinds of writers: the single-threaded
//! command loop and the signal handlers that preempt it. Blocking SIGCHLD,
//! SIGINT and SIGTSTP around every table access suppresses the handlers
//! entirely, so no two critical sections can overlap. An ordinary mutex
//! would not work here: handlers may not take locks, and a handler that
//! interrupts the lock holder would deadlock.

use std::cell::UnsafeCell;

use nix::sys::signal::{self, SigSet, SigmaskHow, Signal};

/// The three signals that may mutate the job table asynchronously.
pub fn job_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTSTP);
    set
}

/// Adds the job-control signals to the calling thread's blocked set.
pub fn block() {
    let _ = signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&job_signals()), None);
}

/// Removes the job-control signals from the calling thread's blocked set.
pub fn unblock() {
    let _ = signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&job_signals()), None);
}

/// Blocks the job-control signals and returns the previous mask, for use
/// with [`restore`] or with `sigsuspend` in the foreground-wait loop.
pub fn block_saving() -> SigSet {
    let mut prev = SigSet::empty();
    let _ = signal::sigprocmask(
        SigmaskHow::SIG_BLOCK,
        Some(&job_signals()),
        Some(&mut prev),
    );
    prev
}

/// Reinstates a mask previously returned by [`block_saving`].
pub fn restore(prev: &SigSet) {
    let _ = signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(prev), None);
}

/// Debug-only check that the gate is closed, run at every job-table entry
/// point to catch a missing `block()` early.
#[inline]
pub fn debug_assert_blocked() {
    #[cfg(debug_assertions)]
    {
        if let Ok(current) = SigSet::thread_get_mask() {
            debug_assert!(current.contains(Signal::SIGCHLD), "SIGCHLD not blocked");
            debug_assert!(current.contains(Signal::SIGINT), "SIGINT not blocked");
            debug_assert!(current.contains(Signal::SIGTSTP), "SIGTSTP not blocked");
        }
    }
}

/// A value whose every access runs inside a blocked-signal critical section.
///
/// `with` closes the gate, lends out `&mut T`, and restores the previous
/// mask on the way out. Restoring (rather than unblocking) makes nested
/// entries safe, including from handler context where the signals are
/// already blocked by `sa_mask`.
///
/// Callers must not re-enter `with` on the same cell from inside the
/// closure: the borrow is exclusive for the duration of the call.
pub struct MaskedCell<T> {
    inner: UnsafeCell<T>,
}

// All access paths run on the process's main thread, either in the command
// loop or in a signal handler that preempted it; the mask discipline makes
// them mutually exclusive.
unsafe impl<T: Send> Sync for MaskedCell<T> {}

impl<T> MaskedCell<T> {
    pub fn new(value: T) -> Self {
        MaskedCell {
            inner: UnsafeCell::new(value),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let prev = block_saving();
        let out = f(unsafe { &mut *self.inner.get() });
        restore(&prev);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_saving_restores_previous_mask() {
        let before = SigSet::thread_get_mask().unwrap();
        let prev = block_saving();
        let during = SigSet::thread_get_mask().unwrap();
        assert!(during.contains(Signal::SIGCHLD));
        assert!(during.contains(Signal::SIGINT));
        assert!(during.contains(Signal::SIGTSTP));
        restore(&prev);
        let after = SigSet::thread_get_mask().unwrap();
        assert_eq!(
            after.contains(Signal::SIGCHLD),
            before.contains(Signal::SIGCHLD)
        );
    }

    #[test]
    fn masked_cell_gives_exclusive_access() {
        let cell = MaskedCell::new(0u32);
        cell.with(|v| *v += 1);
        cell.with(|v| *v += 1);
        assert_eq!(cell.with(|v| *v), 2);
    }

    #[test]
    fn masked_cell_blocks_inside_with() {
        let cell = MaskedCell::new(());
        cell.with(|_| {
            let current = SigSet::thread_get_mask().unwrap();
            assert!(current.contains(Signal::SIGCHLD));
        });
    }
}

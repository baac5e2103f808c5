//! Playback Control — the exclusive slot, cancellation and global flags
//!
//! One `PlaybackControl` is shared by the scheduler and the event
//! dispatcher. The slot mutex gates actuator I/O; the cancel flag is the
//! cooperative preemption signal, observed at step boundaries and inside
//! step waits. Cancellation never interrupts an actuator write in flight.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::sink::LinearPosition;

/// Shared playback state: slot, cancel signal, enable flag, linear toggle
pub struct PlaybackControl {
    /// The exclusive playback slot; only the holder may issue actuator commands
    slot: Mutex<()>,
    /// Advisory marker for the non-exclusive contract check
    slot_held: AtomicBool,
    /// Number of tasks currently waiting to acquire the slot
    waiters: AtomicUsize,
    /// Cooperative preemption signal
    cancel: AtomicBool,
    /// Wakes cancellation-aware waits when the signal is raised
    cancel_notify: Notify,
    /// Global enable; off skips device I/O while preserving step timing
    enabled: AtomicBool,
    /// Alternates per linear command so motion reverses every step
    linear_top: AtomicBool,
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(()),
            slot_held: AtomicBool::new(false),
            waiters: AtomicUsize::new(0),
            cancel: AtomicBool::new(false),
            cancel_notify: Notify::new(),
            enabled: AtomicBool::new(false),
            linear_top: AtomicBool::new(false),
        }
    }

    /// Raise the cancellation signal. Idempotent; never blocks. The current
    /// holder observes it at its next step boundary or mid-wait.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.cancel_notify.notify_waiters();
    }

    /// Whether cancellation has been requested
    #[inline]
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    /// Resolves once cancellation is requested; resolves immediately when the
    /// signal is already raised. This is the interruptible-wait primitive the
    /// scheduler races against step sleeps.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.cancel_notify.notified();
            tokio::pin!(notified);
            // Register before re-checking so a notify between the check and
            // the await is not lost.
            notified.as_mut().enable();
            if self.cancel_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Global enable flag
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Flip the linear target and return the new position
    pub fn toggle_linear(&self) -> LinearPosition {
        let top = !self.linear_top.fetch_not(Ordering::SeqCst);
        if top {
            LinearPosition::Top
        } else {
            LinearPosition::Bottom
        }
    }

    /// Whether some playback currently holds the slot (advisory)
    #[inline]
    pub fn slot_held(&self) -> bool {
        self.slot_held.load(Ordering::SeqCst)
    }

    /// Acquire the exclusive playback slot without preempting, waiting for
    /// the current holder to release. No timeout.
    pub async fn acquire_slot(&self) -> PlaybackGuard<'_> {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let guard = self.slot.lock().await;
        self.finish_acquire(guard)
    }

    /// Raise the cancellation signal and take the slot once the current
    /// holder releases. Registers as a waiter before signalling so a later
    /// preemptor is never lost: while other waiters remain queued the
    /// cancel flag stays raised, and each intermediate holder yields at its
    /// first boundary. The last trigger wins.
    pub async fn preempt_and_acquire(&self) -> PlaybackGuard<'_> {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        self.request_cancel();
        let guard = self.slot.lock().await;
        self.finish_acquire(guard)
    }

    fn finish_acquire<'a>(&'a self, guard: MutexGuard<'a, ()>) -> PlaybackGuard<'a> {
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        self.slot_held.store(true, Ordering::SeqCst);
        // Stale requests are consumed here, but only when nobody else is
        // queued to preempt this holder in turn.
        if self.waiters.load(Ordering::SeqCst) == 0 {
            self.clear_cancel();
        }
        PlaybackGuard {
            control: self,
            _guard: guard,
        }
    }
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle for the playback slot. The cancel flag is left as-is on
/// release; the next acquisition consumes it.
pub struct PlaybackGuard<'a> {
    control: &'a PlaybackControl,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for PlaybackGuard<'_> {
    fn drop(&mut self) {
        self.control.slot_held.store(false, Ordering::SeqCst);
    }
}

//! Generation-stamped timers for room actors.
//!
//! A room runs one timer at a time per *purpose* (choice window, vote
//! window, a player's reconnect grace, ...). Every timer is stamped with
//! the room's state generation at the moment it was armed; when it fires,
//! the room compares that stamp with its current generation and drops the
//! firing if the state has moved on.
//!
//! # Integration
//!
//! The queue never spawns tasks. It sits inside the room actor's
//! `tokio::select!` loop next to the command mailbox:
//!
//! ```ignore
//! loop {
//!     let deadline = timers.next_deadline();
//!     tokio::select! {
//!         cmd = inbox.recv() => { /* handle command */ }
//!         () = partyroom_timer::wait_until(deadline) => {
//!             for fired in timers.pop_expired(Instant::now()) {
//!                 if fired.is_current(generation) { /* apply */ }
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Time comes from `tokio::time`, so tests can pause and advance the clock.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// An armed (or just fired) timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerHandle<P> {
    /// What the timer is for. At most one timer per purpose is armed.
    pub purpose: P,
    /// State generation the timer was armed for.
    pub generation: u64,
    /// When the timer fires.
    pub deadline: Instant,
}

impl<P> TimerHandle<P> {
    /// `true` if the room is still in the generation this timer was armed
    /// for. A `false` firing must be ignored.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters kept by a [`TimerQueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub armed: u64,
    /// Arms that replaced a pending timer with the same purpose.
    pub replaced: u64,
    pub cancelled: u64,
    pub fired: u64,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// The pending timers of one room, keyed by purpose.
#[derive(Debug)]
pub struct TimerQueue<P> {
    owner: String,
    armed: HashMap<P, TimerHandle<P>>,
    stats: TimerStats,
}

impl<P> TimerQueue<P>
where
    P: Clone + Eq + Hash + Debug,
{
    /// Creates an empty queue. `owner` labels trace output (the room code).
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            armed: HashMap::new(),
            stats: TimerStats::default(),
        }
    }

    /// Arms a timer for `purpose`, firing `after` from now.
    ///
    /// Any timer already armed for the same purpose is discarded.
    pub fn arm(&mut self, purpose: P, after: Duration, generation: u64) -> TimerHandle<P> {
        let handle = TimerHandle {
            purpose: purpose.clone(),
            generation,
            deadline: Instant::now() + after,
        };
        if self.armed.insert(purpose, handle.clone()).is_some() {
            self.stats.replaced += 1;
        }
        self.stats.armed += 1;
        trace!(
            owner = %self.owner,
            purpose = ?handle.purpose,
            generation,
            after_ms = after.as_millis() as u64,
            "timer armed"
        );
        handle
    }

    /// Disarms the timer for `purpose`, returning it if one was pending.
    pub fn cancel(&mut self, purpose: &P) -> Option<TimerHandle<P>> {
        let removed = self.armed.remove(purpose);
        if let Some(handle) = &removed {
            self.stats.cancelled += 1;
            trace!(owner = %self.owner, purpose = ?handle.purpose, "timer cancelled");
        }
        removed
    }

    /// Disarms every timer whose purpose matches `pred`. Returns how many
    /// were removed.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&P) -> bool) -> usize {
        let before = self.armed.len();
        self.armed.retain(|purpose, _| !pred(purpose));
        let removed = before - self.armed.len();
        self.stats.cancelled += removed as u64;
        removed
    }

    /// Earliest pending deadline, or `None` when nothing is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().map(|h| h.deadline).min()
    }

    /// Removes and returns every timer due at `now`, earliest first.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<TimerHandle<P>> {
        let due: Vec<P> = self
            .armed
            .iter()
            .filter(|(_, h)| h.deadline <= now)
            .map(|(p, _)| p.clone())
            .collect();

        let mut fired: Vec<TimerHandle<P>> =
            due.iter().filter_map(|p| self.armed.remove(p)).collect();
        fired.sort_by_key(|h| h.deadline);

        self.stats.fired += fired.len() as u64;
        for handle in &fired {
            trace!(
                owner = %self.owner,
                purpose = ?handle.purpose,
                generation = handle.generation,
                "timer fired"
            );
        }
        fired
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    /// `true` when no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> TimerStats {
        self.stats
    }
}

/// Sleeps until `deadline`, or pends forever when there is none.
///
/// Meant for a `tokio::select!` branch: with nothing armed the branch
/// simply never completes and the other branches keep running.
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_current() {
        let handle = TimerHandle {
            purpose: "vote",
            generation: 4,
            deadline: Instant::now(),
        };
        assert!(handle.is_current(4));
        assert!(!handle.is_current(5));
    }

    #[tokio::test]
    async fn test_empty_queue_has_no_deadline() {
        let queue: TimerQueue<&str> = TimerQueue::new("ROOM01");
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}

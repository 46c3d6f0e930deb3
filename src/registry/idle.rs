//! Debounced close-after-idle timers.
//!
//! Each empty session carries at most one pending timer: a spawned task
//! that sleeps out the grace period and then asks the registry to remove
//! the entry. Re-arming cancels the previous timer and restarts the clock
//! (repeated empty transitions restart the countdown rather than racing
//! multiple timers). The generation counter makes a too-late abort benign:
//! a task that already woke up fails its generation check inside
//! `finish_close` and removes nothing.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::game::SessionId;

use super::SessionRegistry;

/// Per-session timer state. Mutated only while the caller holds that
/// session's registry entry lock.
pub(crate) struct IdleState {
    generation: u64,
    pending: Option<PendingClose>,
}

struct PendingClose {
    generation: u64,
    task: JoinHandle<()>,
}

impl IdleState {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            pending: None,
        }
    }

    /// Cancel and discard any pending timer. No-op if none is armed.
    pub(crate) fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }

    /// Arm a fresh timer, cancelling any previous one first.
    pub(crate) fn arm(&mut self, registry: SessionRegistry, id: SessionId, timeout: Duration) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.finish_close(&id, generation);
        });
        self.pending = Some(PendingClose { generation, task });
    }

    /// Whether the timer identified by `generation` is still the armed one.
    pub(crate) fn is_armed(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

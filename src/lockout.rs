use std::time::{Duration, Instant};

/// Default delay between engaging the lockout and its automatic release.
pub const DEFAULT_LOCKOUT_DELAY: Duration = Duration::from_secs(10);

pub type LockEpoch = u64;

/// Epoch-keyed lock state.
///
/// Every transition into or out of a forced unlock bumps the epoch, so a
/// scheduled release captured before a RESET can never unlock a later lock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockoutController {
    locked: bool,
    engaged_at: Option<Instant>,
    epoch: LockEpoch,
}

impl LockoutController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks and returns the epoch a release must present.
    pub fn engage(&mut self, now: Instant) -> LockEpoch {
        self.epoch += 1;
        self.locked = true;
        self.engaged_at = Some(now);
        self.epoch
    }

    /// Unlocks when locked under `epoch`. Stale epochs are ignored.
    pub fn release(&mut self, epoch: LockEpoch) -> bool {
        if !self.locked || epoch != self.epoch {
            return false;
        }

        self.locked = false;
        self.engaged_at = None;
        true
    }

    /// Unlocks unconditionally and invalidates any outstanding release.
    pub fn force_unlock(&mut self) {
        self.epoch += 1;
        self.locked = false;
        self.engaged_at = None;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn epoch(&self) -> LockEpoch {
        self.epoch
    }

    pub fn engaged_at(&self) -> Option<Instant> {
        self.engaged_at
    }

    /// Time left before a release scheduled with `delay` is due.
    pub fn remaining(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let engaged_at = self.engaged_at?;
        Some(delay.saturating_sub(now.saturating_duration_since(engaged_at)))
    }
}

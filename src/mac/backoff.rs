//! Backoff randomness.

use std::collections::VecDeque;
use std::fmt::Debug;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of backoff slot counts.
///
/// Never a process-wide generator: each segment owns one, so a seed fully
/// determines every collision/retry sequence.
pub trait BackoffSource: Debug + Send {
    /// Pick a slot count in `[0, window)`. A window of 0 or 1 always yields 0.
    fn pick_slots(&mut self, window: u64) -> u64;
}

/// Size of the contention window after `collisions` collisions:
/// `2^min(collisions, limit)` (truncated binary exponential backoff).
pub fn backoff_window(collisions: u32, limit: u32) -> u64 {
    1u64 << collisions.min(limit).min(63)
}

/// ChaCha8-backed uniform backoff.
#[derive(Debug, Clone)]
pub struct SeededBackoff {
    rng: ChaCha8Rng,
}

impl SeededBackoff {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl BackoffSource for SeededBackoff {
    fn pick_slots(&mut self, window: u64) -> u64 {
        if window <= 1 {
            return 0;
        }
        self.rng.gen_range(0..window)
    }
}

/// Replays a fixed list of slot counts, then falls back to 0.
///
/// Values are clamped into the current window so a script cannot pick a slot
/// the real algorithm never could.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackoff {
    slots: VecDeque<u64>,
}

impl ScriptedBackoff {
    pub fn new(slots: impl IntoIterator<Item = u64>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.slots.len()
    }
}

impl BackoffSource for ScriptedBackoff {
    fn pick_slots(&mut self, window: u64) -> u64 {
        let pick = self.slots.pop_front().unwrap_or(0);
        pick.min(window.saturating_sub(1))
    }
}

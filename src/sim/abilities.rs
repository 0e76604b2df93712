//! Player abilities: sleep (one-shot invulnerability) and direction reversal

use serde::{Deserialize, Serialize};

use super::state::{BallState, RunStatus};

/// Ability flags for one attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    /// Sleep may be used once per attempt
    pub sleep_used: bool,
    pub sleep_active: bool,
    /// Simulation clock (ms) at which the active sleep ends
    pub sleep_expires_at: Option<u64>,
    /// Authoritative direction; the ball mirrors it
    pub reversed: bool,
}

impl AbilityState {
    /// Start sleeping. Returns the expiry time, or `None` if not allowed.
    pub fn activate_sleep(&mut self, status: RunStatus, now: u64, duration_ms: u64) -> Option<u64> {
        if self.sleep_used || status != RunStatus::Playing {
            return None;
        }
        let expires_at = now + duration_ms;
        self.sleep_used = true;
        self.sleep_active = true;
        self.sleep_expires_at = Some(expires_at);
        Some(expires_at)
    }

    /// End an active sleep. `sleep_used` stays set for the attempt.
    pub fn end_sleep(&mut self) -> bool {
        let was_active = self.sleep_active;
        self.sleep_active = false;
        self.sleep_expires_at = None;
        was_active
    }

    /// Flip direction instantly. Not allowed while asleep.
    pub fn toggle_reverse(&mut self, ball: &mut BallState, status: RunStatus) -> bool {
        if status != RunStatus::Playing || self.sleep_active {
            return false;
        }
        self.set_reversed(ball, !self.reversed);
        true
    }

    /// Set direction (wall bounces use this too)
    pub fn set_reversed(&mut self, ball: &mut BallState, reversed: bool) {
        self.reversed = reversed;
        ball.set_direction(reversed);
    }
}

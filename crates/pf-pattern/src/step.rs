//! Pattern Steps
//!
//! One (relative strength, duration) pair. A zero-strength step is a timed
//! pause with no actuator output.

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, PatternResult};

/// Single step of a haptic pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternStep {
    /// Relative strength in [0, 1]; 0 means "pause"
    pub strength: f32,
    /// Step duration in seconds; must be positive
    pub duration_secs: f32,
}

impl PatternStep {
    /// Create a step driving actuators at `strength` for `duration_secs`
    pub fn new(strength: f32, duration_secs: f32) -> Self {
        Self {
            strength,
            duration_secs,
        }
    }

    /// Create a timed pause (no actuator output)
    pub fn pause(duration_secs: f32) -> Self {
        Self::new(0.0, duration_secs)
    }

    /// Whether this step is a pure pause
    #[inline]
    pub fn is_pause(&self) -> bool {
        self.strength <= 0.0
    }

    /// Returns the duration if it is usable, `None` for non-positive or
    /// non-finite values. The scheduler treats `None` as a zero-length no-op.
    pub fn checked_duration(&self) -> Option<f32> {
        (self.duration_secs.is_finite() && self.duration_secs > 0.0).then_some(self.duration_secs)
    }

    /// Validate strength and duration ranges
    pub fn validate(&self) -> PatternResult<()> {
        if !(0.0..=1.0).contains(&self.strength) || !self.strength.is_finite() {
            return Err(PatternError::InvalidStrength(self.strength));
        }
        if self.checked_duration().is_none() {
            return Err(PatternError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }
}

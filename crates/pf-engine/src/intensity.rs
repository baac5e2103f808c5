//! Intensity Policy — session-level base strength
//!
//! Computes the scalar every step's relative strength is multiplied by.
//! Three modes:
//! - `OnItem`: fixed operator-set strength; check traffic has no effect
//! - `Percent`: fraction of the session's locations already checked
//! - `Time`: ramps up 0.05 per uninterrupted pattern loop, resets to the
//!   floor on every location check
//!
//! The base strength is an atomic float read by the scheduler once per step;
//! mode and progress writes are serialized behind short locks.

use std::str::FromStr;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use portable_atomic::AtomicF32;
use serde::{Deserialize, Serialize};

/// Floor and per-loop increment for Time mode
pub const TIME_FLOOR: f32 = 0.05;
const TIME_RAMP_STEP: f32 = 0.05;

/// Default operator strength for OnItem mode
pub const DEFAULT_MANUAL_STRENGTH: f32 = 0.5;

/// How the base strength is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityMode {
    /// Fixed strength; patterns play once per item
    OnItem,
    /// Strength tracks percent of locations checked
    Percent,
    /// Strength ramps with time since the last check
    Time,
}

impl FromStr for IntensityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onitem" | "on-item" | "on_item" | "item" => Ok(IntensityMode::OnItem),
            "percent" => Ok(IntensityMode::Percent),
            "time" => Ok(IntensityMode::Time),
            other => Err(format!("unknown intensity mode '{other}'")),
        }
    }
}

/// Session counters mirrored from the game session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub checked: u64,
    pub missing: u64,
}

impl SessionProgress {
    /// Fraction of known locations already checked, in [0, 1]
    pub fn percent_complete(&self) -> f32 {
        let total = self.checked + self.missing;
        if total == 0 {
            0.0
        } else {
            (self.checked as f32 / total as f32).clamp(0.0, 1.0)
        }
    }
}

/// Derives the current base strength from mode, counters and loop ticks
pub struct IntensityPolicy {
    mode: Mutex<IntensityMode>,
    progress: Mutex<SessionProgress>,
    base: AtomicF32,
    manual_strength: AtomicF32,
}

impl IntensityPolicy {
    pub fn new(mode: IntensityMode) -> Self {
        let policy = Self {
            mode: Mutex::new(mode),
            progress: Mutex::new(SessionProgress::default()),
            base: AtomicF32::new(0.0),
            manual_strength: AtomicF32::new(DEFAULT_MANUAL_STRENGTH),
        };
        policy.recompute();
        policy
    }

    /// Active mode
    pub fn mode(&self) -> IntensityMode {
        *self.mode.lock()
    }

    /// Switch modes; returns true when the mode actually changed so the
    /// caller can cancel any active pattern. Counters are preserved; only
    /// the derived strength is recomputed.
    pub fn set_mode(&self, mode: IntensityMode) -> bool {
        let changed = {
            let mut current = self.mode.lock();
            let changed = *current != mode;
            *current = mode;
            changed
        };
        if changed {
            self.recompute();
        }
        changed
    }

    /// Operator strength override (OnItem base and manual floor)
    pub fn set_manual_strength(&self, strength: f32) {
        let clamped = strength.clamp(0.0, 1.0);
        self.manual_strength.store(clamped, Ordering::SeqCst);
        if self.mode() == IntensityMode::OnItem {
            self.base.store(clamped, Ordering::SeqCst);
        }
    }

    /// Current base strength in [0, 1]
    #[inline]
    pub fn base_strength(&self) -> f32 {
        self.base.load(Ordering::SeqCst)
    }

    /// Snapshot of the session counters
    pub fn progress(&self) -> SessionProgress {
        *self.progress.lock()
    }

    /// Connection established: the snapshot replaces local counters wholesale
    pub fn on_connect(&self, checked: u64, missing: u64) {
        {
            let mut progress = self.progress.lock();
            *progress = SessionProgress { checked, missing };
        }
        self.recompute();
        log::info!(
            "[Intensity] Connected: {checked} checked / {missing} missing, base {:.3}",
            self.base_strength()
        );
    }

    /// One or more locations were checked
    pub fn on_location_checked(&self, count: u64) {
        {
            let mut progress = self.progress.lock();
            progress.checked += count;
            // Drift-prone double decrement carried over from the session
            // source's accounting; a fresh Connected snapshot resynchronizes.
            progress.missing = progress.missing.saturating_sub(2 * count);
        }
        match self.mode() {
            // OnItem strength is unaffected by check traffic
            IntensityMode::OnItem => {}
            IntensityMode::Percent => self.recompute(),
            // The "time since last check" signal: drop back to the floor
            IntensityMode::Time => self.base.store(TIME_FLOOR, Ordering::SeqCst),
        }
    }

    /// One full pattern loop completed without interruption (Time-mode ramp)
    pub fn on_loop_completed(&self) {
        if self.mode() != IntensityMode::Time {
            return;
        }
        let _ = self.base.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |base| {
            Some((base + TIME_RAMP_STEP).min(1.0))
        });
    }

    /// Reset any Time-mode ramp to the floor (disable/enable transitions)
    pub fn reset_ramp(&self) {
        if self.mode() == IntensityMode::Time {
            self.base.store(TIME_FLOOR, Ordering::SeqCst);
        }
    }

    fn recompute(&self) {
        let base = match self.mode() {
            IntensityMode::OnItem => self.manual_strength.load(Ordering::SeqCst),
            IntensityMode::Percent => self.progress.lock().percent_complete(),
            IntensityMode::Time => TIME_FLOOR,
        };
        self.base.store(base.clamp(0.0, 1.0), Ordering::SeqCst);
    }
}

//! # pf-engine — PulseForge Playback Engine
//!
//! The core of the haptic feedback loop:
//! - `ActuatorSink`: trait boundary to the device-control transport
//! - `PlaybackControl`: the exclusive playback slot, cancellation signal,
//!   enable flag and linear-position toggle
//! - `IntensityPolicy`: session-level base-strength computation
//! - `PatternScheduler`: the step loop that plays exactly one sequence at a
//!   time and always leaves actuators at zero
//!
//! ## Architecture
//!
//! ```text
//! GameEvent ──▶ dispatcher (pf-session) ──▶ PatternScheduler::play()
//!                                              │  acquire slot, preempting
//!                                              │  the current holder
//!                                              ▼
//!                                   step loop ──▶ ActuatorSink
//!                                        ▲
//!                        IntensityPolicy ┘ (base strength per step/loop)
//! ```
//!
//! Playback never crashes the process: bad pattern data, missing devices and
//! transport failures degrade to silence.

pub mod intensity;
pub mod playback;
pub mod scheduler;
pub mod sink;

pub use intensity::{IntensityMode, IntensityPolicy, SessionProgress};
pub use playback::{PlaybackControl, PlaybackGuard};
pub use scheduler::{PatternScheduler, PlayOptions};
pub use sink::{ActuatorSink, DeviceId, LinearPosition, LogSink, NullSink, SinkError};

//! # pf-pattern — PulseForge Pattern Library
//!
//! Pure data layer for haptic feedback motifs:
//! - `PatternStep`: one (relative strength, duration) pair
//! - `PatternSequence`: ordered, non-empty list of steps, immutable after construction
//! - `PatternLibrary`: one named sequence per event slot, with built-in defaults
//!   and JSON overrides
//!
//! No device I/O and no scheduling lives here; the library is static
//! configuration consumed by `pf-engine`.

pub mod error;
pub mod library;
pub mod sequence;
pub mod step;

pub use error::{PatternError, PatternResult};
pub use library::{PatternLibrary, PatternLibraryOverrides, PatternSlot};
pub use sequence::PatternSequence;
pub use step::PatternStep;

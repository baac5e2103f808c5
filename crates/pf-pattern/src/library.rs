//! Pattern Library
//!
//! One sequence per event slot. `Default` carries the built-in motifs;
//! individual slots can be replaced at startup from a JSON overrides file.

use serde::{Deserialize, Serialize};

use crate::error::PatternResult;
use crate::sequence::PatternSequence;
use crate::step::PatternStep;

/// Selection key for library lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSlot {
    /// Progression item received
    Progression,
    /// Useful item received
    Useful,
    /// Trap item received
    Trap,
    /// Trash item received
    Trash,
    /// Location checked
    Location,
    /// Cross-session link signal
    Link,
    /// Operator self-test
    SelfTest,
}

impl PatternSlot {
    /// Every slot, in a fixed order
    pub const ALL: [PatternSlot; 7] = [
        PatternSlot::Progression,
        PatternSlot::Useful,
        PatternSlot::Trap,
        PatternSlot::Trash,
        PatternSlot::Location,
        PatternSlot::Link,
        PatternSlot::SelfTest,
    ];
}

/// Library holding one sequence per slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternLibrary {
    progression: PatternSequence,
    useful: PatternSequence,
    trap: PatternSequence,
    trash: PatternSequence,
    location: PatternSequence,
    link: PatternSequence,
    self_test: PatternSequence,
}

/// Partial overrides parsed from a JSON config; unset slots keep defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternLibraryOverrides {
    pub progression: Option<PatternSequence>,
    pub useful: Option<PatternSequence>,
    pub trap: Option<PatternSequence>,
    pub trash: Option<PatternSequence>,
    pub location: Option<PatternSequence>,
    pub link: Option<PatternSequence>,
    pub self_test: Option<PatternSequence>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self {
            progression: single_buzz("progression", 3.0),
            useful: single_buzz("useful", 2.0),
            trap: single_buzz("trap", 4.0),
            trash: single_buzz("trash", 1.0),
            location: single_buzz("location", 0.5),
            link: link_ramp(),
            self_test: self_test_pattern(),
        }
    }
}

impl PatternLibrary {
    /// Library with the built-in motifs
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the sequence for a slot
    pub fn get(&self, slot: PatternSlot) -> &PatternSequence {
        match slot {
            PatternSlot::Progression => &self.progression,
            PatternSlot::Useful => &self.useful,
            PatternSlot::Trap => &self.trap,
            PatternSlot::Trash => &self.trash,
            PatternSlot::Location => &self.location,
            PatternSlot::Link => &self.link,
            PatternSlot::SelfTest => &self.self_test,
        }
    }

    /// Replace the sequence for a slot
    pub fn set(&mut self, slot: PatternSlot, sequence: PatternSequence) {
        match slot {
            PatternSlot::Progression => self.progression = sequence,
            PatternSlot::Useful => self.useful = sequence,
            PatternSlot::Trap => self.trap = sequence,
            PatternSlot::Trash => self.trash = sequence,
            PatternSlot::Location => self.location = sequence,
            PatternSlot::Link => self.link = sequence,
            PatternSlot::SelfTest => self.self_test = sequence,
        }
    }

    /// Apply partial overrides on top of the current library
    pub fn apply_overrides(&mut self, overrides: PatternLibraryOverrides) {
        let PatternLibraryOverrides {
            progression,
            useful,
            trap,
            trash,
            location,
            link,
            self_test,
        } = overrides;
        let slots = [
            (PatternSlot::Progression, progression),
            (PatternSlot::Useful, useful),
            (PatternSlot::Trap, trap),
            (PatternSlot::Trash, trash),
            (PatternSlot::Location, location),
            (PatternSlot::Link, link),
            (PatternSlot::SelfTest, self_test),
        ];
        for (slot, sequence) in slots {
            if let Some(sequence) = sequence {
                log::info!("[PatternLibrary] Override for {:?}: '{}'", slot, sequence.name());
                self.set(slot, sequence);
            }
        }
    }

    /// Build a library from default motifs plus a JSON overrides document
    pub fn from_overrides_json(json: &str) -> PatternResult<Self> {
        let overrides: PatternLibraryOverrides = serde_json::from_str(json)?;
        let mut library = Self::default();
        library.apply_overrides(overrides);
        Ok(library)
    }
}

fn single_buzz(name: &str, duration_secs: f32) -> PatternSequence {
    PatternSequence::new(name, vec![PatternStep::new(1.0, duration_secs)])
        .expect("built-in pattern is valid")
}

/// Rising 0.1..1.0 staircase; `last_secs` lengthens the final full-strength step
fn staircase(step_secs: f32, last_secs: f32) -> Vec<PatternStep> {
    (1..=10)
        .map(|i| {
            let duration = if i == 10 { last_secs } else { step_secs };
            PatternStep::new(i as f32 / 10.0, duration)
        })
        .collect()
}

/// Four rising staircases separated by half-second pauses
fn link_ramp() -> PatternSequence {
    let mut steps = staircase(0.2, 0.2);
    for _ in 0..3 {
        steps.push(PatternStep::pause(0.5));
        steps.extend(staircase(0.1, 0.2));
    }
    PatternSequence::new("link", steps).expect("built-in pattern is valid")
}

/// Two short pulses, a beat, then a longer confirmation buzz
fn self_test_pattern() -> PatternSequence {
    PatternSequence::new(
        "self_test",
        vec![
            PatternStep::new(1.0, 0.1),
            PatternStep::pause(0.1),
            PatternStep::new(1.0, 0.1),
            PatternStep::pause(0.1),
            PatternStep::new(1.0, 0.5),
        ],
    )
    .expect("built-in pattern is valid")
}

//! Pattern Sequences
//!
//! Ordered, non-empty list of steps describing one haptic motif. Sequences
//! are validated at construction and never mutated at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, PatternResult};
use crate::step::PatternStep;

/// Immutable ordered list of pattern steps
///
/// Deserialization funnels through [`PatternSequence::new`], so sequences
/// loaded from config files carry the same invariants as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSequence")]
pub struct PatternSequence {
    name: String,
    steps: Vec<PatternStep>,
}

#[derive(Deserialize)]
struct RawSequence {
    name: String,
    steps: Vec<PatternStep>,
}

impl TryFrom<RawSequence> for PatternSequence {
    type Error = PatternError;

    fn try_from(raw: RawSequence) -> PatternResult<Self> {
        Self::new(raw.name, raw.steps)
    }
}

impl PatternSequence {
    /// Create a sequence, validating every step
    pub fn new(name: impl Into<String>, steps: Vec<PatternStep>) -> PatternResult<Self> {
        let name = name.into();
        if steps.is_empty() {
            return Err(PatternError::EmptySequence(name));
        }
        for step in &steps {
            step.validate()?;
        }
        Ok(Self { name, steps })
    }

    /// Parse a sequence from space-separated `strength,duration` pairs,
    /// e.g. `"0.1,0.2 0.0,0.5 1.0,0.2"` (a zero strength is a pause).
    pub fn parse(name: impl Into<String>, text: &str) -> PatternResult<Self> {
        let mut steps = Vec::new();
        for pair in text.split_whitespace() {
            let Some((strength, duration)) = pair.split_once(',') else {
                return Err(PatternError::MalformedStep(pair.to_string()));
            };
            let strength: f32 = strength
                .trim()
                .parse()
                .map_err(|_| PatternError::MalformedStep(pair.to_string()))?;
            let duration: f32 = duration
                .trim()
                .parse()
                .map_err(|_| PatternError::MalformedStep(pair.to_string()))?;
            steps.push(PatternStep::new(strength, duration));
        }
        Self::new(name, steps)
    }

    /// Sequence name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered steps
    pub fn steps(&self) -> &[PatternStep] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Sequences are never empty, but clippy insists on the pair
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total nominal duration of one pass, in seconds
    pub fn total_duration_secs(&self) -> f32 {
        self.steps.iter().map(|s| s.duration_secs.max(0.0)).sum()
    }
}

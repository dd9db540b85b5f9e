//! Syllabus unit detection.
//!
//! Syllabi are organized into numbered units (sometimes called chapters or
//! modules). Each chunk is labelled with the first unit heading it mentions so
//! that retrieval can be narrowed to one unit.
//!
//! ```
//! use syllabus_rag_context::units::UnitDetector;
//!
//! let detector = UnitDetector::default();
//! assert_eq!(detector.detect("Unit 2 covers informed search"), "Unit-2");
//! assert_eq!(detector.detect("CHAPTER-7: Planning"), "Unit-7");
//! assert_eq!(detector.detect("Course outcomes and grading"), "Unknown");
//! ```
use crate::error::ChunkingError;
use regex::{Regex, RegexBuilder};

/// Label assigned when no heading pattern matches.
pub const UNKNOWN_UNIT: &str = "Unknown";

/// Heading patterns in priority order. Each pattern captures the unit number
/// in group 1 and is matched case-insensitively.
///
/// - `unit[\s-]*(\d+)`: `Unit 1`, `UNIT-1`, `unit1`
/// - `chapter[\s-]*(\d+)`: `Chapter 3`, `CHAPTER-3`
/// - `module[\s-]*(\d+)`: `Module 4`
pub const DEFAULT_UNIT_PATTERNS: &[&str] = &[
    r"unit[\s-]*(\d+)",
    r"chapter[\s-]*(\d+)",
    r"module[\s-]*(\d+)",
];

/// Detects the syllabus unit a piece of text belongs to.
///
/// Patterns are tried in order; the first pattern with any match wins, and
/// within that pattern the earliest match in the text is used.
#[derive(Debug, Clone)]
pub struct UnitDetector {
    patterns: Vec<Regex>,
}

impl UnitDetector {
    /// Compiles `patterns` case-insensitively, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidPattern`] if a pattern does not compile
    /// or has no capture group for the unit number.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ChunkingError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ChunkingError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })?;
                if regex.captures_len() < 2 {
                    return Err(ChunkingError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: "pattern must capture the unit number in group 1".to_string(),
                    });
                }
                Ok(regex)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns `"Unit-{n}"` for the first matching heading pattern, or
    /// [`UNKNOWN_UNIT`].
    pub fn detect(&self, text: &str) -> String {
        for regex in &self.patterns {
            let Some(number) = regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
            else {
                continue;
            };

            // "Unit 01" and "Unit 1" are the same unit.
            return match number.parse::<u64>() {
                Ok(n) => format!("Unit-{n}"),
                Err(_) => format!("Unit-{number}"),
            };
        }
        UNKNOWN_UNIT.to_string()
    }
}

impl Default for UnitDetector {
    fn default() -> Self {
        let patterns = DEFAULT_UNIT_PATTERNS
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("default unit patterns are valid")
            })
            .collect();
        Self { patterns }
    }
}

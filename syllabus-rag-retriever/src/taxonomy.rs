//! Bloom's taxonomy vocabulary for chunk tags.

/// The six cognitive levels, lowest to highest.
pub const BLOOM_LEVELS: [&str; 6] = [
    "Remember",
    "Understand",
    "Apply",
    "Analyze",
    "Evaluate",
    "Create",
];

/// Tag stamped on chunks when the caller assigns none.
pub const DEFAULT_TAXONOMY_TAG: &str = "Apply";

/// Whether `tag` is exactly one of [`BLOOM_LEVELS`].
pub fn is_bloom_level(tag: &str) -> bool {
    BLOOM_LEVELS.contains(&tag)
}

//! Shared test fixtures and utilities for rigkit crates.
//!
//! Provides canonical guide triples, scenes seeded with guide locators, and
//! deterministic RNG setup for randomized properties.

pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{arm_config, arm_guides, leg_config, leg_guides, seeded_scene};
pub use rng::{random_guides, random_isometry, seeded_rng};

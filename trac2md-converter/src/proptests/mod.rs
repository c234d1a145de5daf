//! Property-based tests for the converter
//!
//! These check properties that must hold for any input, complementing the
//! fixture tests with inputs nobody thought to write down.

mod generators;
mod invariants;

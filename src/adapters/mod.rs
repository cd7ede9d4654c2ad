//! Serde adapters for wire values that need lenient handling.

pub mod iso8601;

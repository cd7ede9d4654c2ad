//! Utility modules: retry with backoff.

pub mod retry;

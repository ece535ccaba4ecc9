//! # Pipeline Module
//!
//! High-level orchestration: read, validate, and re-emit reference panels.

pub mod reemit;

pub use reemit::{ReemitPipeline, ReemitSummary};

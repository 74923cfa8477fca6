//! Compute layer for temporal resolution.
//!
//! This module separates lookup and bucketing logic from the history
//! structures that use it. It provides:
//! - Fill-forward search over ascending reference times
//! - Timezone localization with overflow recovery
//! - Period flooring for reporting granularities
//!
//! The compute layer holds no history state of its own.

pub mod temporal;

//! Mimic Test Harness
//!
//! Shared testing utilities for the mimic crates: tracing bootstrap,
//! assertion macros for mock errors, isolation locks for tests that patch
//! the global module registry, YAML fixtures and proptest strategies.

pub mod assertions;
pub mod fixtures;
pub mod isolation;
pub mod strategies;

pub use isolation::{acquire_resource_lock, ResourceLock};

use once_cell::sync::Lazy;

/// Initialize the test harness with tracing support.
///
/// Honors `MIMIC_LOG_LEVEL` and `RUST_LOG`; call at the top of any test that
/// should show model events.
pub fn init() {
    static INIT: Lazy<()> = Lazy::new(mimic_common_log::init_for_tests);
    Lazy::force(&INIT);
}

pub mod config;

/// Common utilities shared across the Prostore services
///
/// This crate provides shared functionality used by the checkout core and
/// the storage/HTTP backend, including:
///
/// - Configuration loading for all executables
/// - Shared test utilities and data factories

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, generate_unique_test_id};

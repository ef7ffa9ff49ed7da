//! Adapters for the scheduling ports

#[cfg(any(test, feature = "mock"))]
pub mod memory;

//! Adapters bundled with the payment domain
//!
//! - **SandboxGateway**: deterministic gateway for manual runs and demos
//! - **memory**: in-memory repositories for tests (`mock` feature)
//!
//! Postgres-backed repositories live in `infra_db`.

#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod sandbox;

pub use sandbox::SandboxGateway;

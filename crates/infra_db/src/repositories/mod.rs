//! PostgreSQL implementations of the domain ports
//!
//! Each repository maps rows onto domain types and driver errors onto
//! `PortError`, so services can be wired to either these or the in-memory
//! adapters without change.

pub mod locks;
pub mod payments;
pub mod scheduling;

pub use locks::PgSubjectLockProvider;
pub use payments::{PgPaymentMethodRepository, PgPaymentRepository, PgTransactionRepository};
pub use scheduling::{PgScheduledPaymentRepository, PgSubscriptionLookup};

//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the payment engine using SQLx: connection
//! pool setup, embedded migrations and repositories implementing every
//! port declared by `domain_payments` and `domain_scheduling`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgPaymentRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/payments")).await?;
//! run_migrations(&pool).await?;
//! let payments = PgPaymentRepository::new(pool.clone());
//! ```

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::{
    PgPaymentMethodRepository, PgPaymentRepository, PgScheduledPaymentRepository,
    PgSubjectLockProvider, PgSubscriptionLookup, PgTransactionRepository,
};

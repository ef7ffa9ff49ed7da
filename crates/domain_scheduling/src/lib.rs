//! Scheduling Domain - Scheduled Payment Trigger Pipeline
//!
//! Scheduled payments wait for a business event (for example the first
//! completed service visit of a subscription) before they are charged. The
//! trigger pipeline finds the pending ones for an area, routes each to the
//! handler for its trigger type and submits due payments as batch payments
//! through `domain_payments`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod ports;
pub mod scheduled;
pub mod submitter;

pub use config::SchedulingConfig;
pub use error::SchedulingError;
pub use handler::{InitialServiceCompletedHandler, TriggerOutcome};
pub use pipeline::{TriggerPipeline, TriggerRunSummary};
pub use ports::{PaymentSubmitter, ScheduledPaymentRepository, SubscriptionLookup};
pub use scheduled::{
    ScheduledPayment, ScheduledPaymentStatus, Subscription, TriggerType, SUBSCRIPTION_ID_KEY,
};

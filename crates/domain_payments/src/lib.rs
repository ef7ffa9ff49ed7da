//! Payments Domain - Gateway Operations and Payment Lifecycle
//!
//! This crate processes monetary operations against an external payment
//! gateway and keeps payment records consistent with what the gateway did.
//!
//! # Components
//!
//! - **Operations**: immutable requests validated per operation type
//! - **Processor**: validate, dispatch, interpret and log against one gateway
//! - **State machine**: legal source statuses and in-flight markers per operation
//! - **Duplicate detection**: suppresses repeated batch charges for the same invoices
//! - **Refunds**: windowed, electronic-only credits and voids, single or in batch
//! - **Subject locks**: one payment creation per account at a time
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_payments::{CreatePaymentRequest, PaymentService};
//!
//! let request = CreatePaymentRequest::new(account_id, method_id, amount, invoice_ids).batch();
//! match service.create_payment(request).await? {
//!     CreatePaymentOutcome::Processed(outcome) => println!("{}", outcome.payment.status),
//!     CreatePaymentOutcome::Duplicate { original } => println!("already paid by {}", original.id),
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod gateway;
pub mod lock;
pub mod method;
pub mod operation;
pub mod payment;
pub mod ports;
pub mod processor;
pub mod refund;
pub mod service;
pub mod status;
pub mod transaction;

pub use config::{PaymentsConfig, CAPTURE_WINDOW_DAYS, TECHNICAL_REFUND_DAYS_LIMIT};
pub use duplicate::{DuplicateCheck, DuplicatePaymentDetector, PaymentCandidate};
pub use error::PaymentError;
pub use gateway::{Gateway, GatewayResponse};
pub use lock::{
    create_payment_lock_key, refund_lock_key, InMemorySubjectLockProvider, LockRelease,
    SubjectLockGuard, SubjectLockProvider,
};
pub use method::{BillingAddress, Instrument, PaymentMethod};
pub use operation::{
    OperationField, OperationRequest, OperationResult, OperationType, ValidationErrors, Violation,
    ViolationKind,
};
pub use payment::{Payment, PaymentType};
pub use ports::{PaymentMethodRepository, PaymentRepository, TransactionRepository};
pub use processor::PaymentProcessor;
pub use refund::{BatchRefundOptions, RefundOutcome, RefundRequest, RefundService, RefundSummary};
pub use service::{CreatePaymentOutcome, CreatePaymentRequest, PaymentOutcome, PaymentService};
pub use status::{PaymentStateMachine, PaymentStatus};
pub use transaction::Transaction;

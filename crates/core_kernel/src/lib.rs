//! Core Kernel - Foundational types shared by the payment domains
//!
//! This crate provides the building blocks every other crate depends on:
//! - Money in integer minor units, so charge amounts never touch floating point
//! - Strongly typed identifiers for payments, accounts, invoices and schedules
//! - Port primitives (error type, pagination) for the ports-and-adapters layout

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    PaymentId, PaymentMethodId, TransactionId, InvoiceId,
    AccountId, SubscriptionId, ScheduledPaymentId,
};
pub use ports::{PortError, DomainPort, Page, PageRequest};

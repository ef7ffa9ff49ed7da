//! Payment operations
//!
//! An [`OperationRequest`] is an immutable value built fresh for every
//! attempt. The processor validates it for an [`OperationType`], hands it to
//! the gateway and returns an [`OperationResult`]; nothing about one call
//! survives into the next.

pub mod field;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Money, PaymentId, PortError};

use crate::error::PaymentError;
use crate::gateway::GatewayResponse;
use crate::method::BillingAddress;
use crate::payment::PaymentType;

pub use field::OperationField;
pub use validator::{validate, OperationRules, ValidationErrors, Violation, ViolationKind};

/// Gateway operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Hold funds without settling
    Authorize,
    /// Settle a previous authorization
    Capture,
    /// Authorize and capture in one step (a sale)
    AuthCapture,
    /// Void an authorization or unsettled capture
    Cancel,
    /// Return funds against a captured transaction
    Credit,
    /// Query the gateway for a transaction's state
    CheckStatus,
    /// Vault an instrument and obtain a token
    Tokenize,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Authorize => "authorize",
            OperationType::Capture => "capture",
            OperationType::AuthCapture => "auth_capture",
            OperationType::Cancel => "cancel",
            OperationType::Credit => "credit",
            OperationType::CheckStatus => "check_status",
            OperationType::Tokenize => "tokenize",
        }
    }

    /// Whether a completed call moves a payment's status
    pub fn moves_status(&self) -> bool {
        !matches!(self, OperationType::CheckStatus | OperationType::Tokenize)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorize" => Ok(OperationType::Authorize),
            "capture" => Ok(OperationType::Capture),
            "auth_capture" => Ok(OperationType::AuthCapture),
            "cancel" => Ok(OperationType::Cancel),
            "credit" => Ok(OperationType::Credit),
            "check_status" => Ok(OperationType::CheckStatus),
            "tokenize" => Ok(OperationType::Tokenize),
            other => Err(PortError::transformation(format!(
                "unknown operation type '{}'",
                other
            ))),
        }
    }
}

/// Input to a single gateway operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationRequest {
    reference_id: Option<String>,
    reference_transaction_id: Option<String>,
    token: Option<String>,
    ach_account_number: Option<String>,
    ach_routing_number: Option<String>,
    ach_token: Option<String>,
    name_on_account: Option<String>,
    billing_address: BillingAddress,
    amount: Option<Money>,
    charge_description: Option<String>,
    email: Option<String>,
    payment_type: Option<PaymentType>,
    payment_id: Option<PaymentId>,
}

impl OperationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference_id(mut self, value: impl Into<String>) -> Self {
        self.reference_id = Some(value.into());
        self
    }

    pub fn with_reference_transaction_id(mut self, value: impl Into<String>) -> Self {
        self.reference_transaction_id = Some(value.into());
        self
    }

    pub fn with_token(mut self, value: impl Into<String>) -> Self {
        self.token = Some(value.into());
        self
    }

    pub fn with_ach_account_number(mut self, value: impl Into<String>) -> Self {
        self.ach_account_number = Some(value.into());
        self
    }

    pub fn with_ach_routing_number(mut self, value: impl Into<String>) -> Self {
        self.ach_routing_number = Some(value.into());
        self
    }

    /// Sets both halves of the raw ACH instrument
    pub fn with_ach_account(self, account_number: impl Into<String>, routing_number: impl Into<String>) -> Self {
        self.with_ach_account_number(account_number)
            .with_ach_routing_number(routing_number)
    }

    pub fn with_ach_token(mut self, value: impl Into<String>) -> Self {
        self.ach_token = Some(value.into());
        self
    }

    pub fn with_name_on_account(mut self, value: impl Into<String>) -> Self {
        self.name_on_account = Some(value.into());
        self
    }

    pub fn with_billing_address(mut self, address: BillingAddress) -> Self {
        self.billing_address = address;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_charge_description(mut self, value: impl Into<String>) -> Self {
        self.charge_description = Some(value.into());
        self
    }

    pub fn with_email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    /// Attaches the payment the call is logged against
    pub fn for_payment(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    /// Textual value of `field`; `None` for absent values and for `Amount`
    pub fn text(&self, field: OperationField) -> Option<&str> {
        let value = match field {
            OperationField::ReferenceId => &self.reference_id,
            OperationField::ReferenceTransactionId => &self.reference_transaction_id,
            OperationField::Token => &self.token,
            OperationField::AchAccountNumber => &self.ach_account_number,
            OperationField::AchRoutingNumber => &self.ach_routing_number,
            OperationField::AchToken => &self.ach_token,
            OperationField::NameOnAccount => &self.name_on_account,
            OperationField::AddressLine1 => &self.billing_address.line1,
            OperationField::City => &self.billing_address.city,
            OperationField::State => &self.billing_address.state,
            OperationField::Zip => &self.billing_address.zip,
            OperationField::ChargeDescription => &self.charge_description,
            OperationField::Email => &self.email,
            OperationField::Amount => return None,
        };
        value.as_deref()
    }

    /// Whether `field` carries a value; blank strings count as absent
    pub fn has(&self, field: OperationField) -> bool {
        match field {
            OperationField::Amount => self.amount.is_some(),
            other => self.text(other).is_some_and(|v| !v.trim().is_empty()),
        }
    }

    pub fn amount(&self) -> Option<Money> {
        self.amount
    }

    pub fn payment_type(&self) -> Option<PaymentType> {
        self.payment_type
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }

    pub fn billing_address(&self) -> &BillingAddress {
        &self.billing_address
    }
}

/// Outcome of a processor call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub operation: OperationType,
    pub successful: bool,
    pub transaction_id: Option<String>,
    pub transaction_status: Option<String>,
    pub raw_response: Option<String>,
    pub error_message: Option<String>,
    pub violations: ValidationErrors,
    pub warnings: Vec<String>,
}

impl OperationResult {
    /// A call stopped by validation; the gateway was never contacted
    pub fn rejected(operation: OperationType, violations: ValidationErrors) -> Self {
        Self {
            operation,
            successful: false,
            transaction_id: None,
            transaction_status: None,
            raw_response: None,
            error_message: Some(violations.to_string()),
            violations,
            warnings: Vec::new(),
        }
    }

    /// Interprets a gateway response
    pub fn from_gateway(operation: OperationType, response: GatewayResponse) -> Self {
        Self {
            operation,
            successful: response.is_successful,
            transaction_id: response.transaction_id,
            transaction_status: response.transaction_status,
            raw_response: response.raw_response,
            error_message: response.error_message,
            violations: ValidationErrors::new(),
            warnings: Vec::new(),
        }
    }

    /// A transport failure, reported exactly like a decline
    pub fn transport_failure(operation: OperationType, message: impl Into<String>) -> Self {
        Self {
            operation,
            successful: false,
            transaction_id: None,
            transaction_status: None,
            raw_response: None,
            error_message: Some(message.into()),
            violations: ValidationErrors::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// True when validation stopped the call before dispatch
    pub fn is_validation_failure(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Turns a validation failure into a typed error; other results pass through
    pub fn into_validated(self) -> Result<Self, PaymentError> {
        if self.violations.is_empty() {
            Ok(self)
        } else {
            Err(PaymentError::OperationValidationFailed(self.violations))
        }
    }

    /// Gateway error text or a generic decline message
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| format!("{} declined", self.operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_operation_type_round_trip() {
        for op in [
            OperationType::Authorize,
            OperationType::AuthCapture,
            OperationType::CheckStatus,
            OperationType::Tokenize,
        ] {
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
        assert!("refund".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_blank_text_is_absent() {
        let request = OperationRequest::new().with_reference_id("   ");
        assert_eq!(request.text(OperationField::ReferenceId), Some("   "));
        assert!(!request.has(OperationField::ReferenceId));
    }

    #[test]
    fn test_amount_presence() {
        let request = OperationRequest::new();
        assert!(!request.has(OperationField::Amount));
        let request = request.with_amount(Money::zero(Currency::USD));
        assert!(request.has(OperationField::Amount));
        assert_eq!(request.text(OperationField::Amount), None);
    }

    #[test]
    fn test_into_validated() {
        let request = OperationRequest::new();
        let violations = validate(OperationType::CheckStatus, &request);
        let result = OperationResult::rejected(OperationType::CheckStatus, violations);

        assert!(!result.is_successful());
        assert!(result.is_validation_failure());
        assert!(matches!(
            result.into_validated(),
            Err(PaymentError::OperationValidationFailed(_))
        ));

        let declined = OperationResult::transport_failure(OperationType::Credit, "connection reset");
        let declined = declined.into_validated().unwrap();
        assert_eq!(declined.failure_reason(), "connection reset");
    }
}

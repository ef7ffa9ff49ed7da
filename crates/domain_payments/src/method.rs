//! Stored payment methods
//!
//! A payment method holds exactly one instrument. Applying it to an
//! [`OperationRequest`] fills in the instrument group the validators expect,
//! so an operation built from a stored method can never carry two groups.

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, PaymentMethodId};

use crate::operation::OperationRequest;
use crate::payment::PaymentType;

/// The payment instrument behind a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instrument {
    /// Gateway-vaulted card token
    Card { token: String },
    /// Raw ACH account
    Ach {
        account_number: String,
        routing_number: String,
    },
    /// Gateway-vaulted ACH token
    AchToken { token: String },
    /// Check, cash, money order: recorded but never sent to a gateway
    Offline { payment_type: PaymentType },
}

/// Billing address on file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// A stored payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub account_id: AccountId,
    pub instrument: Instrument,
    pub name_on_account: Option<String>,
    pub billing_address: BillingAddress,
    pub email: Option<String>,
}

impl PaymentMethod {
    pub fn new(account_id: AccountId, instrument: Instrument) -> Self {
        Self {
            id: PaymentMethodId::new(),
            account_id,
            instrument,
            name_on_account: None,
            billing_address: BillingAddress::default(),
            email: None,
        }
    }

    pub fn with_name(mut self, name_on_account: impl Into<String>) -> Self {
        self.name_on_account = Some(name_on_account.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: BillingAddress) -> Self {
        self.billing_address = address;
        self
    }

    pub fn payment_type(&self) -> PaymentType {
        match &self.instrument {
            Instrument::Card { .. } => PaymentType::CreditCard,
            Instrument::Ach { .. } => PaymentType::Ach,
            Instrument::AchToken { .. } => PaymentType::AchToken,
            Instrument::Offline { payment_type } => *payment_type,
        }
    }

    /// Copies instrument, holder and address fields onto a request
    pub fn apply_to(&self, request: OperationRequest) -> OperationRequest {
        let request = match &self.instrument {
            Instrument::Card { token } => request.with_token(token.clone()),
            Instrument::Ach {
                account_number,
                routing_number,
            } => request.with_ach_account(account_number.clone(), routing_number.clone()),
            Instrument::AchToken { token } => request.with_ach_token(token.clone()),
            Instrument::Offline { .. } => request,
        };

        let mut request = request
            .with_payment_type(self.payment_type())
            .with_billing_address(self.billing_address.clone());
        if let Some(name) = &self.name_on_account {
            request = request.with_name_on_account(name.clone());
        }
        if let Some(email) = &self.email {
            request = request.with_email(email.clone());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationField;

    #[test]
    fn test_ach_method_fills_account_and_routing() {
        let method = PaymentMethod::new(
            AccountId::new(),
            Instrument::Ach {
                account_number: "000123456789".to_string(),
                routing_number: "021000021".to_string(),
            },
        )
        .with_name("Ada Lovelace");

        let request = method.apply_to(OperationRequest::new());

        assert_eq!(request.text(OperationField::AchAccountNumber), Some("000123456789"));
        assert_eq!(request.text(OperationField::AchRoutingNumber), Some("021000021"));
        assert_eq!(request.text(OperationField::Token), None);
        assert_eq!(request.text(OperationField::NameOnAccount), Some("Ada Lovelace"));
        assert_eq!(request.payment_type(), Some(PaymentType::Ach));
    }

    #[test]
    fn test_offline_method_sets_no_instrument() {
        let method = PaymentMethod::new(
            AccountId::new(),
            Instrument::Offline { payment_type: PaymentType::Check },
        );
        assert_eq!(method.payment_type(), PaymentType::Check);

        let request = method.apply_to(OperationRequest::new());
        assert_eq!(request.text(OperationField::Token), None);
        assert_eq!(request.text(OperationField::AchToken), None);
    }
}

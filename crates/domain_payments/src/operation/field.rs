//! Operation fields and their format rules

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{8,64}$").unwrap());
static ACH_ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,17}$").unwrap());
static ACH_ROUTING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9}$").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,64}$").unwrap());

const MAX_NAME_LEN: usize = 100;
const MAX_ADDRESS_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 255;

/// A field an operation request can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationField {
    ReferenceId,
    ReferenceTransactionId,
    Token,
    AchAccountNumber,
    AchRoutingNumber,
    AchToken,
    NameOnAccount,
    AddressLine1,
    City,
    State,
    Zip,
    Amount,
    ChargeDescription,
    Email,
}

impl OperationField {
    pub fn name(&self) -> &'static str {
        match self {
            OperationField::ReferenceId => "reference_id",
            OperationField::ReferenceTransactionId => "reference_transaction_id",
            OperationField::Token => "token",
            OperationField::AchAccountNumber => "ach_account_number",
            OperationField::AchRoutingNumber => "ach_routing_number",
            OperationField::AchToken => "ach_token",
            OperationField::NameOnAccount => "name_on_account",
            OperationField::AddressLine1 => "address_line1",
            OperationField::City => "city",
            OperationField::State => "state",
            OperationField::Zip => "zip",
            OperationField::Amount => "amount",
            OperationField::ChargeDescription => "charge_description",
            OperationField::Email => "email",
        }
    }

    /// Checks a textual value against this field's format
    ///
    /// Returns a human readable description of the expected format on
    /// failure. `Amount` is not textual and always passes here; the
    /// validator applies the sign rule to it directly.
    pub fn check(&self, value: &str) -> Result<(), String> {
        let ok = match self {
            OperationField::Token | OperationField::AchToken => TOKEN_RE.is_match(value),
            OperationField::AchAccountNumber => ACH_ACCOUNT_RE.is_match(value),
            OperationField::AchRoutingNumber => ACH_ROUTING_RE.is_match(value),
            OperationField::Zip => ZIP_RE.is_match(value),
            OperationField::State => STATE_RE.is_match(value),
            OperationField::Email => EMAIL_RE.is_match(value),
            OperationField::ReferenceId | OperationField::ReferenceTransactionId => {
                REFERENCE_RE.is_match(value)
            }
            OperationField::NameOnAccount => {
                bounded_printable(value, 1, MAX_NAME_LEN)
            }
            OperationField::AddressLine1 | OperationField::City => {
                bounded_printable(value, 0, MAX_ADDRESS_LEN)
            }
            OperationField::ChargeDescription => value.chars().count() <= MAX_DESCRIPTION_LEN,
            OperationField::Amount => true,
        };

        if ok {
            Ok(())
        } else {
            Err(format!("{} has an invalid format: {}", self.name(), self.expected()))
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            OperationField::Token | OperationField::AchToken => {
                "8-64 letters, digits, '-' or '_'"
            }
            OperationField::AchAccountNumber => "4-17 digits",
            OperationField::AchRoutingNumber => "exactly 9 digits",
            OperationField::Zip => "5 digits, optionally followed by -4 digits",
            OperationField::State => "two upper-case letters",
            OperationField::Email => "an email address",
            OperationField::ReferenceId | OperationField::ReferenceTransactionId => {
                "1-64 letters, digits, '-' or '_'"
            }
            OperationField::NameOnAccount => "1-100 printable characters",
            OperationField::AddressLine1 | OperationField::City => {
                "at most 100 printable characters"
            }
            OperationField::ChargeDescription => "at most 255 characters",
            OperationField::Amount => "a non-negative amount",
        }
    }
}

impl fmt::Display for OperationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn bounded_printable(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    len >= min && len <= max && !value.chars().any(char::is_control)
}

//! Operation request validation
//!
//! Every operation type declares its rules through [`OperationRules`]. The
//! checks always run in the same order and accumulate into one list:
//!
//! 1. required fields are present
//! 2. exactly one payment instrument group is supplied
//! 3. required fields (and the chosen instrument) are well formed
//! 4. optional fields that are present are well formed
//!
//! A request is valid when no violation was recorded.

use serde::Serialize;
use std::fmt;

use super::field::OperationField;
use super::{OperationRequest, OperationType};

/// Pseudo-field named by instrument-group violations
pub const PAYMENT_INFO: &str = "payment_info";

/// What kind of rule a violation broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    Format,
    NegativeAmount,
    ConflictingInstruments,
    NoInstrument,
}

/// One broken rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(field: &'static str, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// Ordered list of violations from a single validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// True if any violation names `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.kind == kind)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|v| v.message.clone()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

type InstrumentGroup = &'static [OperationField];

const CARD_TOKEN: InstrumentGroup = &[OperationField::Token];
const ACH_ACCOUNT: InstrumentGroup = &[OperationField::AchAccountNumber, OperationField::AchRoutingNumber];
const ACH_TOKEN: InstrumentGroup = &[OperationField::AchToken];

const CHARGE_GROUPS: &[InstrumentGroup] = &[CARD_TOKEN, ACH_ACCOUNT, ACH_TOKEN];
const CHARGE_OPTIONAL: &[OperationField] = &[
    OperationField::NameOnAccount,
    OperationField::Email,
    OperationField::Zip,
    OperationField::State,
    OperationField::AddressLine1,
    OperationField::City,
    OperationField::ChargeDescription,
];

/// Declared field rules for one operation type
#[derive(Debug, Clone, Copy)]
pub struct OperationRules {
    pub required: &'static [OperationField],
    pub instrument_groups: &'static [InstrumentGroup],
    pub optional: &'static [OperationField],
}

impl OperationRules {
    pub fn for_operation(operation: OperationType) -> Self {
        match operation {
            OperationType::AuthCapture | OperationType::Authorize => Self {
                required: &[OperationField::Amount, OperationField::ReferenceId],
                instrument_groups: CHARGE_GROUPS,
                optional: CHARGE_OPTIONAL,
            },
            OperationType::Capture => Self {
                required: &[OperationField::Amount, OperationField::ReferenceTransactionId],
                instrument_groups: &[],
                optional: &[OperationField::ReferenceId],
            },
            OperationType::Cancel => Self {
                required: &[OperationField::ReferenceTransactionId],
                instrument_groups: &[],
                optional: &[OperationField::ReferenceId],
            },
            OperationType::Credit => Self {
                required: &[OperationField::Amount, OperationField::ReferenceTransactionId],
                instrument_groups: &[],
                optional: &[OperationField::ReferenceId, OperationField::ChargeDescription],
            },
            OperationType::CheckStatus => Self {
                required: &[OperationField::ReferenceTransactionId],
                instrument_groups: &[],
                optional: &[],
            },
            OperationType::Tokenize => Self {
                required: &[OperationField::NameOnAccount],
                instrument_groups: &[ACH_ACCOUNT],
                optional: &[OperationField::Email, OperationField::Zip],
            },
        }
    }
}

/// Validates `request` for `operation`
pub fn validate(operation: OperationType, request: &OperationRequest) -> ValidationErrors {
    let rules = OperationRules::for_operation(operation);
    let mut errors = ValidationErrors::new();

    for field in rules.required {
        if !request.has(*field) {
            errors.push(Violation::new(
                field.name(),
                ViolationKind::Missing,
                format!("{} is required", field.name()),
            ));
        }
    }

    let instrument = check_instrument(rules.instrument_groups, request, &mut errors);

    for field in rules.required.iter().chain(instrument.unwrap_or(&[])) {
        check_format(*field, request, &mut errors);
    }

    for field in rules.optional {
        check_format(*field, request, &mut errors);
    }

    errors
}

/// Returns the single complete group when there is one
fn check_instrument(
    groups: &'static [InstrumentGroup],
    request: &OperationRequest,
    errors: &mut ValidationErrors,
) -> Option<InstrumentGroup> {
    if groups.is_empty() {
        return None;
    }

    let touched: Vec<InstrumentGroup> = groups
        .iter()
        .copied()
        .filter(|group| group.iter().any(|f| request.has(*f)))
        .collect();

    match touched.as_slice() {
        [] => {
            let names: Vec<String> = groups.iter().map(|g| group_name(g)).collect();
            errors.push(Violation::new(
                PAYMENT_INFO,
                ViolationKind::NoInstrument,
                format!("no payment info provided: expected one of {}", names.join(", ")),
            ));
            None
        }
        [group] => {
            let missing: Vec<OperationField> =
                group.iter().copied().filter(|f| !request.has(*f)).collect();
            for field in &missing {
                errors.push(Violation::new(
                    field.name(),
                    ViolationKind::Missing,
                    format!("{} is required with {}", field.name(), group_name(group)),
                ));
            }
            if missing.is_empty() {
                Some(*group)
            } else {
                None
            }
        }
        many => {
            let names: Vec<String> = many.iter().map(|g| group_name(g)).collect();
            errors.push(Violation::new(
                PAYMENT_INFO,
                ViolationKind::ConflictingInstruments,
                format!("{} are both set; supply exactly one", names.join(" and ")),
            ));
            None
        }
    }
}

fn check_format(field: OperationField, request: &OperationRequest, errors: &mut ValidationErrors) {
    if field == OperationField::Amount {
        if let Some(amount) = request.amount() {
            if amount.is_negative() {
                errors.push(Violation::new(
                    field.name(),
                    ViolationKind::NegativeAmount,
                    format!("amount must not be negative, got {}", amount.amount_minor()),
                ));
            }
        }
        return;
    }

    if let Some(value) = request.text(field) {
        if let Err(message) = field.check(value) {
            errors.push(Violation::new(field.name(), ViolationKind::Format, message));
        }
    }
}

fn group_name(group: &[OperationField]) -> String {
    group.iter().map(|f| f.name()).collect::<Vec<_>>().join("+")
}

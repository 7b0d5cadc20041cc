//! # Validation Module
//!
//! Field-level input validation, run once at the boundary.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Typed records: a missing field is a parse error                   │
//! │  └── Money/Litres parse as exact decimals                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required text, lengths, phone/email formats                       │
//! │  └── Sign rules on quantities, prices, rates                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Unique open shift per operator                                    │
//! │                                                                         │
//! │  Engines trust what passed here and never re-validate deep inside.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuelstation_core::validation::{validate_phone, validate_required};
//!
//! validate_required("supplier_name", "PSO").unwrap();
//! validate_phone("03001234567").unwrap();
//! assert!(validate_phone("12345").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::{Litres, Money};
use crate::types::TaxRate;
use crate::{MAX_INVOICE_NUMBER_LENGTH, MAX_NAME_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only text.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a person, supplier, or tank name.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_NAME_LENGTH`] characters after trimming
///
/// ## Example
/// ```rust
/// use fuelstation_core::validation::validate_name;
///
/// assert!(validate_name("name", "Ali Transport").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    validate_required(field, value)?;

    if value.trim().chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a Pakistani mobile number.
///
/// ## Accepted Formats
/// ```text
/// 03XXXXXXXXX      local (11 digits)
/// +923XXXXXXXXX    international
/// 3XX-XXXXXXX      dashed, without the leading zero
/// ```
/// Spaces are ignored.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    let valid = if let Some(rest) = compact.strip_prefix("+92") {
        rest.len() == 10 && rest.starts_with('3') && all_digits(rest)
    } else if let Some((prefix, number)) = compact.split_once('-') {
        prefix.len() == 3 && prefix.starts_with('3') && all_digits(prefix)
            && number.len() == 7 && all_digits(number)
    } else {
        compact.len() == 11 && compact.starts_with("03") && all_digits(&compact)
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "expected 03XXXXXXXXX, +923XXXXXXXXX or 3XX-XXXXXXX".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address (one `@`, dotted domain, no spaces).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Requires `value > 0`.
pub fn validate_positive_decimal(field: &str, value: Decimal) -> ValidationResult<()> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Requires `value >= 0`.
pub fn validate_non_negative_money(field: &str, value: Money) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Checks the inputs of a sale amount calculation.
///
/// ## Rules
/// - quantity > 0
/// - unit_price > 0
/// - tax_percentage >= 0
pub fn validate_sale_input(
    quantity: Litres,
    unit_price: Money,
    tax_percentage: TaxRate,
) -> ValidationResult<()> {
    validate_positive_decimal("quantity", quantity.value())?;
    validate_positive_decimal("unit_price", unit_price.amount())?;
    if tax_percentage.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_percentage".to_string(),
        });
    }
    Ok(())
}

/// Checks a supplier delivery before it is costed.
pub fn validate_purchase_input(
    supplier_name: &str,
    invoice_number: &str,
    quantity: Litres,
    rate: Money,
) -> ValidationResult<()> {
    validate_name("supplier_name", supplier_name)?;
    validate_required("invoice_number", invoice_number)?;

    if invoice_number.trim().chars().count() > MAX_INVOICE_NUMBER_LENGTH {
        return Err(ValidationError::TooLong {
            field: "invoice_number".to_string(),
            max: MAX_INVOICE_NUMBER_LENGTH,
        });
    }

    validate_positive_decimal("quantity", quantity.value())?;
    validate_positive_decimal("rate", rate.amount())?;
    Ok(())
}

/// Checks a new or edited credit customer.
pub fn validate_customer_input(
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
    credit_limit: Money,
) -> ValidationResult<()> {
    validate_name("name", name)?;
    if let Some(phone) = phone {
        validate_phone(phone)?;
    }
    if let Some(email) = email {
        validate_email(email)?;
    }
    validate_non_negative_money("credit_limit", credit_limit)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

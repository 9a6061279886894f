//! # Validation Module
//!
//! Boundary validation rules for the order lifecycle engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: serde deserialization                                     │
//! │  ├── Enum variants reject unknown document/agency/status strings    │
//! │  └── Type mismatches never reach business code                      │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business format rules                       │
//! │  ├── Document number format per document type                       │
//! │  ├── International phone format                                     │
//! │  ├── Destination fields per agency type                             │
//! │  └── Item name / quantity / price rules                             │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database constraints                                      │
//! │  ├── UNIQUE (doc_type, doc_number) backs race recovery              │
//! │  └── Foreign keys                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are returned verbatim to the caller, so they name the exact
//! field and rule that failed.

use crate::error::ValidationError;
use crate::types::{AgencyType, Destination, DocumentType, OrderItemInput};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Customer Identity
// =============================================================================

/// Validates a document number against its document type.
///
/// ## Rules
/// - DNI: exactly 8 digits
/// - CE: 1 to 12 alphanumeric characters
/// - OTHER: non-empty, at most 20 characters
pub fn validate_document(doc_type: DocumentType, number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "nro_doc".to_string(),
        });
    }

    let ok = match doc_type {
        DocumentType::Dni => number.len() == 8 && number.chars().all(|c| c.is_ascii_digit()),
        DocumentType::Ce => {
            (1..=12).contains(&number.len()) && number.chars().all(|c| c.is_ascii_alphanumeric())
        }
        DocumentType::Other => number.len() <= 20,
    };

    if !ok {
        let reason = match doc_type {
            DocumentType::Dni => "DNI must be exactly 8 digits",
            DocumentType::Ce => "CE must be 1-12 alphanumeric characters",
            DocumentType::Other => "document number must be at most 20 characters",
        };
        return Err(ValidationError::InvalidFormat {
            field: "nro_doc".to_string(),
            reason: reason.to_string(),
        });
    }

    Ok(())
}

/// Validates an optional phone number in international format:
/// `+` followed by 10 to 15 digits. `None` is always accepted.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    let Some(phone) = phone else {
        return Ok(());
    };
    let phone = phone.trim();

    let mut chars = phone.chars();
    let well_formed = chars.next() == Some('+')
        && phone.len() >= 11
        && phone.len() <= 16
        && chars.all(|c| c.is_ascii_digit());

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "telefono".to_string(),
            reason: "must be international format: + followed by 10-15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates the full customer identity submitted with an order.
pub fn validate_customer(
    doc_type: DocumentType,
    doc_number: &str,
    full_name: &str,
    phone: Option<&str>,
) -> ValidationResult<()> {
    validate_document(doc_type, doc_number)?;

    if full_name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "nombre_completo".to_string(),
        });
    }

    validate_phone(phone)
}

// =============================================================================
// Destination
// =============================================================================

/// Validates destination fields against the agency-type rules.
///
/// ## Rules
/// - SHALOM: agency branch name required
/// - OLVA / FLORES: street address required
/// - OTHER: both required
/// - department / province / district always required
pub fn validate_destination(dest: &Destination) -> ValidationResult<()> {
    for (field, value) in [
        ("dpto", &dest.department),
        ("prov", &dest.province),
        ("dist", &dest.district),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
    }

    let has_name = dest
        .agency_name
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    let has_address = dest
        .address
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    match dest.agency_type {
        AgencyType::Shalom if !has_name => Err(ValidationError::Destination(
            "SHALOM requires an agency branch name".to_string(),
        )),
        AgencyType::Olva | AgencyType::Flores if !has_address => Err(ValidationError::Destination(
            "OLVA/FLORES require a street address".to_string(),
        )),
        AgencyType::Other if !(has_name && has_address) => Err(ValidationError::Destination(
            "OTHER requires both an agency name and a street address".to_string(),
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates a desired item set.
///
/// ## Rules
/// - at least one item, at most [`MAX_ORDER_ITEMS`]
/// - every item: non-empty name, quantity in `[1, MAX_ITEM_QUANTITY]`,
///   unit price >= 0
pub fn validate_items(items: &[OrderItemInput]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::InvalidItems("the item list is empty".to_string()));
    }

    if items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    for item in items {
        if item.name.trim().is_empty() {
            return Err(ValidationError::InvalidItems(
                "every item needs a non-empty name".to_string(),
            ));
        }
        if item.quantity < 1 || item.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::InvalidItems(format!(
                "quantity for '{}' must be between 1 and {}",
                item.name.trim(),
                MAX_ITEM_QUANTITY
            )));
        }
        if item.unit_price.is_negative() {
            return Err(ValidationError::InvalidItems(format!(
                "unit price for '{}' cannot be negative",
                item.name.trim()
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Reason Notes
// =============================================================================

/// Validates and trims a mandatory reason note. `context` names the
/// operation in the error message.
pub fn validate_note(note: Option<&str>, context: &str) -> ValidationResult<String> {
    match note.map(str::trim) {
        Some(n) if !n.is_empty() => Ok(n.to_string()),
        _ => Err(ValidationError::MissingNote {
            context: context.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Order-creation validation.
//!
//! All checks run before anything is persisted; a rejected order never
//! leaves a partial record behind. Messages are user-facing German, as the
//! frontend displays them verbatim.

use thiserror::Error;

use crate::catalog::BUDGET_LIMIT;
use crate::order::models::OrderCreate;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Budget überschritten: {total:.2}€ > {limit:.2}€")]
    BudgetExceeded { total: f64, limit: f64 },
    #[error("Beide Einverständniserklärungen müssen akzeptiert werden")]
    MissingConsent,
    #[error("Unterschrift erforderlich")]
    MissingSignature,
    #[error("Unbekanntes Produkt: {0}")]
    UnknownProduct(String),
}

/// Validate an order request against the already-computed total.
pub fn validate_order(request: &OrderCreate, total: f64) -> Result<(), ValidationError> {
    if total > BUDGET_LIMIT {
        return Err(ValidationError::BudgetExceeded {
            total,
            limit: BUDGET_LIMIT,
        });
    }
    if !request.insurance.consent1 || !request.insurance.consent2 {
        return Err(ValidationError::MissingConsent);
    }
    if request.insurance.signature_insured.trim().is_empty() {
        return Err(ValidationError::MissingSignature);
    }
    Ok(())
}

//! Validation rules for inventory inputs
//!
//! Plain functions returning `&'static str` errors so they can be reused
//! outside the HTTP layer (seeds, imports, tests).

use chrono::NaiveDate;

/// Movement item quantities are strictly positive integers; the sign of a
/// ledger entry is derived from the movement direction, never stored on
/// the item.
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be a positive integer");
    }
    Ok(())
}

/// SKUs: 3-50 characters, uppercase alphanumeric plus dash
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 || sku.len() > 50 {
        return Err("SKU must be 3-50 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric (dashes allowed)");
    }
    Ok(())
}

/// Warehouse and location codes: 2-50 characters, uppercase alphanumeric
/// plus dash or underscore
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 50 {
        return Err("Code must be 2-50 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("Code must be uppercase alphanumeric (dash/underscore allowed)");
    }
    Ok(())
}

/// Batch numbers: 1-100 characters, no whitespace-only values
pub fn validate_batch_number(batch_number: &str) -> Result<(), &'static str> {
    let trimmed = batch_number.trim();
    if trimmed.is_empty() {
        return Err("Batch number cannot be empty");
    }
    if batch_number.len() > 100 {
        return Err("Batch number must be at most 100 characters");
    }
    Ok(())
}

/// An expiring batch must expire after it was manufactured
pub fn validate_batch_dates(
    manufactured: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
) -> Result<(), &'static str> {
    if let (Some(m), Some(e)) = (manufactured, expiration) {
        if e <= m {
            return Err("Expiration date must be after manufactured date");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quantity_rejects_zero_and_negative() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn test_sku_format() {
        assert!(validate_sku("ABC-001").is_ok());
        assert!(validate_sku("AB").is_err());
        assert!(validate_sku("abc-001").is_err());
        assert!(validate_sku("ABC 001").is_err());
    }

    #[test]
    fn test_code_format() {
        assert!(validate_code("WH_MAIN").is_ok());
        assert!(validate_code("A1-B2").is_ok());
        assert!(validate_code("w").is_err());
    }

    #[test]
    fn test_batch_number() {
        assert!(validate_batch_number("LOT-2024-01").is_ok());
        assert!(validate_batch_number("   ").is_err());
        assert!(validate_batch_number(&"X".repeat(101)).is_err());
    }

    #[test]
    fn test_batch_dates() {
        let m = NaiveDate::from_ymd_opt(2024, 1, 1);
        let e = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(validate_batch_dates(m, e).is_ok());
        assert!(validate_batch_dates(e, m).is_err());
        assert!(validate_batch_dates(None, e).is_ok());
        assert!(validate_batch_dates(m, None).is_ok());
    }

    proptest! {
        #[test]
        fn prop_positive_quantities_accepted(q in 1i64..=i64::MAX) {
            prop_assert!(validate_quantity(q).is_ok());
        }

        #[test]
        fn prop_non_positive_quantities_rejected(q in i64::MIN..=0i64) {
            prop_assert!(validate_quantity(q).is_err());
        }

        #[test]
        fn prop_valid_skus_accepted(sku in "[A-Z0-9-]{3,50}") {
            prop_assert!(validate_sku(&sku).is_ok());
        }
    }
}

//! Input validation shared by every ledger

use crate::types::{Amount, LedgerError};

/// Longest accepted account id, in characters
pub const MAX_ACCOUNT_ID_LEN: usize = 256;

/// Stateless checks applied before any ledger touches state
pub struct InputValidator;

impl InputValidator {
    /// Accept ids that are non-blank and at most [`MAX_ACCOUNT_ID_LEN`] characters
    pub fn check_account_id(id: &str) -> Result<(), LedgerError> {
        if id.trim().is_empty() {
            return Err(LedgerError::invalid_account_id(id, "must not be blank"));
        }
        if id.chars().count() > MAX_ACCOUNT_ID_LEN {
            return Err(LedgerError::invalid_account_id(
                id,
                "longer than 256 characters",
            ));
        }
        Ok(())
    }

    /// Accept strictly positive amounts
    pub fn check_amount(amount: Amount) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        Ok(())
    }

    /// Validate both parties and the amount of a transfer
    pub fn check_transfer(from: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        Self::check_account_id(from)?;
        Self::check_account_id(to)?;
        Self::check_amount(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("left")]
    #[case::padded(" left ")]
    #[case::max_len(&"x".repeat(MAX_ACCOUNT_ID_LEN))]
    #[case::multibyte_max_len(&"é".repeat(MAX_ACCOUNT_ID_LEN))]
    fn test_accepts_valid_ids(#[case] id: &str) {
        assert!(InputValidator::check_account_id(id).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::tab("\t")]
    #[case::too_long(&"x".repeat(MAX_ACCOUNT_ID_LEN + 1))]
    fn test_rejects_invalid_ids(#[case] id: &str) {
        assert!(matches!(
            InputValidator::check_account_id(id),
            Err(LedgerError::InvalidAccountId { .. })
        ));
    }

    #[rstest]
    #[case::zero(0, false)]
    #[case::negative(-1, false)]
    #[case::min(i64::MIN, false)]
    #[case::one(1, true)]
    #[case::max(i64::MAX, true)]
    fn test_amount(#[case] amount: Amount, #[case] valid: bool) {
        assert_eq!(InputValidator::check_amount(amount).is_ok(), valid);
    }
}

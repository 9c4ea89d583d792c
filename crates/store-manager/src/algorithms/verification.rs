//! # Verification
//!
//! Unwraps platform verification results into usable transactions.

use crate::domain::StoreError;
use shared_types::{Transaction, VerificationResult};

/// Return the transaction if the platform verified it.
///
/// An unverified transaction becomes `StoreError::Verification` carrying the
/// platform's reason. Callers decide whether to propagate or discard it.
pub fn check_verified(result: VerificationResult<Transaction>) -> Result<Transaction, StoreError> {
    match result {
        VerificationResult::Verified(transaction) => Ok(transaction),
        VerificationResult::Unverified(transaction, reason) => Err(StoreError::Verification {
            transaction_id: transaction.id,
            product_id: transaction.product_id,
            reason,
        }),
    }
}

//! Transaction request types and ledger records.
//!
//! This service never stores transactions. Requests are validated here and
//! forwarded to the external ledger, which returns the records below.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::currency::Currency;

/// Kind of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

/// Request to deposit into or withdraw from a single account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount": "1500.00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTransactionRequest {
    pub account_id: Uuid,
    pub amount: Decimal,
}

impl SimpleTransactionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount)
    }
}

/// Request to move money between two accounts of the same customer.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "to_account_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "250.00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferTransactionRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
}

impl TransferTransactionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.from_account_id == self.to_account_id {
            return Err(AppError::InvalidRequest(
                "Cannot transfer to same account".to_string(),
            ));
        }
        validate_amount(self.amount)
    }

    /// Attach the resolved currencies before forwarding to the ledger.
    pub fn with_currencies(self, from_currency: Currency, to_currency: Currency) -> LedgerTransferRequest {
        LedgerTransferRequest {
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            from_currency,
            to_currency,
        }
    }
}

/// Transfer request as the ledger expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub from_currency: Currency,
    pub to_currency: Currency,
}

/// Transaction record returned by the ledger.
///
/// A transfer is a linked debit/credit pair; each side references the other
/// through `related_transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_transaction: Option<Box<TransactionRecord>>,
}

/// Balance as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

/// Response body for created transfers.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferCreatedResponse {
    pub ids: Vec<Uuid>,
}

fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        let request = SimpleTransactionRequest {
            account_id: Uuid::new_v4(),
            amount: Decimal::ZERO,
        };
        assert!(request.validate().is_err());

        let request = SimpleTransactionRequest {
            account_id: Uuid::new_v4(),
            amount: Decimal::new(1050, 2),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_transfer_to_same_account_rejected() {
        let id = Uuid::new_v4();
        let request = TransferTransactionRequest {
            from_account_id: id,
            to_account_id: id,
            amount: Decimal::ONE,
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "Cannot transfer to same account");
    }

    #[test]
    fn test_ledger_record_parses_linked_pair() {
        let json = r#"{
            "id": "7a0e2b1c-6f3e-4c55-9d1a-2b8f5a9c0d11",
            "account_id": "550e8400-e29b-41d4-a716-446655440000",
            "amount": -250,
            "date": "2025-02-10T12:00:00Z",
            "type": "Transfer",
            "related_transaction": {
                "id": "8b1f3c2d-7a4f-4d66-8e2b-3c9a6b0d1e22",
                "account_id": "660e8400-e29b-41d4-a716-446655440001",
                "amount": 250,
                "date": "2025-02-10T12:00:00Z",
                "type": "Transfer"
            }
        }"#;

        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.transaction_type, TransactionType::Transfer);
        let related = record.related_transaction.unwrap();
        assert_eq!(related.amount, Decimal::from(250));
        assert!(related.related_transaction.is_none());
    }
}

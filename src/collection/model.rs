use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::loan::model::{InstallmentStatus, LoanStatus};

/// How a payment was made.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Upi,
    BankTransfer,
    Cheque,
    Other,
}

/// A recorded payment.
///
/// `amount` is the full sum handed over; `principal_part + interest_part`
/// may fall short of it when the payment overshoots the target installment,
/// the difference being the excess. The late fee is tracked alongside and is
/// never deducted from the amount.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub borrower_id: Uuid,
    pub loan_id: Uuid,
    pub receipt_number: String,
    pub amount: Decimal,
    pub principal_part: Decimal,
    pub interest_part: Decimal,
    pub late_fee: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub installment_number: i32,
    pub days_late: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Portion of the amount beyond the target installment's remaining due.
    pub fn excess(&self) -> Decimal {
        self.amount - self.principal_part - self.interest_part
    }
}

/// Request to record a payment against a loan.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub owner_id: Uuid,
    pub loan_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    /// Explicit installment to pay against; defaults to the earliest unpaid
    /// one.
    pub installment_number: Option<i32>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

impl RecordPaymentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidParameters(
                "payment amount must be greater than 0".to_string(),
            ));
        }
        if let Some(number) = self.installment_number {
            if number < 1 {
                return Err(LedgerError::InvalidParameters(
                    "installment number must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Everything the collector hands the borrower after a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub collection: Collection,
    pub loan_number: String,
    pub loan_status: LoanStatus,
    pub loan_total_amount: Decimal,
    pub loan_paid_amount: Decimal,
    pub loan_pending_amount: Decimal,
    pub installment_status: InstallmentStatus,
    pub borrower_name: String,
    pub borrower_mobile: String,
    #[serde(skip)]
    pub sms_enabled: bool,
}

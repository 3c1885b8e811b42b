//! Loan and installment models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::amortization::Frequency;
use crate::money::round2;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Active,
    Completed,
    Defaulted,
    Cancelled,
}

impl LoanStatus {
    /// Terminal states accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Defaulted | LoanStatus::Cancelled
        )
    }
}

/// Installment status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "installment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    /// Whether the installment can still receive a payment.
    pub fn is_payable(&self) -> bool {
        !matches!(self, InstallmentStatus::Paid)
    }
}

/// Loan model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub borrower_id: Uuid,
    pub loan_number: String,
    pub principal_amount: Decimal,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    pub interest_amount: Decimal,
    pub total_amount: Decimal,
    pub installments: i32,
    pub installment_amount: Decimal,
    pub installment_frequency: Frequency,
    pub disbursement_date: Option<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub paid_installments: i32,
    pub status: LoanStatus,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One installment of a loan's schedule.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Installment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub installment_number: i32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
    pub principal_part: Decimal,
    pub interest_part: Decimal,
    pub paid_amount: Decimal,
    pub paid_date: Option<NaiveDate>,
    pub days_overdue: i32,
    pub late_fee: Decimal,
    pub status: InstallmentStatus,
}

impl Installment {
    /// Remaining (principal, interest) on this installment: the original
    /// parts scaled by the unpaid fraction, rounded to 2 decimals. Both are
    /// zero once paid at or beyond the due amount.
    pub fn outstanding_split(&self) -> (Decimal, Decimal) {
        if self.due_amount <= Decimal::ZERO || self.paid_amount >= self.due_amount {
            return (Decimal::ZERO, Decimal::ZERO);
        }
        let unpaid_fraction = Decimal::ONE - self.paid_amount / self.due_amount;
        (
            round2(self.principal_part * unpaid_fraction),
            round2(self.interest_part * unpaid_fraction),
        )
    }
}

/// Request to create a new loan
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoanRequest {
    pub owner_id: Uuid,
    pub borrower_id: Uuid,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub installments: u32,
    pub installment_frequency: Frequency,
    pub start_date: NaiveDate,
    pub disbursement_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Loan with its full schedule and status counts.
#[derive(Debug, Serialize)]
pub struct LoanSummary {
    pub loan: Loan,
    pub schedule: Vec<Installment>,
    pub overdue_installments: i64,
    pub pending_installments: i64,
}

/// Installment due on a given date, joined with borrower contact details.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DueInstallment {
    pub loan_id: Uuid,
    pub loan_number: String,
    pub borrower_name: String,
    pub borrower_mobile: String,
    pub installment_number: i32,
    pub due_amount: Decimal,
    pub status: InstallmentStatus,
}

/// Per-loan overdue aggregate for an owner.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OverdueLoan {
    pub loan_id: Uuid,
    pub loan_number: String,
    pub borrower_name: String,
    pub borrower_mobile: String,
    pub overdue_count: i64,
    pub overdue_amount: Decimal,
    pub max_days_overdue: i32,
}

//! Status state machines for installments and loans.
//!
//! Pure functions: the services feed in the aggregate figures after each
//! mutation and persist whatever comes back. Keeping the rules here lets the
//! transitions be tested in isolation from storage.

use rust_decimal::Decimal;

use super::model::{InstallmentStatus, LoanStatus};

/// Number of overdue installments that tips an active loan into default.
pub const DEFAULT_OVERDUE_THRESHOLD: i64 = 3;

/// Installment status after a payment lands on it.
pub fn installment_status_after_payment(
    due_amount: Decimal,
    new_paid_amount: Decimal,
) -> InstallmentStatus {
    if new_paid_amount >= due_amount {
        InstallmentStatus::Paid
    } else {
        InstallmentStatus::Partial
    }
}

/// Loan status recomputed from its aggregates.
///
/// Completion takes precedence over default: a loan whose paid amount
/// reaches its total is completed even if overdue installments remain on the
/// books. Default only applies to active loans.
pub fn next_loan_status(
    current: LoanStatus,
    paid_amount: Decimal,
    total_amount: Decimal,
    overdue_count: i64,
) -> LoanStatus {
    if current.is_terminal() {
        return current;
    }
    if paid_amount >= total_amount {
        return LoanStatus::Completed;
    }
    if current == LoanStatus::Active && overdue_count >= DEFAULT_OVERDUE_THRESHOLD {
        return LoanStatus::Defaulted;
    }
    current
}

/// Whether a loan may be cancelled: only pending or active loans with no
/// recorded payment.
pub fn can_cancel(status: LoanStatus, paid_amount: Decimal) -> bool {
    matches!(status, LoanStatus::Pending | LoanStatus::Active) && paid_amount <= Decimal::ZERO
}

//! Payment allocator.
//!
//! Pure functions splitting an incoming payment across principal and
//! interest (interest-first), and computing the late fee from days overdue.
//! The late fee is recorded alongside the payment but is never deducted from
//! the allocatable amount; it is a separate receivable until collected.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round2;

/// Principal/interest split of one payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub principal: Decimal,
    pub interest: Decimal,
    /// Amount beyond the target installment's remaining due. Counted toward
    /// the loan's paid amount but not carried to the next installment.
    pub excess: Decimal,
}

/// Whole days the payment lands after the due date; zero when on time or
/// early.
pub fn days_late(payment_date: NaiveDate, due_date: NaiveDate) -> i32 {
    (payment_date - due_date).num_days().max(0) as i32
}

/// Late fee accrued for the given lateness.
pub fn late_fee(days_late: i32, per_day: Decimal) -> Decimal {
    if days_late <= 0 {
        return Decimal::ZERO;
    }
    round2(Decimal::from(days_late) * per_day)
}

/// Split a payment against the target installment's pending principal and
/// interest, paying interest first.
pub fn split_payment(
    amount: Decimal,
    pending_principal: Decimal,
    pending_interest: Decimal,
) -> PaymentSplit {
    let total_pending = pending_principal + pending_interest;

    if amount >= total_pending {
        return PaymentSplit {
            principal: pending_principal,
            interest: pending_interest,
            excess: amount - total_pending,
        };
    }

    let interest = amount.min(pending_interest);
    let principal = (amount - interest).max(Decimal::ZERO);

    PaymentSplit {
        principal,
        interest,
        excess: Decimal::ZERO,
    }
}

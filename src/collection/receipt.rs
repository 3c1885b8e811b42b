//! Plain-text rendering of a payment receipt.

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::collection::model::PaymentReceipt;

/// Render a receipt as the plain-text slip handed (or messaged) to the
/// borrower.
pub fn format_receipt(receipt: &PaymentReceipt) -> String {
    let c = &receipt.collection;
    let mut out = String::new();

    let _ = writeln!(out, "Receipt {}", c.receipt_number);
    let _ = writeln!(out, "Loan {}", receipt.loan_number);
    let _ = writeln!(out, "Borrower: {} ({})", receipt.borrower_name, receipt.borrower_mobile);
    let _ = writeln!(out, "Date: {}", c.payment_date);
    let _ = writeln!(out, "Installment #{}", c.installment_number);
    let _ = writeln!(out, "Amount paid: {}", c.amount);
    let _ = writeln!(out, "  principal: {}", c.principal_part);
    let _ = writeln!(out, "  interest:  {}", c.interest_part);
    if c.excess() > Decimal::ZERO {
        let _ = writeln!(out, "  excess:    {}", c.excess());
    }
    if c.late_fee > Decimal::ZERO {
        let _ = writeln!(out, "Late fee ({} days): {}", c.days_late, c.late_fee);
    }
    let _ = writeln!(
        out,
        "Loan balance: {} paid / {} total, {} pending",
        receipt.loan_paid_amount, receipt.loan_total_amount, receipt.loan_pending_amount
    );

    out
}

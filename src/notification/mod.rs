//! Borrower notifications.
//!
//! SMS delivery is out of scope; the notifier logs what would be sent.
//! Messages are fire-and-forget and never affect the outcome of the ledger
//! operation that triggered them.

use tracing::info;

use crate::borrower::Borrower;
use crate::collection::model::PaymentReceipt;
use crate::loan::model::Loan;

#[derive(Clone, Default)]
pub struct Notifier;

impl Notifier {
    pub fn new() -> Self {
        Self
    }

    pub fn loan_approved(&self, borrower: &Borrower, loan: &Loan) {
        if !borrower.sms_enabled {
            return;
        }
        info!(
            mobile = %borrower.mobile,
            loan_number = %loan.loan_number,
            total = %loan.total_amount,
            installments = loan.installments,
            "sms: loan approved"
        );
    }

    pub fn payment_recorded(&self, receipt: &PaymentReceipt) {
        if !receipt.sms_enabled {
            return;
        }
        info!(
            mobile = %receipt.borrower_mobile,
            receipt_number = %receipt.collection.receipt_number,
            amount = %receipt.collection.amount,
            pending = %receipt.loan_pending_amount,
            "sms: payment recorded"
        );
    }
}

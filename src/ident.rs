//! Loan number and receipt number generation.
//!
//! Numbers are a fixed prefix, a date stamp and a random 4-digit suffix.
//! Generation itself is pure; the services check the candidate against the
//! unique column and retry up to [`MAX_GENERATION_ATTEMPTS`] times before
//! failing the owning operation.

use chrono::NaiveDate;
use rand::Rng;

/// Retry budget for collision-checked identifier generation.
pub const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Generate a candidate loan number, e.g. `LOAN20260830-0421`.
pub fn loan_number(date: NaiveDate) -> String {
    format!(
        "LOAN{}-{:04}",
        date.format("%Y%m%d"),
        rand::thread_rng().gen_range(0..10_000)
    )
}

/// Generate a candidate receipt number, e.g. `REC20260830-7305`.
pub fn receipt_number(date: NaiveDate) -> String {
    format!(
        "REC{}-{:04}",
        date.format("%Y%m%d"),
        rand::thread_rng().gen_range(0..10_000)
    )
}

//! Amortization engine.
//!
//! Pure functions converting loan terms (principal, annual rate, installment
//! count, frequency) into a flat-interest total and a per-installment
//! schedule. No I/O; the loan service persists the output at creation time.
//!
//! The interest model is flat simple interest over a duration derived from
//! the installment count: `interest = principal * rate * months / 1200`. The
//! final installment absorbs all rounding drift so the schedule sums exactly
//! to the loan's total, principal and interest figures.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::money::round2;

/// Maximum number of installments a loan may carry.
pub const MAX_INSTALLMENTS: u32 = 1000;

/// Repayment frequency
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "installment_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

/// Terms fed into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteInput {
    pub principal: Decimal,
    /// Annual interest rate in percent, 0..=100.
    pub annual_rate: Decimal,
    pub installments: u32,
    pub frequency: Frequency,
}

impl QuoteInput {
    /// Validate the input contract; collects every violation into one error.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.principal <= Decimal::ZERO {
            errors.push("principal amount must be greater than 0");
        }
        if self.annual_rate < Decimal::ZERO || self.annual_rate > Decimal::from(100) {
            errors.push("interest rate must be between 0 and 100");
        }
        if self.installments < 1 {
            errors.push("number of installments must be greater than 0");
        }
        if self.installments > MAX_INSTALLMENTS {
            errors.push("number of installments cannot exceed 1000");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::InvalidParameters(errors.join("; ")))
        }
    }
}

/// Totals computed from the terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationQuote {
    pub principal: Decimal,
    pub interest: Decimal,
    pub total_amount: Decimal,
    pub installments: u32,
    /// Nominal per-installment amount; every installment except the last.
    pub installment_amount: Decimal,
    pub frequency: Frequency,
}

/// One line of the generated schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLine {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub due_amount: Decimal,
    pub principal_part: Decimal,
    pub interest_part: Decimal,
}

/// Loan duration in months implied by the installment count.
pub fn duration_months(installments: u32, frequency: Frequency) -> u32 {
    match frequency {
        Frequency::Daily => installments.div_ceil(30),
        Frequency::Weekly => installments.div_ceil(4),
        Frequency::Monthly => installments,
    }
}

/// Compute the flat-interest totals for the given terms.
pub fn quote(input: &QuoteInput) -> Result<AmortizationQuote> {
    input.validate()?;

    let months = Decimal::from(duration_months(input.installments, input.frequency));
    let interest = round2(input.principal * input.annual_rate * months / Decimal::from(1200));
    let total_amount = input.principal + interest;
    let installment_amount = round2(total_amount / Decimal::from(input.installments));

    Ok(AmortizationQuote {
        principal: input.principal,
        interest,
        total_amount,
        installments: input.installments,
        installment_amount,
        frequency: input.frequency,
    })
}

/// Due date of installment `periods_elapsed + 1`: the start date advanced by
/// that many periods (1 day / 7 days / 1 calendar month).
pub fn due_date(start: NaiveDate, periods_elapsed: u32, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Daily => start + Days::new(periods_elapsed as u64),
        Frequency::Weekly => start + Days::new(7 * periods_elapsed as u64),
        Frequency::Monthly => start + Months::new(periods_elapsed),
    }
}

/// Due date of the final installment.
pub fn end_date(start: NaiveDate, installments: u32, frequency: Frequency) -> NaiveDate {
    due_date(start, installments - 1, frequency)
}

/// Generate the full installment schedule for a quote.
///
/// The last installment's due amount, principal part and interest part are
/// each recomputed as `total_field - nominal_field * (count - 1)` so the
/// schedule sums exactly to the quote's figures.
pub fn build_schedule(quote: &AmortizationQuote, start: NaiveDate) -> Vec<ScheduleLine> {
    let count = quote.installments;
    let count_dec = Decimal::from(count);
    let nominal_principal = round2(quote.principal / count_dec);
    let nominal_interest = round2(quote.interest / count_dec);
    let prior = Decimal::from(count - 1);

    (1..=count)
        .map(|number| {
            let (due_amount, principal_part, interest_part) = if number == count {
                (
                    quote.total_amount - quote.installment_amount * prior,
                    quote.principal - nominal_principal * prior,
                    quote.interest - nominal_interest * prior,
                )
            } else {
                (quote.installment_amount, nominal_principal, nominal_interest)
            };

            ScheduleLine {
                installment_number: number,
                due_date: due_date(start, number - 1, quote.frequency),
                due_amount,
                principal_part,
                interest_part,
            }
        })
        .collect()
}

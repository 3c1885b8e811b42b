//! Lending ledger for small collection-based loan books.
//!
//! Loans carry flat simple interest and repay over a fixed installment
//! schedule (daily, weekly or monthly). Payments are recorded as collections:
//! each one splits interest-first across the target installment, books late
//! fees, and drives the installment and loan status machines, all inside a
//! single database transaction.
//!
//! Amounts are decimals rounded half-up to two places; the last installment
//! of every schedule absorbs rounding drift so schedules sum exactly to the
//! loan totals.

pub mod allocation;
pub mod amortization;
pub mod borrower;
pub mod collection;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod loan;
pub mod money;
pub mod notification;
pub mod settings;

pub use config::Config;
pub use db::Database;
pub use error::{LedgerError, Result};

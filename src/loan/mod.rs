//! Loan ledger: the loan, its installment schedule, and the status state
//! machines driven by payment events.

pub mod model;
pub mod service;
pub mod status;

pub use model::{
    CreateLoanRequest, DueInstallment, Installment, InstallmentStatus, Loan, LoanStatus,
    LoanSummary, OverdueLoan,
};
pub use service::LoanService;

//! Collections: recording payments against loans.
//!
//! A collection is the atomic payment event. Recording one splits the amount
//! across principal and interest, books any late fee, advances the target
//! installment, updates the loan's aggregates and recomputes its status, all
//! in one transaction.

pub mod model;
pub mod receipt;
pub mod service;

pub use model::{Collection, PaymentMode, PaymentReceipt, RecordPaymentRequest};
pub use receipt::format_receipt;
pub use service::CollectionService;

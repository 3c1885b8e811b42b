//! Borrowers: the people loans are issued to, scoped to an owner.

pub mod model;
pub mod service;

pub use model::{Borrower, BorrowerStatus, CreateBorrowerRequest};
pub use service::BorrowerService;

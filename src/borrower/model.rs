use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Borrower status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "borrower_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BorrowerStatus {
    Active,
    Inactive,
    /// Set when one of the borrower's loans is marked defaulted.
    Defaulter,
}

/// Borrower model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Borrower {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub mobile: String,
    pub sms_enabled: bool,
    pub status: BorrowerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to register a borrower
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBorrowerRequest {
    pub owner_id: Uuid,
    pub name: String,
    pub mobile: String,
    pub sms_enabled: bool,
}

impl CreateBorrowerRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::InvalidParameters(
                "borrower name cannot be empty".to_string(),
            ));
        }
        if self.mobile.trim().is_empty() {
            return Err(LedgerError::InvalidParameters(
                "borrower mobile cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_fields() {
        let request = CreateBorrowerRequest {
            owner_id: Uuid::new_v4(),
            name: "  ".to_string(),
            mobile: "9876500001".to_string(),
            sms_enabled: true,
        };
        assert!(request.validate().is_err());

        let request = CreateBorrowerRequest {
            owner_id: Uuid::new_v4(),
            name: "Asha Traders".to_string(),
            mobile: "".to_string(),
            sms_enabled: true,
        };
        assert!(request.validate().is_err());
    }
}

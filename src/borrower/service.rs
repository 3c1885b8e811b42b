//! Borrower service layer.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::borrower::model::{Borrower, BorrowerStatus, CreateBorrowerRequest};
use crate::error::{LedgerError, Result};

#[derive(Clone)]
pub struct BorrowerService {
    db_pool: PgPool,
}

impl BorrowerService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Register a borrower. The mobile number must be unique within the
    /// owner's book.
    pub async fn create_borrower(&self, request: CreateBorrowerRequest) -> Result<Borrower> {
        request.validate()?;

        let borrower = sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (owner_id, name, mobile, sms_enabled)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(request.name.trim())
        .bind(request.mobile.trim())
        .bind(request.sms_enabled)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                LedgerError::ConflictingIdentifier(format!(
                    "a borrower with mobile {} already exists",
                    request.mobile.trim()
                ))
            }
            _ => err.into(),
        })?;

        info!(borrower_id = %borrower.id, "borrower registered");
        Ok(borrower)
    }

    pub async fn get_borrower(&self, owner_id: Uuid, borrower_id: Uuid) -> Result<Borrower> {
        sqlx::query_as::<_, Borrower>(
            "SELECT * FROM borrowers WHERE id = $1 AND owner_id = $2",
        )
        .bind(borrower_id)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("borrower {borrower_id} not found")))
    }

    /// All of an owner's borrowers, ordered by name.
    pub async fn list_borrowers(&self, owner_id: Uuid) -> Result<Vec<Borrower>> {
        let borrowers = sqlx::query_as::<_, Borrower>(
            "SELECT * FROM borrowers WHERE owner_id = $1 ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(borrowers)
    }

    /// Change a borrower's status by hand, e.g. deactivating someone who
    /// moved away. Automatic defaulter flips happen in the loan ledger.
    pub async fn set_status(
        &self,
        owner_id: Uuid,
        borrower_id: Uuid,
        status: BorrowerStatus,
    ) -> Result<Borrower> {
        sqlx::query_as::<_, Borrower>(
            r#"
            UPDATE borrowers SET status = $1, updated_at = NOW()
            WHERE id = $2 AND owner_id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(borrower_id)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("borrower {borrower_id} not found")))
    }
}

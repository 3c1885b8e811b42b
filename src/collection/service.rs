//! Collection service layer - records payments atomically.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::allocation;
use crate::borrower::Borrower;
use crate::collection::model::{Collection, PaymentReceipt, RecordPaymentRequest};
use crate::error::{LedgerError, Result};
use crate::ident::{self, MAX_GENERATION_ATTEMPTS};
use crate::loan::model::{Installment, Loan, LoanStatus};
use crate::loan::service::persist_status_transition;
use crate::loan::status;
use crate::notification::Notifier;
use crate::settings::SettingsService;

/// Collection service for recording payments
#[derive(Clone)]
pub struct CollectionService {
    db_pool: PgPool,
    settings: SettingsService,
    notifier: Notifier,
}

impl CollectionService {
    pub fn new(db_pool: PgPool, settings: SettingsService, notifier: Notifier) -> Self {
        Self {
            db_pool,
            settings,
            notifier,
        }
    }

    /// Record a payment against a loan.
    ///
    /// One transaction covers the collection row, the installment update,
    /// the loan aggregates and the status recomputation; a failure at any
    /// point leaves the ledger untouched.
    pub async fn record_payment(&self, request: RecordPaymentRequest) -> Result<PaymentReceipt> {
        request.validate()?;

        let settings = self.settings.get(request.owner_id).await?;

        let mut tx = self.db_pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(request.loan_id)
        .bind(request.owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("loan {} not found", request.loan_id)))?;

        match loan.status {
            LoanStatus::Completed => {
                return Err(LedgerError::InvalidState(format!(
                    "loan {} is already fully paid",
                    loan.loan_number
                )))
            }
            LoanStatus::Cancelled => {
                return Err(LedgerError::InvalidState(format!(
                    "loan {} is cancelled",
                    loan.loan_number
                )))
            }
            // Collections can start before the approval is entered, and
            // keep landing on defaulted loans.
            LoanStatus::Pending | LoanStatus::Active | LoanStatus::Defaulted => {}
        }

        if request.amount > loan.pending_amount {
            return Err(LedgerError::InvalidParameters(format!(
                "payment amount exceeds pending amount ({})",
                loan.pending_amount
            )));
        }

        let installment = self.lock_target_installment(&mut tx, &loan, &request).await?;

        let days_late = allocation::days_late(request.payment_date, installment.due_date);
        let late_fee = allocation::late_fee(days_late, settings.late_fee_per_day);
        let (pending_principal, pending_interest) = installment.outstanding_split();
        let split = allocation::split_payment(request.amount, pending_principal, pending_interest);

        let receipt_number = self.reserve_receipt_number(&mut tx, request.payment_date).await?;

        let collection = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (
                owner_id, borrower_id, loan_id, receipt_number,
                amount, principal_part, interest_part, late_fee,
                payment_date, payment_mode, transaction_id,
                installment_number, days_late, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(loan.borrower_id)
        .bind(loan.id)
        .bind(&receipt_number)
        .bind(request.amount)
        .bind(split.principal)
        .bind(split.interest)
        .bind(late_fee)
        .bind(request.payment_date)
        .bind(request.payment_mode)
        .bind(&request.transaction_id)
        .bind(installment.installment_number)
        .bind(days_late)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        let new_paid = installment.paid_amount + request.amount;
        let installment_status =
            status::installment_status_after_payment(installment.due_amount, new_paid);

        sqlx::query(
            r#"
            UPDATE installment_schedule
            SET paid_amount = $1, paid_date = $2, status = $3,
                days_overdue = $4, late_fee = $5
            WHERE id = $6
            "#,
        )
        .bind(new_paid)
        .bind(request.payment_date)
        .bind(installment_status)
        .bind(days_late)
        .bind(late_fee)
        .bind(installment.id)
        .execute(&mut *tx)
        .await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET paid_amount = paid_amount + $1,
                pending_amount = GREATEST(total_amount - paid_amount - $1, 0),
                paid_installments = (
                    SELECT COUNT(*) FROM installment_schedule
                    WHERE loan_id = $2 AND status = 'paid'
                ),
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(request.amount)
        .bind(loan.id)
        .fetch_one(&mut *tx)
        .await?;

        let loan = persist_status_transition(&mut tx, &loan).await?;

        let borrower = sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(loan.borrower_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            receipt_number = %collection.receipt_number,
            loan_number = %loan.loan_number,
            amount = %collection.amount,
            installment = collection.installment_number,
            days_late = collection.days_late,
            "payment recorded"
        );

        let receipt = PaymentReceipt {
            collection,
            loan_number: loan.loan_number.clone(),
            loan_status: loan.status,
            loan_total_amount: loan.total_amount,
            loan_paid_amount: loan.paid_amount,
            loan_pending_amount: loan.pending_amount,
            installment_status,
            borrower_name: borrower.name.clone(),
            borrower_mobile: borrower.mobile.clone(),
            sms_enabled: borrower.sms_enabled,
        };
        self.notifier.payment_recorded(&receipt);

        Ok(receipt)
    }

    /// Fetch one collection by receipt number.
    pub async fn get_by_receipt(
        &self,
        owner_id: Uuid,
        receipt_number: &str,
    ) -> Result<Collection> {
        sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE receipt_number = $1 AND owner_id = $2",
        )
        .bind(receipt_number)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("receipt {receipt_number} not found")))
    }

    /// All collections recorded against a loan, newest first.
    pub async fn list_for_loan(&self, owner_id: Uuid, loan_id: Uuid) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            r#"
            SELECT * FROM collections
            WHERE loan_id = $1 AND owner_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(loan_id)
        .bind(owner_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(collections)
    }

    /// Total collected by an owner on a given date.
    pub async fn collected_on(
        &self,
        owner_id: Uuid,
        date: chrono::NaiveDate,
    ) -> Result<Decimal> {
        let (total,): (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM collections
            WHERE owner_id = $1 AND payment_date = $2
            "#,
        )
        .bind(owner_id)
        .bind(date)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(total)
    }

    /// Pick the installment the payment lands on: the requested number, or
    /// the earliest unpaid one. Locked for the transaction.
    async fn lock_target_installment(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        loan: &Loan,
        request: &RecordPaymentRequest,
    ) -> Result<Installment> {
        let installment = match request.installment_number {
            Some(number) => sqlx::query_as::<_, Installment>(
                r#"
                SELECT * FROM installment_schedule
                WHERE loan_id = $1 AND installment_number = $2
                FOR UPDATE
                "#,
            )
            .bind(loan.id)
            .bind(number)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "installment {} of loan {} not found",
                    number, loan.loan_number
                ))
            })?,
            None => sqlx::query_as::<_, Installment>(
                r#"
                SELECT * FROM installment_schedule
                WHERE loan_id = $1 AND status IN ('pending', 'partial', 'overdue')
                ORDER BY installment_number
                LIMIT 1
                FOR UPDATE
                "#,
            )
            .bind(loan.id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "loan {} has no unpaid installments",
                    loan.loan_number
                ))
            })?,
        };

        Ok(installment)
    }

    /// Generate a receipt number that does not collide with an existing one.
    async fn reserve_receipt_number(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        date: chrono::NaiveDate,
    ) -> Result<String> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = ident::receipt_number(date);
            let (exists,): (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM collections WHERE receipt_number = $1)",
            )
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;
            if !exists {
                return Ok(candidate);
            }
        }
        Err(LedgerError::ConflictingIdentifier(
            "could not generate a unique receipt number".to_string(),
        ))
    }
}

//! Loan service layer - lifecycle of loans and their installment schedules.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::amortization::{self, AmortizationQuote, QuoteInput, ScheduleLine};
use crate::borrower::{Borrower, BorrowerStatus};
use crate::error::{LedgerError, Result};
use crate::ident::{self, MAX_GENERATION_ATTEMPTS};
use crate::loan::model::{
    CreateLoanRequest, DueInstallment, Installment, InstallmentStatus, Loan, LoanStatus,
    LoanSummary, OverdueLoan,
};
use crate::loan::status;
use crate::notification::Notifier;

/// Loan service for managing loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
    notifier: Notifier,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(db_pool: PgPool, notifier: Notifier) -> Self {
        Self { db_pool, notifier }
    }

    /// Compute amortization totals and the dated schedule without persisting
    /// anything.
    pub fn preview_amortization(
        &self,
        input: &QuoteInput,
        start_date: NaiveDate,
    ) -> Result<(AmortizationQuote, Vec<ScheduleLine>)> {
        let quote = amortization::quote(input)?;
        let schedule = amortization::build_schedule(&quote, start_date);
        Ok((quote, schedule))
    }

    /// Create a loan in pending status with its full installment schedule.
    pub async fn create_loan(&self, request: CreateLoanRequest) -> Result<Loan> {
        let input = QuoteInput {
            principal: request.principal_amount,
            annual_rate: request.interest_rate,
            installments: request.installments,
            frequency: request.installment_frequency,
        };
        let quote = amortization::quote(&input)?;

        let borrower = self
            .find_borrower(request.owner_id, request.borrower_id)
            .await?;
        if borrower.status == BorrowerStatus::Defaulter {
            warn!(borrower_id = %borrower.id, "issuing loan to a defaulter");
        }

        let schedule = amortization::build_schedule(&quote, request.start_date);
        let end_date = amortization::end_date(
            request.start_date,
            request.installments,
            request.installment_frequency,
        );
        let loan_number = self.reserve_loan_number(request.start_date).await?;

        let mut tx = self.db_pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                owner_id, borrower_id, loan_number,
                principal_amount, interest_rate, interest_amount, total_amount,
                installments, installment_amount, installment_frequency,
                disbursement_date, start_date, end_date,
                pending_amount, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(request.borrower_id)
        .bind(&loan_number)
        .bind(quote.principal)
        .bind(request.interest_rate)
        .bind(quote.interest)
        .bind(quote.total_amount)
        .bind(quote.installments as i32)
        .bind(quote.installment_amount)
        .bind(quote.frequency)
        .bind(request.disbursement_date)
        .bind(request.start_date)
        .bind(end_date)
        .bind(quote.total_amount)
        .bind(LoanStatus::Pending)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        for line in &schedule {
            sqlx::query(
                r#"
                INSERT INTO installment_schedule (
                    loan_id, installment_number, due_date,
                    due_amount, principal_part, interest_part
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(loan.id)
            .bind(line.installment_number as i32)
            .bind(line.due_date)
            .bind(line.due_amount)
            .bind(line.principal_part)
            .bind(line.interest_part)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            loan_number = %loan.loan_number,
            borrower_id = %loan.borrower_id,
            total = %loan.total_amount,
            installments = loan.installments,
            "loan created"
        );

        Ok(loan)
    }

    /// Approve a pending loan, activating it and stamping the disbursement
    /// date.
    pub async fn approve_loan(
        &self,
        owner_id: Uuid,
        loan_id: Uuid,
        disbursement_date: NaiveDate,
    ) -> Result<Loan> {
        let mut tx = self.db_pool.begin().await?;

        let loan = self.lock_loan(&mut tx, owner_id, loan_id).await?;
        if loan.status != LoanStatus::Pending {
            return Err(LedgerError::InvalidState(format!(
                "only pending loans can be approved; loan {} is {:?}",
                loan.loan_number, loan.status
            )));
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET status = 'active', disbursement_date = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(disbursement_date)
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        // Fetched before commit so a lookup failure cannot fail an already
        // committed approval; the notice itself never propagates errors.
        let borrower = self.find_borrower(owner_id, loan.borrower_id).await?;

        tx.commit().await?;

        info!(loan_number = %loan.loan_number, "loan approved");
        self.notifier.loan_approved(&borrower, &loan);

        Ok(loan)
    }

    /// Cancel a loan. Only pending or active loans with no recorded payment
    /// can be cancelled.
    pub async fn cancel_loan(&self, owner_id: Uuid, loan_id: Uuid) -> Result<Loan> {
        let mut tx = self.db_pool.begin().await?;

        let loan = self.lock_loan(&mut tx, owner_id, loan_id).await?;
        if !status::can_cancel(loan.status, loan.paid_amount) {
            return Err(LedgerError::InvalidState(format!(
                "loan {} cannot be cancelled: status {:?}, paid {}",
                loan.loan_number, loan.status, loan.paid_amount
            )));
        }

        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(loan_number = %loan.loan_number, "loan cancelled");
        Ok(loan)
    }

    /// Fetch a loan with its schedule and installment status counts.
    pub async fn get_loan(&self, owner_id: Uuid, loan_id: Uuid) -> Result<LoanSummary> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND owner_id = $2",
        )
        .bind(loan_id)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("loan {loan_id} not found")))?;

        let schedule = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installment_schedule WHERE loan_id = $1 ORDER BY installment_number",
        )
        .bind(loan_id)
        .fetch_all(&self.db_pool)
        .await?;

        let overdue_installments = schedule
            .iter()
            .filter(|i| i.status == InstallmentStatus::Overdue)
            .count() as i64;
        let pending_installments = schedule
            .iter()
            .filter(|i| i.status.is_payable())
            .count() as i64;

        Ok(LoanSummary {
            loan,
            schedule,
            overdue_installments,
            pending_installments,
        })
    }

    /// Fetch a loan by its human-readable number.
    pub async fn get_loan_by_number(&self, owner_id: Uuid, loan_number: &str) -> Result<Loan> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE loan_number = $1 AND owner_id = $2",
        )
        .bind(loan_number)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("loan {loan_number} not found")))
    }

    /// Installments of active loans falling due on the given date, with
    /// borrower contact details for collection rounds.
    pub async fn installments_due_on(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DueInstallment>> {
        let due = sqlx::query_as::<_, DueInstallment>(
            r#"
            SELECT l.id AS loan_id, l.loan_number,
                   b.name AS borrower_name, b.mobile AS borrower_mobile,
                   i.installment_number, i.due_amount, i.status
            FROM installment_schedule i
            JOIN loans l ON l.id = i.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE l.owner_id = $1
              AND l.status = 'active'
              AND i.due_date = $2
              AND i.status <> 'paid'
            ORDER BY l.loan_number, i.installment_number
            "#,
        )
        .bind(owner_id)
        .bind(date)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(due)
    }

    /// Per-loan overdue aggregates for an owner's active and defaulted loans.
    pub async fn overdue_loans(&self, owner_id: Uuid) -> Result<Vec<OverdueLoan>> {
        let overdue = sqlx::query_as::<_, OverdueLoan>(
            r#"
            SELECT l.id AS loan_id, l.loan_number,
                   b.name AS borrower_name, b.mobile AS borrower_mobile,
                   COUNT(*) AS overdue_count,
                   COALESCE(SUM(i.due_amount - i.paid_amount), 0) AS overdue_amount,
                   MAX(i.days_overdue) AS max_days_overdue
            FROM installment_schedule i
            JOIN loans l ON l.id = i.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE l.owner_id = $1
              AND l.status IN ('active', 'defaulted')
              AND i.status = 'overdue'
            GROUP BY l.id, l.loan_number, b.name, b.mobile
            ORDER BY max_days_overdue DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(overdue)
    }

    /// Sweep unpaid installments of active loans past their due date into
    /// overdue, then recompute the status of every touched loan. Rows that
    /// are already overdue get their days-overdue count refreshed. Returns
    /// the ids of loans that moved to defaulted.
    ///
    /// Typically driven once a day by a scheduler.
    pub async fn mark_overdue(&self, owner_id: Uuid, as_of: NaiveDate) -> Result<Vec<Uuid>> {
        let touched = sqlx::query_as::<_, (Uuid,)>(
            r#"
            UPDATE installment_schedule i
            SET status = 'overdue', days_overdue = $2 - i.due_date
            FROM loans l
            WHERE i.loan_id = l.id
              AND l.owner_id = $1
              AND l.status = 'active'
              AND i.due_date < $2
              AND i.status IN ('pending', 'partial', 'overdue')
            RETURNING i.loan_id
            "#,
        )
        .bind(owner_id)
        .bind(as_of)
        .fetch_all(&self.db_pool)
        .await?;

        let mut loan_ids: Vec<Uuid> = touched.into_iter().map(|(id,)| id).collect();
        loan_ids.sort();
        loan_ids.dedup();

        let mut defaulted = Vec::new();
        for loan_id in loan_ids {
            let loan = self.refresh_status(owner_id, loan_id).await?;
            if loan.status == LoanStatus::Defaulted {
                defaulted.push(loan.id);
            }
        }

        if !defaulted.is_empty() {
            warn!(count = defaulted.len(), "loans moved to defaulted");
        }

        Ok(defaulted)
    }

    /// Recompute one loan's status from its aggregates and persist the
    /// transition.
    pub async fn refresh_status(&self, owner_id: Uuid, loan_id: Uuid) -> Result<Loan> {
        let mut tx = self.db_pool.begin().await?;
        let loan = self.lock_loan(&mut tx, owner_id, loan_id).await?;
        let loan = persist_status_transition(&mut tx, &loan).await?;
        tx.commit().await?;
        Ok(loan)
    }

    /// Lock a loan row for the duration of the transaction, checking
    /// ownership.
    async fn lock_loan(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: Uuid,
        loan_id: Uuid,
    ) -> Result<Loan> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(loan_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("loan {loan_id} not found")))
    }

    async fn find_borrower(&self, owner_id: Uuid, borrower_id: Uuid) -> Result<Borrower> {
        sqlx::query_as::<_, Borrower>(
            "SELECT * FROM borrowers WHERE id = $1 AND owner_id = $2",
        )
        .bind(borrower_id)
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("borrower {borrower_id} not found")))
    }

    /// Generate a loan number that does not collide with an existing one.
    async fn reserve_loan_number(&self, date: NaiveDate) -> Result<String> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = ident::loan_number(date);
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM loans WHERE loan_number = $1)")
                    .bind(&candidate)
                    .fetch_one(&self.db_pool)
                    .await?;
            if !exists {
                return Ok(candidate);
            }
        }
        Err(LedgerError::ConflictingIdentifier(
            "could not generate a unique loan number".to_string(),
        ))
    }
}

/// Recompute a locked loan's status from its aggregates and persist the
/// transition inside the caller's transaction. Flips the borrower to
/// defaulter when the loan defaults, and stamps `completed_at` on
/// completion.
pub(crate) async fn persist_status_transition(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    loan: &Loan,
) -> Result<Loan> {
    let (overdue_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM installment_schedule WHERE loan_id = $1 AND status = 'overdue'",
    )
    .bind(loan.id)
    .fetch_one(&mut **tx)
    .await?;

    let next = status::next_loan_status(
        loan.status,
        loan.paid_amount,
        loan.total_amount,
        overdue_count,
    );
    if next == loan.status {
        return Ok(loan.clone());
    }

    let updated = sqlx::query_as::<_, Loan>(
        r#"
        UPDATE loans
        SET status = $1,
            completed_at = CASE WHEN $1 = 'completed'::loan_status THEN NOW() ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(next)
    .bind(loan.id)
    .fetch_one(&mut **tx)
    .await?;

    match next {
        LoanStatus::Completed => {
            info!(loan_number = %updated.loan_number, "loan completed");
        }
        LoanStatus::Defaulted => {
            sqlx::query("UPDATE borrowers SET status = 'defaulter', updated_at = NOW() WHERE id = $1")
                .bind(updated.borrower_id)
                .execute(&mut **tx)
                .await?;
            warn!(loan_number = %updated.loan_number, overdue_count, "loan defaulted");
        }
        _ => {}
    }

    Ok(updated)
}

//! End-to-end ledger flow tests.
//!
//! These exercise the services against a real Postgres instance and are
//! ignored by default; point TEST_DATABASE_URL at a scratch database to run
//! them.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    use lendledger::amortization::Frequency;
    use lendledger::borrower::{BorrowerService, BorrowerStatus, CreateBorrowerRequest};
    use lendledger::collection::{CollectionService, PaymentMode, RecordPaymentRequest};
    use lendledger::error::LedgerError;
    use lendledger::loan::{CreateLoanRequest, InstallmentStatus, LoanService, LoanStatus};
    use lendledger::notification::Notifier;
    use lendledger::settings::SettingsService;

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/lendledger_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn services(pool: &PgPool) -> (BorrowerService, LoanService, CollectionService) {
        let notifier = Notifier::new();
        (
            BorrowerService::new(pool.clone()),
            LoanService::new(pool.clone(), notifier.clone()),
            CollectionService::new(pool.clone(), SettingsService::new(pool.clone()), notifier),
        )
    }

    async fn make_borrower(borrowers: &BorrowerService, owner_id: Uuid) -> Uuid {
        let borrower = borrowers
            .create_borrower(CreateBorrowerRequest {
                owner_id,
                name: "Asha Traders".to_string(),
                mobile: format!("98765{:05}", rand_suffix()),
                sms_enabled: false,
            })
            .await
            .expect("Failed to create borrower");
        borrower.id
    }

    fn rand_suffix() -> u32 {
        // Enough entropy to keep test borrowers from colliding on mobile.
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .subsec_nanos()
            % 100_000
    }

    fn loan_request(owner_id: Uuid, borrower_id: Uuid, start: NaiveDate) -> CreateLoanRequest {
        CreateLoanRequest {
            owner_id,
            borrower_id,
            principal_amount: dec!(1000),
            interest_rate: dec!(12),
            installments: 10,
            installment_frequency: Frequency::Daily,
            start_date: start,
            disbursement_date: None,
            notes: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_loan_creation_persists_full_schedule() {
        let pool = setup_test_db().await;
        let (borrowers, loans, _) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .expect("Failed to create loan");

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.pending_amount, loan.total_amount);
        assert!(loan.loan_number.starts_with("LOAN20260301-"));

        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        assert_eq!(summary.schedule.len(), 10);
        let due_sum: rust_decimal::Decimal =
            summary.schedule.iter().map(|i| i.due_amount).sum();
        assert_eq!(due_sum, loan.total_amount);
        assert_eq!(summary.pending_installments, 10);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_payment_on_pending_loan_is_accepted() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        // Collections can start before the approval is entered; only
        // completed and cancelled loans reject payments.
        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);

        let receipt = collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: dec!(101),
                payment_date: d(2026, 3, 1),
                payment_mode: PaymentMode::Cash,
                installment_number: None,
                transaction_id: None,
                notes: None,
            })
            .await
            .expect("Failed to record payment on pending loan");

        assert_eq!(receipt.loan_status, LoanStatus::Pending);
        assert_eq!(receipt.installment_status, InstallmentStatus::Paid);
        assert_eq!(receipt.loan_paid_amount, dec!(101));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cancelled_loan_rejects_payment() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans.cancel_loan(owner_id, loan.id).await.unwrap();

        let result = collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: dec!(100),
                payment_date: d(2026, 3, 1),
                payment_mode: PaymentMode::Cash,
                installment_number: None,
                transaction_id: None,
                notes: None,
            })
            .await;

        assert!(matches!(result, Err(LedgerError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_full_repayment_completes_loan() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        let loan = loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Active);

        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        let mut last_receipt = None;
        for installment in &summary.schedule {
            let receipt = collections
                .record_payment(RecordPaymentRequest {
                    owner_id,
                    loan_id: loan.id,
                    amount: installment.due_amount,
                    payment_date: installment.due_date,
                    payment_mode: PaymentMode::Cash,
                    installment_number: None,
                    transaction_id: None,
                    notes: None,
                })
                .await
                .expect("Failed to record payment");
            assert_eq!(receipt.collection.days_late, 0);
            assert_eq!(receipt.installment_status, InstallmentStatus::Paid);
            last_receipt = Some(receipt);
        }

        let receipt = last_receipt.unwrap();
        assert_eq!(receipt.loan_status, LoanStatus::Completed);
        assert_eq!(receipt.loan_pending_amount, dec!(0));

        let loan = loans.get_loan(owner_id, loan.id).await.unwrap().loan;
        assert_eq!(loan.status, LoanStatus::Completed);
        assert!(loan.completed_at.is_some());
        assert_eq!(loan.paid_installments, 10);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_payment_above_pending_is_rejected() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        let loan = loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();

        let result = collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: loan.pending_amount + dec!(0.01),
                payment_date: d(2026, 3, 1),
                payment_mode: PaymentMode::Upi,
                installment_number: None,
                transaction_id: Some("UPI-1".to_string()),
                notes: None,
            })
            .await;

        match result {
            Err(LedgerError::InvalidParameters(message)) => {
                assert!(message.contains(&loan.pending_amount.to_string()));
            }
            other => panic!("expected InvalidParameters, got {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_overdue_sweep_defaults_loan_and_flags_borrower() {
        let pool = setup_test_db().await;
        let (borrowers, loans, _) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();

        // Three daily installments past due tips the loan into default.
        let defaulted = loans.mark_overdue(owner_id, d(2026, 3, 4)).await.unwrap();
        assert!(defaulted.contains(&loan.id));

        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        assert_eq!(summary.loan.status, LoanStatus::Defaulted);
        assert_eq!(summary.overdue_installments, 3);

        let borrower = borrowers.get_borrower(owner_id, borrower_id).await.unwrap();
        assert_eq!(borrower.status, BorrowerStatus::Defaulter);

        let overdue = loans.overdue_loans(owner_id).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].overdue_count, 3);
        assert_eq!(overdue[0].max_days_overdue, 3);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_late_payment_books_fee_separately() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();
        loans.mark_overdue(owner_id, d(2026, 3, 3)).await.unwrap();

        // First installment paid two days late; default rate is 50/day.
        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        let first = &summary.schedule[0];
        let receipt = collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: first.due_amount,
                payment_date: d(2026, 3, 3),
                payment_mode: PaymentMode::Cash,
                installment_number: Some(1),
                transaction_id: None,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(receipt.collection.days_late, 2);
        assert_eq!(receipt.collection.late_fee, dec!(100.00));
        // The fee is informational; the full amount still allocates.
        assert_eq!(
            receipt.collection.principal_part + receipt.collection.interest_part,
            first.due_amount
        );
        assert_eq!(receipt.installment_status, InstallmentStatus::Paid);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_late_fee_tracks_latest_payment_lateness() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();

        // Two late payments on the same installment: the stored fee and
        // days-overdue reflect the latest one, they do not accumulate.
        for (amount, date) in [(dec!(50), d(2026, 3, 3)), (dec!(51), d(2026, 3, 4))] {
            collections
                .record_payment(RecordPaymentRequest {
                    owner_id,
                    loan_id: loan.id,
                    amount,
                    payment_date: date,
                    payment_mode: PaymentMode::Cash,
                    installment_number: Some(1),
                    transaction_id: None,
                    notes: None,
                })
                .await
                .unwrap();
        }

        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        let first = &summary.schedule[0];
        assert_eq!(first.status, InstallmentStatus::Paid);
        assert_eq!(first.days_overdue, 3);
        assert_eq!(first.late_fee, dec!(150.00));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_approval_with_sms_enabled_borrower() {
        let pool = setup_test_db().await;
        let (borrowers, loans, _) = services(&pool);
        let owner_id = Uuid::new_v4();

        let borrower = borrowers
            .create_borrower(CreateBorrowerRequest {
                owner_id,
                name: "Ravi Stores".to_string(),
                mobile: format!("97531{:05}", rand_suffix()),
                sms_enabled: true,
            })
            .await
            .unwrap();

        let loan = loans
            .create_loan(loan_request(owner_id, borrower.id, d(2026, 3, 1)))
            .await
            .unwrap();

        // The approval notice is a side channel; approval commits and
        // returns the active loan regardless of it.
        let loan = loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .expect("Failed to approve loan");
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.disbursement_date, Some(d(2026, 3, 1)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_payment_with_no_unpaid_installments_is_not_found() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();

        // Force every installment to paid without touching the loan
        // aggregates, leaving an active loan with nothing to pay against.
        sqlx::query(
            "UPDATE installment_schedule SET status = 'paid', paid_amount = due_amount WHERE loan_id = $1",
        )
        .bind(loan.id)
        .execute(&pool)
        .await
        .unwrap();

        let result = collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: dec!(100),
                payment_date: d(2026, 3, 1),
                payment_mode: PaymentMode::Cash,
                installment_number: None,
                transaction_id: None,
                notes: None,
            })
            .await;

        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_sweep_refreshes_days_on_already_overdue_installments() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();

        // First sweep: installments due Mar 1 and Mar 2 go overdue.
        loans.mark_overdue(owner_id, d(2026, 3, 3)).await.unwrap();

        // Clear one so the loan stays below the default threshold.
        collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: dec!(101),
                payment_date: d(2026, 3, 3),
                payment_mode: PaymentMode::Cash,
                installment_number: Some(1),
                transaction_id: None,
                notes: None,
            })
            .await
            .unwrap();

        // Next day's sweep refreshes the surviving overdue row (Mar 2, now
        // 2 days) and picks up the Mar 3 one.
        loans.mark_overdue(owner_id, d(2026, 3, 4)).await.unwrap();

        let summary = loans.get_loan(owner_id, loan.id).await.unwrap();
        assert_eq!(summary.loan.status, LoanStatus::Active);
        assert_eq!(summary.schedule[1].days_overdue, 2);
        assert_eq!(summary.schedule[2].days_overdue, 1);

        let overdue = loans.overdue_loans(owner_id).await.unwrap();
        assert_eq!(overdue[0].max_days_overdue, 2);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cancel_rules() {
        let pool = setup_test_db().await;
        let (borrowers, loans, collections) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        // A pending loan cancels cleanly.
        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        let cancelled = loans.cancel_loan(owner_id, loan.id).await.unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);

        // A loan with a payment on it does not.
        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();
        loans
            .approve_loan(owner_id, loan.id, d(2026, 3, 1))
            .await
            .unwrap();
        collections
            .record_payment(RecordPaymentRequest {
                owner_id,
                loan_id: loan.id,
                amount: dec!(50),
                payment_date: d(2026, 3, 1),
                payment_mode: PaymentMode::Cash,
                installment_number: None,
                transaction_id: None,
                notes: None,
            })
            .await
            .unwrap();

        let result = loans.cancel_loan(owner_id, loan.id).await;
        assert!(matches!(result, Err(LedgerError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_owner_scoping_hides_foreign_loans() {
        let pool = setup_test_db().await;
        let (borrowers, loans, _) = services(&pool);
        let owner_id = Uuid::new_v4();
        let borrower_id = make_borrower(&borrowers, owner_id).await;

        let loan = loans
            .create_loan(loan_request(owner_id, borrower_id, d(2026, 3, 1)))
            .await
            .unwrap();

        let other_owner = Uuid::new_v4();
        let result = loans.get_loan(other_owner, loan.id).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }
}

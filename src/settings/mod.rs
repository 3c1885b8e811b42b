//! Per-owner ledger settings.
//!
//! Reads fall back to defaults so an owner without a settings row behaves
//! the same as one created with them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Late fee charged per day an installment payment is late.
pub const DEFAULT_LATE_FEE_PER_DAY: Decimal = dec!(50.00);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OwnerSettings {
    pub owner_id: Uuid,
    pub late_fee_per_day: Decimal,
    /// Pre-filled interest rate for new loans, in percent.
    pub default_interest_rate: Decimal,
    pub default_installments: i32,
}

impl OwnerSettings {
    pub fn defaults(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            late_fee_per_day: DEFAULT_LATE_FEE_PER_DAY,
            default_interest_rate: dec!(10.00),
            default_installments: 30,
        }
    }
}

/// Fields accepted by [`SettingsService::update`]; `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub late_fee_per_day: Option<Decimal>,
    pub default_interest_rate: Option<Decimal>,
    pub default_installments: Option<i32>,
}

#[derive(Clone)]
pub struct SettingsService {
    db_pool: PgPool,
}

impl SettingsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Settings for an owner, or the defaults when none are stored.
    pub async fn get(&self, owner_id: Uuid) -> Result<OwnerSettings> {
        let settings = sqlx::query_as::<_, OwnerSettings>(
            r#"
            SELECT owner_id, late_fee_per_day, default_interest_rate, default_installments
            FROM owner_settings WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(settings.unwrap_or_else(|| OwnerSettings::defaults(owner_id)))
    }

    /// Upsert an owner's settings, keeping current values for fields not
    /// supplied.
    pub async fn update(
        &self,
        owner_id: Uuid,
        request: UpdateSettingsRequest,
    ) -> Result<OwnerSettings> {
        let current = self.get(owner_id).await?;
        let late_fee_per_day = request.late_fee_per_day.unwrap_or(current.late_fee_per_day);
        let default_interest_rate = request
            .default_interest_rate
            .unwrap_or(current.default_interest_rate);
        let default_installments = request
            .default_installments
            .unwrap_or(current.default_installments);

        if late_fee_per_day < Decimal::ZERO {
            return Err(LedgerError::InvalidParameters(
                "late fee per day cannot be negative".to_string(),
            ));
        }
        if default_interest_rate < Decimal::ZERO || default_interest_rate > Decimal::from(100) {
            return Err(LedgerError::InvalidParameters(
                "default interest rate must be between 0 and 100".to_string(),
            ));
        }
        if default_installments < 1 {
            return Err(LedgerError::InvalidParameters(
                "default installments must be greater than 0".to_string(),
            ));
        }

        let settings = sqlx::query_as::<_, OwnerSettings>(
            r#"
            INSERT INTO owner_settings (
                owner_id, late_fee_per_day, default_interest_rate, default_installments
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id)
            DO UPDATE SET late_fee_per_day = $2,
                          default_interest_rate = $3,
                          default_installments = $4,
                          updated_at = NOW()
            RETURNING owner_id, late_fee_per_day, default_interest_rate, default_installments
            "#,
        )
        .bind(owner_id)
        .bind(late_fee_per_day)
        .bind(default_interest_rate)
        .bind(default_installments)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(settings)
    }
}

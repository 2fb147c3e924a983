//! # Quote Repository
//!
//! Database operations for quotes.
//!
//! ## Quote Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Quote Lifecycle                                   │
//! │                                                                         │
//! │  1. DRAFT                                                               │
//! │     └── insert() → Quote { status: pending }                            │
//! │     └── update() → segments / price edited (until converted)            │
//! │                                                                         │
//! │  2. SEND                                                                │
//! │     └── mark_sent() → Quote { status: sent }                            │
//! │                                                                         │
//! │  3. CONVERT (ConversionService only)                                    │
//! │     └── link_sale() → converted_to_sale_id set                          │
//! │         UPDATE ... WHERE converted_to_sale_id IS NULL                   │
//! │         0 rows → someone else converted first                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored Segments
//! Rows carry a `schema_version`. Version 1 rows are read through
//! [`QuoteSegments::decode`] and rewritten as version 2 on the next update.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use milesdesk_core::segments::CURRENT_SCHEMA_VERSION;
use milesdesk_core::{CoreError, Customer, Quote, QuoteSegments, QuoteStatus, TripType};

const SELECT_QUOTE: &str = r#"
    SELECT
        id, customer_name, customer_email, customer_phone,
        trip_type, passengers, segments, schema_version, miles_needed,
        total_price, boarding_fee_per_passenger, cost_per_thousand_miles,
        status, converted_to_sale_id, converted_at, notes,
        created_at, updated_at
    FROM quotes
"#;

/// A `quotes` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    id: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    trip_type: TripType,
    passengers: i64,
    segments: String,
    schema_version: i64,
    miles_needed: Option<f64>,
    total_price: f64,
    boarding_fee_per_passenger: f64,
    cost_per_thousand_miles: f64,
    status: QuoteStatus,
    converted_to_sale_id: Option<String>,
    converted_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = DbError;

    fn try_from(row: QuoteRow) -> DbResult<Self> {
        let passengers = u32::try_from(row.passengers)
            .map_err(|_| DbError::corrupt("Quote", &row.id, "negative passenger count"))?;
        let schema_version = u32::try_from(row.schema_version)
            .map_err(|_| DbError::corrupt("Quote", &row.id, "negative schema version"))?;
        let segments =
            QuoteSegments::decode(schema_version, row.trip_type, &row.segments, row.miles_needed)
                .map_err(|e| DbError::corrupt("Quote", &row.id, e))?;

        Ok(Quote {
            id: row.id,
            customer: Customer {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
            },
            passengers,
            segments,
            miles_needed: row.miles_needed,
            total_price: row.total_price,
            boarding_fee_per_passenger: row.boarding_fee_per_passenger,
            cost_per_thousand_miles: row.cost_per_thousand_miles,
            status: row.status,
            converted_to_sale_id: row.converted_to_sale_id,
            converted_at: row.converted_at,
            notes: row.notes,
            schema_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for quote database operations.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Inserts a new quote. Segments are written in the current schema.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a passenger count outside 1..=9 or a
    ///   negative price, cost or fee
    pub async fn insert(&self, quote: &Quote) -> DbResult<()> {
        quote.validate()?;
        debug!(id = %quote.id, trip_type = %quote.trip_type(), "Inserting quote");

        let segments = serde_json::to_string(&quote.segments)?;

        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, customer_name, customer_email, customer_phone,
                trip_type, passengers, segments, schema_version, miles_needed,
                total_price, boarding_fee_per_passenger, cost_per_thousand_miles,
                status, converted_to_sale_id, converted_at, notes,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18
            )
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.customer.name)
        .bind(&quote.customer.email)
        .bind(&quote.customer.phone)
        .bind(quote.trip_type())
        .bind(i64::from(quote.passengers))
        .bind(segments)
        .bind(i64::from(CURRENT_SCHEMA_VERSION))
        .bind(quote.miles_needed)
        .bind(quote.total_price)
        .bind(quote.boarding_fee_per_passenger)
        .bind(quote.cost_per_thousand_miles)
        .bind(quote.status)
        .bind(&quote.converted_to_sale_id)
        .bind(quote.converted_at)
        .bind(&quote.notes)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a quote by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Quote>> {
        fetch_quote_with(&self.pool, id).await
    }

    /// Lists quotes, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<QuoteStatus>, limit: u32) -> DbResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    "{SELECT_QUOTE} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
                ))
                .bind(status)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!("{SELECT_QUOTE} ORDER BY created_at DESC LIMIT ?1"))
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Quote::try_from).collect()
    }

    /// Saves edits to a quote that has not been converted.
    ///
    /// Rewrites the segment document in the current schema version.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for the same input rules as [`insert`](Self::insert)
    /// - `Domain(InvalidQuoteStatus)` if the quote is already converted
    /// - `NotFound` if the quote doesn't exist
    pub async fn update(&self, quote: &Quote) -> DbResult<()> {
        quote.validate()?;
        debug!(id = %quote.id, "Updating quote");

        let segments = serde_json::to_string(&quote.segments)?;

        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                customer_name = ?2,
                customer_email = ?3,
                customer_phone = ?4,
                trip_type = ?5,
                passengers = ?6,
                segments = ?7,
                schema_version = ?8,
                miles_needed = ?9,
                total_price = ?10,
                boarding_fee_per_passenger = ?11,
                cost_per_thousand_miles = ?12,
                notes = ?13,
                updated_at = ?14
            WHERE id = ?1 AND converted_to_sale_id IS NULL
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.customer.name)
        .bind(&quote.customer.email)
        .bind(&quote.customer.phone)
        .bind(quote.trip_type())
        .bind(i64::from(quote.passengers))
        .bind(segments)
        .bind(i64::from(CURRENT_SCHEMA_VERSION))
        .bind(quote.miles_needed)
        .bind(quote.total_price)
        .bind(quote.boarding_fee_per_passenger)
        .bind(quote.cost_per_thousand_miles)
        .bind(&quote.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.locked_or_missing(&quote.id).await);
        }

        Ok(())
    }

    /// Marks a pending quote as sent to the customer.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                status = 'sent',
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.locked_or_missing(id).await);
        }

        debug!(id = %id, "Quote marked as sent");
        Ok(())
    }

    /// Returns the sale a quote was converted into, if any.
    pub async fn converted_sale_id(&self, id: &str) -> DbResult<Option<String>> {
        converted_sale_id_with(&self.pool, id).await
    }

    /// Explains why a guarded UPDATE touched nothing.
    async fn locked_or_missing(&self, id: &str) -> DbError {
        match self.get_by_id(id).await {
            Ok(Some(quote)) => CoreError::InvalidQuoteStatus {
                quote_id: quote.id,
                current_status: quote.status.to_string(),
            }
            .into(),
            Ok(None) => DbError::not_found("Quote", id),
            Err(err) => err,
        }
    }
}

// =============================================================================
// Executor-generic helpers (pool or open transaction)
// =============================================================================

pub(crate) async fn fetch_quote_with<'e, E>(executor: E, id: &str) -> DbResult<Option<Quote>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<QuoteRow> = sqlx::query_as(&format!("{SELECT_QUOTE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(Quote::try_from).transpose()
}

pub(crate) async fn converted_sale_id_with<'e, E>(executor: E, id: &str) -> DbResult<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT converted_to_sale_id FROM quotes WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

    match row {
        Some((sale_id,)) => Ok(sale_id),
        None => Err(DbError::not_found("Quote", id)),
    }
}

/// Links a quote to its sale exactly once.
///
/// Returns `false` when the quote was already linked (or does not exist):
/// the caller must roll back the sale it just inserted.
pub(crate) async fn link_sale_with<'e, E>(
    executor: E,
    quote_id: &str,
    sale_id: &str,
    at: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE quotes SET
            converted_to_sale_id = ?2,
            converted_at = ?3,
            status = 'converted',
            updated_at = ?3
        WHERE id = ?1 AND converted_to_sale_id IS NULL
        "#,
    )
    .bind(quote_id)
    .bind(sale_id)
    .bind(at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

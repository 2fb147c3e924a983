//! # Conversion Service
//!
//! Persists quote → sale conversions with the convert-once guarantee.
//!
//! ## Transaction Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  convert_quote(quote_id, options)                                       │
//! │                                                                         │
//! │  (pool)  load quote + interest table                                    │
//! │  (pool)  milesdesk_core::convert ──► Sale   (or AlreadyConverted)       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT sale                 ── UNIQUE(quote_id) hit? ──► ROLLBACK    │
//! │    UPDATE quotes SET converted_to_sale_id = sale.id                     │
//! │      WHERE id = ? AND converted_to_sale_id IS NULL                      │
//! │                                ── 0 rows? ──────────────► ROLLBACK      │
//! │    INSERT tickets (convert_and_issue only)                              │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  ROLLBACK ──► read converted_to_sale_id ──► AlreadyConverted{sale_id}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale insert is the first statement of the transaction so SQLite
//! takes the write lock up front. Two callers racing on the same quote
//! serialize on that lock; the loser sees the winner's link and gets the
//! winner's sale id back instead of a second sale.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::interest::list_all_with;
use crate::repository::quote::{converted_sale_id_with, fetch_quote_with, link_sale_with};
use crate::repository::sale::insert_sale_with;
use crate::repository::ticket::{claim_issuance_with, insert_ticket_with};
use milesdesk_core::{convert, issue_tickets, ConversionOptions, CoreError, Passenger, Sale, Ticket};

/// Result of a conversion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// A new sale was written and the quote now points at it.
    Created { sale: Sale, tickets: Vec<Ticket> },

    /// The quote already had a sale. Nothing was written.
    AlreadyConverted { sale_id: String },
}

impl ConversionOutcome {
    /// The sale the caller should show, new or existing.
    pub fn sale_id(&self) -> &str {
        match self {
            ConversionOutcome::Created { sale, .. } => &sale.id,
            ConversionOutcome::AlreadyConverted { sale_id } => sale_id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ConversionOutcome::Created { .. })
    }
}

/// Quote → sale conversion against the database.
#[derive(Debug, Clone)]
pub struct ConversionService {
    pool: SqlitePool,
}

impl ConversionService {
    /// Creates a new ConversionService.
    pub fn new(pool: SqlitePool) -> Self {
        ConversionService { pool }
    }

    /// Converts a quote into a sale, at most once.
    ///
    /// ## Errors
    /// - `NotFound` if the quote doesn't exist
    /// - `Domain(IncompleteSegments | ZeroOrNegativePrice | Validation)` when
    ///   the quote cannot become a sale; nothing is written
    ///
    /// An already converted quote is not an error: the outcome carries the
    /// existing sale id.
    pub async fn convert_quote(
        &self,
        quote_id: &str,
        options: &ConversionOptions,
    ) -> DbResult<ConversionOutcome> {
        self.run(quote_id, options, None).await
    }

    /// Converts a quote and issues one ticket per passenger in the same
    /// transaction.
    ///
    /// Passenger names and the PNR are checked before anything is written,
    /// so a bad ticket request never leaves a sale without tickets.
    pub async fn convert_and_issue(
        &self,
        quote_id: &str,
        options: &ConversionOptions,
        passengers: &[Passenger],
        pnr: &str,
    ) -> DbResult<ConversionOutcome> {
        self.run(quote_id, options, Some((passengers, pnr))).await
    }

    async fn run(
        &self,
        quote_id: &str,
        options: &ConversionOptions,
        ticketing: Option<(&[Passenger], &str)>,
    ) -> DbResult<ConversionOutcome> {
        let quote = fetch_quote_with(&self.pool, quote_id)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", quote_id))?;
        let configs = list_all_with(&self.pool).await?;

        let sale = match convert(&quote, options, &configs) {
            Ok(sale) => sale,
            Err(CoreError::AlreadyConverted { sale_id, .. }) => {
                debug!(quote_id = %quote_id, sale_id = %sale_id, "Quote already converted");
                return Ok(ConversionOutcome::AlreadyConverted { sale_id });
            }
            Err(err) => return Err(err.into()),
        };

        let tickets = match ticketing {
            Some((passengers, pnr)) => issue_tickets(&sale, passengers, pnr)?,
            None => Vec::new(),
        };

        let mut tx = self.pool.begin().await?;

        match insert_sale_with(&mut *tx, &sale).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                tx.rollback().await?;
                return self.lost_race(quote_id).await;
            }
            Err(err) => return Err(err),
        }

        if !link_sale_with(&mut *tx, quote_id, &sale.id, sale.created_at).await? {
            tx.rollback().await?;
            return self.lost_race(quote_id).await;
        }

        claim_issuance_with(&mut *tx, &sale.id, &tickets).await?;
        for ticket in &tickets {
            insert_ticket_with(&mut *tx, ticket).await?;
        }

        tx.commit().await?;

        info!(
            quote_id = %quote_id,
            sale_id = %sale.id,
            trip_type = %sale.trip_type(),
            passengers = sale.passengers,
            price_total = sale.price_total,
            profit = sale.profit,
            payment_method = ?sale.payment_method,
            installments = sale.installments,
            tickets = tickets.len(),
            "Quote converted"
        );

        Ok(ConversionOutcome::Created { sale, tickets })
    }

    /// Another conversion committed first. Only called after rollback, so
    /// the pool connection is free again.
    async fn lost_race(&self, quote_id: &str) -> DbResult<ConversionOutcome> {
        match converted_sale_id_with(&self.pool, quote_id).await? {
            Some(sale_id) => {
                warn!(
                    quote_id = %quote_id,
                    sale_id = %sale_id,
                    "Concurrent conversion detected, returning existing sale"
                );
                Ok(ConversionOutcome::AlreadyConverted { sale_id })
            }
            None => Err(DbError::Internal(format!(
                "quote {quote_id} rejected the sale link but has no converted sale"
            ))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use milesdesk_core::segments::{FlightSegment, QuoteSegments};
    use milesdesk_core::{Customer, PaymentInterestConfig, PaymentMethod, PaymentType, Quote, QuoteStatus};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn one_way_quote(total_price: f64) -> Quote {
        let mut quote = Quote::new(
            Customer::named("Marcos Lima"),
            2,
            QuoteSegments::OneWay {
                segment: FlightSegment::new("CNF", "FOR", "2026-07-15", 12_000.0),
            },
        );
        quote.total_price = total_price;
        quote.cost_per_thousand_miles = 25.0;
        quote.boarding_fee_per_passenger = 40.0;
        quote
    }

    #[tokio::test]
    async fn test_convert_links_quote_and_sale() {
        let db = setup().await;
        let quote = one_way_quote(1_400.0);
        db.quotes().insert(&quote).await.unwrap();

        let outcome = db
            .conversions()
            .convert_quote(&quote.id, &ConversionOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_created());

        let ConversionOutcome::Created { sale, tickets } = outcome else {
            panic!("expected a new sale");
        };
        assert!(tickets.is_empty());
        assert_eq!(sale.quote_id.as_deref(), Some(quote.id.as_str()));
        assert_eq!(sale.miles_used_total, 24_000.0);
        // 24k miles at 25/k + 2 × 40 boarding
        assert_eq!(sale.total_cost, 680.0);
        assert_eq!(sale.profit, 720.0);

        let stored = db.quotes().get_by_id(&quote.id).await.unwrap().unwrap();
        assert_eq!(stored.status, QuoteStatus::Converted);
        assert_eq!(stored.converted_to_sale_id.as_deref(), Some(sale.id.as_str()));
        assert!(stored.converted_at.is_some());
    }

    #[tokio::test]
    async fn test_second_convert_returns_existing_sale() {
        let db = setup().await;
        let quote = one_way_quote(1_400.0);
        db.quotes().insert(&quote).await.unwrap();

        let first = db
            .conversions()
            .convert_quote(&quote.id, &ConversionOptions::default())
            .await
            .unwrap();
        let second = db
            .conversions()
            .convert_quote(&quote.id, &ConversionOptions::new(PaymentMethod::Cash, 1))
            .await
            .unwrap();

        assert!(!second.is_created());
        assert_eq!(second.sale_id(), first.sale_id());
        assert_eq!(db.sales().count_converted().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_link_guard_rolls_back_sale() {
        let db = setup().await;
        let quote = one_way_quote(1_400.0);
        db.quotes().insert(&quote).await.unwrap();

        // Simulates a conversion that committed between our read and write.
        let service = db.conversions();
        let stale = fetch_quote_with(db.pool(), &quote.id).await.unwrap().unwrap();
        let first = service
            .convert_quote(&quote.id, &ConversionOptions::default())
            .await
            .unwrap();

        let sale = convert(&stale, &ConversionOptions::default(), &[]).unwrap();
        let mut tx = db.pool().begin().await.unwrap();
        let err = insert_sale_with(&mut *tx, &sale).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        tx.rollback().await.unwrap();

        let outcome = service.lost_race(&quote.id).await.unwrap();
        assert_eq!(outcome.sale_id(), first.sale_id());
        assert_eq!(db.sales().count_converted().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_price_writes_nothing() {
        let db = setup().await;
        let quote = one_way_quote(0.0);
        db.quotes().insert(&quote).await.unwrap();

        let err = db
            .conversions()
            .convert_quote(&quote.id, &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ZeroOrNegativePrice { .. })
        ));

        let stored = db.quotes().get_by_id(&quote.id).await.unwrap().unwrap();
        assert!(!stored.is_converted());
        assert_eq!(db.sales().count_converted().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_terms_use_stored_table() {
        let db = setup().await;
        db.interest_configs()
            .upsert(&PaymentInterestConfig::new(PaymentType::Credit, 5, 10.0).unwrap())
            .await
            .unwrap();
        let quote = one_way_quote(1_000.0);
        db.quotes().insert(&quote).await.unwrap();

        let outcome = db
            .conversions()
            .convert_quote(&quote.id, &ConversionOptions::new(PaymentMethod::Credit, 5))
            .await
            .unwrap();
        let ConversionOutcome::Created { sale, .. } = outcome else {
            panic!("expected a new sale");
        };
        assert_eq!(sale.interest_rate_percent, 10.0);
        assert!((sale.final_amount - 1_100.0).abs() < 1e-9);
        assert!((sale.installment_value - 220.0).abs() < 1e-9);

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.installments, 5);
    }

    #[tokio::test]
    async fn test_convert_and_issue() {
        let db = setup().await;
        let quote = one_way_quote(1_400.0);
        db.quotes().insert(&quote).await.unwrap();
        let passengers = vec![Passenger::new("Marcos Lima"), Passenger::new("Julia Lima")];

        let outcome = db
            .conversions()
            .convert_and_issue(&quote.id, &ConversionOptions::default(), &passengers, "xy7k2p")
            .await
            .unwrap();
        let stored = db.tickets().list_for_sale(outcome.sale_id()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.pnr == "XY7K2P" && t.route == "CNF → FOR"));
    }

    #[tokio::test]
    async fn test_bad_ticket_request_leaves_quote_open() {
        let db = setup().await;
        let quote = one_way_quote(1_400.0);
        db.quotes().insert(&quote).await.unwrap();

        let err = db
            .conversions()
            .convert_and_issue(
                &quote.id,
                &ConversionOptions::default(),
                &[Passenger::new("Marcos Lima")],
                "XY7K2P",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::PassengerMismatch { .. })
        ));
        assert!(db.sales().get_by_quote_id(&quote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_quote() {
        let db = setup().await;
        let err = db
            .conversions()
            .convert_quote("missing", &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}

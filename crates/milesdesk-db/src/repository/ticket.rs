//! # Ticket Repository
//!
//! Stores the per-passenger tickets of a sale.
//!
//! Tickets are written either inside the conversion transaction
//! ([`crate::ConversionService::convert_and_issue`]) or afterwards through
//! [`TicketRepository::issue_for_sale`], once the booking locator is known.
//! A sale gets its tickets exactly once: both paths first write the sale's
//! `ticket_issuances` row, whose primary key rejects a second issuance.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::sale::SaleRepository;
use milesdesk_core::{issue_tickets, Passenger, Ticket};

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: String,
    sale_id: String,
    passenger_name: String,
    passenger_document: Option<String>,
    route: String,
    pnr: String,
    issued_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            sale_id: row.sale_id,
            passenger_name: row.passenger_name,
            passenger_document: row.passenger_document,
            route: row.route,
            pnr: row.pnr,
            issued_at: row.issued_at,
        }
    }
}

/// Repository for ticket database operations.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    /// Issues one ticket per passenger for an existing sale.
    ///
    /// ## Errors
    /// - `NotFound` if the sale doesn't exist
    /// - `UniqueViolation` if the sale already has tickets
    /// - `Domain` for passenger count mismatches, blank names, bad PNRs
    pub async fn issue_for_sale(
        &self,
        sale_id: &str,
        passengers: &[Passenger],
        pnr: &str,
    ) -> DbResult<Vec<Ticket>> {
        let sale = SaleRepository::new(self.pool.clone())
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let tickets = issue_tickets(&sale, passengers, pnr)?;

        let mut tx = self.pool.begin().await?;

        if let Err(err) = claim_issuance_with(&mut *tx, sale_id, &tickets).await {
            tx.rollback().await?;
            return Err(err);
        }
        for ticket in &tickets {
            insert_ticket_with(&mut *tx, ticket).await?;
        }
        tx.commit().await?;

        info!(sale_id = %sale_id, count = tickets.len(), "Tickets issued");
        Ok(tickets)
    }

    /// Tickets of a sale, in issue order.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, passenger_name, passenger_document, route, pnr, issued_at
            FROM tickets
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    /// Tickets sharing a booking locator.
    pub async fn find_by_pnr(&self, pnr: &str) -> DbResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, sale_id, passenger_name, passenger_document, route, pnr, issued_at
            FROM tickets
            WHERE pnr = ?1
            ORDER BY rowid
            "#,
        )
        .bind(pnr.trim().to_ascii_uppercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }
}

pub(crate) async fn insert_ticket_with<'e, E>(executor: E, ticket: &Ticket) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(sale_id = %ticket.sale_id, pnr = %ticket.pnr, "Inserting ticket");

    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, sale_id, passenger_name, passenger_document, route, pnr, issued_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&ticket.id)
    .bind(&ticket.sale_id)
    .bind(&ticket.passenger_name)
    .bind(&ticket.passenger_document)
    .bind(&ticket.route)
    .bind(&ticket.pnr)
    .bind(ticket.issued_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Records that `sale_id` has been ticketed. Must be the first write of the
/// issuing transaction so a concurrent issuer blocks on it and then fails
/// the primary key.
///
/// ## Errors
/// - `UniqueViolation` naming the sale if it was already ticketed
pub(crate) async fn claim_issuance_with<'e, E>(
    executor: E,
    sale_id: &str,
    tickets: &[Ticket],
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let Some(first) = tickets.first() else {
        return Ok(());
    };

    let result = sqlx::query(
        r#"
        INSERT INTO ticket_issuances (sale_id, pnr, passengers, issued_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(sale_id)
    .bind(&first.pnr)
    .bind(tickets.len() as i64)
    .bind(first.issued_at)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => match DbError::from(err) {
            DbError::UniqueViolation { .. } => {
                debug!(sale_id = %sale_id, "Sale already ticketed");
                Err(DbError::duplicate("tickets for sale", sale_id))
            }
            other => Err(other),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

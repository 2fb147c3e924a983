//! # Repository Module
//!
//! Database repository implementations for MilesDesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler / CLI                                                     │
//! │       │                                                                 │
//! │       │  db.quotes().list(Some(QuoteStatus::Pending), 50)               │
//! │       ▼                                                                 │
//! │  QuoteRepository                                                        │
//! │  ├── insert(&self, quote)                                               │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── update(&self, quote)      ← refused once converted                 │
//! │  └── mark_sent(&self, id)                                               │
//! │       │                                                                 │
//! │       │  SQL Query (segments column = versioned JSON)                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Rows are mapped into milesdesk-core types with TryFrom, so a row       │
//! │  that cannot be decoded surfaces as DbError::CorruptRow instead of a    │
//! │  half-filled domain value.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QuoteRepository`](quote::QuoteRepository) - Quote CRUD and status changes
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads and walk-in sales
//! - [`TicketRepository`](ticket::TicketRepository) - Per-passenger tickets
//! - [`InterestConfigRepository`](interest::InterestConfigRepository) - Card surcharge table
//!
//! Writes that span several tables (quote → sale → tickets) live in
//! [`crate::conversion`], which reuses the `*_with` helpers of these modules
//! inside one transaction.

pub mod interest;
pub mod quote;
pub mod sale;
pub mod ticket;

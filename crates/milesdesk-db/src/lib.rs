//! # milesdesk-db: Database Layer for MilesDesk
//!
//! This crate provides database access for MilesDesk.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MilesDesk Data Flow                              │
//! │                                                                         │
//! │  Quote screen / "Convert to sale" button                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   milesdesk-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ QuoteRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ WAL           │    │ TicketRepo    │    │              │  │   │
//! │  │   │               │    │ InterestRepo  │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────┴─────────────┐   ┌──────────────────────────────┐   │   │
//! │  │   │ ConversionService   │   │ AppConfig (toml + env)       │   │   │
//! │  │   │ convert-once tx     │   │ init_tracing                 │   │   │
//! │  │   └─────────────────────┘   └──────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/milesdesk/milesdesk.db                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Quote, sale, ticket and interest table access
//! - [`conversion`] - Quote → sale conversion with the convert-once guard
//! - [`config`] - File and environment configuration, tracing setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use milesdesk_db::{AppConfig, Database};
//! use milesdesk_core::ConversionOptions;
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let outcome = db
//!     .conversions()
//!     .convert_quote(&quote_id, &ConversionOptions::default())
//!     .await?;
//! println!("sale {}", outcome.sale_id());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod conversion;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{init_tracing, AppConfig, ConfigError, DatabaseSettings};
pub use conversion::{ConversionOutcome, ConversionService};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::interest::InterestConfigRepository;
pub use repository::quote::QuoteRepository;
pub use repository::sale::SaleRepository;
pub use repository::ticket::TicketRepository;

//! # Seed Data Generator
//!
//! Populates the database with an interest table and demo quotes, then runs
//! them through the conversion pipeline.
//!
//! ## Usage
//! ```bash
//! # Use milesdesk.toml / MILESDESK_* settings
//! cargo run -p milesdesk-db --bin seed
//!
//! # Specify database path
//! cargo run -p milesdesk-db --bin seed -- --db ./data/milesdesk_dev.db
//!
//! # Specify config file
//! cargo run -p milesdesk-db --bin seed -- --config ./milesdesk.toml
//! ```
//!
//! ## Generated Data
//! - Debit 1× and credit 1× to 12× surcharges (credit 10× to 12× with
//!   per-installment rates)
//! - One quote per trip type, plus one quote stored in the legacy loose
//!   record format
//! - Conversions paid by pix, debit and credit; the round trip also gets
//!   its tickets

use chrono::Utc;
use std::env;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use milesdesk_core::money::{format_brl, format_percent};
use milesdesk_core::segments::{FlightSegment, QuoteSegments, RoundTripQuote};
use milesdesk_core::{
    ConversionOptions, Customer, Passenger, PaymentInterestConfig, PaymentMethod, PaymentType,
    Quote,
};
use milesdesk_db::{init_tracing, AppConfig, ConversionOutcome, Database};

/// Flat credit surcharges for 1× to 9×.
const CREDIT_RATES: &[(u32, f64)] = &[
    (1, 0.0),
    (2, 4.5),
    (3, 5.9),
    (4, 7.2),
    (5, 8.4),
    (6, 9.6),
    (7, 10.8),
    (8, 11.9),
    (9, 13.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MilesDesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.log_filter);

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("🌱 MilesDesk Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.quotes().list(None, 1).await?.is_empty() {
        println!("⚠ Database already has quotes");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    seed_interest_table(&db).await?;
    println!("✓ Interest table written");

    let quotes = demo_quotes(&config);
    for quote in &quotes {
        db.quotes().insert(quote).await?;
    }
    let legacy_id = insert_legacy_quote(&db).await?;
    println!("✓ Inserted {} quotes", quotes.len() + 1);

    println!();
    println!("Converting quotes...");

    let plans = [
        (quotes[0].id.as_str(), ConversionOptions::new(PaymentMethod::Pix, 1)),
        (quotes[2].id.as_str(), ConversionOptions::new(PaymentMethod::Credit, 10)),
        (legacy_id.as_str(), ConversionOptions::new(PaymentMethod::Debit, 1)),
    ];
    for (quote_id, options) in plans {
        let outcome = db.conversions().convert_quote(quote_id, &options).await?;
        report(&outcome);
    }

    let round_trip = &quotes[1];
    let passengers = [Passenger::new("Helena Prado"), Passenger::new("Otávio Prado")];
    let outcome = db
        .conversions()
        .convert_and_issue(
            &round_trip.id,
            &ConversionOptions::new(PaymentMethod::Credit, 3),
            &passengers,
            "HPX4QZ",
        )
        .await?;
    report(&outcome);

    // Second attempt must hand back the same sale.
    let again = db
        .conversions()
        .convert_quote(&round_trip.id, &ConversionOptions::default())
        .await?;
    println!(
        "  Re-convert round trip: {} (same sale: {})",
        if again.is_created() { "created" } else { "already converted" },
        again.sale_id() == outcome.sale_id()
    );

    let tickets = db.tickets().list_for_sale(outcome.sale_id()).await?;
    println!("  Tickets issued: {}", tickets.len());

    println!();
    println!("✓ Seed complete!");
    info!(sales = db.sales().count_converted().await?, "Seed finished");

    Ok(())
}

async fn seed_interest_table(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let mut table = vec![PaymentInterestConfig::new(PaymentType::Debit, 1, 1.99)?];
    for &(installments, rate) in CREDIT_RATES {
        table.push(PaymentInterestConfig::new(PaymentType::Credit, installments, rate)?);
    }
    for installments in 10..=12 {
        let base = 14.0 + f64::from(installments - 10);
        table.push(
            PaymentInterestConfig::new(PaymentType::Credit, installments, base)?
                .with_per_installment_rates([(installments, base - 0.5)])?,
        );
    }

    db.interest_configs().replace_all(&table).await?;
    Ok(())
}

fn demo_quotes(config: &AppConfig) -> Vec<Quote> {
    let cost = if config.pricing.cost_per_thousand_miles > 0.0 {
        config.pricing.cost_per_thousand_miles
    } else {
        27.0
    };

    let priced = |mut quote: Quote, boarding_fee: f64| {
        quote.cost_per_thousand_miles = cost;
        quote.boarding_fee_per_passenger = boarding_fee;
        let breakdown = quote.price_quote(&config.pricing);
        quote.total_price = breakdown.final_price_total;
        quote
    };

    let one_way = Quote::new(
        Customer::named("Bruno Teixeira"),
        1,
        QuoteSegments::OneWay {
            segment: FlightSegment::new("GRU", "SSA", "2026-11-20", 14_500.0),
        },
    );

    let round_trip = Quote::new(
        Customer::named("Helena Prado"),
        2,
        QuoteSegments::RoundTrip {
            trip: RoundTripQuote {
                origin: "GIG".into(),
                destination: "MCO".into(),
                departure_date: "2027-01-08".into(),
                return_date: "2027-01-22".into(),
                miles_outbound: 62_000.0,
                miles_return: 58_000.0,
                airline: Some("LATAM".into()),
                ..Default::default()
            },
        },
    );

    let multi_city = Quote::new(
        Customer::named("Sofia Mendes"),
        1,
        QuoteSegments::MultiCity {
            segments: vec![
                FlightSegment::new("GRU", "LIS", "2027-04-02", 45_000.0),
                FlightSegment::new("LIS", "MAD", "2027-04-09", 9_000.0),
                FlightSegment::new("MAD", "GRU", "2027-04-16", 47_000.0),
            ],
        },
    );

    vec![
        priced(one_way, 42.0),
        priced(round_trip, 180.0),
        priced(multi_city, 260.0),
    ]
}

/// Writes a quote the way older clients stored it: a loose record array with
/// miles typed as text.
async fn insert_legacy_quote(db: &Database) -> Result<String, Box<dyn std::error::Error>> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let segments = r#"[{"origin": "POA", "destination": "REC", "departureDate": "2026-12-05", "miles": "18.000"}]"#;

    sqlx::query(
        r#"
        INSERT INTO quotes (
            id, customer_name, trip_type, passengers, segments, schema_version,
            total_price, boarding_fee_per_passenger, cost_per_thousand_miles,
            status, created_at, updated_at
        ) VALUES (?1, ?2, 'one_way', 1, ?3, 1, ?4, ?5, ?6, 'sent', ?7, ?7)
        "#,
    )
    .bind(&id)
    .bind("Carlos Nogueira")
    .bind(segments)
    .bind(690.0_f64)
    .bind(38.0_f64)
    .bind(26.5_f64)
    .bind(now)
    .execute(db.pool())
    .await?;

    Ok(id)
}

fn report(outcome: &ConversionOutcome) {
    match outcome {
        ConversionOutcome::Created { sale, tickets } => {
            println!(
                "  {} {} | {} pax | price {} | cost {} | profit {} ({}) | {:?} {}x → {}",
                sale.trip_type(),
                sale.route_text(),
                sale.passengers,
                format_brl(sale.price_total),
                format_brl(sale.total_cost),
                format_brl(sale.profit),
                format_percent(sale.profit_margin_percent),
                sale.payment_method,
                sale.installments,
                format_brl(sale.final_amount),
            );
            if !tickets.is_empty() {
                println!("    {} tickets, PNR {}", tickets.len(), tickets[0].pnr);
            }
        }
        ConversionOutcome::AlreadyConverted { sale_id } => {
            println!("  already converted → sale {}", sale_id);
        }
    }
}

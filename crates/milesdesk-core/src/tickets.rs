//! # Ticket Fan-Out
//!
//! One ticket per passenger once a sale exists. Every ticket shares the
//! sale's route text and booking locator; only the passenger differs.
//!
//! ```text
//! Sale (3 pax, GRU → LIS / LIS → GRU)  +  PNR "XYZ123"
//!      │
//!      ├──► Ticket { Ana,   GRU → LIS / LIS → GRU, XYZ123 }
//!      ├──► Ticket { Bruno, GRU → LIS / LIS → GRU, XYZ123 }
//!      └──► Ticket { Caio,  GRU → LIS / LIS → GRU, XYZ123 }
//! ```

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::types::{Passenger, Sale, Ticket};
use crate::validation::{validate_passenger_name, validate_pnr};

/// Builds the tickets for `sale`.
///
/// ## Errors
/// - `PassengerMismatch` unless exactly one identity per passenger is given
/// - `Validation` for a blank passenger name or a malformed PNR
pub fn issue_tickets(sale: &Sale, passengers: &[Passenger], pnr: &str) -> CoreResult<Vec<Ticket>> {
    if passengers.len() != sale.passengers as usize {
        return Err(CoreError::PassengerMismatch {
            expected: sale.passengers,
            provided: passengers.len(),
        });
    }

    let pnr = validate_pnr(pnr)?;
    let route = sale.route_text();
    let issued_at = Utc::now();

    passengers
        .iter()
        .map(|passenger| -> CoreResult<Ticket> {
            Ok(Ticket {
                id: uuid::Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                passenger_name: validate_passenger_name(&passenger.name)?,
                passenger_document: passenger
                    .document
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                route: route.clone(),
                pnr: pnr.clone(),
                issued_at,
            })
        })
        .collect()
}

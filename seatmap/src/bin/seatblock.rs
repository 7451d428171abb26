//! Seatblock command line
//!
//! Drives the seat map against a running reservation store, using a regular
//! grid in place of a rendering host.
//!
//! # Usage
//!
//! ```bash
//! # Follow the live channel and log every snapshot
//! cargo run --bin seatblock -- watch
//!
//! # Reserve seats as one group
//! cargo run --bin seatblock -- reserve "School trip" 1F-3-1 1F-3-2 1F-4-1
//! ```

use seatblock_seatmap::mocks::StaticGeometry;
use seatblock_seatmap::{
    Config, HttpReservationApi, SeatId, SeatIdError, SeatMap, SeatMapEnvironment, SubmissionPhase,
    WsChannel, pump_channel,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: seatblock watch | seatblock reserve <label> <seat>...";

/// First floor: six columns, up to fifteen rows
const GRID_COLUMNS: u32 = 6;
const GRID_ROWS: u32 = 15;
const SEAT_SIZE: f64 = 24.0;
const SEAT_GAP: f64 = 4.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,seatblock_seatmap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        api = %config.api_url,
        channel = %config.channel_url,
        "Configuration loaded"
    );

    let geometry = StaticGeometry::grid("1F", GRID_COLUMNS, GRID_ROWS, SEAT_SIZE, SEAT_GAP)
        .ok_or("seat grid zone is not a valid identifier zone")?;
    let environment = SeatMapEnvironment::new(
        Arc::new(geometry),
        config.venue()?,
        Arc::new(HttpReservationApi::from_config(&config)?),
    )
    .with_settings(config.submission_settings());
    let seat_map = SeatMap::new(environment);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("watch") => watch(&seat_map, &config).await,
        Some("reserve") if args.len() >= 3 => reserve(&seat_map, &config, &args[1], &args[2..]).await,
        _ => {
            eprintln!("{USAGE}");
            Ok(())
        },
    }
}

async fn watch(seat_map: &SeatMap, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut seen_revision = 0;
    let pump = pump_channel(
        seat_map.store(),
        WsChannel::new(config.channel_url.clone()),
        |state| {
            if state.sync.revision() == seen_revision {
                return;
            }
            seen_revision = state.sync.revision();

            if let Some(error) = state.sync.last_error() {
                tracing::warn!(%error, "Channel problem");
            }
            tracing::info!(
                connection = ?state.sync.connection(),
                groups = state.sync.groups().len(),
                reserved = state.sync.reserved().len(),
                "Reservations updated"
            );
            for overlay in state.sync.overlays() {
                tracing::info!(
                    id = %overlay.id,
                    label = %overlay.label,
                    seats = overlay.seat_count,
                    color = %overlay.color,
                    rotation = overlay.rotation_deg,
                    "Group"
                );
            }
        },
    );

    tracing::info!("Press Ctrl+C to stop");
    tokio::select! {
        handled = pump => {
            tracing::info!(handled, connection = ?seat_map.connection().await, "Channel ended");
        },
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        },
    }
    Ok(())
}

async fn reserve(
    seat_map: &SeatMap,
    config: &Config,
    label: &str,
    seats: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let seats = parse_seats(seats)?;
    for seat in &seats {
        seat_map.toggle_seat(seat.clone()).await;
    }

    // Room for the request timeout plus the round trip through the store
    let timeout = config.request_timeout + Duration::from_secs(1);
    match seat_map.submit(label, timeout).await? {
        SubmissionPhase::Succeeded { reservation_id } => {
            tracing::info!(%reservation_id, seats = seats.len(), "Reservation created");
        },
        SubmissionPhase::Conflicted { detail } => {
            tracing::warn!(%detail, "Seats already taken");
        },
        SubmissionPhase::Failed { reason } => {
            tracing::error!(%reason, "Reservation failed");
        },
        other => {
            tracing::warn!(phase = ?other, "Unexpected submission phase");
        },
    }
    Ok(())
}

/// Distinct seats from the command line, so a repeated seat is toggled once
fn parse_seats(args: &[String]) -> Result<BTreeSet<SeatId>, SeatIdError> {
    args.iter().map(|raw| raw.parse::<SeatId>()).collect()
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ride_share_data_management::DataManager;
use ride_share_lib::listing::ListFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "RideShareCLI")]
#[command(about = "A CLI to inspect and fix trips and ride requests", long_about = None)]
struct Cli {
    /// Database file. Defaults to the project's data directory
    #[arg(long, env = "RIDE_SHARE_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all trips, active or not
    Trips {
        #[arg(long)]
        search: Option<String>,
    },
    /// List all ride requests
    Requests {
        #[arg(long)]
        search: Option<String>,
    },
    /// Delete a trip. Its requests go back to the pool
    DeleteTrip { trip_id: i64 },
    /// Reset the self-service password of a trip or request
    SetPassword {
        kind: RecordKind,
        id: i64,
        password: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Trip,
    Request,
}

fn search_filter(search: &Option<String>) -> ListFilter {
    ListFilter {
        terms: search.as_deref().map(ListFilter::parse_terms).unwrap_or_default(),
        ..ListFilter::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let data_manager = match &cli.database {
        Some(path) => DataManager::open(path).await,
        None => DataManager::start().await,
    }.context("Failed to open database")?;

    match &cli.command {
        Commands::Trips { search } => {
            for trip in data_manager.all_trips(&search_filter(search)).await? {
                println!(
                    "{:>5}  {:<20} {} -> {}  {}  {}/{} seats  {}",
                    trip.id,
                    trip.driver_name,
                    trip.departure,
                    trip.destination,
                    trip.date,
                    trip.seats_filled,
                    trip.seats_total,
                    if trip.is_active { "active" } else { "inactive" },
                );
            }
        },
        Commands::Requests { search } => {
            for request in data_manager.all_requests(&search_filter(search)).await? {
                let link = match (request.driver_id, request.is_matched) {
                    (Some(trip_id), true) => format!("matched to {trip_id}"),
                    (Some(trip_id), false) => format!("pending on {trip_id}"),
                    (None, _) => "pool".to_string(),
                };
                println!(
                    "{:>5}  {:<20} {} -> {}  {}  {} seats  {}",
                    request.id,
                    request.passenger_name,
                    request.departure,
                    request.destination,
                    request.date,
                    request.seats_needed,
                    link,
                );
            }
        },
        Commands::DeleteTrip { trip_id } => {
            let released = data_manager.delete_trip(*trip_id).await?;
            println!("Deleted trip {trip_id}, released requests {released:?}");
        },
        Commands::SetPassword { kind, id, password } => {
            match kind {
                RecordKind::Trip => data_manager.set_trip_password(*id, password).await?,
                RecordKind::Request => data_manager.set_request_password(*id, password).await?,
            }
            println!("Password updated");
        },
    }

    Ok(())
}

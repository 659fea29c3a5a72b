//! Helenus demo
//!
//! Seeds a `customers` table and shows which reads are answered by the
//! session cache, the unit-of-work cache or the cluster.

use clap::{Parser, Subcommand};
use eyre::Result;
use helenus::driver::{ScyllaExecutor, check_health_detailed, connect_with_retry};
use helenus::telemetry::{Environment, init_tracing};
use helenus::{FromEnv, HelenusSession, SessionConfig};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::info;

mod commands;
mod config;
mod model;

use config::Config;

#[derive(Parser)]
#[command(name = "helenus-demo")]
#[command(about = "Exercise the helenus caches against a Cassandra/ScyllaDB cluster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo keyspace and table
    Schema,

    /// Insert sample customers in one unit of work
    Seed {
        #[arg(short, long, default_value_t = 10)]
        count: u32,
    },

    /// Read one customer several times and report cache statistics
    Lookup {
        /// Sample customer number
        customer: u32,

        #[arg(short, long, default_value_t = 3)]
        repeat: u32,

        /// Look up by the unique email column instead of the primary key
        #[arg(long)]
        by_email: bool,
    },

    /// Update a customer's tier inside a unit of work
    Promote {
        customer: u32,

        #[arg(short, long)]
        tier: i32,
    },

    /// Delete one customer, or truncate the table without an argument
    Remove { customer: Option<u32> },

    /// Show cluster health and row count
    Status,
}

/// Install color-eyre with file locations and without the environment section
fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus recorder: {}", e))?;
    info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

async fn open(config: &SessionConfig) -> Result<HelenusSession> {
    Ok(HelenusSession::connect(config.clone()).await?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);
    let metrics = init_metrics()?;

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            let session = open(&config.bootstrap_session()).await?;
            commands::create_schema(&session, &config.keyspace, config.replication_factor)
                .await?;
            info!(keyspace = %config.keyspace, "Schema ready");
        }

        Commands::Seed { count } => {
            let session = open(&config.session).await?;
            print_json(&commands::seed(&session, count).await?)?;
        }

        Commands::Lookup {
            customer,
            repeat,
            by_email,
        } => {
            let session = open(&config.session).await?;
            print_json(&commands::lookup(&session, customer, repeat, by_email).await?)?;
        }

        Commands::Promote { customer, tier } => {
            let session = open(&config.session).await?;
            print_json(&commands::promote(&session, customer, tier).await?)?;
        }

        Commands::Remove { customer } => {
            let session = open(&config.session).await?;
            commands::remove(&session, customer).await?;
            info!(?customer, "Removed");
        }

        Commands::Status => {
            let driver = connect_with_retry(&config.session.cassandra, None).await?;
            let health = check_health_detailed(&driver).await;
            info!(
                healthy = health.healthy,
                version = ?health.version,
                response_time_ms = health.response_time_ms,
                "Cluster health"
            );
            let session = HelenusSession::builder(Arc::new(ScyllaExecutor::new(driver)))
                .config(config.session.clone())
                .build();
            println!("customers: {}", commands::count(&session).await?);
        }
    }

    if config.print_metrics {
        println!("{}", metrics.render());
    }

    Ok(())
}

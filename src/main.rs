//! Rollcall CLI: offline-resilient attendance scanner.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollcall::error::HttpClientSnafu;
use rollcall::{
    AppError, AttendanceDate, Config, Diagnostics, Dispatcher, HttpService, LogStore, PersonId,
    Reconciler, ServiceRef, Session,
};

#[derive(Parser)]
#[command(name = "rollcall", about = "Offline-resilient attendance scanner", version)]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run in offline mode: queue everything, never touch the network.
    #[arg(long, global = true)]
    offline: bool,

    /// Base URL of the attendance service (overrides the config file).
    #[arg(long, global = true, env = "ROLLCALL_SERVER")]
    server: Option<String>,

    /// Administrator email for privileged operations.
    #[arg(long, global = true, env = "ROLLCALL_EMAIL")]
    email: Option<String>,

    /// Administrator password for privileged operations.
    #[arg(long, global = true, env = "ROLLCALL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take attendance for today, or for an explicit day.
    Scan {
        /// Backfill date as MM-DD-YYYY (defaults to today).
        #[arg(long)]
        date: Option<AttendanceDate>,
    },
    /// Replay every pending queue against the server.
    UploadPending,
    /// Show attendance data.
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
    /// Export attendance data to CSV.
    Export {
        /// Limit the export to one month (1-12).
        #[arg(long)]
        month: Option<u32>,
        /// Output file (defaults to the configured output path plus .csv).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Percentage of meetings attended by one person.
    Percent { id: PersonId },
    /// Delete one recorded event on the server.
    Delete {
        id: PersonId,
        month: u32,
        day: u32,
        year: i32,
    },
    /// Drop all remote attendance data.
    DropDb {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// All attendance data.
    All,
    /// Today's attendance.
    Today,
    /// Attendance for one day.
    Day { month: u32, day: u32, year: i32 },
    /// Attendance history for one person.
    Student { id: PersonId },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if cli.offline {
        config.offline = true;
    }
    if let Some(server) = &cli.server {
        config.server_address = server.clone();
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let store = Arc::new(LogStore::open(&config.data_dir).await?);
    let service =
        Arc::new(HttpService::new(&config.server_address).context(HttpClientSnafu)?);

    if let (Some(email), Some(password)) = (&cli.email, &cli.password)
        && !config.offline
    {
        let outcome = service.login(email, password).await;
        if !outcome.accepted {
            return Err(AppError::LoginRefused {
                message: outcome.message,
            });
        }
        info!("{}", outcome.message);
    }

    let diagnostics = Diagnostics::new(&config.diagnostics_path);
    let service_ref: ServiceRef = service.clone();
    let reconciler = Reconciler::new(store.clone(), service_ref.clone());
    let dispatcher = Dispatcher::new(
        store.clone(),
        service_ref,
        reconciler.clone(),
        diagnostics.clone(),
        config.offline,
        config.max_in_flight,
    );
    let mut session = Session::new(config, store, service, dispatcher, reconciler, diagnostics);

    match cli.command {
        Command::Scan { date } => {
            let date = date.unwrap_or_else(AttendanceDate::today);
            session.scan(date).await
        }
        Command::UploadPending => session.upload_pending().await,
        Command::Show { what } => match what {
            ShowTarget::All => session.show_all().await,
            ShowTarget::Today => session.show_day(AttendanceDate::today()).await,
            ShowTarget::Day { month, day, year } => {
                session.show_day(AttendanceDate::new(month, day, year)?).await
            }
            ShowTarget::Student { id } => session.show_student(id).await,
        },
        Command::Export { month, out } => session.export(month, out).await,
        Command::Percent { id } => session.percentage(id).await,
        Command::Delete {
            id,
            month,
            day,
            year,
        } => session.delete(id, AttendanceDate::new(month, day, year)?).await,
        Command::DropDb { yes } => session.drop_database(yes).await,
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use superset_toolkit::superset::http::format_superset_error;
use superset_toolkit::{ConfigOverrides, SupersetClient, SupersetError};
use tracing_subscriber::EnvFilter;

/// Superset REST API toolkit
#[derive(Parser, Debug)]
#[command(name = "superset-toolkit", version, about, long_about = None)]
struct Args {
    /// Superset base URL (overrides SUPERSET_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Username (overrides SUPERSET_USERNAME)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Password (overrides SUPERSET_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Default schema for datasets
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Database name datasets are registered against
    #[arg(long, global = true)]
    database: Option<String>,

    /// YAML profile to read settings from
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the connection and print a status report
    Status,
    /// Make sure a dataset exists for a table and print its ID
    EnsureDataset {
        table: String,
    },
    /// Delete charts whose name contains PATTERN (dry run unless --execute)
    DeleteCharts {
        pattern: String,
        #[arg(long)]
        execute: bool,
    },
    /// Delete dashboards whose title contains PATTERN (dry run unless --execute)
    DeleteDashboards {
        pattern: String,
        #[arg(long)]
        execute: bool,
    },
    /// Delete datasets whose table name contains PATTERN (dry run unless --execute)
    DeleteDatasets {
        pattern: String,
        #[arg(long)]
        execute: bool,
    },
    /// Move ownership of charts and dashboards between users
    Migrate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        execute: bool,
    },
    /// Delete every chart and dashboard a user owns
    Cleanup {
        user: String,
        #[arg(long)]
        execute: bool,
    },
    /// Show the charts and dashboards a user owns
    Summary {
        user: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(default_filter) = level.as_filter() else {
        return Ok(None);
    };
    // RUST_LOG still wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("superset-toolkit started with log level: {:?}", level);
    Ok(Some(guard))
}

/// CLI flags > YAML profile > environment
fn load_config(args: &Args) -> Result<superset_toolkit::Config> {
    let explicit = ConfigOverrides {
        superset_url: args.url.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        schema: args.schema.clone(),
        database_name: args.database.clone(),
        timeout_secs: None,
    };

    let file = match &args.config {
        Some(path) => ConfigOverrides::load_file(path)?,
        None => ConfigOverrides::load_default_file()?.unwrap_or_default(),
    };

    let config = explicit.or(file).or(ConfigOverrides::from_env()).resolve()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &SupersetClient, command: &Command) -> Result<()> {
    match command {
        Command::Status => print_json(&client.validate_connection().await),
        Command::EnsureDataset { table } => {
            let id = client.ensure_dataset(table, None).await?;
            println!("{}", id);
            Ok(())
        }
        Command::DeleteCharts { pattern, execute } => {
            print_json(&client.delete_charts_by_name_pattern(pattern, !execute).await?)
        }
        Command::DeleteDashboards { pattern, execute } => {
            print_json(&client.delete_dashboards_by_name_pattern(pattern, !execute).await?)
        }
        Command::DeleteDatasets { pattern, execute } => {
            print_json(&client.delete_datasets_by_name_pattern(pattern, !execute).await?)
        }
        Command::Migrate { from, to, execute } => {
            print_json(&client.migrate_user_resources(from, to, !execute).await?)
        }
        Command::Cleanup { user, execute } => print_json(&client.cleanup_user(user, !execute).await?),
        Command::Summary { user } => print_json(&client.get_user_summary(user).await?),
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SupersetError>() {
        Some(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", format_superset_error(e));
        }
        None => eprintln!("Error: {err:#}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let client = match load_config(&args) {
        Ok(config) => SupersetClient::connect(config).await.map_err(anyhow::Error::from),
        Err(err) => Err(err),
    };
    let client = match client {
        Ok(client) => client,
        Err(err) => {
            report(&err);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&client, &args.command).await;
    client.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

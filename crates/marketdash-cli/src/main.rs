//! marketdash - command-line client for the real-estate market dashboard.
//!
//! Signs in against the dashboard backend, keeps the session between runs
//! and prints market charts, price-range tables and admin listings.

mod commands;
mod render;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marketdash_core::models::UserSort;
use marketdash_core::stats::YearFilter;
use marketdash_core::ChartKind;

use commands::App;

#[derive(Parser)]
#[command(name = "marketdash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-estate market dashboard in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print the raw result envelope as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend URL (overrides MARKETDASH_API_BASE_URL and the config file)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and keep the session for later commands
    Signin {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long, env = "MARKETDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        /// Full name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted twice when omitted)
        #[arg(long, env = "MARKETDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Activate an account with the token from the verification email
    Activate { token: String },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List available cities
    Cities,

    /// Show one market chart for a city
    Chart {
        /// Chart name, e.g. barometer, median-sales, weekly-pending
        kind: ChartKind,
        /// City (defaults to the last city used)
        #[arg(short, long)]
        city: Option<String>,
        /// Year to show ("all" or e.g. 2024)
        #[arg(short, long, default_value = "all")]
        year: YearFilter,
        /// Series to show: listings (dom-trend) or average (price-per-sqft)
        #[arg(short, long, value_enum)]
        metric: Option<ChartMetric>,
        /// Print the backend payload untouched
        #[arg(long)]
        raw: bool,
    },

    /// Show the price-range tables for a city and month
    Tables {
        /// City (defaults to the last city used)
        #[arg(short, long)]
        city: Option<String>,
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
        /// Month as 1-12 or Jan-Dec (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
        /// Property type
        #[arg(short, long, value_enum, default_value_t = TableKind::All)]
        kind: TableKind,
        /// Export to CSV (default file name: property-market-data-<date>.csv)
        #[arg(long, value_name = "FILE")]
        csv: Option<Option<PathBuf>>,
    },

    /// Ask the market assistant a question
    Chat {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List accounts (admin only)
    Users {
        /// Match against name or email
        #[arg(short, long)]
        search: Option<String>,
        /// Only this role
        #[arg(short, long)]
        role: Option<String>,
        /// Only verified accounts
        #[arg(long, conflicts_with = "unverified")]
        verified: bool,
        /// Only unverified accounts
        #[arg(long)]
        unverified: bool,
        /// Order by name, email, joined (newest first) or verified
        #[arg(long, default_value = "joined")]
        sort: UserSort,
    },
}

/// Alternate series for charts that carry more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartMetric {
    Median,
    Average,
    Listings,
}

impl ChartMetric {
    pub fn name(&self) -> &'static str {
        match self {
            ChartMetric::Median => "median",
            ChartMetric::Average => "average",
            ChartMetric::Listings => "listings",
        }
    }

    /// Metrics `kind` can display; the first is the default.
    pub fn supported(kind: ChartKind) -> &'static [ChartMetric] {
        match kind {
            ChartKind::DomTrend => &[ChartMetric::Median, ChartMetric::Listings],
            ChartKind::PricePerSqft => &[ChartMetric::Median, ChartMetric::Average],
            _ => &[ChartMetric::Median],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    Sf,
    Condo,
    All,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "marketdash.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());
    info!("marketdash starting");

    let mut app = App::new(cli.base_url.as_deref(), cli.json)?;
    debug!(base_url = %app.base_url(), "Using backend");

    let outcome = match cli.command {
        Commands::Signin { email, password } => app.signin(email, password).await,
        Commands::Signup {
            name,
            email,
            password,
        } => app.signup(name, email, password).await,
        Commands::Activate { token } => app.activate(&token).await,
        Commands::Logout => app.logout(),
        Commands::Whoami => app.whoami(),
        Commands::Cities => app.cities().await,
        Commands::Chart {
            kind,
            city,
            year,
            metric,
            raw,
        } => app.chart(kind, city, year, metric, raw).await,
        Commands::Tables {
            city,
            year,
            month,
            kind,
            csv,
        } => app.tables(city, year, month, kind, csv).await,
        Commands::Chat { query } => app.chat(&query.join(" ")).await,
        Commands::Users {
            search,
            role,
            verified,
            unverified,
            sort,
        } => app.users(search, role, verified, unverified, sort).await,
    }?;

    Ok(outcome.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_chart() {
        let cli = Cli::try_parse_from([
            "marketdash",
            "chart",
            "median-sales",
            "--city",
            "Austin",
            "--year",
            "2024",
            "--json",
        ])
        .expect("parse");
        assert!(cli.json);
        match cli.command {
            Commands::Chart {
                kind, city, year, ..
            } => {
                assert_eq!(kind, ChartKind::MedianSales);
                assert_eq!(city.as_deref(), Some("Austin"));
                assert_eq!(year, YearFilter::Year(2024));
            }
            _ => panic!("expected chart command"),
        }
    }

    #[test]
    fn test_cli_parses_metric_and_sort() {
        let cli = Cli::try_parse_from([
            "marketdash",
            "chart",
            "dom-trend",
            "--metric",
            "listings",
        ])
        .expect("parse");
        match cli.command {
            Commands::Chart { kind, metric, .. } => {
                assert_eq!(metric, Some(ChartMetric::Listings));
                assert!(ChartMetric::supported(kind).contains(&ChartMetric::Listings));
                assert!(!ChartMetric::supported(ChartKind::SalesVolume).contains(&ChartMetric::Listings));
            }
            _ => panic!("expected chart command"),
        }

        let cli = Cli::try_parse_from(["marketdash", "users", "--sort", "name"]).expect("parse");
        match cli.command {
            Commands::Users { sort, .. } => assert_eq!(sort, UserSort::Name),
            _ => panic!("expected users command"),
        }
        let cli = Cli::try_parse_from(["marketdash", "users"]).expect("parse");
        match cli.command {
            Commands::Users { sort, .. } => assert_eq!(sort, UserSort::Joined),
            _ => panic!("expected users command"),
        }
        assert!(Cli::try_parse_from(["marketdash", "users", "--sort", "age"]).is_err());
    }

    #[test]
    fn test_cli_csv_flag_without_value() {
        let cli = Cli::try_parse_from(["marketdash", "tables", "--csv"]).expect("parse");
        match cli.command {
            Commands::Tables { csv, kind, .. } => {
                assert_eq!(csv, Some(None));
                assert_eq!(kind, TableKind::All);
            }
            _ => panic!("expected tables command"),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_filters() {
        assert!(Cli::try_parse_from(["marketdash", "users", "--verified", "--unverified"]).is_err());
        assert!(Cli::try_parse_from(["marketdash", "chart", "pie"]).is_err());
        assert!(Cli::try_parse_from(["marketdash", "chat"]).is_err());
    }
}

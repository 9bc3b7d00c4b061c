use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use migration::Migrator;
use shared::fixtures::FixtureConfig;
use shared::{AppContext, Config, Error, TradeFilters, TradeQuery};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use crate::commands::{Output, Request};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("BUILD_PROFILE"),
    ")"
);

#[derive(Parser)]
#[command(name = "investments")]
#[command(version = VERSION, about = "Investments demo on Cassandra", long_about = None)]
struct Cli {
    /// Comma-separated Cassandra contact points.
    #[arg(long, global = true)]
    cluster_ips: Option<String>,
    /// Keyspace to use.
    #[arg(long, global = true)]
    keyspace: Option<String>,
    /// Keyspace replication factor.
    #[arg(long, global = true)]
    replication_factor: Option<u32>,
    /// Username for commands that need one.
    #[arg(long, short = 'u', global = true)]
    username: Option<String>,
    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Populate demo data.
    Populate {
        #[arg(long, default_value_t = 10)]
        accounts: usize,
        #[arg(long, default_value_t = 10)]
        positions_per_account: usize,
        #[arg(long, default_value_t = 100)]
        trades_per_account: usize,
        /// Seed for a reproducible dataset.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show accounts for a username.
    Accounts,
    /// Show positions for an account.
    Positions {
        #[arg(long, short = 'a')]
        account: String,
    },
    /// Show trade history for an account.
    Trades {
        #[arg(long, short = 'a')]
        account: String,
        /// Instrument symbol filter.
        #[arg(long)]
        symbol: Option<String>,
        /// Trade type filter.
        #[arg(long = "type", value_name = "buy|sell")]
        trade_type: Option<String>,
        /// Start date (YYYY-MM-DD or ISO 8601).
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD or ISO 8601), inclusive.
        #[arg(long)]
        end: Option<String>,
        /// Maximum number of trades to show.
        #[arg(long)]
        limit: Option<u32>,
    },
}

impl Cli {
    fn config(&self) -> Result<Config, Error> {
        let mut config = Config::from_env()?;
        if let Some(ips) = &self.cluster_ips {
            config.cluster_ips = ips.clone();
        }
        if let Some(keyspace) = &self.keyspace {
            config.keyspace = keyspace.clone();
        }
        if let Some(rf) = self.replication_factor {
            config.replication_factor = rf;
        }
        Ok(config)
    }

    fn output(&self) -> Output {
        if self.json {
            Output::Json
        } else {
            Output::Table
        }
    }

    /// Checks user input and builds the request, without touching the cluster.
    fn request(&self) -> Result<Request, Error> {
        let request = match &self.command {
            Command::Populate {
                accounts,
                positions_per_account,
                trades_per_account,
                seed,
            } => Request::Populate(FixtureConfig {
                accounts_count: *accounts,
                positions_per_account: *positions_per_account,
                trades_per_account: *trades_per_account,
                seed: *seed,
            }),
            Command::Accounts => match &self.username {
                Some(username) => Request::Accounts {
                    username: username.clone(),
                },
                None => Cli::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "accounts requires --username",
                    )
                    .exit(),
            },
            Command::Positions { account } => Request::Positions {
                account: account.clone(),
            },
            Command::Trades {
                account,
                symbol,
                trade_type,
                start,
                end,
                limit,
            } => {
                let filters = TradeFilters::parse(symbol.as_deref(), trade_type.as_deref())?;
                let query = TradeQuery::builder(account.as_str())
                    .filters(filters)
                    .dates(start.as_deref(), end.as_deref())?
                    .limit(*limit)
                    .build()?;
                Request::Trades(query)
            }
        };
        Ok(request)
    }
}

/// Logs go to `path` so stdout only carries command output.
fn init_logging(path: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            warn!(path, error = %e, "Cannot open log file, logging to stderr");
        }
    }
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let request = cli.request()?;
    info!(command = request.name(), "Running command");

    let ctx = AppContext::connect(config).await?;
    let result: anyhow::Result<String> = async {
        let config = ctx.config();
        Migrator::ensure_schema(ctx.store(), &config.keyspace, config.replication_factor)
            .await?;
        commands::dispatch(&ctx, request, cli.output()).await
    }
    .await;
    ctx.shutdown();

    println!("{}", result?);
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    let log_file = config.log_file.clone();
    init_logging(&log_file);

    match run(&cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Command failed: {:#}", err);
            eprintln!(
                "ERROR: operation failed: {:#}. See {} for details.",
                err, log_file
            );
            ExitCode::from(exit_code(&err))
        }
    }
}

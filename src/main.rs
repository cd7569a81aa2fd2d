use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod ai;
mod app;
mod config;
mod db;
mod error;
mod jobs;
mod mail;
mod market;
mod models;

use app::App;
use config::Config;
use error::Result;
use models::{JobOutcome, SignUpEvent, UserProfile, WatchlistAdd};

#[derive(Debug, Parser)]
#[command(name = "signalist", version, about = "Watchlist news digests and welcome emails")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daily news digest once
    Digest,
    /// Run the daily news digest on the configured cron until interrupted
    Schedule,
    /// Register a user and send their welcome email
    Signup(SignupArgs),
    /// Manage a user's watchlist
    #[command(subcommand)]
    Watchlist(WatchlistCommand),
    /// Print the news a digest would be built from
    News {
        /// Ticker symbols; general market news when omitted
        symbols: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct SignupArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long, default_value = "")]
    investment_goals: String,
    #[arg(long, default_value = "")]
    risk_tolerance: String,
    #[arg(long, default_value = "")]
    preferred_industry: String,
}

#[derive(Debug, Subcommand)]
enum WatchlistCommand {
    Add {
        email: String,
        symbol: String,
        #[arg(long)]
        company: Option<String>,
    },
    Remove {
        email: String,
        symbol: String,
    },
    List {
        email: String,
    },
    /// List with live quote data
    Show {
        email: String,
    },
}

impl From<SignupArgs> for SignUpEvent {
    fn from(args: SignupArgs) -> Self {
        SignUpEvent {
            email: args.email,
            name: args.name,
            profile: UserProfile {
                country: args.country,
                investment_goals: args.investment_goals,
                risk_tolerance: args.risk_tolerance,
                preferred_industry: args.preferred_industry,
            },
        }
    }
}

fn print_outcome(outcome: &JobOutcome) -> Result<()> {
    println!("{}", serde_json::to_string(outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let app = App::new(config).await?;

    match cli.command {
        Command::Digest => print_outcome(&app.run_digest().await?)?,

        Command::Schedule => app.run_schedule().await?,

        Command::Signup(args) => print_outcome(&app.sign_up(args.into()).await?)?,

        Command::Watchlist(WatchlistCommand::Add {
            email,
            symbol,
            company,
        }) => match app.add_to_watchlist(&email, &symbol, company.as_deref()).await? {
            WatchlistAdd::Added => println!("Added {} to watchlist", symbol.to_uppercase()),
            WatchlistAdd::AlreadyPresent => println!("Stock already in watchlist"),
        },

        Command::Watchlist(WatchlistCommand::Remove { email, symbol }) => {
            if app.remove_from_watchlist(&email, &symbol).await? {
                println!("Removed {} from watchlist", symbol.to_uppercase());
            } else {
                println!("{} was not in the watchlist", symbol.to_uppercase());
            }
        }

        Command::Watchlist(WatchlistCommand::List { email }) => {
            for entry in app.watchlist(&email).await? {
                println!(
                    "{:<8} {:<32} added {}",
                    entry.symbol,
                    entry.company,
                    entry.added_at.format("%Y-%m-%d")
                );
            }
        }

        Command::Watchlist(WatchlistCommand::Show { email }) => {
            for row in app.watchlist_with_data(&email).await? {
                match row.details {
                    Some(d) => println!(
                        "{:<8} {:<32} {:>12} {:>8}  cap {:>9}  P/E {}",
                        d.symbol,
                        d.company,
                        d.price_formatted,
                        d.change_formatted,
                        d.market_cap_formatted,
                        d.pe_ratio
                    ),
                    None => println!("{:<8} {:<32} (no quote data)", row.entry.symbol, row.entry.company),
                }
            }
        }

        Command::News { symbols } => {
            for line in app.news_lines(&symbols).await? {
                println!("{line}");
            }
        }
    }

    Ok(())
}

mod commands;
mod config;
mod logging;
mod server;
mod usda;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_add, cmd_clear, cmd_goals_set, cmd_goals_show, cmd_history, cmd_remove, cmd_report,
    cmd_search, cmd_today,
};
use crate::config::Config;
use crate::usda::UsdaClient;
use nutrilog_core::db::Database;
use nutrilog_core::tracker::Tracker;

#[derive(Parser)]
#[command(
    name = "nutrilog",
    version,
    about = "Track daily protein and fiber against your goals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search USDA `FoodData Central` for a food
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search for a food and log it
    Add {
        /// Search query
        query: String,
        /// Pick the Nth result instead of prompting (1-based)
        #[arg(short, long)]
        pick: Option<usize>,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the entries and totals for a day
    #[command(alias = "summary")]
    Today {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an entry by its position in the day (1-based)
    Remove {
        /// Position as shown by `today`
        #[arg(allow_negative_numbers = true)]
        position: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every entry for a day
    Clear {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change daily goals
    Goals {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Weekly report: daily totals, goal progress, top sources, streak
    Report {
        /// Last day of the week to report on (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show totals for the last N days
    History {
        /// Number of days to show (1-3650)
        #[arg(
            short,
            long,
            default_value = "7",
            value_parser = clap::value_parser!(u32).range(1..=3650)
        )]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the JSON API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show the current goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the daily goals in grams
    Set {
        /// Daily protein goal
        #[arg(long)]
        protein: Option<f64>,
        /// Daily fiber goal
        #[arg(long)]
        fiber: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_level)?;

    let db = Database::open(&config.db_path)?;
    let mut tracker = Tracker::new(db);
    tracker.journal().ensure_goals()?;
    let usda = UsdaClient::new(&config.usda_endpoint, &config.usda_api_key)?;

    match cli.command {
        Commands::Search { query, json } => cmd_search(&mut tracker, &usda, &query, json).await,
        Commands::Add {
            query,
            pick,
            date,
            json,
        } => cmd_add(&mut tracker, &usda, &query, pick, date, json).await,
        Commands::Today { date, json } => cmd_today(&tracker, date, json),
        Commands::Remove {
            position,
            date,
            yes,
            json,
        } => cmd_remove(&tracker, position, date, yes, json),
        Commands::Clear { date, yes, json } => cmd_clear(&tracker, date, yes, json),
        Commands::Goals { command } => match command {
            GoalCommands::Show { json } => cmd_goals_show(&tracker, json),
            GoalCommands::Set {
                protein,
                fiber,
                json,
            } => cmd_goals_set(&tracker, protein, fiber, json),
        },
        Commands::Report { date, json } => cmd_report(&tracker, date, json),
        Commands::History { days, json } => cmd_history(&tracker, days, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?)
            };
            server::start_server(tracker, usda, port, &bind, api_key).await
        }
    }
}

mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "inactive-user", version, about = "Inactive User: notify, warn, block and delete dormant accounts")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, default config and database
    Init,
    /// Run one lifecycle cycle (self-throttled by the run gate)
    Run {
        /// Bypass the minimum interval check
        #[arg(long)]
        force: bool,
        /// Evaluate thresholds at this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// Run cycles periodically until SIGINT/SIGTERM
    Watch,
    /// Show account counts, last run and pending messages
    Status,
    /// List accounts
    Accounts {
        /// Filter by status: active, blocked
        #[arg(long)]
        status: Option<String>,
    },
    /// List queued outbox messages
    Outbox {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Mark a queued message as sent
        #[arg(long)]
        ack: Option<String>,
    },
    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display the full configuration
    Show,
    /// Get a config value (dot notation: thresholds.block_after_secs)
    Get {
        /// Config key (dot notation)
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key (dot notation)
        key: String,
        /// Value (JSON: true, 42, ["a@example.com"], "string")
        value: String,
    },
    /// Check thresholds, recipients and delivery settings
    Validate,
}

fn main() {
    let app = App::parse();

    match &app.command {
        Commands::Watch => inactive_user::tracing_init::init_file_tracing(),
        _ => inactive_user::tracing_init::init_stderr_tracing(),
    }

    let result = match app.command {
        Commands::Init => cli::init::run(),
        Commands::Run { force, now } => cli::run::run(force, now.as_deref()),
        Commands::Watch => cli::watch::run(),
        Commands::Status => cli::status::run(),
        Commands::Accounts { status } => cli::accounts::run(status.as_deref()),
        Commands::Outbox { limit, ack } => cli::outbox::run(limit, ack.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::config::run_show(),
            ConfigAction::Get { key } => cli::config::run_get(&key),
            ConfigAction::Set { key, value } => cli::config::run_set(&key, &value),
            ConfigAction::Validate => cli::config::run_validate(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

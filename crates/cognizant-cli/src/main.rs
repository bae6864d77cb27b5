mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cognizant_core::config::get_data_dir;
use commands::daemon::{run_daemon_process, show_status, start_daemon, stop_daemon};

#[derive(Parser)]
#[command(name = "cognizant")]
#[command(about = "Reminds you when you linger on distracting sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize cognizant (first-time setup)
    Init,
    /// Start the watch daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the watch daemon
    Stop,
    /// Show the current watch and settings
    Status,
    /// Forward a browser tab event to the daemon
    Tab {
        #[command(subcommand)]
        action: TabAction,
    },
    /// Attach as the in-page observer for a tab and show reminders
    Observe {
        /// Tab id to observe
        tab_id: u32,
        /// Ask to continue right after each reminder
        #[arg(long)]
        auto_continue: bool,
    },
    /// Keep browsing: restart the timer for the current site
    Continue,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Usage report per site
    Report {
        /// Time period: today, week, month
        #[arg(default_value = "today")]
        period: String,
        /// Read the local mirror instead of the log service
        #[arg(long)]
        local: bool,
    },
    /// List recorded test results
    Results {
        /// Only show results of this test type
        #[arg(short = 't', long = "type")]
        test_type: Option<String>,
        /// Read the local mirror instead of the log service
        #[arg(long)]
        local: bool,
    },
    /// Record a test result, e.g. `record-test reaction '{"ms": 312}'`
    RecordTest {
        /// Test type, e.g. reaction, memory, attention
        test_type: String,
        /// Result payload as JSON
        result: String,
    },
}

#[derive(Subcommand, Debug)]
enum TabAction {
    /// A tab became the active tab
    Activated {
        tab_id: u32,
        /// Current URL of the tab, if known
        #[arg(long)]
        url: Option<String>,
    },
    /// A tab finished loading a page
    Navigated { tab_id: u32, url: String },
    /// A tab was closed
    Closed { tab_id: u32 },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Key: threshold, goal, watchlist, log_service_url
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Key: threshold, goal, watchlist, log_service_url
        key: String,
        /// Value (watchlist takes a comma-separated list)
        value: String,
    },
    /// List all configuration
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Init => commands::init::init_command(&data_dir),
        Commands::Start => start_daemon(&data_dir),
        Commands::DaemonInternalStart => run_daemon_process(&data_dir).await,
        Commands::Stop => stop_daemon(&data_dir).await,
        Commands::Status => show_status(&data_dir).await,
        Commands::Tab { action } => {
            let request = match action {
                TabAction::Activated { tab_id, url } => {
                    commands::tab::activated(tab_id, url)
                }
                TabAction::Navigated { tab_id, url } => commands::tab::navigated(tab_id, url),
                TabAction::Closed { tab_id } => commands::tab::closed(tab_id),
            };
            commands::tab::send(&data_dir, request).await
        }
        Commands::Observe {
            tab_id,
            auto_continue,
        } => commands::observe::observe_command(&data_dir, tab_id, auto_continue).await,
        Commands::Continue => commands::tab::continue_command(&data_dir).await,
        Commands::Config { action } => match action {
            ConfigAction::Get { key } => commands::config::handle_config_get(&key),
            ConfigAction::Set { key, value } => {
                commands::config::handle_config_set(&data_dir, &key, &value).await
            }
            ConfigAction::List => commands::config::handle_config_list(),
        },
        Commands::Report { period, local } => {
            commands::report::handle_report_command(&period, local).await
        }
        Commands::Results { test_type, local } => {
            commands::results::handle_results_command(test_type.as_deref(), local).await
        }
        Commands::RecordTest { test_type, result } => {
            commands::results::handle_record_test(&test_type, &result).await
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
];

#[derive(Parser, Debug, Clone)]
#[command(name = "careerboard", about = "Job board collection scraper")]
pub struct Config {
    /// Database connection URL. Without it, records are not persisted.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Run Chrome without a visible window
    #[arg(long, env = "HEADLESS", default_value = "true", action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Chrome profile directory holding a signed-in session
    #[arg(long, env = "CHROME_USER_DATA_DIR")]
    pub user_data_dir: Option<PathBuf>,

    /// Total time to wait for the job list to render, in milliseconds
    #[arg(long, env = "READY_TIMEOUT_MS", default_value = "15000")]
    pub ready_timeout_ms: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the API server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
        listen_addr: String,

        /// Allowed CORS origin; repeat for several
        #[arg(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,
    },
    /// Walk one collection and write the records as JSON
    Scrape {
        /// Collection token, e.g. recommended or remote-jobs
        #[arg(long, short = 'c', default_value = "recommended")]
        collection: String,

        /// Maximum number of jobs to collect
        #[arg(long, short = 'l', default_value = "25")]
        limit: usize,

        /// Maximum number of list pages to visit
        #[arg(long, short = 'p', default_value = "5")]
        pages: usize,

        /// Open every job to read its description, hiring team and match analysis
        #[arg(long, short = 'd')]
        details: bool,

        /// Output file; stdout when omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Print every accepted collection token
    Collections,
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or_default(),
        })
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Configured origins, or the local development defaults when none are set.
pub fn cors_origins(configured: &[String]) -> Vec<String> {
    let origins: Vec<String> = configured
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
    } else {
        origins
    }
}

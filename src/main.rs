mod browser;
mod collectors;
mod config;
mod error;
mod models;
mod routes;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::browser::Launcher;
use crate::browser::chrome::ChromeLauncher;
use crate::collectors::progress::ConsoleNotifier;
use crate::collectors::runner::{BrowserExtractor, JobRunner, validate};
use crate::collectors::walker::{WalkOptions, Walker};
use crate::config::{Command, Config, cors_origins};
use crate::models::collection::Collection;
use crate::models::extraction_job::ScrapeRequest;
use crate::models::job::JobRecord;
use crate::routes::AppState;
use crate::store::records::{NullSink, PgRecordSink, RecordSink};
use crate::store::status::InMemoryStatusStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    match config.resolved_command() {
        Command::Serve {
            listen_addr,
            cors_origins,
        } => serve(&config, &listen_addr, &cors_origins).await,
        Command::Scrape {
            collection,
            limit,
            pages,
            details,
            output,
        } => {
            let request = ScrapeRequest {
                collection,
                limit,
                pages,
                details,
                owner_id: None,
            };
            scrape(&config, request, output).await
        }
        Command::Collections => {
            for token in Collection::choices() {
                println!("{token}");
            }
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("careerboard=info,tower_http=info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve(config: &Config, listen_addr: &str, configured_origins: &[String]) -> anyhow::Result<()> {
    let sink = connect_sink(config).await;

    let launcher = ChromeLauncher::new(config.headless, config.user_data_dir.clone());
    let options = WalkOptions {
        ready_timeout: config.ready_timeout(),
    };
    let runner = JobRunner::new(
        Arc::new(InMemoryStatusStore::new()),
        sink,
        Arc::new(BrowserExtractor::new(launcher, options)),
    );

    let origins = cors_origins(configured_origins)
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Allowing CORS origins: {}", cors_origins(configured_origins).join(", "));

    let app = routes::router(AppState { runner })
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {listen_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Postgres sink when a database is configured and reachable; otherwise
/// records are only reported, never stored.
async fn connect_sink(config: &Config) -> Arc<dyn RecordSink> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, scraped jobs will not be saved");
        return Arc::new(NullSink);
    };

    tracing::info!("Connecting to database...");
    match PgPoolOptions::new().max_connections(5).connect(url).await {
        Ok(pool) => Arc::new(PgRecordSink::new(pool)),
        Err(e) => {
            tracing::warn!("Failed to connect to database, running without persistence: {e}");
            Arc::new(NullSink)
        }
    }
}

async fn scrape(config: &Config, request: ScrapeRequest, output: Option<PathBuf>) -> anyhow::Result<()> {
    validate(&request)?;

    let launcher = ChromeLauncher::new(config.headless, config.user_data_dir.clone());
    let page = launcher.launch().await?;
    let notifier = ConsoleNotifier;
    let records = Walker::new(&page)
        .with_notifier(&notifier)
        .with_options(WalkOptions {
            ready_timeout: config.ready_timeout(),
        })
        .walk(&request.collection, request.limit, request.pages, request.details)
        .await?;

    let json = serde_json::to_string_pretty(&records)?;
    match &output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            tracing::info!("Saved {} jobs to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }

    print_summary(&records);
    Ok(())
}

fn print_summary(records: &[JobRecord]) {
    tracing::info!("Scraped {} jobs", records.len());
    for (i, record) in records.iter().enumerate() {
        tracing::info!(
            "{}. {} at {} [{}]",
            i + 1,
            record.display_title(),
            record.display_employer(),
            record.id
        );
        tracing::info!(
            "   Location: {} | Posted: {}",
            record.location.as_deref().unwrap_or("N/A"),
            record.posted_time.as_deref().unwrap_or("N/A")
        );
        if let Some(kind) = &record.employment_type {
            tracing::info!("   Type: {kind}");
        }
        if let Some(workplace) = &record.workplace_type {
            tracing::info!("   Workplace: {workplace}");
        }

        let flags: Vec<&str> = [
            (record.is_promoted, "Promoted"),
            (record.supports_expedited_apply, "Easy Apply"),
            (record.is_actively_hiring, "Actively hiring"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect();
        if !flags.is_empty() {
            tracing::info!("   Flags: {}", flags.join(", "));
        }

        if let Some(description) = &record.description {
            tracing::info!("   Description: {} chars", description.chars().count());
        }
        for member in record.hiring_team.iter().flatten() {
            tracing::info!(
                "   Hiring: {} ({}){}",
                member.name,
                member.title.as_deref().unwrap_or("no title"),
                if member.is_job_poster { " - job poster" } else { "" }
            );
        }
        if let Some(analysis) = &record.match_analysis {
            if let (Some(matched), Some(required)) = (analysis.total_matched, analysis.total_required) {
                tracing::info!("   Match: {matched} of {required} required qualifications");
            }
            if let Some(summary) = &analysis.summary {
                tracing::info!("   Match summary: {summary}");
            }
        }
    }
}

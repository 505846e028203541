use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mentor_match::config::{LoggingSettings, Settings};
use mentor_match::routes::{self, AppState};
use mentor_match::{compare, Orchestrator, PostgresStore, RunOptions};

/// Mentor Match - stable mentor-mentee matching rounds
#[derive(Parser)]
#[command(name = "mentor-match")]
#[command(version)]
#[command(about = "Score mentee-mentor pairs and assign them with capacity-aware deferred acceptance")]
struct Cli {
    /// Configuration file; defaults to config/default.toml plus config/local.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,
    /// Run a single matching round and exit
    Run {
        /// Label stored with the round summary
        #[arg(long)]
        round_name: String,
        /// Compute and print the summary without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Dry-run every configured [[experiments]] bundle and report the best
    Compare,
}

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors, e.g. a malformed round id
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is not configured yet
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(&settings.logging);

    if let Err(e) = settings.matching.check() {
        error!("{}", e);
        std::process::exit(2);
    }

    info!("Configuration loaded successfully");

    let store = PostgresStore::from_settings(&settings.database)
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;

    info!(
        "PostgreSQL store initialized (max: {} connections)",
        settings.database.max_connections.unwrap_or(10)
    );

    match cli.command {
        Commands::Run { round_name, dry_run } => run_once(settings, store, round_name, dry_run).await,
        Commands::Compare => compare_experiments(settings, store).await,
        Commands::Serve => serve(settings, store).await,
    }
}

async fn run_once(
    settings: Settings,
    store: PostgresStore,
    round_name: String,
    dry_run: bool,
) -> std::io::Result<()> {
    let result = match Orchestrator::new(settings.matching) {
        Ok(orchestrator) => {
            let options = RunOptions::new(round_name).dry_run(dry_run);
            orchestrator.run(&store, &options).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            let summary = serde_json::to_string_pretty(&report.summary)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            error!("Matching round failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn compare_experiments(settings: Settings, store: PostgresStore) -> std::io::Result<()> {
    if settings.experiments.is_empty() {
        error!("No [[experiments]] bundles configured");
        std::process::exit(2);
    }

    match compare(&store, &settings.experiments).await {
        Ok(comparison) => {
            let report = serde_json::to_string_pretty(&comparison)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!("Experiment comparison failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn serve(settings: Settings, store: PostgresStore) -> std::io::Result<()> {
    info!(
        "Matcher configured with {} (semantic {:.2}, expertise {:.2})",
        settings.matching.algorithm_name(),
        settings.matching.semantic_weight,
        settings.matching.expertise_weight
    );

    let app_state = AppState::new(Arc::new(store), settings.matching.clone());

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

mod applications;
mod config;
mod db;
mod errors;
mod jobs;
mod matching;
mod models;
mod resume;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::HeaderValue;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applications::submitter::StoredApplicationSubmitter;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::PgJobSource;
use crate::matching::batch::{BatchMatcher, ScoringStrategy};
use crate::matching::scoring::{BatchScoring, RemoteScorer, TfIdfScorer};
use crate::routes::build_router;
use crate::session::SessionRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let matcher = build_matcher(&config)?;
    info!("Scoring strategy: {:?}", matcher.strategy());

    let submitter = Arc::new(StoredApplicationSubmitter::new(
        db.clone(),
        s3,
        config.s3_bucket.clone(),
    ));

    let state = AppState {
        sessions: Arc::new(SessionRegistry::new(submitter.clone())),
        matcher,
        job_source: Arc::new(PgJobSource::new(db)),
        resumes: submitter,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote scorer when `SCORING_API_URL` is set, local TF-IDF otherwise.
fn build_matcher(config: &Config) -> Result<BatchMatcher> {
    let strategy = ScoringStrategy::parse(&config.scoring_strategy, config.scoring_concurrency)?;

    match &config.scoring_api_url {
        Some(url) => {
            let remote = Arc::new(RemoteScorer::new(
                url.clone(),
                Duration::from_secs(config.scoring_timeout_secs),
            )?);
            info!("Scoring backend: remote ({url})");
            let batch: Arc<dyn BatchScoring> = remote.clone();
            Ok(BatchMatcher::new(remote, Some(batch), strategy))
        }
        None => {
            info!("Scoring backend: local TF-IDF");
            Ok(BatchMatcher::new(Arc::new(TfIdfScorer), None, strategy))
        }
    }
}

fn build_cors(config: &Config) -> Result<CorsLayer> {
    match &config.frontend_url {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("FRONTEND_URL '{origin}' is not a valid origin"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobmatch-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

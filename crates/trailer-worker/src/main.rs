//! Trailer worker binary.
//!
//! Reads a job request JSON file, runs it to completion and prints the final
//! job as JSON on stdout.

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trailer_models::{JobRequest, JobState};
use trailer_worker::{metrics, TrailerPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "trailer=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    // Logs go to stderr so stdout carries only the job document
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let Some(request_path) = std::env::args().nth(1).map(PathBuf::from) else {
        error!("Usage: trailer-worker <job-request.json>");
        std::process::exit(2);
    };

    info!("Starting trailer-worker");

    // Load configuration
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        match metrics::install_exporter(addr) {
            Ok(()) => info!(addr = %addr, "Prometheus exporter listening"),
            Err(e) => error!("Failed to install metrics exporter: {}", e),
        }
    }

    let request: JobRequest = match tokio::fs::read(&request_path)
        .await
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
    {
        Ok(r) => r,
        Err(e) => {
            error!(path = %request_path.display(), "Failed to read job request: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = match TrailerPipeline::from_config(config).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let job = pipeline.run_job(request).await;

    match serde_json::to_string_pretty(&job) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize job: {}", e);
            std::process::exit(1);
        }
    }

    if job.state == JobState::Failed {
        std::process::exit(1);
    }
    info!("Worker shutdown complete");
}

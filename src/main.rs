use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use sentinel_bruteforce::cli::{Cli, format_table};
use sentinel_bruteforce::utils::init_tracing;
use sentinel_bruteforce::{
    ChainedCredential, CredentialConfig, DetectorConfig, DetectorError, HttpClient,
    HttpClientConfig, LogAnalyticsClient, LogConfig, MetricsConfig, Pipeline, ReportWriter,
    RunMetrics, WebhookNotifier, exit_code,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut detector = DetectorConfig::from_env();
    let mut log_config = LogConfig::from_env();
    let mut metrics_config = MetricsConfig::from_env();
    cli.apply(&mut detector, &mut log_config, &mut metrics_config);

    if let Err(e) = init_tracing(&log_config) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        built = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        "Starting sentinel-bruteforce"
    );

    let metrics = if metrics_config.enabled {
        match RunMetrics::new() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Failed to create run metrics; continuing without them");
                None
            }
        }
    } else {
        None
    };

    let result = run(&detector, metrics.clone()).await;

    if let (Some(metrics), Some(path)) = (&metrics, &metrics_config.textfile_path) {
        match metrics.write_textfile(path) {
            Ok(()) => info!(path = %path.display(), "Metrics textfile written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write metrics textfile"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Detection run failed");
            eprintln!("error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(config: &DetectorConfig, metrics: Option<RunMetrics>) -> Result<(), DetectorError> {
    config.validate()?;

    if config.webhook_url.is_none() {
        warn!("SLACK_WEBHOOK_URL is not set; alerts will not be posted");
    }

    let http = HttpClient::new(HttpClientConfig::from_env(), metrics.clone())
        .map_err(|e| DetectorError::Configuration(e.user_message()))?;

    let credential = ChainedCredential::default_chain(&CredentialConfig::from_env(), &http);
    let query = LogAnalyticsClient::new(
        http.clone(),
        Arc::new(credential),
        config.query_endpoint.clone(),
        config.workspace_id()?,
    );
    let notifier = WebhookNotifier::new(http, config.webhook_url.clone())
        .with_notify_on_empty(config.notify_on_empty);

    let mut pipeline = Pipeline::new(
        Box::new(query),
        notifier,
        ReportWriter::new(&config.report_path),
        config.threshold,
        config.window_hours,
    );
    if let Some(metrics) = metrics {
        pipeline = pipeline.with_metrics(metrics);
    }

    let summary = pipeline.run(chrono::Utc::now()).await?;

    if summary.suspicious.is_empty() {
        println!("No suspicious IPs detected.");
    } else {
        print!("{}", format_table(&summary.suspicious));
    }
    println!("Results saved to {}", summary.report_path.display());

    Ok(())
}

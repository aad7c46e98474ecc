use pairing_engine::config::{EncoderKind, LoggingSettings, Settings};
use pairing_engine::core::{PipelineError, RoundMatcher};
use pairing_engine::services::{
    filter_eligible, load_snapshot, write_report, HashingEncoder, HttpEncoder,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match std::env::var("PAIRING_CONFIG") {
        Ok(path) => Settings::load_from(path),
        Err(_) => Settings::load(),
    };

    // Initialize logging; LOG_LEVEL and LOG_FORMAT win over the config file
    let logging = settings
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default()
        .overridden_by(
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("LOG_FORMAT").ok(),
        );
    init_tracing(&logging);

    info!("Starting pairing round...");

    let result = match settings {
        Ok(settings) => run(settings).await,
        Err(e) => Err(PipelineError::from(e)),
    };

    if let Err(e) = result {
        error!("Pairing round failed: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(logging: &LoggingSettings) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&logging.level))
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn run(settings: Settings) -> Result<(), PipelineError> {
    info!("Configuration loaded successfully");

    let rows = load_snapshot(&settings.run.snapshot_path).await?;
    let applicants = filter_eligible(rows)?;

    let matcher = RoundMatcher::from_settings(&settings);
    info!(
        "Matcher initialized with composition: {:?}",
        settings.scoring.composition
    );

    let report = match settings.encoder.kind {
        EncoderKind::Http => {
            let encoder = HttpEncoder::from_settings(&settings.encoder)?;
            info!("Using embedding server at {}", settings.encoder.endpoint);
            matcher.run(&encoder, applicants).await?
        }
        EncoderKind::Hashing => {
            let encoder = HashingEncoder::new(settings.encoder.hashing_dimension);
            info!("Using offline hashing encoder");
            matcher.run(&encoder, applicants).await?
        }
    };

    write_report(&settings.run.report_path, &report).await?;
    Ok(())
}

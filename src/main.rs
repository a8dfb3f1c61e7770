use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tpsgauge::config::Config;
use tpsgauge::errors::Result;
use tpsgauge::metrics::{FinalReport, GaugeSink, spawn_exporter};
use tpsgauge::operation::HttpOperation;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Application failed: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Parse and validate configuration
    let config = Config::from_args()?;

    init_logging(&config);

    info!("📈 tpsgauge - throughput gauge");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !config.output.json {
        config.print_summary();
    }

    let operation = Arc::new(
        HttpOperation::new(
            config.target.url.clone(),
            config.target.method,
            config.http_timeout(),
        )?
        .with_status_check(config.target.check_status),
    );
    let gauge = Arc::new(GaugeSink::new()?);

    let cancel = CancellationToken::new();
    let exporter = match config.output.metrics_addr {
        Some(addr) => Some(spawn_exporter(addr, gauge.clone(), cancel.clone()).await?.1),
        None => None,
    };
    setup_signal_handler(cancel.clone());
    if let Some(duration) = config.test_duration() {
        schedule_stop(cancel.clone(), duration);
    }

    let started = Instant::now();
    let summary = tpsgauge::start(cancel, config.engine_config(), operation, gauge.clone())
        .await
        .inspect_err(|e| error!("Run failed: {}", e))?;

    // The exporter shares the run's token and is already shutting down
    if let Some(server) = exporter {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{}", e),
            Err(e) => warn!("Metrics server task failed: {}", e),
        }
    }

    let report = FinalReport::new(&config, started.elapsed(), summary, &gauge);
    if config.output.json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
    }
    Ok(())
}

/// Cancel the run on Ctrl+C
fn setup_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        warn!("Received Ctrl+C, initiating graceful shutdown...");
        cancel.cancel();
    });
}

/// Cancel the run once the configured duration has elapsed
fn schedule_stop(cancel: CancellationToken, duration: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                info!("Reached time limit: {:?}", duration);
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let level = if config.output.verbose {
        "debug"
    } else {
        "info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [format!("tpsgauge={}", level), "reqwest=warn".into(), "hyper=warn".into()] {
        match directive.parse::<Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log directive '{}': {}", directive, e),
        }
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", e);
    }

    if config.output.verbose {
        info!("Verbose logging enabled");
    }
}

mod bootstrap;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use monitor_charts::ChartRenderer;
use monitor_core::formatting::format_reading;
use monitor_core::settings::Settings;
use monitor_core::time_utils::{resolve_timezone, CliTimeResolver};
use monitor_data::store::{JsonFileStore, RealtimeDbClient, StoreConfig, StoreReader};
use monitor_runtime::data_manager::DataManager;
use monitor_runtime::orchestrator::{latest_reading, MonitoringOrchestrator};

fn main() -> Result<ExitCode> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    bootstrap::setup_logging(settings.effective_log_level())?;
    tracing::info!("sensor-monitor v{} starting", env!("CARGO_PKG_VERSION"));

    let store = open_store(&settings)?;
    let mut data = DataManager::new(store, settings.ref_path.clone(), settings.verbose);
    let display_tz = resolve_timezone(settings.effective_display_tz());

    if settings.debug {
        match latest_reading(&mut data)? {
            Some(reading) => {
                println!("Latest reading:");
                println!("{}", format_reading(&reading, display_tz));
            }
            None => println!("No data available."),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let orchestrator = MonitoringOrchestrator::new(
        CliTimeResolver::new(&settings.tz),
        settings.time_request(),
        settings.verbose,
    );
    let outcome = orchestrator.run(&mut data)?;
    if outcome.is_empty() {
        eprintln!("No data matched the requested time range.");
        return Ok(ExitCode::FAILURE);
    }
    if outcome.used_fallback {
        tracing::warn!(
            "No rows in {} for --start/--end; showing rows matched as UTC",
            settings.tz
        );
    }

    bootstrap::ensure_plots_dir(&settings.plots_dir)?;
    let renderer = ChartRenderer::new(&settings.plots_dir, display_tz).with_png(!settings.no_png);
    let artifacts = renderer
        .render_readings(&outcome.readings)
        .context("rendering charts")?;

    for artifact in &artifacts {
        println!("Saved interactive plot: {}", artifact.html.display());
        if let Some(png) = &artifact.png {
            println!("Saved static image: {}", png.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// A local snapshot when `--input` is given, otherwise the Realtime Database.
fn open_store(settings: &Settings) -> Result<Box<dyn StoreReader>> {
    if let Some(path) = &settings.input {
        tracing::info!("Reading snapshot {}", path.display());
        return Ok(Box::new(JsonFileStore::new(path.clone())));
    }

    let config = StoreConfig {
        database_url: settings.database_url.clone(),
        credentials: settings.credentials.clone(),
        timeout: Duration::from_secs(settings.timeout_secs),
    };
    let client = RealtimeDbClient::connect(&config)
        .with_context(|| format!("connecting to {}", settings.database_url))?;
    if !client.is_authenticated() {
        tracing::debug!("requests to {} are unauthenticated", settings.database_url);
    }
    Ok(Box::new(client))
}

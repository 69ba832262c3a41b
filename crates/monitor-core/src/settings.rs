use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::time_utils::TimeRequest;

/// Realtime Database instance the sensors write to.
pub const DEFAULT_DATABASE_URL: &str = "https://moist-meat-monitor-default-rtdb.firebaseio.com/";

/// Location of the reading set inside the database.
pub const DEFAULT_REF_PATH: &str = "/sensors/device1";

/// Timezone CLI timestamps are written in when none is given.
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Fetch sensor readings and render temperature / humidity charts
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensor-monitor",
    about = "Fetch sensor readings and render temperature / humidity charts",
    version
)]
pub struct Settings {
    /// Start timestamp (epoch seconds/milliseconds or ISO datetime)
    #[arg(short = 's', long)]
    pub start: Option<String>,

    /// End timestamp (epoch seconds/milliseconds or ISO datetime)
    #[arg(short = 'e', long)]
    pub end: Option<String>,

    /// Relative timeframe: last N hours (overrides --start/--end)
    #[arg(long)]
    pub hours: Option<f64>,

    /// Timezone for CLI timestamps without an offset ("auto" = system)
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    pub tz: String,

    /// Timezone for the chart time axis (defaults to --tz)
    #[arg(long)]
    pub display_tz: Option<String>,

    /// Show fetch and filter details
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Show the latest reading and exit
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Realtime Database base URL
    #[arg(long, env = "SENSOR_MONITOR_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Path of the reading set inside the database
    #[arg(long, default_value = DEFAULT_REF_PATH)]
    pub ref_path: String,

    /// Credentials file (JSON with an `auth_token` field)
    #[arg(long, env = "SENSOR_MONITOR_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Read readings from a local JSON snapshot instead of the database
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// HTTP timeout for the database request, in seconds (1-600)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout_secs: u64,

    /// Directory charts are written to
    #[arg(long, default_value = "plots")]
    pub plots_dir: PathBuf,

    /// Skip the static PNG export
    #[arg(long)]
    pub no_png: bool,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.sensor-monitor/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_tz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plots_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".sensor-monitor").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// value was provided, then persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                warn!("Could not clear saved settings at {}: {}", config_path.display(), e);
            }
            return settings;
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI (or environment) always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "tz") {
            if let Some(v) = last.tz {
                settings.tz = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "display_tz") && settings.display_tz.is_none() {
            settings.display_tz = last.display_tz;
        }
        if !is_arg_explicitly_set(&matches, "database_url") {
            if let Some(v) = last.database_url {
                settings.database_url = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "plots_dir") {
            if let Some(v) = last.plots_dir {
                settings.plots_dir = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            warn!("Could not save settings to {}: {}", config_path.display(), e);
        }

        settings
    }

    /// Reject values clap cannot express as a range.
    pub fn validate(&self) -> Result<()> {
        if let Some(hours) = self.hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(MonitorError::Config(format!(
                    "--hours must be a non-negative number, got {}",
                    hours
                )));
            }
        }
        if self.ref_path.trim_matches('/').is_empty() {
            return Err(MonitorError::Config(
                "--ref-path must name a location inside the database".to_string(),
            ));
        }
        Ok(())
    }

    /// The time selection requested on the command line.
    pub fn time_request(&self) -> TimeRequest {
        TimeRequest {
            start: self.start.clone(),
            end: self.end.clone(),
            hours: self.hours,
        }
    }

    /// Timezone for the chart axis: `--display-tz`, else `--tz`.
    pub fn effective_display_tz(&self) -> &str {
        self.display_tz.as_deref().unwrap_or(&self.tz)
    }

    /// Log level after applying `--verbose` (which implies at least INFO).
    pub fn effective_log_level(&self) -> &str {
        match (self.verbose, self.log_level.as_str()) {
            (true, "WARNING" | "ERROR") => "INFO",
            (_, level) => level,
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            tz: Some(s.tz.clone()),
            display_tz: s.display_tz.clone(),
            database_url: Some(s.database_url.clone()),
            plots_dir: Some(s.plots_dir.clone()),
        }
    }
}

// ── Helper: check if an arg was explicitly set ─────────────────────────────────

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine | clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────

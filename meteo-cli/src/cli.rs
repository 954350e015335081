use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{CustomType, MultiSelect, Select, Text};

use meteo_core::{Archive, ArchiveClient, ArchiveQuery, Config, DailyMetric, TemperatureUnit};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Historical daily weather from the Open-Meteo archive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a date range of daily observations and print or save it as JSON.
    Fetch {
        /// Latitude in degrees; falls back to the configured default.
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,

        /// Longitude in degrees; falls back to the configured default.
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,

        /// First day of the range, YYYY-MM-DD.
        #[arg(long)]
        start_date: NaiveDate,

        /// Last day of the range (inclusive), YYYY-MM-DD.
        #[arg(long)]
        end_date: NaiveDate,

        /// Comma-separated metric list, e.g. "temperature_2m_max,sunrise".
        /// Falls back to the configured default, then to all metrics.
        #[arg(long)]
        daily: Option<String>,

        /// "celsius" or "fahrenheit"; falls back to the configured
        /// default, then to celsius.
        #[arg(long)]
        temperature_unit: Option<String>,

        /// IANA timezone, e.g. "America/New_York"; falls back to the
        /// configured default.
        #[arg(long)]
        timezone: Option<String>,

        /// Write the archive JSON here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Interactively choose and store default query parameters.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Fetch {
                latitude,
                longitude,
                start_date,
                end_date,
                daily,
                temperature_unit,
                timezone,
                output,
                timeout,
            } => {
                let query = build_query(
                    latitude,
                    longitude,
                    start_date,
                    end_date,
                    daily,
                    temperature_unit,
                    timezone,
                )?;

                let client = ArchiveClient::new().with_timeout(Duration::from_secs(timeout));
                let archive = client.fetch(&query).await?;

                write_archive(&archive, output.as_deref())
            }
            Command::Configure => configure(),
        }
    }
}

/// Merge explicit flags over stored defaults into a validated query.
fn build_query(
    latitude: Option<f64>,
    longitude: Option<f64>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily: Option<String>,
    temperature_unit: Option<String>,
    timezone: Option<String>,
) -> Result<ArchiveQuery> {
    let config = Config::load()?;

    let latitude = latitude.or(config.latitude).context(
        "No latitude given.\nHint: pass --latitude or run `meteo configure` to store a default.",
    )?;
    let longitude = longitude.or(config.longitude).context(
        "No longitude given.\nHint: pass --longitude or run `meteo configure` to store a default.",
    )?;
    let timezone = timezone.or_else(|| config.timezone.clone()).context(
        "No timezone given.\nHint: pass --timezone or run `meteo configure` to store a default.",
    )?;

    let temperature_unit = match temperature_unit {
        Some(s) => TemperatureUnit::try_from(s.as_str())?,
        None => config.temperature_unit()?.unwrap_or_default(),
    };

    let metrics = match daily {
        Some(list) => list
            .split(',')
            .map(DailyMetric::try_from)
            .collect::<Result<Vec<_>, _>>()?,
        None => config.metrics()?.unwrap_or_else(|| DailyMetric::all().to_vec()),
    };

    let query = ArchiveQuery::new(
        latitude,
        longitude,
        start_date,
        end_date,
        metrics,
        temperature_unit,
        timezone,
    )?;

    Ok(query)
}

/// Pretty-print the archive to stdout, or save it next to whatever
/// the caller wants to analyze it with.
fn write_archive(archive: &Archive, output: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(archive)
        .context("Failed to serialize fetched archive to JSON")?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write archive to {}", path.display()))?;
            println!(
                "Saved {} daily record(s) to {}",
                archive.records.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Interactive defaults, seeded with the original NYC pull so a bare
/// enter-enter-enter run reproduces it.
fn configure() -> Result<()> {
    let existing = Config::load()?;

    let latitude = CustomType::<f64>::new("Latitude:")
        .with_default(existing.latitude.unwrap_or(40.7128))
        .with_error_message("Please enter a number of degrees")
        .prompt()?;

    let longitude = CustomType::<f64>::new("Longitude:")
        .with_default(existing.longitude.unwrap_or(-74.0060))
        .with_error_message("Please enter a number of degrees")
        .prompt()?;

    let timezone = Text::new("Timezone (IANA):")
        .with_default(existing.timezone.as_deref().unwrap_or("America/New_York"))
        .prompt()?;

    let unit = Select::new("Temperature unit:", TemperatureUnit::all().to_vec()).prompt()?;

    let all_selected: Vec<usize> = (0..DailyMetric::all().len()).collect();
    let metrics = MultiSelect::new("Daily metrics:", DailyMetric::all().to_vec())
        .with_default(&all_selected)
        .prompt()?;

    let config = Config {
        latitude: Some(latitude),
        longitude: Some(longitude),
        timezone: Some(timezone),
        temperature_unit: Some(unit.as_str().to_string()),
        metrics: Some(metrics.iter().map(|m| m.as_str().to_string()).collect()),
    };
    config.save()?;

    println!("Defaults saved to {}", Config::config_file_path()?.display());

    Ok(())
}

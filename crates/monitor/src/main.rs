//! `plantwatch-monitor` -- replay recorded sensor readings through a plant.
//!
//! Builds the plant described by `PLANT_DEFINITION`, optionally starts
//! every startable equipment, ingests the readings in `READINGS_FILE` and
//! prints the replay summary as JSON on stdout.
//!
//! See [`MonitorConfig::from_env`] for the environment variables.

use anyhow::Context;
use plantwatch_monitor::config::{LogFormat, MonitorConfig};
use plantwatch_monitor::definition::PlantDefinition;
use plantwatch_monitor::replay;
use plantwatch_monitor::repository::InMemoryPlantRepository;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env()?;

    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plantwatch_monitor=info,plantwatch_core=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(
        plant_definition = %config.plant_definition.display(),
        readings_file = %config.readings_file.display(),
        auto_start = config.auto_start_equipment,
        "Starting plantwatch-monitor",
    );

    let definition = PlantDefinition::load(&config.plant_definition)?;
    let mut repo = InMemoryPlantRepository::from_definition(&definition)
        .context("failed to build plant from definition")?;

    if config.auto_start_equipment {
        repo.start_all_startable();
    }

    let summary = replay::replay_file(&mut repo, &config.readings_file)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

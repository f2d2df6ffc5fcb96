use crate::engine::Session;
use crate::{ingest, output, reports};
use anyhow::{Context, Result};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::info;

/// Where the pipeline reads from and writes to. The defaults mirror the
/// published dataset layout: registrations CSV under `data/`, summary
/// reports beside the binary, per-year extracts under `parquet_output/`.
#[derive(Debug, Clone)]
pub struct Config {
    pub csv_path: PathBuf,
    pub report_dir: PathBuf,
    pub extract_dir: PathBuf,
    pub extract_years: RangeInclusive<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/Electric_Vehicle_Population_Data.csv"),
            report_dir: PathBuf::from("."),
            extract_dir: PathBuf::from("parquet_output"),
            extract_years: 2010..=2022,
        }
    }
}

impl Config {
    fn report_stem(&self, name: &str) -> PathBuf {
        self.report_dir.join(name)
    }

    fn extract_stem(&self, year: i32) -> PathBuf {
        self.extract_dir.join(format!("electric_cars_{year}"))
    }
}

/// Run the whole pipeline: load the registrations CSV into an in-memory
/// session, write the four summary reports, then one extract per year in
/// the configured range. The first failure aborts the run; the session is
/// released on every exit path.
#[tracing::instrument(level = "info", skip(config), fields(input = %config.csv_path.display()))]
pub async fn run(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("creating `{}`", config.report_dir.display()))?;
    std::fs::create_dir_all(&config.extract_dir)
        .with_context(|| format!("creating `{}`", config.extract_dir.display()))?;

    let session = Session::open();
    let rows = ingest::load_csv(&session, &config.csv_path).await?;
    info!(rows, "registrations loaded");

    output::write_result(
        reports::count_cars_by_city(&session).await?,
        config.report_stem("count_cars_by_city"),
    )
    .await?;
    output::write_result(
        reports::top_3_models(&session).await?,
        config.report_stem("top_3_models"),
    )
    .await?;
    output::write_result(
        reports::top_model_by_postal_code(&session).await?,
        config.report_stem("top_model_by_postal_code"),
    )
    .await?;
    output::write_result(
        reports::count_cars_by_year(&session).await?,
        config.report_stem("count_cars_by_year"),
    )
    .await?;

    for year in config.extract_years.clone() {
        output::write_result(
            reports::extract_year(&session, year).await?,
            config.extract_stem(year),
        )
        .await?;
    }

    session.close();
    info!("pipeline finished");
    Ok(())
}

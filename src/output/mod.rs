use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::Schema;
use datafusion::prelude::DataFrame;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

/// Materialise a query result and write it to `<stem>.parquet` as a single
/// Snappy-compressed file, returning the path written. An empty result
/// still produces a file carrying the result's schema. Existing files are
/// replaced; parent directories must already exist.
#[tracing::instrument(level = "info", skip(frame, stem), fields(stem = %stem.as_ref().display()))]
pub async fn write_result(frame: DataFrame, stem: impl AsRef<Path>) -> Result<PathBuf> {
    let path = stem.as_ref().with_extension("parquet");

    // the plan schema survives even when collect() yields no batches
    let plan_schema = Schema::from(frame.schema());
    let batches = frame.collect().await.context("collecting result rows")?;

    let schema = match batches.first() {
        Some(batch) => batch.schema(),
        None => Arc::new(plan_schema),
    };
    let batch = concat_batches(&schema, &batches).context("concatenating result rows")?;

    let file =
        File::create(&path).with_context(|| format!("creating `{}`", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))
        .context("opening parquet writer")?;
    writer.write(&batch).context("writing parquet row group")?;
    writer.close().context("closing parquet writer")?;

    info!(rows = batch.num_rows(), path = %path.display(), "result written");
    Ok(path)
}

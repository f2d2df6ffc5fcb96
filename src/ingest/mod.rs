use crate::engine::Session;
use crate::schema::{self, Column, ColumnType, COLUMNS};
use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{ArrayRef, Int32Builder, Int64Builder, StringBuilder};
use arrow::record_batch::RecordBatch;
use csv::StringRecord;
use std::{fs::File, io::BufReader, path::Path, sync::Arc};
use tracing::info;

/// Rows accumulated per insert. Batching is internal only; the final table
/// holds the same rows in the same order as one-at-a-time inserts.
const BATCH_ROWS: usize = 8192;

/// Stand-in recorded for a missing source field, applied before type
/// coercion and regardless of column type.
const MISSING_VALUE: &str = "0";

/// Typed array builder for one column of the table.
enum CellBuilder {
    Text(StringBuilder),
    Int(Int32Builder),
    BigInt(Int64Builder),
}

impl CellBuilder {
    fn for_type(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Text => CellBuilder::Text(StringBuilder::new()),
            ColumnType::Int => CellBuilder::Int(Int32Builder::new()),
            ColumnType::BigInt => CellBuilder::BigInt(Int64Builder::new()),
        }
    }

    fn append(&mut self, value: &str, column: &Column, row: usize) -> Result<()> {
        match self {
            CellBuilder::Text(b) => b.append_value(value),
            CellBuilder::Int(b) => b.append_value(parse_int::<i32>(value, column, row)?),
            CellBuilder::BigInt(b) => b.append_value(parse_int::<i64>(value, column, row)?),
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            CellBuilder::Text(b) => Arc::new(b.finish()),
            CellBuilder::Int(b) => Arc::new(b.finish()),
            CellBuilder::BigInt(b) => Arc::new(b.finish()),
        }
    }
}

fn parse_int<T: std::str::FromStr>(value: &str, column: &Column, row: usize) -> Result<T> {
    value.trim().parse().map_err(|_| {
        anyhow!(
            "row {row}: cannot coerce {value:?} in column `{}` to an integer",
            column.name
        )
    })
}

/// One in-flight batch of rows, one builder per table column.
struct BatchBuilders {
    cells: Vec<CellBuilder>,
    rows: usize,
}

impl BatchBuilders {
    fn new() -> Self {
        Self {
            cells: COLUMNS.iter().map(|c| CellBuilder::for_type(c.ty)).collect(),
            rows: 0,
        }
    }

    fn append_record(&mut self, record: &StringRecord, row: usize) -> Result<()> {
        for ((cell, column), raw) in self.cells.iter_mut().zip(COLUMNS.iter()).zip(record.iter()) {
            // uniform substitution first; per-type coercion happens below it
            let value = if raw.trim().is_empty() { MISSING_VALUE } else { raw };
            cell.append(value, column, row)?;
        }
        self.rows += 1;
        Ok(())
    }

    fn finish_batch(&mut self) -> Result<RecordBatch> {
        self.rows = 0;
        let columns: Vec<ArrayRef> = self.cells.iter_mut().map(CellBuilder::finish).collect();
        RecordBatch::try_new(schema::table_schema(), columns).context("assembling record batch")
    }
}

/// Create the `electric_cars` table and load `path` into it, returning the
/// number of rows inserted. Missing fields are recorded as the zero
/// default; a malformed record or an uncoercible field aborts the load.
#[tracing::instrument(level = "info", skip(session, path), fields(path = %path.as_ref().display()))]
pub async fn load_csv(session: &Session, path: impl AsRef<Path>) -> Result<u64> {
    let table = schema::create_table(session)?;

    let file = File::open(path.as_ref())
        .with_context(|| format!("opening `{}`", path.as_ref().display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let mut builders = BatchBuilders::new();
    let mut total: u64 = 0;

    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result.with_context(|| format!("reading CSV record {row}"))?;
        if record.len() != COLUMNS.len() {
            bail!(
                "CSV record {row} has {} fields, expected {}",
                record.len(),
                COLUMNS.len()
            );
        }
        builders.append_record(&record, row)?;
        total += 1;

        if builders.rows >= BATCH_ROWS {
            session.append_batch(table, builders.finish_batch()?).await?;
        }
    }
    if builders.rows > 0 {
        session.append_batch(table, builders.finish_batch()?).await?;
    }

    info!(rows = total, table, "load complete");
    Ok(total)
}

use anyhow::{Context, Result};
use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use datafusion::catalog::memory::MemTable;
use datafusion::dataframe::{DataFrame, DataFrameWriteOptions};
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::debug;

/// An in-memory analytical session. Every table registered in it lives
/// exactly as long as the session value; dropping it on any exit path
/// releases everything, so there is nothing to leak on failures.
pub struct Session {
    ctx: SessionContext,
}

impl Session {
    /// Open a fresh session with an empty catalog.
    pub fn open() -> Self {
        debug!("session opened");
        Self {
            ctx: SessionContext::new(),
        }
    }

    /// Whether `table` is registered in this session's catalog.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.ctx
            .table_exist(table)
            .with_context(|| format!("looking up `{table}` in the session catalog"))
    }

    /// Register an empty in-memory table under `table` with the given schema.
    /// Rows arrive later through [`Session::append_batch`].
    pub fn create_empty_table(&self, table: &str, schema: SchemaRef) -> Result<()> {
        // One empty partition: appends land there and scans preserve
        // their arrival order.
        let provider = MemTable::try_new(schema, vec![vec![]])
            .with_context(|| format!("building in-memory table `{table}`"))?;
        self.ctx
            .register_table(table, Arc::new(provider))
            .with_context(|| format!("registering table `{table}`"))?;
        Ok(())
    }

    /// Append one batch of rows to `table`. The batch schema must match the
    /// schema the table was created with.
    pub async fn append_batch(&self, table: &str, batch: RecordBatch) -> Result<()> {
        let rows = batch.num_rows();
        self.ctx
            .read_batch(batch)
            .context("staging batch for insert")?
            .write_table(table, DataFrameWriteOptions::new())
            .await
            .with_context(|| format!("inserting {rows} rows into `{table}`"))?;
        debug!(rows, table, "batch appended");
        Ok(())
    }

    /// Plan one SQL statement and hand back the lazy result frame.
    pub async fn sql(&self, query: &str) -> Result<DataFrame> {
        self.ctx
            .sql(query)
            .await
            .with_context(|| format!("executing `{query}`"))
    }

    /// Release the session and every table it holds.
    pub fn close(self) {
        debug!("session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn two_row_batch(schema: &SchemaRef) -> RecordBatch {
        RecordBatch::try_new(
            Arc::clone(schema),
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["a", "b"])),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_append_query_roundtrip() -> Result<()> {
        let session = Session::open();
        let schema: SchemaRef = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, true),
            Field::new("name", DataType::Utf8, true),
        ]));

        assert!(!session.table_exists("widgets")?);
        session.create_empty_table("widgets", Arc::clone(&schema))?;
        assert!(session.table_exists("widgets")?);

        session.append_batch("widgets", two_row_batch(&schema)).await?;
        session.append_batch("widgets", two_row_batch(&schema)).await?;

        let batches = session
            .sql("SELECT COUNT(*) AS n FROM widgets")
            .await?
            .collect()
            .await?;
        let n = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .unwrap()
            .value(0);
        assert_eq!(n, 4);

        session.close();
        Ok(())
    }

    #[tokio::test]
    async fn query_against_missing_table_fails() {
        let session = Session::open();
        let result = session.sql("SELECT * FROM nowhere").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_table_scans_as_zero_rows() -> Result<()> {
        let session = Session::open();
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new(
            "id",
            DataType::Int32,
            true,
        )]));
        session.create_empty_table("empty", schema)?;

        let batches = session.sql("SELECT * FROM empty").await?.collect().await?;
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 0);
        Ok(())
    }
}

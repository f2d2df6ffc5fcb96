use crate::engine::Session;
use anyhow::{bail, Result};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

/// Name of the one table every load and report runs against.
pub const TABLE_NAME: &str = "electric_cars";

/// Declared type of a column, mapped onto Arrow when the schema is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int,
    BigInt,
}

impl ColumnType {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnType::Text => DataType::Utf8,
            ColumnType::Int => DataType::Int32,
            ColumnType::BigInt => DataType::Int64,
        }
    }
}

/// A single column definition of the registration table.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

/// The 17 columns of the dataset, in CSV column order. Loader coercion,
/// the Arrow schema, and every query key off this table.
pub const COLUMNS: [Column; 17] = [
    // the source publishes only the first 10 characters of each VIN
    Column { name: "vin", ty: ColumnType::Text },
    Column { name: "county", ty: ColumnType::Text },
    Column { name: "city", ty: ColumnType::Text },
    Column { name: "state", ty: ColumnType::Text },
    Column { name: "postal_code", ty: ColumnType::Int },
    Column { name: "model_year", ty: ColumnType::Int },
    Column { name: "make", ty: ColumnType::Text },
    Column { name: "model", ty: ColumnType::Text },
    Column { name: "electric_vehicle_type", ty: ColumnType::Text },
    Column { name: "cafv_eligibility", ty: ColumnType::Text },
    Column { name: "electric_range", ty: ColumnType::Int },
    Column { name: "base_msrp", ty: ColumnType::Int },
    Column { name: "legislative_district", ty: ColumnType::Int },
    Column { name: "dol_vehicle_id", ty: ColumnType::Int },
    Column { name: "vehicle_location", ty: ColumnType::Text },
    Column { name: "electric_utility", ty: ColumnType::Text },
    // census tracts are 11-digit GEOIDs, too wide for Int32
    Column { name: "census_tract", ty: ColumnType::BigInt },
];

static ARROW_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let fields: Vec<Field> = COLUMNS
        .iter()
        .map(|col| Field::new(col.name, col.ty.data_type(), true))
        .collect();
    Arc::new(Schema::new(fields))
});

/// The Arrow schema shared by the table, the loader and the writers.
pub fn table_schema() -> SchemaRef {
    Arc::clone(&ARROW_SCHEMA)
}

/// Create the empty `electric_cars` table in `session` and return its name
/// as the handle downstream steps query against. Errors if the table
/// already exists.
pub fn create_table(session: &Session) -> Result<&'static str> {
    if session.table_exists(TABLE_NAME)? {
        bail!("table `{TABLE_NAME}` already exists in this session");
    }
    session.create_empty_table(TABLE_NAME, table_schema())?;
    debug!(table = TABLE_NAME, columns = COLUMNS.len(), "table created");
    Ok(TABLE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_matches_column_table() {
        let schema = table_schema();
        assert_eq!(schema.fields().len(), 17);
        for (field, col) in schema.fields().iter().zip(COLUMNS.iter()) {
            assert_eq!(field.name(), col.name);
            assert_eq!(field.data_type(), &col.ty.data_type());
            assert!(field.is_nullable());
        }
    }

    #[test]
    fn census_tract_is_widened() {
        let schema = table_schema();
        let field = schema.field_with_name("census_tract").unwrap();
        assert_eq!(field.data_type(), &DataType::Int64);
        // every other integer column stays Int32
        for name in [
            "postal_code",
            "model_year",
            "electric_range",
            "base_msrp",
            "legislative_district",
            "dol_vehicle_id",
        ] {
            let field = schema.field_with_name(name).unwrap();
            assert_eq!(field.data_type(), &DataType::Int32);
        }
    }

    #[test]
    fn create_table_returns_handle() -> Result<()> {
        let session = Session::open();
        let handle = create_table(&session)?;
        assert_eq!(handle, TABLE_NAME);
        assert!(session.table_exists(TABLE_NAME)?);
        Ok(())
    }

    #[test]
    fn duplicate_create_fails() -> Result<()> {
        let session = Session::open();
        create_table(&session)?;
        let err = create_table(&session).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        Ok(())
    }
}

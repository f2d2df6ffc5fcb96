use crate::engine::Session;
use anyhow::Result;
use datafusion::prelude::DataFrame;

/// Vehicle counts per (model_year, city) pair.
pub async fn count_cars_by_city(session: &Session) -> Result<DataFrame> {
    session
        .sql(
            "SELECT model_year, city, COUNT(*) AS car_count \
             FROM electric_cars GROUP BY model_year, city",
        )
        .await
}

/// The three models with the most registrations, busiest first.
/// Ties at the cut-off are resolved arbitrarily.
pub async fn top_3_models(session: &Session) -> Result<DataFrame> {
    session
        .sql(
            "SELECT model, COUNT(*) AS car_count \
             FROM electric_cars GROUP BY model \
             ORDER BY car_count DESC LIMIT 3",
        )
        .await
}

/// Registration counts per (postal_code, model) pair. The outer grouping
/// keys on model as well as postal_code, so every pair from the inner
/// count survives into the result, one row each, rather than a single
/// winning model per postal code.
pub async fn top_model_by_postal_code(session: &Session) -> Result<DataFrame> {
    session
        .sql(
            "SELECT postal_code, model, MAX(car_count) AS max_car_count \
             FROM ( \
                 SELECT postal_code, model, COUNT(*) AS car_count \
                 FROM electric_cars \
                 GROUP BY postal_code, model \
             ) t \
             GROUP BY postal_code, model",
        )
        .await
}

/// Vehicle counts per model year.
pub async fn count_cars_by_year(session: &Session) -> Result<DataFrame> {
    session
        .sql(
            "SELECT model_year, COUNT(*) AS car_count \
             FROM electric_cars GROUP BY model_year",
        )
        .await
}

/// Every column of every registration with the given model year. Years
/// absent from the data yield an empty frame that still carries the full
/// table schema.
pub async fn extract_year(session: &Session, year: i32) -> Result<DataFrame> {
    session
        .sql(&format!(
            "SELECT * FROM electric_cars WHERE model_year = {year}"
        ))
        .await
}

pub mod engine;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod schema;

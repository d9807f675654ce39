// Source trait for raw dataset access
use crate::domain::raw_table::RawTable;
use async_trait::async_trait;

#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Human-readable identity of the source (e.g. the file path)
    fn describe(&self) -> String;

    /// Load the full table as stored, with whatever column names it has
    async fn load_raw(&self) -> anyhow::Result<RawTable>;
}

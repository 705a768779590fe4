use async_trait::async_trait;

use crate::model::{HistoryRecord, WardrobeItem};

/// Source of the owned garments.
#[async_trait]
pub trait WardrobeStore: Send + Sync {
    async fn wardrobe(&self) -> anyhow::Result<Vec<WardrobeItem>>;
}

/// Append-only log of what was worn each day.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Every stored record. A store with no history yet returns an empty list.
    /// Reading never writes; any setup the store needs happens on `append`.
    async fn history(&self) -> anyhow::Result<Vec<HistoryRecord>>;

    /// Add one record after the existing ones. Never rewrites earlier rows.
    async fn append(&self, record: &HistoryRecord) -> anyhow::Result<()>;
}

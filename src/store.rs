// src/store.rs
// Persistence adapter contract. The real schema lives with the capture
// service; this crate only consumes the three calls the pipeline needs.

use crate::types::ContentItem;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A persisted category assignment, as the adapter records it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAssignment {
    pub item_id: i64,
    pub category: String,
    pub confidence: u8,
    pub user_confirmed: bool,
}

/// Adapter over the capture service's persistence layer.
///
/// All writes return `Ok(true)` on success and `Ok(false)` when the store
/// rejected the write (e.g. the item no longer exists); `Err` is reserved for
/// transport-level failures. The pipeline never retries — a failed write
/// leaves the item unclassified and safely reprocessable.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn add_category_assignment(
        &self,
        item_id: i64,
        category: &str,
        confidence: u8,
        user_confirmed: bool,
    ) -> Result<bool>;

    async fn update_embedding(&self, item_id: i64, vector: &[f32]) -> Result<bool>;

    async fn fetch_unclassified_items(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> Result<Vec<ContentItem>>;
}

/// In-memory store used by the CLI dry-run mode and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    items: Vec<ContentItem>,
    assignments: Vec<CategoryAssignment>,
    embeddings: HashMap<i64, Vec<f32>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed an unclassified item (save-path stand-in)
    pub async fn insert_item(&self, item: ContentItem) {
        self.inner.write().await.items.push(item);
    }

    pub async fn assignments(&self) -> Vec<CategoryAssignment> {
        self.inner.read().await.assignments.clone()
    }

    pub async fn assignments_for(&self, item_id: i64) -> Vec<CategoryAssignment> {
        self.inner
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.item_id == item_id)
            .cloned()
            .collect()
    }

    pub async fn embedding_for(&self, item_id: i64) -> Option<Vec<f32>> {
        self.inner.read().await.embeddings.get(&item_id).cloned()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add_category_assignment(
        &self,
        item_id: i64,
        category: &str,
        confidence: u8,
        user_confirmed: bool,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.assignments.push(CategoryAssignment {
            item_id,
            category: category.to_string(),
            confidence,
            user_confirmed,
        });
        Ok(true)
    }

    async fn update_embedding(&self, item_id: i64, vector: &[f32]) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.embeddings.insert(item_id, vector.to_vec());
        Ok(true)
    }

    async fn fetch_unclassified_items(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        let inner = self.inner.read().await;
        let classified: std::collections::HashSet<i64> =
            inner.assignments.iter().map(|a| a.item_id).collect();
        Ok(inner
            .items
            .iter()
            .filter(|i| i.owner_id == owner_id && !classified.contains(&i.id))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKind;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store
            .insert_item(ContentItem::new(1, 7, ItemKind::Note, "buy milk"))
            .await;
        store
            .insert_item(ContentItem::new(2, 7, ItemKind::Link, "watch later"))
            .await;

        let unclassified = store.fetch_unclassified_items(7, 10).await.unwrap();
        assert_eq!(unclassified.len(), 2);

        assert!(store
            .add_category_assignment(1, "todo", 97, false)
            .await
            .unwrap());

        // Item 1 is now classified and drops out of the unclassified query
        let unclassified = store.fetch_unclassified_items(7, 10).await.unwrap();
        assert_eq!(unclassified.len(), 1);
        assert_eq!(unclassified[0].id, 2);

        store.update_embedding(1, &[0.1, 0.2]).await.unwrap();
        assert_eq!(store.embedding_for(1).await, Some(vec![0.1, 0.2]));
        assert!(store.embedding_for(2).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_respects_owner_and_limit() {
        let store = MemoryStore::new();
        for id in 0..5 {
            store
                .insert_item(ContentItem::new(id, 7, ItemKind::Note, "x"))
                .await;
        }
        store
            .insert_item(ContentItem::new(99, 8, ItemKind::Note, "other owner"))
            .await;

        let items = store.fetch_unclassified_items(7, 3).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.owner_id == 7));
    }
}

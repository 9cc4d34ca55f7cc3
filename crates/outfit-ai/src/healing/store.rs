use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::wardrobe::domain::{ClothingItem, CoreCategory, FormalityLevel, ItemId, UserId};
use crate::wardrobe::keywords::contains_phrase;
use crate::wardrobe::normalizer::normalize_wardrobe;

/// Constraint filter pushed down to the item store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub excluded_ids: BTreeSet<ItemId>,
    pub excluded_materials: BTreeSet<String>,
    pub min_formality: Option<FormalityLevel>,
    pub max_formality: Option<FormalityLevel>,
}

impl ItemFilter {
    pub fn excluding<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.excluded_ids.extend(ids);
        self
    }

    pub fn within(mut self, min: FormalityLevel, max: FormalityLevel) -> Self {
        self.min_formality = Some(min);
        self.max_formality = Some(max);
        self
    }

    pub fn without_materials<I>(mut self, materials: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.excluded_materials.extend(materials);
        self
    }

    pub fn admits(&self, item: &ClothingItem) -> bool {
        if self.excluded_ids.contains(&item.id) {
            return false;
        }
        let level = item.formality();
        if self.min_formality.map_or(false, |min| level < min) {
            return false;
        }
        if self.max_formality.map_or(false, |max| level > max) {
            return false;
        }
        match item.material() {
            Some(material) => !self
                .excluded_materials
                .iter()
                .any(|excluded| contains_phrase(material, excluded)),
            None => true,
        }
    }
}

/// Read-only wardrobe lookups; the only suspension point of a generation.
///
/// Implementations return normalized items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn query_items(
        &self,
        user: &UserId,
        category: Option<CoreCategory>,
        filter: &ItemFilter,
    ) -> Result<Vec<ClothingItem>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no wardrobe found for user {0}")]
    UnknownUser(String),
    #[error("item store unavailable: {0}")]
    Unavailable(String),
}

/// Store over a wardrobe supplied inline with the request.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    items: Vec<ClothingItem>,
}

impl SnapshotStore {
    pub fn new(items: Vec<ClothingItem>) -> Self {
        let mut items = normalize_wardrobe(items);
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemStore for SnapshotStore {
    async fn query_items(
        &self,
        _user: &UserId,
        category: Option<CoreCategory>,
        filter: &ItemFilter,
    ) -> Result<Vec<ClothingItem>, StoreError> {
        Ok(self
            .items
            .iter()
            .filter(|item| category.map_or(true, |wanted| item.category() == wanted))
            .filter(|item| filter.admits(item))
            .cloned()
            .collect())
    }
}

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::wardrobe::domain::{ClothingItem, CoreCategory, FormalityLevel, ItemId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("{category} already holds {limit} item(s)")]
    CategoryFull { category: CoreCategory, limit: usize },
    #[error("a dress cannot be combined with separate tops or bottoms")]
    DressConflict,
    #[error("item {0} is already part of the outfit")]
    DuplicateItem(ItemId),
}

/// Category to item mapping. Every change produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outfit {
    items: BTreeMap<CoreCategory, Vec<ClothingItem>>,
    score: f32,
}

impl Outfit {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build without composition checks; validators report any violations.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ClothingItem>,
    {
        let mut grouped: BTreeMap<CoreCategory, Vec<ClothingItem>> = BTreeMap::new();
        for item in items {
            grouped.entry(item.category()).or_default().push(item);
        }
        Self {
            items: grouped,
            score: 0.0,
        }
    }

    /// Add an item, enforcing the per-category cap and dress exclusivity.
    pub fn try_with_item(
        &self,
        item: ClothingItem,
        limits: &BTreeMap<CoreCategory, usize>,
    ) -> Result<Outfit, CompositionError> {
        if self.contains(&item.id) {
            return Err(CompositionError::DuplicateItem(item.id));
        }

        let category = item.category();
        let limit = limits.get(&category).copied().unwrap_or(1);
        if self.count(category) >= limit {
            return Err(CompositionError::CategoryFull { category, limit });
        }

        let separates = self.count(CoreCategory::Tops) + self.count(CoreCategory::Bottoms) > 0;
        match category {
            CoreCategory::Dress if separates => return Err(CompositionError::DressConflict),
            CoreCategory::Tops | CoreCategory::Bottoms if self.has_dress() => {
                return Err(CompositionError::DressConflict)
            }
            _ => {}
        }

        let mut next = self.clone();
        next.items.entry(category).or_default().push(item);
        Ok(next)
    }

    pub fn without(&self, ids: &BTreeSet<ItemId>) -> Outfit {
        Outfit::from_items(self.items().filter(|item| !ids.contains(&item.id)).cloned())
            .with_score(self.score)
    }

    pub fn with_score(mut self, score: f32) -> Outfit {
        self.score = score;
        self
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// Items in category order.
    pub fn items(&self) -> impl Iterator<Item = &ClothingItem> {
        self.items.values().flatten()
    }

    pub fn into_items(self) -> Vec<ClothingItem> {
        self.items.into_values().flatten().collect()
    }

    pub fn in_category(&self, category: CoreCategory) -> &[ClothingItem] {
        self.items
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, category: CoreCategory) -> usize {
        self.in_category(category).len()
    }

    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn has_dress(&self) -> bool {
        self.count(CoreCategory::Dress) > 0
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items().any(|item| &item.id == id)
    }

    pub fn item_ids(&self) -> BTreeSet<ItemId> {
        self.items().map(|item| item.id.clone()).collect()
    }

    pub fn categories(&self) -> Vec<CoreCategory> {
        self.items
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, _)| *category)
            .collect()
    }

    pub fn formality_levels(&self) -> BTreeSet<FormalityLevel> {
        self.items().map(ClothingItem::formality).collect()
    }

    pub fn find(&self, id: &ItemId) -> Option<&ClothingItem> {
        self.items().find(|item| &item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styling::rules::StylingRules;
    use crate::wardrobe::domain::{ItemMetadata, UserId};

    fn item(id: &str, category: CoreCategory) -> ClothingItem {
        ClothingItem {
            id: ItemId(id.to_string()),
            name: id.to_string(),
            item_type: String::new(),
            owner_id: UserId("user-1".to_string()),
            metadata: ItemMetadata {
                core_category: Some(category),
                ..ItemMetadata::default()
            },
        }
    }

    #[test]
    fn dress_and_separates_are_exclusive() {
        let limits = StylingRules::default().category_limits;
        let with_dress = Outfit::empty()
            .try_with_item(item("dress", CoreCategory::Dress), &limits)
            .expect("dress fits");
        assert_eq!(
            with_dress.try_with_item(item("top", CoreCategory::Tops), &limits),
            Err(CompositionError::DressConflict)
        );

        let with_top = Outfit::empty()
            .try_with_item(item("top", CoreCategory::Tops), &limits)
            .expect("top fits");
        assert_eq!(
            with_top.try_with_item(item("dress", CoreCategory::Dress), &limits),
            Err(CompositionError::DressConflict)
        );
    }

    #[test]
    fn caps_are_enforced_per_category() {
        let limits = StylingRules::default().category_limits;
        let outfit = Outfit::empty()
            .try_with_item(item("shoe-a", CoreCategory::Shoes), &limits)
            .expect("first shoe fits");
        assert!(matches!(
            outfit.try_with_item(item("shoe-b", CoreCategory::Shoes), &limits),
            Err(CompositionError::CategoryFull { limit: 1, .. })
        ));
    }
}

use std::collections::BTreeSet;

use super::domain::{ClothingItem, CoreCategory, FormalityLevel, NormalizedTags, VisualAttributes};
use super::keywords::{
    category_for_text, contains_any, formality_for_text, material_for_text, normalize_tag,
    LAYERING_KEYWORDS, OCCASION_TAG_FORMALITY, SWEATER_FAMILY,
};

/// Where the resolved category came from, for debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    Metadata,
    WearLayer,
    DeclaredType,
    NameKeyword,
    Fallback,
}

/// Resolve the canonical category without applying overrides.
pub fn infer_category(item: &ClothingItem) -> (CoreCategory, CategorySource) {
    if let Some(category) = item.metadata.core_category {
        return (category, CategorySource::Metadata);
    }

    if let Some(layer) = item.attributes().and_then(|attrs| attrs.wear_layer) {
        return (layer.implied_category(), CategorySource::WearLayer);
    }

    if let Some(category) = category_for_text(&item.item_type) {
        return (category, CategorySource::DeclaredType);
    }

    if let Some(category) = category_for_text(&item.name) {
        return (category, CategorySource::NameKeyword);
    }

    (CoreCategory::Accessories, CategorySource::Fallback)
}

// Overrides chain bottoms -> tops -> outerwear, so the output is a fixed point.
fn apply_overrides(item: &ClothingItem, category: CoreCategory) -> CoreCategory {
    let mut category = category;

    // Declared type keywords beat a conflicting coarse bottoms flag.
    if category == CoreCategory::Bottoms && contains_any(&item.item_type, SWEATER_FAMILY) {
        category = CoreCategory::Tops;
    }

    if category == CoreCategory::Tops && contains_any(&item.name, LAYERING_KEYWORDS) {
        category = CoreCategory::Outerwear;
    }

    category
}

fn normalize_tags(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|value| normalize_tag(value))
        .filter(|value| !value.is_empty())
        .collect()
}

fn infer_formality(item: &ClothingItem, occasion_tags: &BTreeSet<String>) -> FormalityLevel {
    if let Some(level) = formality_for_text(&item.search_text()) {
        return level;
    }

    OCCASION_TAG_FORMALITY
        .iter()
        .find(|(tag, _)| occasion_tags.contains(*tag))
        .map(|(_, level)| *level)
        .unwrap_or(FormalityLevel::SmartCasual)
}

/// Map raw item metadata onto the canonical taxonomy.
///
/// Deterministic and idempotent: feeding the output back in yields the same
/// item.
pub fn normalize_item(item: ClothingItem) -> ClothingItem {
    let (category, _) = infer_category(&item);
    let category = apply_overrides(&item, category);

    let normalized = NormalizedTags {
        occasion: normalize_tags(&item.metadata.occasion),
        style: normalize_tags(&item.metadata.style),
        mood: normalize_tags(&item.metadata.mood),
        season: normalize_tags(&item.metadata.season),
    };

    let mut attributes: VisualAttributes = item.attributes().cloned().unwrap_or_default();
    if attributes.wear_layer.is_none() {
        attributes.wear_layer = Some(category.default_layer());
    }
    if attributes.formal_level.is_none() {
        attributes.formal_level = Some(infer_formality(&item, &normalized.occasion));
    }
    if attributes.material.is_none() {
        attributes.material = material_for_text(&item.search_text()).map(str::to_string);
    } else {
        attributes.material = attributes.material.as_deref().map(normalize_tag);
    }

    let mut normalized_item = item;
    normalized_item.metadata.core_category = Some(category);
    normalized_item.metadata.visual_attributes = Some(attributes);
    normalized_item.metadata.normalized = Some(normalized);
    normalized_item.metadata.colors = normalized_item
        .metadata
        .colors
        .iter()
        .map(|color| normalize_tag(color))
        .filter(|color| !color.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    normalized_item
}

pub fn normalize_wardrobe(items: Vec<ClothingItem>) -> Vec<ClothingItem> {
    items.into_iter().map(normalize_item).collect()
}

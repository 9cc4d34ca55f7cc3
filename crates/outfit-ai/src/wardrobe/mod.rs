//! Wardrobe domain model and ingestion-time normalization.

pub mod domain;
pub mod import;
pub mod keywords;
pub mod normalizer;

pub use domain::{
    ClothingItem, CoreCategory, FabricWeight, FormalityLevel, ItemId, ItemMetadata,
    NormalizedTags, OutfitContext, StylePreferences, TemperatureBand, UserId, UserProfile,
    VisualAttributes, WearLayer, Weather,
};
pub use import::{WardrobeImportError, WardrobeImporter};
pub use normalizer::{infer_category, normalize_item, normalize_wardrobe, CategorySource};

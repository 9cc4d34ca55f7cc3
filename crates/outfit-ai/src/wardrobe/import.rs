use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{
    ClothingItem, CoreCategory, FormalityLevel, ItemId, ItemMetadata, UserId, VisualAttributes,
};

#[derive(Debug, thiserror::Error)]
pub enum WardrobeImportError {
    #[error("failed to read wardrobe export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid wardrobe CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unknown formality '{value}'")]
    Formality { row: usize, value: String },
}

/// Reads flat CSV wardrobe exports into raw (un-normalized) items.
pub struct WardrobeImporter;

impl WardrobeImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        owner: &UserId,
    ) -> Result<Vec<ClothingItem>, WardrobeImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, owner)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        owner: &UserId,
    ) -> Result<Vec<ClothingItem>, WardrobeImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut items = Vec::new();

        for (index, record) in csv_reader.deserialize::<WardrobeRow>().enumerate() {
            let row = record?;
            items.push(row.into_item(index + 1, owner)?);
        }

        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct WardrobeRow {
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    material: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    formality: Option<String>,
    #[serde(default)]
    colors: String,
    #[serde(default)]
    occasion: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    mood: String,
    #[serde(default)]
    season: String,
}

impl WardrobeRow {
    fn into_item(self, row: usize, owner: &UserId) -> Result<ClothingItem, WardrobeImportError> {
        let formal_level = match self.formality {
            Some(value) => Some(parse_formality(&value).ok_or_else(|| {
                WardrobeImportError::Formality {
                    row,
                    value: value.clone(),
                }
            })?),
            None => None,
        };

        let visual_attributes = if formal_level.is_some() || self.material.is_some() {
            Some(VisualAttributes {
                formal_level,
                material: self.material,
                ..VisualAttributes::default()
            })
        } else {
            None
        };

        Ok(ClothingItem {
            id: ItemId(self.id),
            name: self.name,
            item_type: self.item_type,
            owner_id: owner.clone(),
            metadata: ItemMetadata {
                core_category: self.category.as_deref().and_then(CoreCategory::from_label),
                visual_attributes,
                occasion: split_list(&self.occasion),
                style: split_list(&self.style),
                mood: split_list(&self.mood),
                season: split_list(&self.season),
                colors: split_list(&self.colors),
                normalized: None,
            },
        })
    }
}

fn parse_formality(value: &str) -> Option<FormalityLevel> {
    match value.trim().parse::<u8>() {
        Ok(rank) if rank <= 4 => Some(FormalityLevel::from_rank(rank)),
        Ok(_) => None,
        Err(_) => FormalityLevel::from_label(value),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

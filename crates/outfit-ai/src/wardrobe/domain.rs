use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::styling::rules::StylingRules;

/// Identifier wrapper for wardrobe items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the owning user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Canonical garment category. Every normalized item resolves to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreCategory {
    Tops,
    Bottoms,
    Dress,
    Shoes,
    Outerwear,
    Accessories,
}

impl CoreCategory {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Tops,
            Self::Bottoms,
            Self::Dress,
            Self::Shoes,
            Self::Outerwear,
            Self::Accessories,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tops => "tops",
            Self::Bottoms => "bottoms",
            Self::Dress => "dress",
            Self::Shoes => "shoes",
            Self::Outerwear => "outerwear",
            Self::Accessories => "accessories",
        }
    }

    /// Layer assumed when the item carries no explicit wear layer.
    pub const fn default_layer(self) -> WearLayer {
        match self {
            Self::Tops | Self::Dress => WearLayer::Base,
            Self::Bottoms => WearLayer::Bottom,
            Self::Shoes => WearLayer::Footwear,
            Self::Outerwear => WearLayer::Outer,
            Self::Accessories => WearLayer::Accessory,
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tops" | "top" => Some(Self::Tops),
            "bottoms" | "bottom" => Some(Self::Bottoms),
            "dress" | "dresses" => Some(Self::Dress),
            "shoes" | "shoe" | "footwear" => Some(Self::Shoes),
            "outerwear" => Some(Self::Outerwear),
            "accessories" | "accessory" => Some(Self::Accessories),
            _ => None,
        }
    }
}

impl fmt::Display for CoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical position of a garment in a layered outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WearLayer {
    Base,
    Inner,
    Mid,
    Outer,
    Bottom,
    Footwear,
    Accessory,
}

impl WearLayer {
    /// Category implied by a layer when no category was declared.
    pub const fn implied_category(self) -> CoreCategory {
        match self {
            Self::Base | Self::Inner | Self::Mid => CoreCategory::Tops,
            Self::Outer => CoreCategory::Outerwear,
            Self::Bottom => CoreCategory::Bottoms,
            Self::Footwear => CoreCategory::Shoes,
            Self::Accessory => CoreCategory::Accessories,
        }
    }

    /// Layers that count toward torso layering.
    pub const fn is_torso_layer(self) -> bool {
        matches!(self, Self::Base | Self::Inner | Self::Mid | Self::Outer)
    }
}

/// Formality rank from casual (0) to black-tie (4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormalityLevel {
    Casual,
    SmartCasual,
    BusinessCasual,
    Business,
    BlackTie,
}

impl FormalityLevel {
    pub const fn rank(self) -> u8 {
        match self {
            Self::Casual => 0,
            Self::SmartCasual => 1,
            Self::BusinessCasual => 2,
            Self::Business => 3,
            Self::BlackTie => 4,
        }
    }

    pub const fn from_rank(rank: u8) -> Self {
        match rank {
            0 => Self::Casual,
            1 => Self::SmartCasual,
            2 => Self::BusinessCasual,
            3 => Self::Business,
            _ => Self::BlackTie,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::SmartCasual => "smart casual",
            Self::BusinessCasual => "business casual",
            Self::Business => "business",
            Self::BlackTie => "black tie",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let folded = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match folded.as_str() {
            "casual" => Some(Self::Casual),
            "smart casual" => Some(Self::SmartCasual),
            "business casual" => Some(Self::BusinessCasual),
            "business" | "formal" => Some(Self::Business),
            "black tie" => Some(Self::BlackTie),
            _ => None,
        }
    }

    pub const fn distance(self, other: Self) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub const fn saturating_sub(self, steps: u8) -> Self {
        Self::from_rank(self.rank().saturating_sub(steps))
    }

    pub const fn saturating_add(self, steps: u8) -> Self {
        Self::from_rank(self.rank().saturating_add(steps))
    }
}

impl<'de> Deserialize<'de> for FormalityLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawFormality {
            Rank(u8),
            Label(String),
        }

        match RawFormality::deserialize(deserializer)? {
            RawFormality::Rank(rank) if rank <= 4 => Ok(Self::from_rank(rank)),
            RawFormality::Rank(rank) => Err(serde::de::Error::custom(format!(
                "formality rank {rank} outside 0-4"
            ))),
            RawFormality::Label(label) => Self::from_label(&label).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown formality level '{label}'"))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FabricWeight {
    Light,
    Medium,
    Heavy,
}

/// Structured visual metadata attached by upstream image analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualAttributes {
    pub wear_layer: Option<WearLayer>,
    pub sleeve_length: Option<String>,
    pub fit: Option<String>,
    pub pattern: Option<String>,
    pub formal_level: Option<FormalityLevel>,
    pub fabric_weight: Option<FabricWeight>,
    pub material: Option<String>,
    pub silhouette: Option<String>,
    pub length: Option<String>,
    pub texture_style: Option<String>,
    pub gender_target: Option<String>,
}

/// Lower-cased, de-duplicated tag sets produced by normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedTags {
    pub occasion: BTreeSet<String>,
    pub style: BTreeSet<String>,
    pub mood: BTreeSet<String>,
    pub season: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMetadata {
    pub core_category: Option<CoreCategory>,
    pub visual_attributes: Option<VisualAttributes>,
    pub occasion: Vec<String>,
    pub style: Vec<String>,
    pub mood: Vec<String>,
    pub season: Vec<String>,
    pub colors: Vec<String>,
    pub normalized: Option<NormalizedTags>,
}

/// A single garment owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingItem {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

impl ClothingItem {
    /// Category after normalization; un-normalized items fall back to accessories.
    pub fn category(&self) -> CoreCategory {
        self.metadata
            .core_category
            .unwrap_or(CoreCategory::Accessories)
    }

    pub fn attributes(&self) -> Option<&VisualAttributes> {
        self.metadata.visual_attributes.as_ref()
    }

    pub fn formality(&self) -> FormalityLevel {
        self.attributes()
            .and_then(|attrs| attrs.formal_level)
            .unwrap_or(FormalityLevel::SmartCasual)
    }

    pub fn wear_layer(&self) -> WearLayer {
        self.attributes()
            .and_then(|attrs| attrs.wear_layer)
            .unwrap_or_else(|| self.category().default_layer())
    }

    pub fn material(&self) -> Option<&str> {
        self.attributes().and_then(|attrs| attrs.material.as_deref())
    }

    pub fn tags(&self) -> NormalizedTags {
        self.metadata.normalized.clone().unwrap_or_default()
    }

    /// Lower-cased `name type` text used by keyword matchers.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.name, self.item_type).to_lowercase()
    }

    /// Whether the item counts as heavy under the configured material set.
    pub fn is_heavy(&self, rules: &StylingRules) -> bool {
        let heavy_weight = self
            .attributes()
            .and_then(|attrs| attrs.fabric_weight)
            .map(|weight| weight == FabricWeight::Heavy)
            .unwrap_or(false);
        heavy_weight
            || self
                .material()
                .map(|material| rules.is_heavy_material(material))
                .unwrap_or(false)
    }

    pub fn is_light(&self, rules: &StylingRules) -> bool {
        let light_weight = self
            .attributes()
            .and_then(|attrs| attrs.fabric_weight)
            .map(|weight| weight == FabricWeight::Light)
            .unwrap_or(false);
        light_weight
            || self
                .material()
                .map(|material| rules.is_light_material(material))
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_f: f32,
    #[serde(default)]
    pub condition: String,
    /// Probability of precipitation in `[0, 1]`.
    #[serde(default)]
    pub precipitation: f32,
}

impl Weather {
    pub fn is_wet(&self) -> bool {
        let condition = self.condition.to_ascii_lowercase();
        self.precipitation >= 0.5
            || ["rain", "snow", "sleet", "storm", "drizzle"]
                .iter()
                .any(|keyword| condition.contains(keyword))
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temperature_f: 68.0,
            condition: "clear".to_string(),
            precipitation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePreferences {
    pub favorite_colors: Vec<String>,
    pub avoided_colors: Vec<String>,
    pub avoided_materials: Vec<String>,
    pub preferred_fit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub body_type: Option<String>,
    pub skin_tone: Option<String>,
    pub gender: Option<String>,
    pub preferences: StylePreferences,
}

/// Situational context for one generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutfitContext {
    pub occasion: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub profile: UserProfile,
    /// Items the user explicitly forced into consideration.
    #[serde(default)]
    pub pinned_items: Vec<ItemId>,
}

impl OutfitContext {
    pub fn formality_level(&self, rules: &StylingRules) -> FormalityLevel {
        rules.formality_for_occasion(&self.occasion)
    }

    pub fn temperature_band(&self, rules: &StylingRules) -> TemperatureBand {
        rules
            .temperature_thresholds
            .band_for(self.weather.temperature_f)
    }

    pub fn is_pinned(&self, id: &ItemId) -> bool {
        self.pinned_items.iter().any(|pinned| pinned == id)
    }
}

/// Temperature band derived from Fahrenheit thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    VeryCold,
    Cold,
    Cool,
    Mild,
    Warm,
    Hot,
}

impl TemperatureBand {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::VeryCold,
            Self::Cold,
            Self::Cool,
            Self::Mild,
            Self::Warm,
            Self::Hot,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryCold => "very cold",
            Self::Cold => "cold",
            Self::Cool => "cool",
            Self::Mild => "mild",
            Self::Warm => "warm",
            Self::Hot => "hot",
        }
    }
}

//! Externally editable tuning tables.
//!
//! Everything the assembler, validators and fallback tiers consult lives here
//! so behavior can be tuned by swapping a JSON document instead of code.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::wardrobe::domain::{ClothingItem, CoreCategory, FormalityLevel, TemperatureBand};
use crate::wardrobe::keywords::{contains_any, contains_phrase, normalize_tag};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read styling rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid styling rules JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("item bounds invalid (min {min}, max {max})")]
    ItemBounds { min: usize, max: usize },
    #[error("category limit for {0} must be at least 1")]
    ZeroCategoryLimit(CoreCategory),
    #[error("temperature thresholds must be strictly descending from hot to cold")]
    UnorderedThresholds,
    #[error("{table} compatibility table contains an empty value")]
    EmptyCompatibilityValue { table: &'static str },
    #[error("scoring weights must be non-negative and sum to a positive value")]
    InvalidWeights,
    #[error("forbidden combination '{0}' has a side that matches nothing")]
    EmptyMatcher(String),
}

/// Fahrenheit lower bounds for each band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThresholds {
    pub hot: f32,
    pub warm: f32,
    pub mild: f32,
    pub cool: f32,
    pub cold: f32,
}

impl TemperatureThresholds {
    pub fn band_for(&self, temperature_f: f32) -> TemperatureBand {
        if temperature_f >= self.hot {
            TemperatureBand::Hot
        } else if temperature_f >= self.warm {
            TemperatureBand::Warm
        } else if temperature_f >= self.mild {
            TemperatureBand::Mild
        } else if temperature_f >= self.cool {
            TemperatureBand::Cool
        } else if temperature_f >= self.cold {
            TemperatureBand::Cold
        } else {
            TemperatureBand::VeryCold
        }
    }

    fn is_ordered(&self) -> bool {
        self.hot > self.warm && self.warm > self.mild && self.mild > self.cool && self.cool > self.cold
    }
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        Self {
            hot: 85.0,
            warm: 70.0,
            mild: 60.0,
            cool: 50.0,
            cold: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayeringRequirement {
    pub min_layers: u8,
    pub outerwear_required: bool,
}

/// Matches one side of a forbidden pair: category (when set) and any keyword
/// (when non-empty) must both hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMatcher {
    #[serde(default)]
    pub category: Option<CoreCategory>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ItemMatcher {
    pub fn matches(&self, item: &ClothingItem) -> bool {
        if let Some(category) = self.category {
            if item.category() != category {
                return false;
            }
        }
        if self.keywords.is_empty() {
            return true;
        }
        let text = item.search_text();
        self.keywords
            .iter()
            .any(|keyword| contains_phrase(&text, keyword))
    }

    fn is_empty(&self) -> bool {
        self.category.is_none() && self.keywords.is_empty()
    }

    fn new(category: Option<CoreCategory>, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenCombination {
    pub name: String,
    pub left: ItemMatcher,
    pub right: ItemMatcher,
    pub reason: String,
}

impl ForbiddenCombination {
    /// True when the two items sit on opposite sides of this pair.
    pub fn violated_by(&self, a: &ClothingItem, b: &ClothingItem) -> bool {
        (self.left.matches(a) && self.right.matches(b))
            || (self.left.matches(b) && self.right.matches(a))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityTables {
    pub style: BTreeMap<String, Vec<String>>,
    pub occasion: BTreeMap<String, Vec<String>>,
    pub mood: BTreeMap<String, Vec<String>>,
    /// Add reverse edges at load time. When false, edges keep the direction
    /// written in the table.
    pub enforce_symmetry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub compatibility: f32,
    pub formality: f32,
    pub weather: f32,
}

impl ScoringWeights {
    pub fn total(&self) -> f32 {
        self.compatibility + self.formality + self.weather
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            compatibility: 0.45,
            formality: 0.35,
            weather: 0.2,
        }
    }
}

/// Candidate matching strategy; the guardrail monitor compares the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Compatibility-graph matching.
    Semantic,
    /// Exact tag matching only.
    Traditional,
}

impl FilterMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Traditional => "traditional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylingRules {
    pub category_limits: BTreeMap<CoreCategory, usize>,
    pub min_items: usize,
    pub max_items: usize,
    pub occasion_formality: BTreeMap<String, FormalityLevel>,
    pub default_formality: FormalityLevel,
    pub temperature_thresholds: TemperatureThresholds,
    pub layering: BTreeMap<TemperatureBand, LayeringRequirement>,
    pub heavy_materials: Vec<String>,
    pub light_materials: Vec<String>,
    pub cold_exposure_keywords: Vec<String>,
    pub wet_weather_sensitive_materials: Vec<String>,
    pub forbidden_combinations: Vec<ForbiddenCombination>,
    pub dressless_occasions: Vec<String>,
    pub compatibility: CompatibilityTables,
    pub scoring: ScoringWeights,
    pub filter_mode: FilterMode,
    pub max_variations: usize,
}

impl StylingRules {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, RulesError> {
        let rules: Self = serde_json::from_str(raw)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        if self.min_items == 0 || self.min_items > self.max_items {
            return Err(RulesError::ItemBounds {
                min: self.min_items,
                max: self.max_items,
            });
        }

        for (category, limit) in &self.category_limits {
            if *limit == 0 {
                return Err(RulesError::ZeroCategoryLimit(*category));
            }
        }

        if !self.temperature_thresholds.is_ordered() {
            return Err(RulesError::UnorderedThresholds);
        }

        let tables = [
            ("style", &self.compatibility.style),
            ("occasion", &self.compatibility.occasion),
            ("mood", &self.compatibility.mood),
        ];
        for (name, table) in tables {
            let has_empty = table.iter().any(|(key, values)| {
                normalize_tag(key).is_empty() || values.iter().any(|v| normalize_tag(v).is_empty())
            });
            if has_empty {
                return Err(RulesError::EmptyCompatibilityValue { table: name });
            }
        }

        let weights = self.scoring;
        if weights.compatibility < 0.0
            || weights.formality < 0.0
            || weights.weather < 0.0
            || weights.total() <= 0.0
        {
            return Err(RulesError::InvalidWeights);
        }

        for combination in &self.forbidden_combinations {
            if combination.left.is_empty() || combination.right.is_empty() {
                return Err(RulesError::EmptyMatcher(combination.name.clone()));
            }
        }

        Ok(())
    }

    pub fn category_limit(&self, category: CoreCategory) -> usize {
        self.category_limits.get(&category).copied().unwrap_or(1)
    }

    pub fn formality_for_occasion(&self, occasion: &str) -> FormalityLevel {
        self.occasion_formality
            .get(&normalize_tag(occasion))
            .copied()
            .unwrap_or(self.default_formality)
    }

    pub fn layering_for(&self, band: TemperatureBand) -> LayeringRequirement {
        self.layering
            .get(&band)
            .copied()
            .unwrap_or(LayeringRequirement {
                min_layers: 1,
                outerwear_required: false,
            })
    }

    pub fn is_heavy_material(&self, material: &str) -> bool {
        self.heavy_materials
            .iter()
            .any(|heavy| contains_phrase(material, heavy))
    }

    pub fn is_light_material(&self, material: &str) -> bool {
        self.light_materials
            .iter()
            .any(|light| contains_phrase(material, light))
    }

    pub fn is_cold_exposure(&self, item: &ClothingItem) -> bool {
        let keywords: Vec<&str> = self
            .cold_exposure_keywords
            .iter()
            .map(String::as_str)
            .collect();
        contains_any(&item.search_text(), &keywords)
    }

    pub fn is_dressless_occasion(&self, occasion: &str) -> bool {
        let occasion = normalize_tag(occasion);
        self.dressless_occasions
            .iter()
            .any(|candidate| normalize_tag(candidate) == occasion)
    }

    /// First forbidden pair violated by the two items, if any.
    pub fn forbidden_between(
        &self,
        a: &ClothingItem,
        b: &ClothingItem,
    ) -> Option<&ForbiddenCombination> {
        self.forbidden_combinations
            .iter()
            .find(|combination| combination.violated_by(a, b))
    }
}

fn string_table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(key, values)| {
            (
                key.to_string(),
                values.iter().map(|value| value.to_string()).collect(),
            )
        })
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for StylingRules {
    fn default() -> Self {
        let category_limits = BTreeMap::from([
            (CoreCategory::Tops, 2),
            (CoreCategory::Bottoms, 1),
            (CoreCategory::Dress, 1),
            (CoreCategory::Shoes, 1),
            (CoreCategory::Outerwear, 1),
            (CoreCategory::Accessories, 2),
        ]);

        // 0-4 scale; casual=0 through black tie=4.
        let occasion_formality = [
            ("athletic", FormalityLevel::Casual),
            ("gym", FormalityLevel::Casual),
            ("workout", FormalityLevel::Casual),
            ("hiking", FormalityLevel::Casual),
            ("beach", FormalityLevel::Casual),
            ("casual", FormalityLevel::Casual),
            ("everyday", FormalityLevel::Casual),
            ("weekend", FormalityLevel::Casual),
            ("errands", FormalityLevel::Casual),
            ("brunch", FormalityLevel::SmartCasual),
            ("date", FormalityLevel::SmartCasual),
            ("party", FormalityLevel::SmartCasual),
            ("night out", FormalityLevel::SmartCasual),
            ("dinner", FormalityLevel::BusinessCasual),
            ("date night", FormalityLevel::BusinessCasual),
            ("business casual", FormalityLevel::BusinessCasual),
            ("work", FormalityLevel::BusinessCasual),
            ("office", FormalityLevel::BusinessCasual),
            ("business", FormalityLevel::Business),
            ("interview", FormalityLevel::Business),
            ("professional", FormalityLevel::Business),
            ("formal", FormalityLevel::Business),
            ("wedding", FormalityLevel::Business),
            ("cocktail", FormalityLevel::Business),
            ("gala", FormalityLevel::BlackTie),
            ("black tie", FormalityLevel::BlackTie),
        ]
        .into_iter()
        .map(|(occasion, level)| (occasion.to_string(), level))
        .collect();

        let layering = BTreeMap::from([
            (
                TemperatureBand::VeryCold,
                LayeringRequirement {
                    min_layers: 3,
                    outerwear_required: true,
                },
            ),
            (
                TemperatureBand::Cold,
                LayeringRequirement {
                    min_layers: 2,
                    outerwear_required: true,
                },
            ),
            (
                TemperatureBand::Cool,
                LayeringRequirement {
                    min_layers: 2,
                    outerwear_required: false,
                },
            ),
            (
                TemperatureBand::Mild,
                LayeringRequirement {
                    min_layers: 1,
                    outerwear_required: false,
                },
            ),
            (
                TemperatureBand::Warm,
                LayeringRequirement {
                    min_layers: 1,
                    outerwear_required: false,
                },
            ),
            (
                TemperatureBand::Hot,
                LayeringRequirement {
                    min_layers: 1,
                    outerwear_required: false,
                },
            ),
        ]);

        let forbidden_combinations = vec![
            ForbiddenCombination {
                name: "tailoring-with-shorts".to_string(),
                left: ItemMatcher::new(None, &["blazer", "suit", "sport coat", "tuxedo"]),
                right: ItemMatcher::new(Some(CoreCategory::Bottoms), &["shorts"]),
                reason: "tailored jackets do not pair with shorts".to_string(),
            },
            ForbiddenCombination {
                name: "formal-shoes-with-casual-bottoms".to_string(),
                left: ItemMatcher::new(
                    Some(CoreCategory::Shoes),
                    &[
                        "oxford",
                        "oxfords",
                        "dress shoes",
                        "dress shoe",
                        "heels",
                        "pumps",
                        "brogues",
                        "derby",
                    ],
                ),
                right: ItemMatcher::new(
                    Some(CoreCategory::Bottoms),
                    &["shorts", "sweatpants", "joggers", "leggings", "track pants"],
                ),
                reason: "formal shoes clash with athletic or lounge bottoms".to_string(),
            },
            ForbiddenCombination {
                name: "athletic-shoes-with-formalwear".to_string(),
                left: ItemMatcher::new(
                    Some(CoreCategory::Shoes),
                    &[
                        "sneaker",
                        "sneakers",
                        "trainers",
                        "running shoes",
                        "flip flops",
                        "slides",
                    ],
                ),
                right: ItemMatcher::new(None, &["tuxedo", "gown", "suit"]),
                reason: "athletic footwear undermines formalwear".to_string(),
            },
            ForbiddenCombination {
                name: "dress-with-top".to_string(),
                left: ItemMatcher::new(Some(CoreCategory::Dress), &[]),
                right: ItemMatcher::new(Some(CoreCategory::Tops), &[]),
                reason: "a dress replaces separate tops".to_string(),
            },
            ForbiddenCombination {
                name: "dress-with-bottom".to_string(),
                left: ItemMatcher::new(Some(CoreCategory::Dress), &[]),
                right: ItemMatcher::new(Some(CoreCategory::Bottoms), &[]),
                reason: "a dress replaces separate bottoms".to_string(),
            },
        ];

        let compatibility = CompatibilityTables {
            style: string_table(&[
                (
                    "classic",
                    &["classic", "preppy", "minimalist", "business", "elegant", "timeless"],
                ),
                (
                    "casual",
                    &["casual", "relaxed", "everyday", "streetwear", "sporty", "comfortable"],
                ),
                ("minimalist", &["minimalist", "classic", "modern", "clean"]),
                ("streetwear", &["streetwear", "urban", "casual", "sporty", "edgy"]),
                ("bohemian", &["bohemian", "boho", "romantic", "vintage", "relaxed"]),
                ("edgy", &["edgy", "grunge", "rock", "streetwear"]),
                ("preppy", &["preppy", "classic", "collegiate"]),
                ("romantic", &["romantic", "feminine", "bohemian", "vintage"]),
                ("sporty", &["sporty", "athletic", "athleisure", "casual", "streetwear"]),
                ("elegant", &["elegant", "classic", "sophisticated", "glamorous"]),
                ("vintage", &["vintage", "retro", "bohemian", "classic"]),
                ("business", &["business", "classic", "professional", "minimalist"]),
            ]),
            occasion: string_table(&[
                ("athletic", &["athletic", "gym", "sport", "workout", "casual", "everyday"]),
                ("casual", &["casual", "everyday", "weekend", "errands", "brunch"]),
                (
                    "business",
                    &["business", "work", "office", "professional", "interview"],
                ),
                (
                    "business casual",
                    &["business casual", "work", "office", "business"],
                ),
                ("formal", &["formal", "wedding", "gala", "black tie", "cocktail"]),
                ("black tie", &["black tie", "formal", "gala"]),
                ("date", &["date", "date night", "dinner", "party", "cocktail"]),
                ("party", &["party", "night out", "cocktail", "date"]),
                ("wedding", &["wedding", "formal", "cocktail"]),
                ("interview", &["interview", "business", "professional"]),
            ]),
            mood: string_table(&[
                ("confident", &["confident", "bold", "powerful", "energetic"]),
                ("relaxed", &["relaxed", "calm", "comfortable", "cozy"]),
                ("bold", &["bold", "confident", "edgy", "playful"]),
                ("romantic", &["romantic", "dreamy", "soft"]),
                ("playful", &["playful", "fun", "energetic", "bold"]),
                ("professional", &["professional", "confident", "polished"]),
                ("cozy", &["cozy", "comfortable", "relaxed"]),
            ]),
            enforce_symmetry: true,
        };

        Self {
            category_limits,
            min_items: 3,
            max_items: 8,
            occasion_formality,
            default_formality: FormalityLevel::SmartCasual,
            temperature_thresholds: TemperatureThresholds::default(),
            layering,
            heavy_materials: strings(&[
                "wool",
                "fleece",
                "down",
                "cashmere",
                "tweed",
                "sherpa",
                "shearling",
                "corduroy",
                "velvet",
            ]),
            light_materials: strings(&[
                "linen",
                "cotton",
                "silk",
                "chiffon",
                "rayon",
                "seersucker",
                "mesh",
                "jersey",
            ]),
            cold_exposure_keywords: strings(&[
                "shorts",
                "sandal",
                "sandals",
                "flip flops",
                "tank top",
                "crop top",
                "slides",
            ]),
            wet_weather_sensitive_materials: strings(&["suede", "canvas", "silk", "velvet"]),
            forbidden_combinations,
            dressless_occasions: strings(&["athletic", "gym", "workout", "hiking"]),
            compatibility,
            scoring: ScoringWeights::default(),
            filter_mode: FilterMode::Semantic,
            max_variations: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_validate() {
        StylingRules::default().validate().expect("defaults are valid");
    }

    #[test]
    fn temperature_bands_follow_thresholds() {
        let thresholds = TemperatureThresholds::default();
        assert_eq!(thresholds.band_for(90.0), TemperatureBand::Hot);
        assert_eq!(thresholds.band_for(85.0), TemperatureBand::Hot);
        assert_eq!(thresholds.band_for(70.0), TemperatureBand::Warm);
        assert_eq!(thresholds.band_for(65.0), TemperatureBand::Mild);
        assert_eq!(thresholds.band_for(50.0), TemperatureBand::Cool);
        assert_eq!(thresholds.band_for(45.0), TemperatureBand::Cold);
        assert_eq!(thresholds.band_for(12.0), TemperatureBand::VeryCold);
    }

    #[test]
    fn occasion_lookup_is_tag_normalized() {
        let rules = StylingRules::default();
        assert_eq!(rules.formality_for_occasion("Black-Tie"), FormalityLevel::BlackTie);
        assert_eq!(rules.formality_for_occasion("athletic"), FormalityLevel::Casual);
        assert_eq!(
            rules.formality_for_occasion("something new"),
            FormalityLevel::SmartCasual
        );
    }

    #[test]
    fn partial_json_overrides_keep_defaults() {
        let rules = StylingRules::from_json(r#"{ "min_items": 2, "max_variations": 3 }"#)
            .expect("partial rules load");
        assert_eq!(rules.min_items, 2);
        assert_eq!(rules.max_variations, 3);
        assert_eq!(rules.category_limit(CoreCategory::Tops), 2);
    }

    #[test]
    fn rejects_inverted_item_bounds() {
        match StylingRules::from_json(r#"{ "min_items": 9, "max_items": 8 }"#) {
            Err(RulesError::ItemBounds { min, max }) => {
                assert_eq!((min, max), (9, 8));
            }
            other => panic!("expected item bounds error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let raw = r#"{ "temperature_thresholds": { "hot": 60, "warm": 70, "mild": 55, "cool": 50, "cold": 40 } }"#;
        assert!(matches!(
            StylingRules::from_json(raw),
            Err(RulesError::UnorderedThresholds)
        ));
    }

    #[test]
    fn heavy_material_matches_compound_names() {
        let rules = StylingRules::default();
        assert!(rules.is_heavy_material("merino wool"));
        assert!(!rules.is_heavy_material("cotton"));
    }
}

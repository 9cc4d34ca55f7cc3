use serde::Serialize;

use super::compatibility::CompatibilityEngine;
use super::constraints::Constraints;
use super::rules::StylingRules;
use crate::wardrobe::domain::{
    ClothingItem, CoreCategory, FabricWeight, ItemId, StylePreferences, TemperatureBand,
};
use crate::wardrobe::keywords::{contains_phrase, normalize_tag};

/// Why a candidate was excluded before selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    FormalityOutOfRange,
    HeavyMaterialInHeat,
    ColdWeatherExposure,
    OccasionMismatch,
    DressNotAllowed,
    ForbiddenPairing,
}

impl RejectionReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FormalityOutOfRange => "formality_out_of_range",
            Self::HeavyMaterialInHeat => "heavy_material_in_heat",
            Self::ColdWeatherExposure => "cold_weather_exposure",
            Self::OccasionMismatch => "occasion_mismatch",
            Self::DressNotAllowed => "dress_not_allowed",
            Self::ForbiddenPairing => "forbidden_pairing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub item_id: ItemId,
    pub category: CoreCategory,
    pub reason: RejectionReason,
}

/// Soft ranking of candidates plus the hard filters applied before ranking.
#[derive(Debug, Clone, Copy)]
pub struct ItemScorer<'a> {
    rules: &'a StylingRules,
    engine: &'a CompatibilityEngine,
    preferences: Option<&'a StylePreferences>,
}

impl<'a> ItemScorer<'a> {
    pub fn new(rules: &'a StylingRules, engine: &'a CompatibilityEngine) -> Self {
        Self {
            rules,
            engine,
            preferences: None,
        }
    }

    pub fn with_preferences(mut self, preferences: &'a StylePreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// First hard filter the item fails, if any.
    pub fn rejection(&self, item: &ClothingItem, constraints: &Constraints) -> Option<RejectionReason> {
        if !constraints.formality_in_range(item.formality()) {
            return Some(RejectionReason::FormalityOutOfRange);
        }
        if item.category() == CoreCategory::Dress && !constraints.dress_allowed {
            return Some(RejectionReason::DressNotAllowed);
        }

        // User-forced items skip the weather filters.
        let pinned = constraints.is_pinned(&item.id);
        if !pinned && self.is_excluded_material(item, constraints) {
            return Some(RejectionReason::HeavyMaterialInHeat);
        }
        if !pinned && constraints.exposure_excluded && self.rules.is_cold_exposure(item) {
            return Some(RejectionReason::ColdWeatherExposure);
        }

        let tags = item.tags();
        if !self
            .engine
            .occasion_matches(&constraints.occasion, &tags.occasion)
        {
            return Some(RejectionReason::OccasionMismatch);
        }

        None
    }

    fn is_excluded_material(&self, item: &ClothingItem, constraints: &Constraints) -> bool {
        if constraints.excluded_materials.is_empty() {
            return false;
        }
        let heavy_weight = item
            .attributes()
            .and_then(|attrs| attrs.fabric_weight)
            .map(|weight| weight == FabricWeight::Heavy)
            .unwrap_or(false);
        heavy_weight
            || item
                .material()
                .map(|material| {
                    constraints
                        .excluded_materials
                        .iter()
                        .any(|excluded| contains_phrase(material, excluded))
                })
                .unwrap_or(false)
    }

    /// Weighted score in `[0, 1]`.
    pub fn score(&self, item: &ClothingItem, constraints: &Constraints) -> f32 {
        let weights = self.rules.scoring;
        let compatibility = self.compatibility(item, constraints);
        let formality = 1.0 - f32::from(item.formality().distance(constraints.target_formality)) / 4.0;
        let weather = self.weather(item, constraints);

        let base = (weights.compatibility * compatibility
            + weights.formality * formality
            + weights.weather * weather)
            / weights.total();

        let mut adjusted = base + self.preference_adjustment(item);
        if constraints.is_pinned(&item.id) {
            adjusted += 0.25;
        }
        adjusted.clamp(0.0, 1.0)
    }

    fn compatibility(&self, item: &ClothingItem, constraints: &Constraints) -> f32 {
        let tags = item.tags();
        let mut parts = vec![
            self.engine
                .occasion_affinity(&constraints.occasion, &tags.occasion)
                .weight(),
        ];
        if !constraints.style.is_empty() {
            parts.push(self.engine.style_affinity(&constraints.style, &tags.style).weight());
        }
        if !constraints.mood.is_empty() {
            parts.push(self.engine.mood_affinity(&constraints.mood, &tags.mood).weight());
        }
        parts.iter().sum::<f32>() / parts.len() as f32
    }

    fn weather(&self, item: &ClothingItem, constraints: &Constraints) -> f32 {
        let heavy = item.is_heavy(self.rules);
        let light = item.is_light(self.rules);

        let mut value: f32 = match constraints.temperature_band {
            TemperatureBand::Hot | TemperatureBand::Warm if heavy => 0.1,
            TemperatureBand::Hot | TemperatureBand::Warm if light => 1.0,
            TemperatureBand::Cold | TemperatureBand::VeryCold if heavy => 1.0,
            TemperatureBand::Cold | TemperatureBand::VeryCold if light => 0.4,
            _ => 0.7,
        };

        if constraints.temperature_band <= TemperatureBand::Cool
            && item.category() == CoreCategory::Outerwear
        {
            value = value.max(0.9);
        }

        if let Some(material) = item.material() {
            if constraints
                .preferred_materials
                .iter()
                .any(|preferred| contains_phrase(material, preferred))
            {
                value = (value + 0.1).min(1.0);
            }
        }

        value
    }

    fn preference_adjustment(&self, item: &ClothingItem) -> f32 {
        let Some(preferences) = self.preferences else {
            return 0.0;
        };

        let colors: Vec<String> = item
            .metadata
            .colors
            .iter()
            .map(|color| normalize_tag(color))
            .collect();
        let listed = |values: &[String]| {
            values
                .iter()
                .any(|value| colors.contains(&normalize_tag(value)))
        };

        let mut adjustment = 0.0;
        if listed(&preferences.favorite_colors) {
            adjustment += 0.05;
        }
        if listed(&preferences.avoided_colors) {
            adjustment -= 0.1;
        }
        if let Some(material) = item.material() {
            if preferences
                .avoided_materials
                .iter()
                .any(|avoided| contains_phrase(material, &normalize_tag(avoided)))
            {
                adjustment -= 0.15;
            }
        }
        adjustment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styling::constraints::ConstraintCompiler;
    use crate::wardrobe::domain::{ItemMetadata, OutfitContext, UserId, VisualAttributes, Weather};
    use crate::wardrobe::normalizer::normalize_item;

    fn item(id: &str, name: &str, item_type: &str, material: Option<&str>) -> ClothingItem {
        normalize_item(ClothingItem {
            id: ItemId(id.to_string()),
            name: name.to_string(),
            item_type: item_type.to_string(),
            owner_id: UserId("user-1".to_string()),
            metadata: ItemMetadata {
                visual_attributes: material.map(|material| VisualAttributes {
                    material: Some(material.to_string()),
                    ..VisualAttributes::default()
                }),
                ..ItemMetadata::default()
            },
        })
    }

    fn constraints(rules: &StylingRules, occasion: &str, temperature_f: f32) -> Constraints {
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let context = OutfitContext {
            occasion: occasion.to_string(),
            weather: Weather {
                temperature_f,
                ..Weather::default()
            },
            ..OutfitContext::default()
        };
        ConstraintCompiler::new(rules, &engine).compile(&context)
    }

    #[test]
    fn hard_filters_reject_heat_and_formality_misfits() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let scorer = ItemScorer::new(&rules, &engine);
        let constraints = constraints(&rules, "business", 90.0);

        let blazer = item("blazer", "Wool blazer", "blazer", Some("wool"));
        let sneakers = item("sneakers", "White sneakers", "sneakers", None);
        let shirt = item("shirt", "Cotton dress shirt", "shirt", Some("cotton"));

        assert_eq!(
            scorer.rejection(&blazer, &constraints),
            Some(RejectionReason::HeavyMaterialInHeat)
        );
        assert_eq!(
            scorer.rejection(&sneakers, &constraints),
            Some(RejectionReason::FormalityOutOfRange)
        );
        assert_eq!(scorer.rejection(&shirt, &constraints), None);
    }

    #[test]
    fn pinned_items_bypass_weather_filters() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let scorer = ItemScorer::new(&rules, &engine);
        let mut constraints = constraints(&rules, "business", 90.0);
        let blazer = item("blazer", "Wool blazer", "blazer", Some("wool"));
        constraints.pinned_items.insert(blazer.id.clone());

        assert_eq!(scorer.rejection(&blazer, &constraints), None);
    }

    #[test]
    fn light_fabrics_outscore_heavy_ones_in_heat() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let scorer = ItemScorer::new(&rules, &engine);
        let constraints = constraints(&rules, "casual", 88.0);

        let linen = item("linen", "Linen tee", "t-shirt", Some("linen"));
        let fleece = item("fleece", "Fleece top", "pullover", Some("fleece"));
        let linen_score = scorer.score(&linen, &constraints);
        assert!(linen_score > scorer.score(&fleece, &constraints));
        assert!((0.0..=1.0).contains(&linen_score));
    }

    #[test]
    fn avoided_colors_lower_the_score() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let constraints = constraints(&rules, "casual", 70.0);
        let mut tee = item("tee", "Tee", "t-shirt", Some("cotton"));
        tee.metadata.colors = vec!["orange".to_string()];

        let preferences = StylePreferences {
            avoided_colors: vec!["Orange".to_string()],
            ..StylePreferences::default()
        };
        let neutral = ItemScorer::new(&rules, &engine).score(&tee, &constraints);
        let picky = ItemScorer::new(&rules, &engine)
            .with_preferences(&preferences)
            .score(&tee, &constraints);
        assert!(picky < neutral);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::compatibility::CompatibilityEngine;
use super::rules::{LayeringRequirement, StylingRules};
use crate::wardrobe::domain::{CoreCategory, FormalityLevel, ItemId, OutfitContext, TemperatureBand};
use crate::wardrobe::keywords::normalize_tag;

/// Selection constraints compiled once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraints {
    pub occasion: String,
    pub style: String,
    pub mood: String,
    pub target_formality: FormalityLevel,
    pub min_formality: FormalityLevel,
    pub max_formality: FormalityLevel,
    pub temperature_f: f32,
    pub temperature_band: TemperatureBand,
    pub layering: LayeringRequirement,
    /// Ordered categories for the separates path.
    pub required_categories: Vec<CoreCategory>,
    pub optional_categories: Vec<CoreCategory>,
    /// A dress may stand in for the tops + bottoms pair.
    pub dress_allowed: bool,
    pub category_limits: BTreeMap<CoreCategory, usize>,
    pub min_items: usize,
    pub max_items: usize,
    pub excluded_materials: BTreeSet<String>,
    pub preferred_materials: BTreeSet<String>,
    pub exposure_excluded: bool,
    pub permitted_styles: BTreeSet<String>,
    pub pinned_items: BTreeSet<ItemId>,
}

impl Constraints {
    pub fn limit(&self, category: CoreCategory) -> usize {
        self.category_limits.get(&category).copied().unwrap_or(1)
    }

    pub fn formality_in_range(&self, level: FormalityLevel) -> bool {
        level >= self.min_formality && level <= self.max_formality
    }

    /// Required categories when a dress replaces the separates.
    pub fn dress_path_categories(&self) -> Vec<CoreCategory> {
        let mut categories = vec![CoreCategory::Dress];
        categories.extend(
            self.required_categories
                .iter()
                .copied()
                .filter(|category| !matches!(category, CoreCategory::Tops | CoreCategory::Bottoms)),
        );
        categories
    }

    pub fn is_required(&self, category: CoreCategory) -> bool {
        self.required_categories.contains(&category)
    }

    pub fn is_pinned(&self, id: &ItemId) -> bool {
        self.pinned_items.contains(id)
    }
}

/// Pure compiler from request context to [`Constraints`].
#[derive(Debug, Clone)]
pub struct ConstraintCompiler<'a> {
    rules: &'a StylingRules,
    engine: &'a CompatibilityEngine,
}

impl<'a> ConstraintCompiler<'a> {
    pub fn new(rules: &'a StylingRules, engine: &'a CompatibilityEngine) -> Self {
        Self { rules, engine }
    }

    pub fn compile(&self, context: &OutfitContext) -> Constraints {
        let rules = self.rules;
        let target_formality = context.formality_level(rules);
        let temperature_band = context.temperature_band(rules);
        let layering = rules.layering_for(temperature_band);

        let mut required_categories = vec![
            CoreCategory::Tops,
            CoreCategory::Bottoms,
            CoreCategory::Shoes,
        ];
        let formal_cover =
            target_formality >= FormalityLevel::Business && temperature_band <= TemperatureBand::Mild;
        if layering.outerwear_required || formal_cover {
            required_categories.push(CoreCategory::Outerwear);
        }

        let mut optional_categories = Vec::new();
        if !required_categories.contains(&CoreCategory::Outerwear)
            && temperature_band != TemperatureBand::Hot
        {
            optional_categories.push(CoreCategory::Outerwear);
        }
        optional_categories.push(CoreCategory::Accessories);

        let excluded_materials: BTreeSet<String> = if temperature_band == TemperatureBand::Hot {
            rules.heavy_materials.iter().map(|m| normalize_tag(m)).collect()
        } else {
            BTreeSet::new()
        };

        let preferred_materials: BTreeSet<String> = match temperature_band {
            TemperatureBand::Hot | TemperatureBand::Warm => {
                rules.light_materials.iter().map(|m| normalize_tag(m)).collect()
            }
            TemperatureBand::Cold | TemperatureBand::VeryCold => {
                rules.heavy_materials.iter().map(|m| normalize_tag(m)).collect()
            }
            _ => BTreeSet::new(),
        };

        Constraints {
            occasion: normalize_tag(&context.occasion),
            style: normalize_tag(&context.style),
            mood: normalize_tag(&context.mood),
            target_formality,
            min_formality: target_formality.saturating_sub(1),
            max_formality: target_formality.saturating_add(1),
            temperature_f: context.weather.temperature_f,
            temperature_band,
            layering,
            required_categories,
            optional_categories,
            dress_allowed: !rules.is_dressless_occasion(&context.occasion),
            category_limits: CoreCategory::ordered()
                .into_iter()
                .map(|category| (category, rules.category_limit(category)))
                .collect(),
            min_items: rules.min_items,
            max_items: rules.max_items,
            excluded_materials,
            preferred_materials,
            exposure_excluded: temperature_band <= TemperatureBand::Cold,
            permitted_styles: self.engine.style_neighborhood(&context.style),
            pinned_items: context.pinned_items.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wardrobe::domain::Weather;

    fn compile(occasion: &str, temperature_f: f32) -> Constraints {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, rules.filter_mode);
        let context = OutfitContext {
            occasion: occasion.to_string(),
            style: "classic".to_string(),
            weather: Weather {
                temperature_f,
                ..Weather::default()
            },
            ..OutfitContext::default()
        };
        ConstraintCompiler::new(&rules, &engine).compile(&context)
    }

    #[test]
    fn hot_business_request_excludes_heavy_materials_without_outerwear() {
        let constraints = compile("business", 90.0);
        assert_eq!(constraints.target_formality, FormalityLevel::Business);
        assert_eq!(constraints.temperature_band, TemperatureBand::Hot);
        assert_eq!(
            constraints.required_categories,
            vec![CoreCategory::Tops, CoreCategory::Bottoms, CoreCategory::Shoes]
        );
        assert!(!constraints.optional_categories.contains(&CoreCategory::Outerwear));
        assert!(constraints.excluded_materials.contains("wool"));
        assert!(constraints.preferred_materials.contains("linen"));
    }

    #[test]
    fn cool_formal_request_requires_outerwear() {
        let constraints = compile("formal", 55.0);
        assert!(constraints.is_required(CoreCategory::Outerwear));
        assert!(constraints.excluded_materials.is_empty());
    }

    #[test]
    fn cold_weather_requires_outerwear_and_blocks_exposure() {
        let constraints = compile("casual", 35.0);
        assert_eq!(constraints.temperature_band, TemperatureBand::VeryCold);
        assert!(constraints.is_required(CoreCategory::Outerwear));
        assert!(constraints.exposure_excluded);
        assert_eq!(constraints.layering.min_layers, 3);
    }

    #[test]
    fn athletic_requests_disallow_dresses() {
        let constraints = compile("athletic", 70.0);
        assert!(!constraints.dress_allowed);
        assert_eq!(constraints.min_formality, FormalityLevel::Casual);
        assert_eq!(constraints.max_formality, FormalityLevel::SmartCasual);
    }

    #[test]
    fn dress_path_replaces_separates() {
        let constraints = compile("date", 72.0);
        assert!(constraints.dress_allowed);
        assert_eq!(
            constraints.dress_path_categories(),
            vec![CoreCategory::Dress, CoreCategory::Shoes]
        );
    }

    #[test]
    fn compilation_is_reproducible() {
        assert_eq!(compile("wedding", 64.0), compile("wedding", 64.0));
    }
}

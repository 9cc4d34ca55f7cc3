use super::{
    Findings, IssueKind, OutfitValidator, Severity, ValidationContext, ValidationResult,
    ValidatorError,
};
use crate::styling::assembler::torso_layers;
use crate::styling::outfit::Outfit;
use crate::wardrobe::domain::{ClothingItem, CoreCategory, TemperatureBand};
use crate::wardrobe::keywords::{contains_phrase, normalize_tag};

/// Temperature fit of each garment.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeatherValidator;

impl OutfitValidator for WeatherValidator {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let band = ctx.constraints.temperature_band;
        let temperature = ctx.constraints.temperature_f;

        for item in outfit.items() {
            let pinned = ctx.constraints.is_pinned(&item.id);
            let heavy = item.is_heavy(ctx.rules);
            let exposed = ctx.rules.is_cold_exposure(item);

            match band {
                TemperatureBand::Hot if heavy && pinned => findings.issue(
                    IssueKind::WeatherMismatch,
                    Severity::Low,
                    format!("{} is heavy for {temperature:.0}°F but was requested", item.name),
                    &[item],
                ),
                TemperatureBand::Hot if heavy => {
                    findings.issue(
                        IssueKind::WeatherMismatch,
                        Severity::High,
                        format!("{} is too heavy for {temperature:.0}°F", item.name),
                        &[item],
                    );
                    findings.suggest("swap heavy fabrics for linen or cotton");
                }
                TemperatureBand::Warm if heavy && item.category() == CoreCategory::Outerwear => {
                    findings.issue(
                        IssueKind::WeatherMismatch,
                        Severity::Medium,
                        format!("{} may be too warm at {temperature:.0}°F", item.name),
                        &[item],
                    )
                }
                TemperatureBand::Cold | TemperatureBand::VeryCold if exposed && !pinned => {
                    findings.issue(
                        IssueKind::WeatherMismatch,
                        Severity::High,
                        format!("{} leaves skin exposed at {temperature:.0}°F", item.name),
                        &[item],
                    );
                    findings.suggest("choose full-length bottoms and closed shoes");
                }
                TemperatureBand::Cool if exposed => findings.issue(
                    IssueKind::WeatherMismatch,
                    Severity::Low,
                    format!("{} may feel chilly at {temperature:.0}°F", item.name),
                    &[item],
                ),
                _ => {}
            }
        }

        if band == TemperatureBand::Hot {
            let unnecessary: Vec<&ClothingItem> = outfit
                .in_category(CoreCategory::Outerwear)
                .iter()
                .filter(|item| !item.is_light(ctx.rules) && !ctx.constraints.is_pinned(&item.id))
                .filter(|item| !item.is_heavy(ctx.rules))
                .collect();
            for item in unnecessary {
                findings.issue(
                    IssueKind::WeatherMismatch,
                    Severity::Medium,
                    format!("{} adds an unnecessary layer in the heat", item.name),
                    &[item],
                );
            }
        }

        findings.finish()
    }
}

/// Structural composition: exclusivity, caps, required categories, layers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayeringValidator;

impl OutfitValidator for LayeringValidator {
    fn name(&self) -> &'static str {
        "layering"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let constraints = ctx.constraints;

        if outfit.has_dress() {
            let separates: Vec<&ClothingItem> = outfit
                .in_category(CoreCategory::Tops)
                .iter()
                .chain(outfit.in_category(CoreCategory::Bottoms))
                .collect();
            if !separates.is_empty() {
                findings.issue(
                    IssueKind::LayeringConflict,
                    Severity::Critical,
                    "a dress cannot be worn with separate tops or bottoms",
                    &separates,
                );
            }
        }

        for category in CoreCategory::ordered() {
            let items = outfit.in_category(category);
            let limit = constraints.limit(category);
            if items.len() > limit {
                let extra: Vec<&ClothingItem> = items[limit..].iter().collect();
                findings.issue(
                    IssueKind::DuplicateCategory,
                    Severity::High,
                    format!("{} {category} exceed the limit of {limit}", items.len()),
                    &extra,
                );
            }
        }

        let min_layers = usize::from(constraints.layering.min_layers);
        let tops = outfit.in_category(CoreCategory::Tops);
        for (index, top) in tops.iter().enumerate() {
            let duplicate = tops[..index]
                .iter()
                .any(|earlier| earlier.wear_layer() == top.wear_layer());
            // Extra tops are expected when the weather calls for layers.
            if duplicate && min_layers <= 1 && index < constraints.limit(CoreCategory::Tops) {
                findings.issue(
                    IssueKind::DuplicateCategory,
                    Severity::Medium,
                    format!("{} repeats a layer that is already covered", top.name),
                    &[top],
                );
            }
        }

        let required = if outfit.has_dress() {
            constraints.dress_path_categories()
        } else {
            constraints.required_categories.clone()
        };
        for category in required {
            if outfit.count(category) == 0 {
                findings.category_issue(
                    IssueKind::MissingCategory,
                    Severity::High,
                    format!("outfit is missing required {category}"),
                    category,
                );
            }
        }

        let count = outfit.item_count();
        if count < constraints.min_items {
            findings.category_issue(
                IssueKind::MissingCategory,
                Severity::High,
                format!("{count} items is below the minimum of {}", constraints.min_items),
                CoreCategory::Accessories,
            );
        } else if count > constraints.max_items {
            findings.category_issue(
                IssueKind::DuplicateCategory,
                Severity::High,
                format!("{count} items exceeds the maximum of {}", constraints.max_items),
                CoreCategory::Accessories,
            );
        }

        let layers = torso_layers(outfit);
        if layers < min_layers {
            let severity = if constraints.temperature_band <= TemperatureBand::Cold {
                Severity::High
            } else {
                Severity::Medium
            };
            findings.category_issue(
                IssueKind::LayeringConflict,
                severity,
                format!(
                    "{layers} torso layer(s) for {} weather, {min_layers} recommended",
                    constraints.temperature_band.label()
                ),
                CoreCategory::Tops,
            );
            findings.suggest("add a mid layer such as a sweater or cardigan");
        }

        findings.finish()
    }
}

/// Fabric suitability beyond temperature: precipitation and preferences.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaterialValidator;

impl OutfitValidator for MaterialValidator {
    fn name(&self) -> &'static str {
        "material"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let wet = ctx.context.weather.is_wet();
        let avoided = &ctx.context.profile.preferences.avoided_materials;

        for item in outfit.items() {
            let Some(material) = item.material() else {
                continue;
            };

            if wet
                && ctx
                    .rules
                    .wet_weather_sensitive_materials
                    .iter()
                    .any(|sensitive| contains_phrase(material, sensitive))
            {
                findings.issue(
                    IssueKind::MaterialMismatch,
                    Severity::Medium,
                    format!("{material} on {} does not hold up in wet weather", item.name),
                    &[item],
                );
                findings.suggest("pick water-resistant fabrics for wet conditions");
            }

            if avoided
                .iter()
                .any(|value| contains_phrase(material, &normalize_tag(value)))
            {
                findings.issue(
                    IssueKind::MaterialMismatch,
                    Severity::Medium,
                    format!("{} is made of {material}, which the wearer avoids", item.name),
                    &[item],
                );
            }
        }

        if ctx.constraints.temperature_band <= TemperatureBand::Cold {
            let torso: Vec<&ClothingItem> = outfit
                .items()
                .filter(|item| item.wear_layer().is_torso_layer())
                .collect();
            if !torso.is_empty() && torso.iter().all(|item| item.is_light(ctx.rules)) {
                findings.issue(
                    IssueKind::MaterialMismatch,
                    Severity::Low,
                    "only lightweight fabrics on the torso in cold weather",
                    &torso,
                );
            }
        }

        findings.finish()
    }
}

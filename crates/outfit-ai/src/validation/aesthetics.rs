use std::collections::BTreeSet;

use super::{
    Findings, IssueKind, OutfitValidator, Severity, ValidationContext, ValidationResult,
    ValidatorError,
};
use crate::styling::compatibility::Affinity;
use crate::styling::outfit::Outfit;
use crate::wardrobe::domain::{ClothingItem, CoreCategory};
use crate::wardrobe::keywords::normalize_tag;

const NEUTRAL_COLORS: &[&str] = &[
    "black", "white", "gray", "grey", "navy", "beige", "cream", "tan", "brown", "denim", "khaki",
    "ivory", "camel", "charcoal", "taupe",
];

const CLASHING_COLORS: &[(&str, &str)] = &[
    ("red", "orange"),
    ("red", "pink"),
    ("orange", "pink"),
    ("orange", "purple"),
    ("green", "purple"),
];

const MAX_ACCENT_COLORS: usize = 3;

const VOLUME_FITS: &[&str] = &["oversized", "loose", "baggy", "relaxed", "wide"];

/// Requested style and mood against item tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleValidator;

impl OutfitValidator for StyleValidator {
    fn name(&self) -> &'static str {
        "style"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let style = ctx.constraints.style.as_str();
        let mood = ctx.constraints.mood.as_str();

        let mut tagged = 0usize;
        let mut off_style: Vec<&ClothingItem> = Vec::new();
        for item in outfit.items() {
            let tags = item.tags();
            if !style.is_empty() {
                match ctx.engine.style_affinity(style, &tags.style) {
                    Affinity::Untagged => {}
                    Affinity::Mismatch => {
                        tagged += 1;
                        off_style.push(item);
                        findings.issue(
                            IssueKind::StyleConflict,
                            Severity::Low,
                            format!("{} does not read as {style}", item.name),
                            &[item],
                        );
                    }
                    _ => tagged += 1,
                }
            }
            if !mood.is_empty()
                && ctx.engine.mood_affinity(mood, &tags.mood) == Affinity::Mismatch
            {
                findings.issue(
                    IssueKind::StyleConflict,
                    Severity::Low,
                    format!("{} sets a different mood than {mood}", item.name),
                    &[item],
                );
            }
        }

        if tagged >= 2 && off_style.len() * 2 > tagged {
            findings.issue(
                IssueKind::StyleConflict,
                Severity::Medium,
                format!("most tagged pieces stray from the {style} style"),
                &off_style,
            );
            findings.suggest(format!("favor pieces tagged {style} or a close neighbor"));
        }

        // Two off-style pieces whose own styles are mutually incompatible.
        let graph = ctx.engine.style_graph();
        for (index, first) in off_style.iter().enumerate() {
            let first_tags = first.tags().style;
            for second in &off_style[index + 1..] {
                let second_tags = second.tags().style;
                let compatible = first_tags.iter().any(|a| {
                    second_tags
                        .iter()
                        .any(|b| graph.compatible(a, b) || graph.compatible(b, a))
                });
                if !compatible {
                    findings.issue(
                        IssueKind::StyleConflict,
                        Severity::High,
                        format!(
                            "{} ({}) clashes with {} ({})",
                            second.name,
                            joined(&second_tags),
                            first.name,
                            joined(&first_tags)
                        ),
                        &[*second, *first],
                    );
                }
            }
        }

        findings.finish()
    }
}

fn joined(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join("/")
}

/// Accent color count, known clashes and avoided colors.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorHarmonyValidator;

impl OutfitValidator for ColorHarmonyValidator {
    fn name(&self) -> &'static str {
        "color_harmony"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let preferences = &ctx.context.profile.preferences;
        let avoided: BTreeSet<String> = preferences
            .avoided_colors
            .iter()
            .map(|color| normalize_tag(color))
            .collect();

        let mut accents: BTreeSet<String> = BTreeSet::new();
        let mut owners: Vec<(String, &ClothingItem)> = Vec::new();
        for item in outfit.items() {
            for color in &item.metadata.colors {
                let color = normalize_tag(color);
                if color.is_empty() {
                    continue;
                }
                if avoided.contains(&color) {
                    findings.issue(
                        IssueKind::ColorClash,
                        Severity::Medium,
                        format!("{} is {color}, a color the wearer avoids", item.name),
                        &[item],
                    );
                }
                if !NEUTRAL_COLORS.contains(&color.as_str()) {
                    accents.insert(color.clone());
                }
                owners.push((color, item));
            }
        }

        if accents.len() > MAX_ACCENT_COLORS {
            let items: Vec<&ClothingItem> = outfit.items().collect();
            findings.issue(
                IssueKind::ColorClash,
                Severity::Medium,
                format!(
                    "{} accent colors compete ({})",
                    accents.len(),
                    joined(&accents)
                ),
                &items,
            );
            findings.suggest("anchor bright pieces with neutrals");
        }

        for (left, right) in CLASHING_COLORS {
            let left_item = owners.iter().find(|(color, _)| color == left);
            let right_item = owners.iter().find(|(color, _)| color == right);
            if let (Some((_, a)), Some((_, b))) = (left_item, right_item) {
                if a.id != b.id {
                    findings.issue(
                        IssueKind::ColorClash,
                        Severity::Low,
                        format!("{left} and {right} tend to clash"),
                        &[*b, *a],
                    );
                }
            }
        }

        let patterned: Vec<&ClothingItem> = outfit
            .items()
            .filter(|item| {
                item.attributes()
                    .and_then(|attrs| attrs.pattern.as_deref())
                    .map(|pattern| {
                        !matches!(normalize_tag(pattern).as_str(), "" | "solid" | "plain")
                    })
                    .unwrap_or(false)
            })
            .collect();
        if patterned.len() > 1 {
            findings.issue(
                IssueKind::ColorClash,
                Severity::Low,
                format!("{} patterned pieces compete for attention", patterned.len()),
                &patterned,
            );
        }

        findings.finish()
    }
}

/// Fit preferences and silhouette balance.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitValidator;

impl OutfitValidator for FitValidator {
    fn name(&self) -> &'static str {
        "fit"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let preferred = ctx
            .context
            .profile
            .preferences
            .preferred_fit
            .as_deref()
            .map(normalize_tag);

        for item in outfit.items() {
            let Some(fit) = item.attributes().and_then(|attrs| attrs.fit.as_deref()) else {
                continue;
            };
            let fit = normalize_tag(fit);
            if let Some(preferred) = &preferred {
                if !fit.is_empty() && &fit != preferred {
                    findings.issue(
                        IssueKind::FitConcern,
                        Severity::Low,
                        format!("{} is {fit} cut; {preferred} is preferred", item.name),
                        &[item],
                    );
                }
            }
        }

        let voluminous = |category: CoreCategory| {
            outfit.in_category(category).iter().find(|item| {
                item.attributes()
                    .and_then(|attrs| attrs.fit.as_deref())
                    .map(|fit| VOLUME_FITS.contains(&normalize_tag(fit).as_str()))
                    .unwrap_or(false)
            })
        };
        if let (Some(top), Some(bottom)) = (
            voluminous(CoreCategory::Tops),
            voluminous(CoreCategory::Bottoms),
        ) {
            findings.issue(
                IssueKind::FitConcern,
                Severity::Low,
                format!("{} and {} are both loose", top.name, bottom.name),
                &[bottom, top],
            );
            findings.suggest("balance a loose piece with a fitted one");
        }

        findings.finish()
    }
}

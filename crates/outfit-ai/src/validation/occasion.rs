use super::{
    Findings, IssueKind, OutfitValidator, Severity, ValidationContext, ValidationResult,
    ValidatorError,
};
use crate::styling::assembler::MAX_FORMALITY_LEVELS;
use crate::styling::outfit::Outfit;
use crate::wardrobe::domain::{ClothingItem, FormalityLevel};

/// Occasion tags, dress-code floor and forbidden pairings.
#[derive(Debug, Default, Clone, Copy)]
pub struct OccasionValidator;

impl OutfitValidator for OccasionValidator {
    fn name(&self) -> &'static str {
        "occasion"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let constraints = ctx.constraints;
        let occasion = constraints.occasion.as_str();
        let label = if occasion.is_empty() { "the occasion" } else { occasion };
        let mut appropriate = 0usize;

        for item in outfit.items() {
            let tags = item.tags();
            let affinity = ctx.engine.occasion_affinity(occasion, &tags.occasion);
            if affinity.is_match() && constraints.formality_in_range(item.formality()) {
                appropriate += 1;
            }

            if constraints.target_formality >= FormalityLevel::Business
                && item.formality() == FormalityLevel::Casual
            {
                findings.issue(
                    IssueKind::OccasionMismatch,
                    Severity::Critical,
                    format!("{} is far too casual for {label}", item.name),
                    &[item],
                );
            } else if !affinity.is_match() {
                let declared: Vec<&str> = tags.occasion.iter().map(String::as_str).collect();
                findings.issue(
                    IssueKind::OccasionMismatch,
                    Severity::Medium,
                    format!(
                        "{} is meant for {} rather than {label}",
                        item.name,
                        declared.join(", ")
                    ),
                    &[item],
                );
            }
        }

        if !outfit.is_empty() && appropriate == 0 {
            let items: Vec<&ClothingItem> = outfit.items().collect();
            findings.issue(
                IssueKind::OccasionMismatch,
                Severity::Critical,
                format!("no {label}-appropriate items in the outfit"),
                &items,
            );
            findings.suggest(format!("add pieces suited to {label} to the wardrobe"));
        }

        let items: Vec<&ClothingItem> = outfit.items().collect();
        for (index, first) in items.iter().enumerate() {
            for second in &items[index + 1..] {
                if let Some(combination) = ctx.rules.forbidden_between(first, second) {
                    findings.issue(
                        IssueKind::ForbiddenCombination,
                        Severity::High,
                        format!(
                            "{} with {}: {}",
                            first.name, second.name, combination.reason
                        ),
                        &[*second, *first],
                    );
                }
            }
        }

        findings.finish()
    }
}

/// Dress-code distance and the spread of formality levels.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormalityValidator;

impl OutfitValidator for FormalityValidator {
    fn name(&self) -> &'static str {
        "formality"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let mut findings = Findings::new(self.name());
        let target = ctx.constraints.target_formality;

        for item in outfit.items() {
            let distance = item.formality().distance(target);
            if distance >= 2 {
                findings.issue(
                    IssueKind::FormalitySpread,
                    Severity::High,
                    format!(
                        "{} is {} while the occasion calls for {}",
                        item.name,
                        item.formality().label(),
                        target.label()
                    ),
                    &[item],
                );
            }
        }

        let levels = outfit.formality_levels();
        if levels.len() > MAX_FORMALITY_LEVELS {
            let mut outliers: Vec<&ClothingItem> = outfit.items().collect();
            outliers.sort_by(|a, b| {
                b.formality()
                    .distance(target)
                    .cmp(&a.formality().distance(target))
                    .then_with(|| a.id.cmp(&b.id))
            });
            let names: Vec<&str> = levels.iter().map(|level| level.label()).collect();
            findings.issue(
                IssueKind::FormalitySpread,
                Severity::High,
                format!(
                    "outfit mixes {} formality levels ({})",
                    levels.len(),
                    names.join(", ")
                ),
                &outliers[..1],
            );
            findings.suggest("keep every piece within one step of the same dress code");
        }

        let count = outfit.item_count();
        if count > 0 {
            let total: u32 = outfit
                .items()
                .map(|item| u32::from(item.formality().distance(target)))
                .sum();
            let average = total as f32 / count as f32;
            if average > 1.0 {
                let items: Vec<&ClothingItem> = outfit.items().collect();
                findings.issue(
                    IssueKind::FormalitySpread,
                    Severity::Low,
                    format!("average formality drifts {average:.1} steps from {}", target.label()),
                    &items,
                );
            }
        }

        findings.finish()
    }
}

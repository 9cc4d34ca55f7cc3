//! Outfit validation.
//!
//! Eight independent validators run in a fixed order over every draft outfit.
//! Each reports typed [`ValidationIssue`]s; the pipeline merges them into a
//! single [`ValidationResult`] whose severity decides acceptance. High and
//! Critical findings block an outfit and send it through the healing tiers,
//! Medium and Low findings travel with the response as advice.

use std::fmt;

use serde::Serialize;

use crate::styling::compatibility::CompatibilityEngine;
use crate::styling::constraints::Constraints;
use crate::styling::outfit::Outfit;
use crate::styling::rules::StylingRules;
use crate::wardrobe::domain::{ClothingItem, CoreCategory, ItemId, OutfitContext};

pub mod aesthetics;
pub mod climate;
pub mod occasion;
pub mod pipeline;

pub use aesthetics::{ColorHarmonyValidator, FitValidator, StyleValidator};
pub use climate::{LayeringValidator, MaterialValidator, WeatherValidator};
pub use occasion::{FormalityValidator, OccasionValidator};
pub use pipeline::{ValidationPipeline, ValidationStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and Critical findings reject the outfit.
    pub const fn blocks(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    const fn confidence_penalty(self) -> f32 {
        match self {
            Self::Low => 0.03,
            Self::Medium => 0.1,
            Self::High => 0.25,
            Self::Critical => 0.5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification used by targeted repair to pick a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateCategory,
    WeatherMismatch,
    LayeringConflict,
    StyleConflict,
    OccasionMismatch,
    FormalitySpread,
    ForbiddenCombination,
    MissingCategory,
    ColorClash,
    MaterialMismatch,
    FitConcern,
    ValidatorFailure,
}

impl IssueKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DuplicateCategory => "duplicate_category",
            Self::WeatherMismatch => "weather_mismatch",
            Self::LayeringConflict => "layering_conflict",
            Self::StyleConflict => "style_conflict",
            Self::OccasionMismatch => "occasion_mismatch",
            Self::FormalitySpread => "formality_spread",
            Self::ForbiddenCombination => "forbidden_combination",
            Self::MissingCategory => "missing_category",
            Self::ColorClash => "color_clash",
            Self::MaterialMismatch => "material_mismatch",
            Self::FitConcern => "fit_concern",
            Self::ValidatorFailure => "validator_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub validator: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// Items implicated in the finding, offending item first.
    pub item_ids: Vec<ItemId>,
    pub category: Option<CoreCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub severity: Severity,
    pub confidence: f32,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn clean() -> Self {
        Self::from_issues(Vec::new(), Vec::new())
    }

    /// Derive validity, message lists, severity and confidence from issues.
    pub fn from_issues(issues: Vec<ValidationIssue>, suggestions: Vec<String>) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for issue in &issues {
            let line = format!("{}: {}", issue.validator, issue.message);
            if issue.severity.blocks() {
                errors.push(line);
            } else {
                warnings.push(line);
            }
        }

        let severity = issues
            .iter()
            .map(|issue| issue.severity)
            .max()
            .unwrap_or(Severity::Low);
        let penalty: f32 = issues
            .iter()
            .map(|issue| issue.severity.confidence_penalty())
            .sum();

        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
            severity,
            confidence: (1.0 - penalty).clamp(0.0, 1.0),
            issues,
        }
    }

    /// Union of both results; severity is the maximum of the two.
    pub fn merge(self, other: ValidationResult) -> ValidationResult {
        let mut issues = self.issues;
        issues.extend(other.issues);
        let mut suggestions = self.suggestions;
        for suggestion in other.suggestions {
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }
        ValidationResult::from_issues(issues, suggestions)
    }

    pub fn blocking_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.severity.blocks())
    }

    pub fn blocking_count(&self) -> usize {
        self.blocking_issues().count()
    }

    /// Ordering key for picking the least-bad outfit: severity, then number
    /// of blocking issues, then total issues.
    pub fn badness(&self) -> (Severity, usize, usize) {
        let severity = if self.issues.is_empty() {
            Severity::Low
        } else {
            self.severity
        };
        (severity, self.blocking_count(), self.issues.len())
    }
}

/// Read-only inputs shared by every validator for one request.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub context: &'a OutfitContext,
    pub constraints: &'a Constraints,
    pub rules: &'a StylingRules,
    pub engine: &'a CompatibilityEngine,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    #[error("validator could not evaluate the outfit: {0}")]
    Evaluation(String),
}

pub trait OutfitValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(
        &self,
        outfit: &Outfit,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError>;
}

/// Issue collector used inside validators.
#[derive(Debug)]
pub(crate) struct Findings {
    validator: &'static str,
    issues: Vec<ValidationIssue>,
    suggestions: Vec<String>,
}

impl Findings {
    pub(crate) fn new(validator: &'static str) -> Self {
        Self {
            validator,
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub(crate) fn issue(
        &mut self,
        kind: IssueKind,
        severity: Severity,
        message: impl Into<String>,
        items: &[&ClothingItem],
    ) {
        self.issues.push(ValidationIssue {
            validator: self.validator.to_string(),
            kind,
            severity,
            message: message.into(),
            item_ids: items.iter().map(|item| item.id.clone()).collect(),
            category: items.first().map(|item| item.category()),
        });
    }

    pub(crate) fn category_issue(
        &mut self,
        kind: IssueKind,
        severity: Severity,
        message: impl Into<String>,
        category: CoreCategory,
    ) {
        self.issues.push(ValidationIssue {
            validator: self.validator.to_string(),
            kind,
            severity,
            message: message.into(),
            item_ids: Vec::new(),
            category: Some(category),
        });
    }

    pub(crate) fn suggest(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    pub(crate) fn finish(self) -> Result<ValidationResult, ValidatorError> {
        Ok(ValidationResult::from_issues(self.issues, self.suggestions))
    }
}

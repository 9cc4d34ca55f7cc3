use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

use super::aesthetics::{ColorHarmonyValidator, FitValidator, StyleValidator};
use super::climate::{LayeringValidator, MaterialValidator, WeatherValidator};
use super::occasion::{FormalityValidator, OccasionValidator};
use super::{
    IssueKind, OutfitValidator, Severity, ValidationContext, ValidationIssue, ValidationResult,
};
use crate::styling::outfit::Outfit;

/// Aggregate counters kept for tuning the rule tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total_runs: u64,
    pub failed_runs: u64,
    /// Runs in which a validator reported a blocking issue.
    pub failures_by_validator: BTreeMap<String, u64>,
    /// Validator crashes and `Err` returns.
    pub validator_errors: BTreeMap<String, u64>,
    pub failure_messages: BTreeMap<String, u64>,
}

impl ValidationStats {
    /// Most frequent blocking messages, highest count first.
    pub fn top_failures(&self, limit: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .failure_messages
            .iter()
            .map(|(message, count)| (message.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.failed_runs as f64 / self.total_runs as f64
        }
    }
}

/// Ordered validator set; every validator runs on every outfit.
pub struct ValidationPipeline {
    validators: Vec<Box<dyn OutfitValidator>>,
    stats: Mutex<ValidationStats>,
}

impl ValidationPipeline {
    /// Weather, Occasion, Style, Layering, Formality, ColorHarmony, Material, Fit.
    pub fn standard() -> Self {
        Self::with_validators(vec![
            Box::new(WeatherValidator),
            Box::new(OccasionValidator),
            Box::new(StyleValidator),
            Box::new(LayeringValidator),
            Box::new(FormalityValidator),
            Box::new(ColorHarmonyValidator),
            Box::new(MaterialValidator),
            Box::new(FitValidator),
        ])
    }

    pub fn with_validators(validators: Vec<Box<dyn OutfitValidator>>) -> Self {
        Self {
            validators,
            stats: Mutex::new(ValidationStats::default()),
        }
    }

    pub fn validator_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|validator| validator.name()).collect()
    }

    pub fn validate(&self, outfit: &Outfit, ctx: &ValidationContext<'_>) -> ValidationResult {
        let mut merged = ValidationResult::clean();
        let mut crashed: Vec<&'static str> = Vec::new();

        for validator in &self.validators {
            let name = validator.name();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| validator.validate(outfit, ctx)));
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(error)) => {
                    warn!(validator = name, %error, "validator returned an error");
                    crashed.push(name);
                    failure_result(name, error.to_string())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(validator = name, message = %message, "validator panicked");
                    crashed.push(name);
                    failure_result(name, format!("panicked: {message}"))
                }
            };
            merged = merged.merge(result);
        }

        self.record(&merged, &crashed);
        merged
    }

    fn record(&self, result: &ValidationResult, crashed: &[&'static str]) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_runs += 1;
        if !result.is_valid {
            stats.failed_runs += 1;
        }

        let mut failing: Vec<&str> = result
            .blocking_issues()
            .map(|issue| issue.validator.as_str())
            .collect();
        failing.sort_unstable();
        failing.dedup();
        for validator in failing {
            *stats
                .failures_by_validator
                .entry(validator.to_string())
                .or_default() += 1;
        }
        for validator in crashed {
            *stats
                .validator_errors
                .entry((*validator).to_string())
                .or_default() += 1;
        }
        for issue in result.blocking_issues() {
            *stats
                .failure_messages
                .entry(issue.message.clone())
                .or_default() += 1;
        }
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = ValidationStats::default();
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("validators", &self.validator_names())
            .finish()
    }
}

fn failure_result(validator: &str, detail: String) -> ValidationResult {
    let issue = ValidationIssue {
        validator: validator.to_string(),
        kind: IssueKind::ValidatorFailure,
        severity: Severity::Critical,
        message: format!("validator {validator} failed: {detail}"),
        item_ids: Vec::new(),
        category: None,
    };
    ValidationResult::from_issues(vec![issue], Vec::new())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::reassembly::{Reassembler, Reassembly, Relaxation};
use super::repair::{RepairAction, RepairOutcome, TargetedRepair};
use super::store::{ItemFilter, ItemStore, SnapshotStore, StoreError};
use crate::guardrails::{FilteringMetrics, GuardrailMonitor};
use crate::styling::assembler::OutfitAssembler;
use crate::styling::compatibility::CompatibilityEngine;
use crate::styling::constraints::{ConstraintCompiler, Constraints};
use crate::styling::outfit::Outfit;
use crate::styling::rules::{FilterMode, StylingRules};
use crate::styling::scoring::{ItemScorer, Rejection};
use crate::validation::{Severity, ValidationContext, ValidationPipeline, ValidationResult};
use crate::wardrobe::domain::{ClothingItem, ItemId, OutfitContext, UserId, UserProfile, Weather};

const MIN_TEMPERATURE_F: f32 = -60.0;
const MAX_TEMPERATURE_F: f32 = 140.0;

/// Generation input: the situational context plus either an inline wardrobe
/// or the owner whose stored wardrobe should be queried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub occasion: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default, alias = "userProfile")]
    pub user_profile: UserProfile,
    #[serde(default, alias = "userId")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub wardrobe: Option<Vec<ClothingItem>>,
    #[serde(default, alias = "pinnedItems")]
    pub pinned_items: Vec<ItemId>,
    /// Alternatives wanted besides the main outfit.
    #[serde(default)]
    pub variations: usize,
    #[serde(default, alias = "filterMode")]
    pub filter_mode: Option<FilterMode>,
    #[serde(default)]
    pub debug: bool,
}

impl GenerationRequest {
    pub fn context(&self) -> Result<OutfitContext, GenerationError> {
        if self.occasion.trim().is_empty() {
            return Err(GenerationError::InvalidContext(
                "occasion is required".to_string(),
            ));
        }
        let temperature = self.weather.temperature_f;
        if !temperature.is_finite() || !(MIN_TEMPERATURE_F..=MAX_TEMPERATURE_F).contains(&temperature)
        {
            return Err(GenerationError::InvalidContext(format!(
                "temperature {temperature}°F is outside {MIN_TEMPERATURE_F}..{MAX_TEMPERATURE_F}"
            )));
        }
        let precipitation = self.weather.precipitation;
        if !(0.0..=1.0).contains(&precipitation) {
            return Err(GenerationError::InvalidContext(format!(
                "precipitation {precipitation} must be a probability between 0 and 1"
            )));
        }

        Ok(OutfitContext {
            occasion: self.occasion.clone(),
            style: self.style.clone(),
            mood: self.mood.clone(),
            weather: self.weather.clone(),
            profile: self.user_profile.clone(),
            pinned_items: self.pinned_items.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    Primary,
    TargetedRepair,
    FullReassembly,
    Variation,
    EmergencyDefault,
}

impl GenerationStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::TargetedRepair => "targeted_repair",
            Self::FullReassembly => "full_reassembly",
            Self::Variation => "variation",
            Self::EmergencyDefault => "emergency_default",
        }
    }
}

/// What one tier did and what it left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierRecord {
    pub tier: GenerationStrategy,
    pub accepted: bool,
    pub items_fixed: Vec<ItemId>,
    pub items_replaced: Vec<ItemId>,
    pub actions: Vec<RepairAction>,
    pub remaining_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TierRecord {
    fn assessed(tier: GenerationStrategy, result: &ValidationResult) -> Self {
        Self {
            tier,
            accepted: result.is_valid,
            items_fixed: Vec::new(),
            items_replaced: Vec::new(),
            actions: Vec::new(),
            remaining_errors: result.errors.clone(),
            note: None,
        }
    }

    fn noted(tier: GenerationStrategy, note: impl Into<String>) -> Self {
        Self {
            tier,
            accepted: false,
            items_fixed: Vec::new(),
            items_replaced: Vec::new(),
            actions: Vec::new(),
            remaining_errors: Vec::new(),
            note: Some(note.into()),
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealingRecord {
    pub final_strategy: GenerationStrategy,
    pub validation_runs: usize,
    pub tiers: Vec<TierRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMetadata {
    pub generation_strategy: GenerationStrategy,
    pub item_count: usize,
    pub outfit_score: f32,
    pub is_valid: bool,
    pub severity: Severity,
    pub confidence: f32,
    pub filter_mode: FilterMode,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutfitVariation {
    pub items: Vec<ClothingItem>,
    pub outfit_score: f32,
    pub severity: Severity,
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// Filtering trail returned when the caller asks for debug output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugReport {
    pub constraints: Constraints,
    pub candidates_considered: usize,
    pub candidates_eligible: usize,
    pub rejections: Vec<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResponse {
    pub items: Vec<ClothingItem>,
    pub metadata: GenerationMetadata,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub healing: HealingRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<OutfitVariation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugReport>,
}

/// Input errors; everything past input validation yields a response.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("either user_id or wardrobe must be provided")]
    MissingUser,
    #[error("wardrobe has no items to choose from")]
    EmptyWardrobe,
    #[error("invalid context: {0}")]
    InvalidContext(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Attempt {
    strategy: GenerationStrategy,
    outfit: Outfit,
    result: ValidationResult,
}

/// Runs assembly, validation and the healing tiers for one request at a time;
/// requests share nothing but the rule tables, pipeline and monitor.
pub struct OutfitGenerationService<S> {
    store: Arc<S>,
    rules: Arc<StylingRules>,
    semantic: CompatibilityEngine,
    traditional: CompatibilityEngine,
    pipeline: ValidationPipeline,
    monitor: Arc<GuardrailMonitor>,
}

impl<S> OutfitGenerationService<S>
where
    S: ItemStore + 'static,
{
    pub fn new(store: Arc<S>, rules: Arc<StylingRules>, monitor: Arc<GuardrailMonitor>) -> Self {
        Self::with_pipeline(store, rules, ValidationPipeline::standard(), monitor)
    }

    pub fn with_pipeline(
        store: Arc<S>,
        rules: Arc<StylingRules>,
        pipeline: ValidationPipeline,
        monitor: Arc<GuardrailMonitor>,
    ) -> Self {
        let semantic = CompatibilityEngine::new(&rules.compatibility, FilterMode::Semantic);
        let traditional = CompatibilityEngine::new(&rules.compatibility, FilterMode::Traditional);
        Self {
            store,
            rules,
            semantic,
            traditional,
            pipeline,
            monitor,
        }
    }

    pub fn rules(&self) -> &StylingRules {
        &self.rules
    }

    pub fn pipeline(&self) -> &ValidationPipeline {
        &self.pipeline
    }

    pub fn monitor(&self) -> &Arc<GuardrailMonitor> {
        &self.monitor
    }

    fn engine_for(&self, mode: FilterMode) -> &CompatibilityEngine {
        match mode {
            FilterMode::Semantic => &self.semantic,
            FilterMode::Traditional => &self.traditional,
        }
    }

    /// Produce the best outfit the wardrobe allows, healing failed drafts.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let started = Instant::now();
        let context = request.context()?;
        let GenerationRequest {
            user_id,
            wardrobe,
            variations,
            filter_mode,
            debug: wants_debug,
            ..
        } = request;

        let (inline, user) = match (wardrobe, user_id) {
            (Some(items), _) if items.is_empty() => return Err(GenerationError::EmptyWardrobe),
            (Some(items), user) => (
                Some(SnapshotStore::new(items)),
                user.unwrap_or_else(|| UserId("inline".to_string())),
            ),
            (None, Some(user)) => (None, user),
            (None, None) => return Err(GenerationError::MissingUser),
        };
        let store: &dyn ItemStore = match &inline {
            Some(snapshot) => snapshot,
            None => self.store.as_ref(),
        };

        let candidates = store
            .query_items(&user, None, &ItemFilter::default())
            .await?;
        if candidates.is_empty() {
            return Err(GenerationError::EmptyWardrobe);
        }

        let mode = filter_mode.unwrap_or(self.rules.filter_mode);
        let engine = self.engine_for(mode);
        let rules: &StylingRules = &self.rules;
        let constraints = ConstraintCompiler::new(rules, engine).compile(&context);
        let assembler =
            OutfitAssembler::new(rules, engine).with_preferences(&context.profile.preferences);
        let scorer: ItemScorer<'_> = *assembler.scorer();
        let ctx = ValidationContext {
            context: &context,
            constraints: &constraints,
            rules,
            engine,
        };
        let repair = TargetedRepair::new(store, &user, rules, scorer);
        let reassembler = Reassembler::new(store, &user, rules, scorer);

        let mut rejections = hard_filter_rejections(&candidates, &scorer, &constraints);
        let eligible = candidates.len() - rejections.len();
        let mut selection_failure = None;
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut tiers: Vec<TierRecord> = Vec::new();
        let mut accepted: Option<usize> = None;
        let mut validation_runs = 0usize;

        match assembler.assemble(&candidates, &constraints) {
            Ok(assembly) => {
                rejections = assembly.rejections;
                let result = self.pipeline.validate(&assembly.outfit, &ctx);
                validation_runs += 1;
                tiers.push(TierRecord::assessed(GenerationStrategy::Primary, &result));
                let primary_valid = result.is_valid;
                attempts.push(Attempt {
                    strategy: GenerationStrategy::Primary,
                    outfit: assembly.outfit.clone(),
                    result: result.clone(),
                });

                if primary_valid {
                    accepted = Some(0);
                } else {
                    debug!(errors = result.errors.len(), "primary outfit rejected, attempting repair");
                    let outcome = repair
                        .repair(&assembly.outfit, &result, &constraints)
                        .await?;
                    if outcome.changed() {
                        let result = self.pipeline.validate(&outcome.outfit, &ctx);
                        validation_runs += 1;
                        tiers.push(repair_record(&outcome, &result));
                        if result.is_valid {
                            accepted = Some(attempts.len());
                        }
                        attempts.push(Attempt {
                            strategy: GenerationStrategy::TargetedRepair,
                            outfit: outcome.outfit,
                            result,
                        });
                    } else {
                        let mut record = TierRecord::noted(
                            GenerationStrategy::TargetedRepair,
                            "no local fix applies",
                        );
                        record.remaining_errors = outcome.unresolved;
                        tiers.push(record);
                    }
                }
            }
            Err(failure) => {
                debug!(%failure, "primary selection failed, skipping to reassembly");
                tiers.push(TierRecord::noted(
                    GenerationStrategy::Primary,
                    failure.to_string(),
                ));
                selection_failure = Some(failure.to_string());
            }
        }

        if accepted.is_none() {
            let rebuilt = reassembler.reassemble(&constraints, 0).await?;
            if rebuilt.outfit.is_empty() {
                tiers.push(TierRecord::noted(
                    GenerationStrategy::FullReassembly,
                    "store returned no usable items",
                ));
            } else {
                let result = self.pipeline.validate(&rebuilt.outfit, &ctx);
                validation_runs += 1;
                tiers.push(
                    TierRecord::assessed(GenerationStrategy::FullReassembly, &result)
                        .with_note(reassembly_note(&rebuilt)),
                );
                if result.is_valid {
                    accepted = Some(attempts.len());
                }
                attempts.push(Attempt {
                    strategy: GenerationStrategy::FullReassembly,
                    outfit: rebuilt.outfit,
                    result,
                });
            }
        }

        let wanted = variations.min(self.rules.max_variations);
        let mut alternatives: Vec<OutfitVariation> = Vec::new();
        if accepted.is_none() || wanted > 0 {
            let mut seen: Vec<BTreeSet<ItemId>> = attempts
                .iter()
                .map(|attempt| attempt.outfit.item_ids())
                .collect();
            let mut validated = 0usize;

            for offset in 1..=self.rules.max_variations {
                if accepted.is_some() && alternatives.len() >= wanted {
                    break;
                }
                let outfit = match assembler.assemble_ranked(&candidates, &constraints, offset) {
                    Ok(assembly) => assembly.outfit,
                    Err(_) => reassembler.reassemble(&constraints, offset).await?.outfit,
                };
                let ids = outfit.item_ids();
                if outfit.is_empty() || seen.contains(&ids) {
                    continue;
                }
                seen.push(ids);

                let result = self.pipeline.validate(&outfit, &ctx);
                validation_runs += 1;
                validated += 1;
                if accepted.is_none() {
                    if result.is_valid {
                        accepted = Some(attempts.len());
                    }
                    attempts.push(Attempt {
                        strategy: GenerationStrategy::Variation,
                        outfit,
                        result,
                    });
                } else if result.is_valid {
                    alternatives.push(OutfitVariation {
                        outfit_score: outfit.score(),
                        items: outfit.into_items(),
                        severity: result.severity,
                        confidence: result.confidence,
                        warnings: result.warnings,
                    });
                }
            }

            let promoted = accepted
                .map(|index| attempts[index].strategy == GenerationStrategy::Variation)
                .unwrap_or(false);
            let mut record = TierRecord::noted(
                GenerationStrategy::Variation,
                format!(
                    "{validated} variation(s) validated, {} kept as alternatives",
                    alternatives.len()
                ),
            );
            record.accepted = promoted;
            tiers.push(record);
        }

        let (chosen, strategy) = match accepted {
            Some(index) => {
                let chosen = attempts.swap_remove(index);
                let strategy = chosen.strategy;
                (chosen, strategy)
            }
            None => {
                let least_bad = attempts
                    .iter()
                    .enumerate()
                    .min_by_key(|(index, attempt)| (attempt.result.badness(), *index))
                    .map(|(index, _)| index);
                let chosen = match least_bad {
                    Some(index) => attempts.swap_remove(index),
                    None => {
                        let outfit = Outfit::empty();
                        let result = self.pipeline.validate(&outfit, &ctx);
                        validation_runs += 1;
                        Attempt {
                            strategy: GenerationStrategy::EmergencyDefault,
                            outfit,
                            result,
                        }
                    }
                };
                let record =
                    TierRecord::assessed(GenerationStrategy::EmergencyDefault, &chosen.result)
                        .with_note(format!(
                            "returning least-bad {} outfit",
                            chosen.strategy.label()
                        ));
                tiers.push(record);
                (chosen, GenerationStrategy::EmergencyDefault)
            }
        };

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
        for rejection in &rejections {
            *reason_counts
                .entry(rejection.reason.label().to_string())
                .or_default() += 1;
        }
        self.monitor.record(FilteringMetrics {
            recorded_at: Utc::now(),
            items_before: candidates.len(),
            items_after: eligible,
            filter_mode: mode,
            composition_success: chosen.result.is_valid,
            outfit_count: usize::from(chosen.result.is_valid) + alternatives.len(),
            latency_ms,
            strategy: strategy.label().to_string(),
            rejection_reasons: reason_counts,
        });

        info!(
            strategy = strategy.label(),
            items = chosen.outfit.item_count(),
            severity = %chosen.result.severity,
            validation_runs,
            latency_ms,
            "outfit generated"
        );

        let debug = wants_debug.then(|| DebugReport {
            constraints: constraints.clone(),
            candidates_considered: candidates.len(),
            candidates_eligible: eligible,
            rejections,
            selection_failure,
        });
        let Attempt { outfit, result, .. } = chosen;
        Ok(GenerationResponse {
            metadata: GenerationMetadata {
                generation_strategy: strategy,
                item_count: outfit.item_count(),
                outfit_score: outfit.score(),
                is_valid: result.is_valid,
                severity: result.severity,
                confidence: result.confidence,
                filter_mode: mode,
                latency_ms,
            },
            items: outfit.into_items(),
            errors: result.errors,
            warnings: result.warnings,
            suggestions: result.suggestions,
            healing: HealingRecord {
                final_strategy: strategy,
                validation_runs,
                tiers,
            },
            variations: alternatives,
            debug,
        })
    }
}

fn hard_filter_rejections(
    candidates: &[ClothingItem],
    scorer: &ItemScorer<'_>,
    constraints: &Constraints,
) -> Vec<Rejection> {
    candidates
        .iter()
        .filter_map(|item| {
            scorer.rejection(item, constraints).map(|reason| Rejection {
                item_id: item.id.clone(),
                category: item.category(),
                reason,
            })
        })
        .collect()
}

fn repair_record(outcome: &RepairOutcome, result: &ValidationResult) -> TierRecord {
    let mut record = TierRecord::assessed(GenerationStrategy::TargetedRepair, result);
    record.items_fixed = outcome
        .actions
        .iter()
        .map(|action| action.touched_item().clone())
        .collect();
    record.items_replaced = outcome
        .actions
        .iter()
        .filter_map(|action| match action {
            RepairAction::Replaced { removed, .. } => Some(removed.clone()),
            _ => None,
        })
        .collect();
    record.actions = outcome.actions.clone();
    if !outcome.unresolved.is_empty() {
        record.note = Some(format!("{} issue(s) had no local fix", outcome.unresolved.len()));
    }
    record
}

fn reassembly_note(rebuilt: &Reassembly) -> String {
    let relaxed: Vec<String> = rebuilt
        .choices
        .iter()
        .filter(|choice| choice.relaxation != Relaxation::Strict)
        .map(|choice| format!("{} ({})", choice.category, choice.relaxation.label()))
        .collect();
    let missing: Vec<String> = rebuilt
        .missing
        .iter()
        .map(|slot| {
            if slot.conflicts.total() == 0 {
                format!("no candidates for {}", slot.category)
            } else {
                format!("no {} fits the draft ({})", slot.category, slot.conflicts)
            }
        })
        .collect();

    match (relaxed.is_empty(), missing.is_empty()) {
        (true, true) => "rebuilt from store with compiled constraints".to_string(),
        (false, true) => format!("relaxed filters for {}", relaxed.join(", ")),
        (true, false) => missing.join("; "),
        (false, false) => format!(
            "relaxed filters for {}; {}",
            relaxed.join(", "),
            missing.join("; ")
        ),
    }
}

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::compatibility::CompatibilityEngine;
use super::constraints::Constraints;
use super::outfit::Outfit;
use super::rules::StylingRules;
use super::scoring::{ItemScorer, Rejection, RejectionReason};
use crate::wardrobe::domain::{
    ClothingItem, CoreCategory, FormalityLevel, StylePreferences, TemperatureBand,
};

/// Distinct formality levels an assembled outfit may span.
pub const MAX_FORMALITY_LEVELS: usize = 2;

/// Placement attempts allowed when backtracking over required slots.
const SEARCH_BUDGET: usize = 4_096;

/// Explicit "no candidate" outcome branched on by the healing tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionFailure {
    #[error("{}", missing_category_message(.category, .conflicts))]
    MissingCategory {
        category: CoreCategory,
        conflicts: SlotConflicts,
    },
    #[error("only {found} items could be assembled, below the minimum of {required}")]
    BelowMinimum { found: usize, required: usize },
}

fn missing_category_message(category: &CoreCategory, conflicts: &SlotConflicts) -> String {
    if conflicts.total() == 0 {
        format!("no eligible {category} item")
    } else {
        format!("no {category} item fits the draft: {conflicts}")
    }
}

/// Why otherwise eligible candidates for a slot could not join a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotConflicts {
    pub formality_spread: usize,
    pub forbidden_pairing: usize,
    pub composition: usize,
}

impl SlotConflicts {
    pub fn total(&self) -> usize {
        self.formality_spread + self.forbidden_pairing + self.composition
    }

    /// Tally each candidate against `outfit` by the first rule it breaks.
    pub(crate) fn tally<'i, I>(
        outfit: &Outfit,
        candidates: I,
        constraints: &Constraints,
        rules: &StylingRules,
    ) -> Self
    where
        I: IntoIterator<Item = &'i ClothingItem>,
    {
        let mut conflicts = Self::default();
        for candidate in candidates {
            if outfit.contains(&candidate.id) {
                continue;
            }
            if outfit
                .items()
                .any(|chosen| rules.forbidden_between(chosen, candidate).is_some())
            {
                conflicts.forbidden_pairing += 1;
            } else if !keeps_formality_spread(outfit, candidate.formality()) {
                conflicts.formality_spread += 1;
            } else if outfit
                .try_with_item(candidate.clone(), &constraints.category_limits)
                .is_err()
            {
                conflicts.composition += 1;
            }
        }
        conflicts
    }
}

impl fmt::Display for SlotConflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.formality_spread, "would exceed the formality spread"),
            (self.forbidden_pairing, "form a forbidden pairing"),
            (self.composition, "break category limits"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, reason)| format!("{count} candidate(s) {reason}"))
        .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Successful assembly plus the per-candidate filtering trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    pub outfit: Outfit,
    pub rejections: Vec<Rejection>,
    pub considered: usize,
    pub eligible: usize,
}

#[derive(Debug, Clone)]
struct Ranked {
    item: ClothingItem,
    score: f32,
}

/// Greedy, deterministic selection over pre-filtered candidates.
#[derive(Debug, Clone, Copy)]
pub struct OutfitAssembler<'a> {
    rules: &'a StylingRules,
    scorer: ItemScorer<'a>,
}

impl<'a> OutfitAssembler<'a> {
    pub fn new(rules: &'a StylingRules, engine: &'a CompatibilityEngine) -> Self {
        Self {
            rules,
            scorer: ItemScorer::new(rules, engine),
        }
    }

    pub fn with_preferences(mut self, preferences: &'a StylePreferences) -> Self {
        self.scorer = self.scorer.with_preferences(preferences);
        self
    }

    pub fn scorer(&self) -> &ItemScorer<'a> {
        &self.scorer
    }

    pub fn assemble(
        &self,
        candidates: &[ClothingItem],
        constraints: &Constraints,
    ) -> Result<Assembly, SelectionFailure> {
        self.assemble_ranked(candidates, constraints, 0)
    }

    /// Assemble starting each category `rank_offset` places down its ranking,
    /// used to produce distinct secondary-ranked variations.
    pub fn assemble_ranked(
        &self,
        candidates: &[ClothingItem],
        constraints: &Constraints,
        rank_offset: usize,
    ) -> Result<Assembly, SelectionFailure> {
        let mut rejections = Vec::new();
        let mut by_category: BTreeMap<CoreCategory, Vec<Ranked>> = BTreeMap::new();

        for item in candidates {
            if let Some(reason) = self.scorer.rejection(item, constraints) {
                rejections.push(Rejection {
                    item_id: item.id.clone(),
                    category: item.category(),
                    reason,
                });
                continue;
            }
            let score = self.scorer.score(item, constraints);
            by_category.entry(item.category()).or_default().push(Ranked {
                item: item.clone(),
                score,
            });
        }
        for ranked in by_category.values_mut() {
            ranked.sort_by(compare_ranked);
        }
        let eligible: usize = by_category.values().map(Vec::len).sum();

        let separates = self.build(
            &constraints.required_categories,
            &by_category,
            constraints,
            rank_offset,
        );
        let dress = if constraints.dress_allowed && by_category.contains_key(&CoreCategory::Dress) {
            Some(self.build(
                &constraints.dress_path_categories(),
                &by_category,
                constraints,
                rank_offset,
            ))
        } else {
            None
        };

        let chosen = match (separates, dress) {
            (Ok(a), Some(Ok(b))) => {
                if b.outfit.score() > a.outfit.score() {
                    Ok(b)
                } else {
                    Ok(a)
                }
            }
            (Ok(a), _) => Ok(a),
            (Err(_), Some(Ok(b))) => Ok(b),
            (Err(failure), _) => Err(failure),
        };

        match chosen {
            Ok(draft) => {
                rejections.extend(draft.pair_rejections);
                debug!(
                    items = draft.outfit.item_count(),
                    score = draft.outfit.score(),
                    eligible,
                    rank_offset,
                    "assembled outfit"
                );
                Ok(Assembly {
                    outfit: draft.outfit,
                    rejections,
                    considered: candidates.len(),
                    eligible,
                })
            }
            Err(failure) => {
                debug!(%failure, eligible, "assembly failed");
                Err(failure)
            }
        }
    }

    fn build(
        &self,
        required: &[CoreCategory],
        ranked: &BTreeMap<CoreCategory, Vec<Ranked>>,
        constraints: &Constraints,
        rank_offset: usize,
    ) -> Result<Draft, SelectionFailure> {
        let mut draft = Draft::default();

        let pools: Vec<Vec<&Ranked>> = required
            .iter()
            .map(|category| {
                let pool = ranked.get(category).map(Vec::as_slice).unwrap_or(&[]);
                rotated(pool, rank_offset)
            })
            .collect();
        let found = search_slots(&draft.outfit, &pools, |outfit: &Outfit, candidate: &&Ranked| {
            admit(outfit, &candidate.item, constraints, self.rules)
        });

        match found {
            Some((outfit, picks)) => {
                draft.outfit = outfit;
                draft.scores.extend(picks.iter().map(|candidate| candidate.score));
                for candidate in pools.iter().flatten() {
                    if !draft.outfit.contains(&candidate.item.id)
                        && self.forbidden_with_draft(&draft.outfit, &candidate.item).is_some()
                    {
                        draft.note_pair_rejection(&candidate.item);
                    }
                }
            }
            None => {
                for category in required {
                    let pool = ranked.get(category).map(Vec::as_slice).unwrap_or(&[]);
                    if !self.pick(&mut draft, pool, constraints, rank_offset) {
                        let conflicts = SlotConflicts::tally(
                            &draft.outfit,
                            pool.iter().map(|candidate| &candidate.item),
                            constraints,
                            self.rules,
                        );
                        return Err(SelectionFailure::MissingCategory {
                            category: *category,
                            conflicts,
                        });
                    }
                }
            }
        }

        for category in &constraints.optional_categories {
            let wanted = match category {
                CoreCategory::Outerwear => constraints.temperature_band <= TemperatureBand::Mild,
                _ => true,
            };
            if wanted && draft.outfit.count(*category) == 0 {
                let pool = ranked.get(category).map(Vec::as_slice).unwrap_or(&[]);
                self.pick(&mut draft, pool, constraints, rank_offset);
            }
        }

        let min_layers = usize::from(constraints.layering.min_layers);
        while torso_layers(&draft.outfit) < min_layers
            && draft.outfit.item_count() < constraints.max_items
        {
            let layered = [CoreCategory::Tops, CoreCategory::Outerwear]
                .into_iter()
                .any(|category| {
                    let pool = ranked.get(&category).map(Vec::as_slice).unwrap_or(&[]);
                    self.pick(&mut draft, pool, constraints, 0)
                });
            if !layered {
                break;
            }
        }

        let top_up = [
            CoreCategory::Accessories,
            CoreCategory::Outerwear,
            CoreCategory::Tops,
        ];
        for category in top_up {
            if category == CoreCategory::Outerwear
                && constraints.temperature_band == TemperatureBand::Hot
            {
                continue;
            }
            let pool = ranked.get(&category).map(Vec::as_slice).unwrap_or(&[]);
            while draft.outfit.item_count() < constraints.min_items
                && self.pick(&mut draft, pool, constraints, 0)
            {}
        }

        if draft.outfit.item_count() < constraints.min_items {
            return Err(SelectionFailure::BelowMinimum {
                found: draft.outfit.item_count(),
                required: constraints.min_items,
            });
        }

        let score = if draft.scores.is_empty() {
            0.0
        } else {
            draft.scores.iter().sum::<f32>() / draft.scores.len() as f32
        };
        draft.outfit = draft.outfit.with_score(score);
        Ok(draft)
    }

    /// Add the first admissible candidate, scanning from `rank_offset` and
    /// wrapping around. Returns whether an item was added.
    fn pick(
        &self,
        draft: &mut Draft,
        pool: &[Ranked],
        constraints: &Constraints,
        rank_offset: usize,
    ) -> bool {
        if pool.is_empty() || draft.outfit.item_count() >= constraints.max_items {
            return false;
        }
        let start = rank_offset % pool.len();

        for index in (start..pool.len()).chain(0..start) {
            let candidate = &pool[index];
            if draft.outfit.contains(&candidate.item.id) {
                continue;
            }
            if let Some(name) = self.forbidden_with_draft(&draft.outfit, &candidate.item) {
                debug!(item = %candidate.item.id, pair = name, "skipping forbidden pairing");
                draft.note_pair_rejection(&candidate.item);
                continue;
            }
            if !keeps_formality_spread(&draft.outfit, candidate.item.formality()) {
                continue;
            }
            if let Ok(next) = draft
                .outfit
                .try_with_item(candidate.item.clone(), &constraints.category_limits)
            {
                draft.outfit = next;
                draft.scores.push(candidate.score);
                return true;
            }
        }
        false
    }

    fn forbidden_with_draft(&self, outfit: &Outfit, candidate: &ClothingItem) -> Option<&'a str> {
        let rules = self.rules;
        outfit
            .items()
            .find_map(|chosen| rules.forbidden_between(chosen, candidate))
            .map(|combination| combination.name.as_str())
    }
}

#[derive(Debug, Default)]
struct Draft {
    outfit: Outfit,
    scores: Vec<f32>,
    pair_rejections: Vec<Rejection>,
}

impl Draft {
    fn note_pair_rejection(&mut self, item: &ClothingItem) {
        if self.pair_rejections.iter().any(|rejection| rejection.item_id == item.id) {
            return;
        }
        self.pair_rejections.push(Rejection {
            item_id: item.id.clone(),
            category: item.category(),
            reason: RejectionReason::ForbiddenPairing,
        });
    }
}

fn compare_ranked(a: &Ranked, b: &Ranked) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.item.id.cmp(&b.item.id))
}

fn rotated<T>(pool: &[T], offset: usize) -> Vec<&T> {
    if pool.is_empty() {
        return Vec::new();
    }
    let start = offset % pool.len();
    pool[start..].iter().chain(&pool[..start]).collect()
}

/// First complete assignment of one candidate per slot, in pool order.
///
/// Earlier slots are revisited when a later slot has nothing admissible, so
/// an early pick can no longer strand the rest of the outfit. Returns `None`
/// when no assignment exists or the search budget runs out.
pub(crate) fn search_slots<T, F>(
    base: &Outfit,
    pools: &[Vec<T>],
    admit: F,
) -> Option<(Outfit, Vec<T>)>
where
    T: Clone,
    F: Fn(&Outfit, &T) -> Option<Outfit>,
{
    let mut budget = SEARCH_BUDGET;
    let mut picks = Vec::with_capacity(pools.len());
    descend(base, pools, &admit, &mut budget, &mut picks).map(|outfit| (outfit, picks))
}

fn descend<T, F>(
    outfit: &Outfit,
    pools: &[Vec<T>],
    admit: &F,
    budget: &mut usize,
    picks: &mut Vec<T>,
) -> Option<Outfit>
where
    T: Clone,
    F: Fn(&Outfit, &T) -> Option<Outfit>,
{
    let Some((pool, rest)) = pools.split_first() else {
        return Some(outfit.clone());
    };
    for candidate in pool {
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        if let Some(next) = admit(outfit, candidate) {
            picks.push(candidate.clone());
            if let Some(done) = descend(&next, rest, admit, budget, picks) {
                return Some(done);
            }
            picks.pop();
        }
    }
    None
}

/// `outfit` plus `candidate` if the pair rules, formality spread and
/// category caps all allow it.
pub(crate) fn admit(
    outfit: &Outfit,
    candidate: &ClothingItem,
    constraints: &Constraints,
    rules: &StylingRules,
) -> Option<Outfit> {
    if outfit.contains(&candidate.id) {
        return None;
    }
    if outfit
        .items()
        .any(|chosen| rules.forbidden_between(chosen, candidate).is_some())
    {
        return None;
    }
    if !keeps_formality_spread(outfit, candidate.formality()) {
        return None;
    }
    outfit
        .try_with_item(candidate.clone(), &constraints.category_limits)
        .ok()
}

pub(crate) fn keeps_formality_spread(outfit: &Outfit, level: FormalityLevel) -> bool {
    let mut levels = outfit.formality_levels();
    levels.insert(level);
    levels.len() <= MAX_FORMALITY_LEVELS
}

pub(crate) fn torso_layers(outfit: &Outfit) -> usize {
    outfit
        .items()
        .filter(|item| item.wear_layer().is_torso_layer())
        .count()
}

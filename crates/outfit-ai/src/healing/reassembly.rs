use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use super::store::{ItemFilter, ItemStore, StoreError};
use crate::styling::assembler::{admit, search_slots, torso_layers, SlotConflicts};
use crate::styling::constraints::Constraints;
use crate::styling::outfit::Outfit;
use crate::styling::rules::StylingRules;
use crate::styling::scoring::{ItemScorer, RejectionReason};
use crate::wardrobe::domain::{ClothingItem, CoreCategory, ItemId, TemperatureBand, UserId};

/// How far a slot loosened the compiled filters to find an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    Strict,
    /// Formality window and occasion tags dropped, weather kept.
    IgnoreDressCode,
    /// Anything in the category.
    IgnoreWeather,
}

impl Relaxation {
    const LADDER: [Relaxation; 3] = [
        Relaxation::Strict,
        Relaxation::IgnoreDressCode,
        Relaxation::IgnoreWeather,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::IgnoreDressCode => "ignore_dress_code",
            Self::IgnoreWeather => "ignore_weather",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotChoice {
    pub category: CoreCategory,
    pub item_id: ItemId,
    pub relaxation: Relaxation,
}

/// Required slot left empty, with what kept its candidates out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSlot {
    pub category: CoreCategory,
    pub conflicts: SlotConflicts,
}

/// Outfit rebuilt straight from the store, with the relaxations it needed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reassembly {
    pub outfit: Outfit,
    pub choices: Vec<SlotChoice>,
    pub missing: Vec<MissingSlot>,
}

impl Reassembly {
    pub fn relaxed(&self) -> bool {
        self.choices
            .iter()
            .any(|choice| choice.relaxation != Relaxation::Strict)
    }
}

/// Rebuilds an outfit category by category from store queries, one item
/// per slot by constraint fit, then accessories.
#[derive(Clone, Copy)]
pub struct Reassembler<'a> {
    store: &'a dyn ItemStore,
    user: &'a UserId,
    rules: &'a StylingRules,
    scorer: ItemScorer<'a>,
}

impl<'a> Reassembler<'a> {
    pub fn new(
        store: &'a dyn ItemStore,
        user: &'a UserId,
        rules: &'a StylingRules,
        scorer: ItemScorer<'a>,
    ) -> Self {
        Self {
            store,
            user,
            rules,
            scorer,
        }
    }

    pub async fn reassemble(
        &self,
        constraints: &Constraints,
        rank_offset: usize,
    ) -> Result<Reassembly, StoreError> {
        let separates = self
            .fill(&constraints.required_categories, constraints, rank_offset)
            .await?;
        let needs_dress = separates
            .missing
            .iter()
            .any(|slot| matches!(slot.category, CoreCategory::Tops | CoreCategory::Bottoms));

        let chosen = if needs_dress && constraints.dress_allowed {
            let dress = self
                .fill(&constraints.dress_path_categories(), constraints, rank_offset)
                .await?;
            if dress.missing.len() < separates.missing.len() {
                dress
            } else {
                separates
            }
        } else {
            separates
        };

        debug!(
            items = chosen.outfit.item_count(),
            missing = chosen.missing.len(),
            relaxed = chosen.relaxed(),
            rank_offset,
            "reassembled outfit from store"
        );
        Ok(chosen)
    }

    async fn fill(
        &self,
        required: &[CoreCategory],
        constraints: &Constraints,
        rank_offset: usize,
    ) -> Result<Reassembly, StoreError> {
        let mut draft = Reassembly::default();

        let mut pools = Vec::with_capacity(required.len());
        for category in required {
            pools.push(
                self.slot_pool(*category, constraints, rank_offset, Relaxation::IgnoreWeather)
                    .await?,
            );
        }
        let found = search_slots(
            &draft.outfit,
            &pools,
            |outfit: &Outfit, (candidate, _): &(ClothingItem, Relaxation)| {
                admit(outfit, candidate, constraints, self.rules)
            },
        );

        match found {
            Some((outfit, picks)) => {
                draft.outfit = outfit;
                draft.choices = required
                    .iter()
                    .zip(picks)
                    .map(|(category, (item, relaxation))| SlotChoice {
                        category: *category,
                        item_id: item.id,
                        relaxation,
                    })
                    .collect();
            }
            None => {
                for (category, pool) in required.iter().zip(&pools) {
                    let placed = pool.iter().find_map(|(candidate, relaxation)| {
                        admit(&draft.outfit, candidate, constraints, self.rules)
                            .map(|next| (next, candidate.id.clone(), *relaxation))
                    });
                    match placed {
                        Some((next, item_id, relaxation)) => {
                            draft.outfit = next;
                            draft.choices.push(SlotChoice {
                                category: *category,
                                item_id,
                                relaxation,
                            });
                        }
                        None => draft.missing.push(MissingSlot {
                            category: *category,
                            conflicts: SlotConflicts::tally(
                                &draft.outfit,
                                pool.iter().map(|(candidate, _)| candidate),
                                constraints,
                                self.rules,
                            ),
                        }),
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
                self.fill_slot(&mut draft, *category, constraints, rank_offset, Relaxation::Strict)
                    .await?;
            }
        }

        let min_layers = usize::from(constraints.layering.min_layers);
        while torso_layers(&draft.outfit) < min_layers
            && draft.outfit.item_count() < constraints.max_items
        {
            let mut layered = false;
            for category in [CoreCategory::Tops, CoreCategory::Outerwear] {
                if self
                    .fill_slot(&mut draft, category, constraints, 0, Relaxation::Strict)
                    .await?
                {
                    layered = true;
                    break;
                }
            }
            if !layered {
                break;
            }
        }

        for loosest in [Relaxation::Strict, Relaxation::IgnoreDressCode] {
            for category in [
                CoreCategory::Accessories,
                CoreCategory::Outerwear,
                CoreCategory::Tops,
            ] {
                if category == CoreCategory::Outerwear
                    && constraints.temperature_band == TemperatureBand::Hot
                {
                    continue;
                }
                while draft.outfit.item_count() < constraints.min_items
                    && self
                        .fill_slot(&mut draft, category, constraints, 0, loosest)
                        .await?
                {}
            }
        }

        draft.outfit = rescore(&draft.outfit, &self.scorer, constraints);
        Ok(draft)
    }

    /// Walk the relaxation ladder up to `loosest` and place the first
    /// admissible item. Returns whether the slot was filled.
    async fn fill_slot(
        &self,
        draft: &mut Reassembly,
        category: CoreCategory,
        constraints: &Constraints,
        rank_offset: usize,
        loosest: Relaxation,
    ) -> Result<bool, StoreError> {
        if draft.outfit.item_count() >= constraints.max_items {
            return Ok(false);
        }

        for relaxation in Relaxation::LADDER {
            if relaxation > loosest {
                break;
            }
            let filter = filter_for(relaxation, constraints, &draft.outfit);
            let pool = self
                .store
                .query_items(self.user, Some(category), &filter)
                .await?;
            let ranked = self.rank(pool, relaxation, constraints);
            if ranked.is_empty() {
                continue;
            }

            let offset = if relaxation == Relaxation::Strict {
                rank_offset % ranked.len()
            } else {
                0
            };
            for index in (offset..ranked.len()).chain(0..offset) {
                let candidate = &ranked[index];
                if let Some(next) = admit(&draft.outfit, candidate, constraints, self.rules) {
                    draft.outfit = next;
                    draft.choices.push(SlotChoice {
                        category,
                        item_id: candidate.id.clone(),
                        relaxation,
                    });
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Every candidate for `category` up to `loosest`, strictest tier first.
    async fn slot_pool(
        &self,
        category: CoreCategory,
        constraints: &Constraints,
        rank_offset: usize,
        loosest: Relaxation,
    ) -> Result<Vec<(ClothingItem, Relaxation)>, StoreError> {
        let mut pool: Vec<(ClothingItem, Relaxation)> = Vec::new();
        for relaxation in Relaxation::LADDER {
            if relaxation > loosest {
                break;
            }
            let filter = filter_for(relaxation, constraints, &Outfit::empty());
            let found = self
                .store
                .query_items(self.user, Some(category), &filter)
                .await?;
            let mut ranked = self.rank(found, relaxation, constraints);
            ranked.retain(|item| !pool.iter().any(|(seen, _)| seen.id == item.id));
            if relaxation == Relaxation::Strict && !ranked.is_empty() {
                let start = rank_offset % ranked.len();
                ranked.rotate_left(start);
            }
            pool.extend(ranked.into_iter().map(|item| (item, relaxation)));
        }
        Ok(pool)
    }

    fn rank(
        &self,
        pool: Vec<ClothingItem>,
        relaxation: Relaxation,
        constraints: &Constraints,
    ) -> Vec<ClothingItem> {
        let mut scored: Vec<(ClothingItem, f32)> = pool
            .into_iter()
            .filter(|item| match self.scorer.rejection(item, constraints) {
                None => true,
                Some(RejectionReason::DressNotAllowed) => false,
                Some(RejectionReason::FormalityOutOfRange | RejectionReason::OccasionMismatch) => {
                    relaxation >= Relaxation::IgnoreDressCode
                }
                Some(_) => relaxation >= Relaxation::IgnoreWeather,
            })
            .map(|item| {
                let score = self.scorer.score(&item, constraints);
                (item, score)
            })
            .collect();

        let target = constraints.target_formality;
        scored.sort_by(|(a, a_score), (b, b_score)| {
            let by_distance = if relaxation == Relaxation::Strict {
                Ordering::Equal
            } else {
                a.formality()
                    .distance(target)
                    .cmp(&b.formality().distance(target))
            };
            by_distance
                .then_with(|| b_score.total_cmp(a_score))
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.into_iter().map(|(item, _)| item).collect()
    }
}

fn filter_for(relaxation: Relaxation, constraints: &Constraints, outfit: &Outfit) -> ItemFilter {
    let filter = ItemFilter::default().excluding(outfit.item_ids());
    match relaxation {
        Relaxation::Strict => filter
            .within(constraints.min_formality, constraints.max_formality)
            .without_materials(constraints.excluded_materials.iter().cloned()),
        Relaxation::IgnoreDressCode => {
            filter.without_materials(constraints.excluded_materials.iter().cloned())
        }
        Relaxation::IgnoreWeather => filter,
    }
}

/// Mean item score, the same measure the assembler uses.
pub(crate) fn rescore(outfit: &Outfit, scorer: &ItemScorer<'_>, constraints: &Constraints) -> Outfit {
    let count = outfit.item_count();
    let score = if count == 0 {
        0.0
    } else {
        outfit
            .items()
            .map(|item| scorer.score(item, constraints))
            .sum::<f32>()
            / count as f32
    };
    outfit.clone().with_score(score)
}

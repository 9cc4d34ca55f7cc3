use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use super::reassembly::rescore;
use super::store::{ItemFilter, ItemStore, StoreError};
use crate::styling::assembler::admit;
use crate::styling::constraints::Constraints;
use crate::styling::outfit::Outfit;
use crate::styling::rules::StylingRules;
use crate::styling::scoring::ItemScorer;
use crate::validation::{IssueKind, ValidationIssue, ValidationResult};
use crate::wardrobe::domain::{ClothingItem, CoreCategory, ItemId, UserId};

/// One local fix applied by targeted repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    Replaced {
        category: CoreCategory,
        removed: ItemId,
        added: ItemId,
        issue: IssueKind,
    },
    Dropped {
        category: CoreCategory,
        item_id: ItemId,
        issue: IssueKind,
    },
    Added {
        category: CoreCategory,
        item_id: ItemId,
        issue: IssueKind,
    },
}

impl RepairAction {
    pub fn touched_item(&self) -> &ItemId {
        match self {
            Self::Replaced { removed, .. } => removed,
            Self::Dropped { item_id, .. } | Self::Added { item_id, .. } => item_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub outfit: Outfit,
    pub actions: Vec<RepairAction>,
    /// Blocking findings no local fix could address.
    pub unresolved: Vec<String>,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Tier 1: classify each blocking issue and apply a matching local fix.
#[derive(Clone, Copy)]
pub struct TargetedRepair<'a> {
    store: &'a dyn ItemStore,
    user: &'a UserId,
    rules: &'a StylingRules,
    scorer: ItemScorer<'a>,
}

struct Workbench {
    outfit: Outfit,
    actions: Vec<RepairAction>,
    unresolved: Vec<String>,
    retired: BTreeSet<ItemId>,
}

impl<'a> TargetedRepair<'a> {
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

    pub async fn repair(
        &self,
        outfit: &Outfit,
        result: &ValidationResult,
        constraints: &Constraints,
    ) -> Result<RepairOutcome, StoreError> {
        let mut bench = Workbench {
            outfit: outfit.clone(),
            actions: Vec::new(),
            unresolved: Vec::new(),
            retired: BTreeSet::new(),
        };

        for issue in result.blocking_issues() {
            match issue.kind {
                IssueKind::DuplicateCategory => self.drop_extras(&mut bench, issue, constraints),
                IssueKind::LayeringConflict if !issue.item_ids.is_empty() => {
                    self.drop_extras(&mut bench, issue, constraints)
                }
                IssueKind::LayeringConflict => {
                    let added = self.add_layer(&mut bench, issue, constraints).await?;
                    if !added {
                        bench.unresolved.push(issue.message.clone());
                    }
                }
                IssueKind::MissingCategory => {
                    let added = self.add_missing(&mut bench, issue, constraints).await?;
                    if !added {
                        bench.unresolved.push(issue.message.clone());
                    }
                }
                IssueKind::WeatherMismatch
                | IssueKind::StyleConflict
                | IssueKind::OccasionMismatch
                | IssueKind::FormalitySpread
                | IssueKind::ForbiddenCombination
                | IssueKind::MaterialMismatch => {
                    let targets: Vec<ItemId> = if issue.kind == IssueKind::OccasionMismatch {
                        issue.item_ids.clone()
                    } else {
                        issue.item_ids.iter().take(1).cloned().collect()
                    };
                    for target in targets {
                        self.replace(&mut bench, &target, issue, constraints).await?;
                    }
                }
                IssueKind::ColorClash | IssueKind::FitConcern | IssueKind::ValidatorFailure => {
                    bench.unresolved.push(issue.message.clone());
                }
            }
        }

        debug!(
            actions = bench.actions.len(),
            unresolved = bench.unresolved.len(),
            "targeted repair finished"
        );
        Ok(RepairOutcome {
            outfit: rescore(&bench.outfit, &self.scorer, constraints),
            actions: bench.actions,
            unresolved: bench.unresolved,
        })
    }

    fn drop_extras(&self, bench: &mut Workbench, issue: &ValidationIssue, constraints: &Constraints) {
        if issue.item_ids.is_empty() {
            // Too many items overall: shed optional pieces, weakest first.
            let mut optional: Vec<&ClothingItem> = bench
                .outfit
                .items()
                .filter(|item| !constraints.is_required(item.category()))
                .filter(|item| !constraints.is_pinned(&item.id))
                .collect();
            optional.sort_by(|a, b| {
                self.scorer
                    .score(a, constraints)
                    .total_cmp(&self.scorer.score(b, constraints))
                    .then_with(|| b.id.cmp(&a.id))
            });
            let excess = bench.outfit.item_count().saturating_sub(constraints.max_items);
            let doomed: Vec<ClothingItem> = optional.into_iter().take(excess).cloned().collect();
            for item in doomed {
                self.drop_item(bench, &item, issue.kind);
            }
            if bench.outfit.item_count() > constraints.max_items {
                bench.unresolved.push(issue.message.clone());
            }
            return;
        }

        for id in &issue.item_ids {
            if constraints.is_pinned(id) {
                bench
                    .unresolved
                    .push(format!("kept pinned item {id}: {}", issue.message));
                continue;
            }
            if let Some(item) = bench.outfit.find(id).cloned() {
                self.drop_item(bench, &item, issue.kind);
            }
        }
    }

    fn drop_item(&self, bench: &mut Workbench, item: &ClothingItem, issue: IssueKind) {
        let ids: BTreeSet<ItemId> = [item.id.clone()].into_iter().collect();
        bench.outfit = bench.outfit.without(&ids);
        bench.retired.insert(item.id.clone());
        bench.actions.push(RepairAction::Dropped {
            category: item.category(),
            item_id: item.id.clone(),
            issue,
        });
    }

    async fn replace(
        &self,
        bench: &mut Workbench,
        target: &ItemId,
        issue: &ValidationIssue,
        constraints: &Constraints,
    ) -> Result<(), StoreError> {
        let Some(current) = bench.outfit.find(target).cloned() else {
            return Ok(());
        };
        if constraints.is_pinned(target) {
            bench
                .unresolved
                .push(format!("kept pinned item {target}: {}", issue.message));
            return Ok(());
        }

        let category = current.category();
        let ids: BTreeSet<ItemId> = [target.clone()].into_iter().collect();
        let base = bench.outfit.without(&ids);
        let candidates = self
            .candidates(bench, category, constraints, Some(target))
            .await?;

        for candidate in candidates {
            if let Some(next) = admit(&base, &candidate, constraints, self.rules) {
                bench.outfit = next;
                bench.retired.insert(target.clone());
                bench.actions.push(RepairAction::Replaced {
                    category,
                    removed: target.clone(),
                    added: candidate.id.clone(),
                    issue: issue.kind,
                });
                return Ok(());
            }
        }

        if constraints.is_required(category) || category == CoreCategory::Dress {
            bench.unresolved.push(format!(
                "no replacement for {} in {category}: {}",
                current.name, issue.message
            ));
        } else {
            self.drop_item(bench, &current, issue.kind);
        }
        Ok(())
    }

    async fn add_missing(
        &self,
        bench: &mut Workbench,
        issue: &ValidationIssue,
        constraints: &Constraints,
    ) -> Result<bool, StoreError> {
        let categories: Vec<CoreCategory> = match issue.category {
            // Below the item minimum: any top-up category will do.
            Some(CoreCategory::Accessories) | None => vec![
                CoreCategory::Accessories,
                CoreCategory::Outerwear,
                CoreCategory::Tops,
            ],
            Some(category) => vec![category],
        };
        for category in categories {
            if self.add_one(bench, category, issue.kind, constraints).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn add_layer(
        &self,
        bench: &mut Workbench,
        issue: &ValidationIssue,
        constraints: &Constraints,
    ) -> Result<bool, StoreError> {
        for category in [CoreCategory::Tops, CoreCategory::Outerwear] {
            if self.add_one(bench, category, issue.kind, constraints).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn add_one(
        &self,
        bench: &mut Workbench,
        category: CoreCategory,
        issue: IssueKind,
        constraints: &Constraints,
    ) -> Result<bool, StoreError> {
        if bench.outfit.item_count() >= constraints.max_items {
            return Ok(false);
        }
        let candidates = self.candidates(bench, category, constraints, None).await?;
        for candidate in candidates {
            if let Some(next) = admit(&bench.outfit, &candidate, constraints, self.rules) {
                bench.outfit = next;
                bench.actions.push(RepairAction::Added {
                    category,
                    item_id: candidate.id.clone(),
                    issue,
                });
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Store candidates passing the same filters as primary assembly, best
    /// score first.
    async fn candidates(
        &self,
        bench: &Workbench,
        category: CoreCategory,
        constraints: &Constraints,
        replacing: Option<&ItemId>,
    ) -> Result<Vec<ClothingItem>, StoreError> {
        let filter = ItemFilter::default()
            .excluding(bench.outfit.item_ids())
            .excluding(bench.retired.iter().cloned())
            .excluding(replacing.cloned())
            .within(constraints.min_formality, constraints.max_formality)
            .without_materials(constraints.excluded_materials.iter().cloned());
        let pool = self
            .store
            .query_items(self.user, Some(category), &filter)
            .await?;

        let mut ranked: Vec<(ClothingItem, f32)> = pool
            .into_iter()
            .filter(|item| self.scorer.rejection(item, constraints).is_none())
            .map(|item| {
                let score = self.scorer.score(&item, constraints);
                (item, score)
            })
            .collect();
        ranked.sort_by(|(a, a_score), (b, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a.id.cmp(&b.id))
        });
        Ok(ranked.into_iter().map(|(item, _)| item).collect())
    }
}

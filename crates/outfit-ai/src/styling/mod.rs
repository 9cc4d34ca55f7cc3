//! Constraint compilation, candidate scoring and outfit assembly.

pub mod assembler;
pub mod compatibility;
pub mod constraints;
pub mod outfit;
pub mod rules;
pub mod scoring;

pub use assembler::{
    Assembly, OutfitAssembler, SelectionFailure, SlotConflicts, MAX_FORMALITY_LEVELS,
};
pub use compatibility::{Affinity, CompatibilityEngine, CompatibilityGraph};
pub use constraints::{ConstraintCompiler, Constraints};
pub use outfit::{CompositionError, Outfit};
pub use rules::{
    CompatibilityTables, FilterMode, ForbiddenCombination, ItemMatcher, LayeringRequirement,
    RulesError, ScoringWeights, StylingRules, TemperatureThresholds,
};
pub use scoring::{ItemScorer, Rejection, RejectionReason};

//! Self-healing generation.
//!
//! A draft outfit that fails validation is not returned as a failure. The
//! service walks a fixed ladder of tiers (targeted repair, full reassembly
//! from the item store, ranked variations) and, when none of them produces
//! a valid outfit, returns the least-bad attempt with its errors attached.
//! Every tier is recorded so callers can see how the result was reached.

pub mod reassembly;
pub mod repair;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use reassembly::{MissingSlot, Reassembler, Reassembly, Relaxation, SlotChoice};
pub use repair::{RepairAction, RepairOutcome, TargetedRepair};
pub use router::generation_router;
pub use service::{
    DebugReport, GenerationError, GenerationMetadata, GenerationRequest, GenerationResponse,
    GenerationStrategy, HealingRecord, OutfitGenerationService, OutfitVariation, TierRecord,
};
pub use store::{ItemFilter, ItemStore, SnapshotStore, StoreError};

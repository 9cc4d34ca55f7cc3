//! Outfit composition with a self-healing validation pipeline.
//!
//! Raw wardrobe items are normalized into a fixed category taxonomy, a
//! request context is compiled into selection constraints, and a
//! deterministic assembler picks one item per slot. Independent validators
//! judge the draft; failed drafts go through repair, reassembly and
//! variation tiers before the least-bad outfit is returned with its
//! diagnostics. A guardrail monitor watches filter and composition rates
//! for drift.

pub mod config;
pub mod error;
pub mod guardrails;
pub mod healing;
pub mod styling;
pub mod telemetry;
pub mod validation;
pub mod wardrobe;

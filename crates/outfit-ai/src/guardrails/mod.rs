//! Rolling filter and composition metrics with baseline drift alerts.
//!
//! Rule-based matching degrades quietly as tag vocabularies drift. The
//! monitor keeps a bounded history of per-request measurements and raises
//! deduplicated alerts when the recent window strays from an explicitly
//! established baseline. It observes and never gates a request.

pub mod monitor;

pub use monitor::{
    AlertKind, Baseline, FilteringMetrics, GuardrailAlert, GuardrailMonitor, GuardrailStatus,
    MonitorConfig, MonitorError, ReasonShare, RejectionAnalytics, WindowSummary,
};

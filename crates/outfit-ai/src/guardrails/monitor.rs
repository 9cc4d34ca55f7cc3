use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::styling::rules::FilterMode;

/// Immutable per-request measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteringMetrics {
    pub recorded_at: DateTime<Utc>,
    pub items_before: usize,
    pub items_after: usize,
    pub filter_mode: FilterMode,
    pub composition_success: bool,
    pub outfit_count: usize,
    pub latency_ms: u64,
    pub strategy: String,
    pub rejection_reasons: BTreeMap<String, usize>,
}

impl FilteringMetrics {
    /// Share of candidates that survived the hard filters.
    pub fn pass_rate(&self) -> f64 {
        if self.items_before == 0 {
            0.0
        } else {
            self.items_after as f64 / self.items_before as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitorConfig {
    /// Rolling history length; the oldest sample is evicted on overflow.
    pub capacity: usize,
    /// Most recent samples used for status and alerting.
    pub window: usize,
    pub baseline_min_samples: usize,
    /// Composition success below `baseline * success_threshold` alerts.
    pub success_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            window: 100,
            baseline_min_samples: 20,
            success_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WindowSummary {
    pub samples: usize,
    pub pass_rate: f64,
    pub composition_success_rate: f64,
    pub outfits_per_request: f64,
    pub average_latency_ms: f64,
}

impl WindowSummary {
    fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a FilteringMetrics>,
    {
        let mut summary = WindowSummary::default();
        let mut pass = 0.0;
        let mut successes = 0usize;
        let mut outfits = 0usize;
        let mut latency = 0u64;
        for sample in samples {
            summary.samples += 1;
            pass += sample.pass_rate();
            successes += usize::from(sample.composition_success);
            outfits += sample.outfit_count;
            latency += sample.latency_ms;
        }
        if summary.samples > 0 {
            let n = summary.samples as f64;
            summary.pass_rate = pass / n;
            summary.composition_success_rate = successes as f64 / n;
            summary.outfits_per_request = outfits as f64 / n;
            summary.average_latency_ms = latency as f64 / n;
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    pub established_at: DateTime<Utc>,
    pub summary: WindowSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailStatus {
    pub total_recorded: usize,
    pub recent: WindowSummary,
    /// Semantic versus traditional filtering over the same window.
    pub by_mode: BTreeMap<FilterMode, WindowSummary>,
    pub baseline: Option<Baseline>,
    pub active_alerts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CompositionSuccessDrop,
    PassRateSpike,
    OutfitYieldDrop,
}

impl AlertKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CompositionSuccessDrop => "composition_success_drop",
            Self::PassRateSpike => "pass_rate_spike",
            Self::OutfitYieldDrop => "outfit_yield_drop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailAlert {
    pub kind: AlertKind,
    pub message: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonShare {
    pub reason: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionAnalytics {
    pub total_rejections: u64,
    pub reasons: Vec<ReasonShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("baseline needs at least {required} samples, only {available} recorded")]
    InsufficientSamples { required: usize, available: usize },
}

#[derive(Debug, Default)]
struct MonitorState {
    history: VecDeque<FilteringMetrics>,
    baseline: Option<Baseline>,
    alerts: Vec<GuardrailAlert>,
    rejection_counts: BTreeMap<String, u64>,
}

impl MonitorState {
    fn recent(&self, window: usize) -> impl Iterator<Item = &FilteringMetrics> {
        let skip = self.history.len().saturating_sub(window);
        self.history.iter().skip(skip)
    }
}

/// Process-wide rolling quality monitor. One mutex guards the whole state so
/// concurrent requests append and read consistent snapshots.
#[derive(Debug)]
pub struct GuardrailMonitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

impl GuardrailMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn config(&self) -> MonitorConfig {
        self.config
    }

    pub fn record(&self, metrics: FilteringMetrics) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (reason, count) in &metrics.rejection_reasons {
            *state.rejection_counts.entry(reason.clone()).or_default() += *count as u64;
        }
        if self.config.capacity > 0 {
            while state.history.len() >= self.config.capacity {
                state.history.pop_front();
            }
            state.history.push_back(metrics);
        }
        self.check_alerts(&mut state);
    }

    pub fn status(&self) -> GuardrailStatus {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.config.window;
        let recent = WindowSummary::from_samples(state.recent(window));

        let mut by_mode = BTreeMap::new();
        for mode in [FilterMode::Semantic, FilterMode::Traditional] {
            let summary = WindowSummary::from_samples(
                state.recent(window).filter(|sample| sample.filter_mode == mode),
            );
            if summary.samples > 0 {
                by_mode.insert(mode, summary);
            }
        }

        GuardrailStatus {
            total_recorded: state.history.len(),
            recent,
            by_mode,
            baseline: state.baseline.clone(),
            active_alerts: state.alerts.len(),
        }
    }

    /// Snapshot the recent window as the reference point; clears alerts
    /// raised against the previous baseline.
    pub fn establish_baseline(&self) -> Result<Baseline, MonitorError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let summary = WindowSummary::from_samples(state.recent(self.config.window));
        if summary.samples < self.config.baseline_min_samples {
            return Err(MonitorError::InsufficientSamples {
                required: self.config.baseline_min_samples,
                available: summary.samples,
            });
        }

        let baseline = Baseline {
            established_at: Utc::now(),
            summary,
        };
        info!(
            samples = summary.samples,
            pass_rate = summary.pass_rate,
            success_rate = summary.composition_success_rate,
            "guardrail baseline established"
        );
        state.baseline = Some(baseline.clone());
        state.alerts.clear();
        Ok(baseline)
    }

    pub fn alerts(&self) -> Vec<GuardrailAlert> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .alerts
            .clone()
    }

    /// Rejection reasons across every recorded request, most frequent first.
    pub fn debug_reasons(&self, limit: usize) -> RejectionAnalytics {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let total: u64 = state.rejection_counts.values().sum();
        let mut reasons: Vec<ReasonShare> = state
            .rejection_counts
            .iter()
            .map(|(reason, count)| ReasonShare {
                reason: reason.clone(),
                count: *count,
                percentage: if total == 0 {
                    0.0
                } else {
                    *count as f64 * 100.0 / total as f64
                },
            })
            .collect();
        reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
        reasons.truncate(limit);
        RejectionAnalytics {
            total_rejections: total,
            reasons,
        }
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = MonitorState::default();
    }

    fn check_alerts(&self, state: &mut MonitorState) {
        let Some(baseline) = state.baseline.as_ref() else {
            return;
        };
        let reference = baseline.summary;
        let current = WindowSummary::from_samples(state.recent(self.config.window));
        if current.samples < self.config.baseline_min_samples.max(1) {
            return;
        }

        let mut raised = Vec::new();
        let success_floor = reference.composition_success_rate * self.config.success_threshold;
        if current.composition_success_rate < success_floor {
            raised.push((
                AlertKind::CompositionSuccessDrop,
                reference.composition_success_rate,
                current.composition_success_rate,
                format!(
                    "composition success fell to {:.0}% from a baseline of {:.0}%",
                    current.composition_success_rate * 100.0,
                    reference.composition_success_rate * 100.0
                ),
            ));
        }
        if reference.pass_rate > 0.0 && current.pass_rate > reference.pass_rate * 2.0 {
            raised.push((
                AlertKind::PassRateSpike,
                reference.pass_rate,
                current.pass_rate,
                format!(
                    "filter pass rate rose to {:.2} from {:.2}; matching may be too permissive",
                    current.pass_rate, reference.pass_rate
                ),
            ));
        }
        if reference.outfits_per_request > 0.0
            && current.outfits_per_request < reference.outfits_per_request * 0.5
        {
            raised.push((
                AlertKind::OutfitYieldDrop,
                reference.outfits_per_request,
                current.outfits_per_request,
                format!(
                    "outfits per request fell to {:.2} from {:.2}",
                    current.outfits_per_request, reference.outfits_per_request
                ),
            ));
        }

        for (kind, baseline_value, current_value, message) in raised {
            if state.alerts.iter().any(|alert| alert.kind == kind) {
                continue;
            }
            warn!(alert = kind.label(), %message, "guardrail alert raised");
            state.alerts.push(GuardrailAlert {
                kind,
                message,
                baseline_value,
                current_value,
                raised_at: Utc::now(),
            });
        }
    }
}

impl Default for GuardrailMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(before: usize, after: usize, success: bool, outfits: usize) -> FilteringMetrics {
        let mut reasons = BTreeMap::new();
        reasons.insert("formality_out_of_range".to_string(), before - after);
        FilteringMetrics {
            recorded_at: Utc::now(),
            items_before: before,
            items_after: after,
            filter_mode: FilterMode::Semantic,
            composition_success: success,
            outfit_count: outfits,
            latency_ms: 4,
            strategy: "primary".to_string(),
            rejection_reasons: reasons,
        }
    }

    fn monitor(capacity: usize, window: usize, min_samples: usize) -> GuardrailMonitor {
        GuardrailMonitor::new(MonitorConfig {
            capacity,
            window,
            baseline_min_samples: min_samples,
            success_threshold: 0.8,
        })
    }

    #[test]
    fn history_evicts_oldest_beyond_capacity() {
        let monitor = monitor(3, 3, 1);
        for after in 1..=5 {
            monitor.record(sample(10, after, true, 1));
        }
        let status = monitor.status();
        assert_eq!(status.total_recorded, 3);
        assert!((status.recent.pass_rate - 0.4).abs() < 1e-9);
    }

    #[test]
    fn baseline_requires_minimum_samples() {
        let monitor = monitor(10, 10, 3);
        monitor.record(sample(10, 5, true, 1));
        assert_eq!(
            monitor.establish_baseline(),
            Err(MonitorError::InsufficientSamples {
                required: 3,
                available: 1
            })
        );
    }

    #[test]
    fn success_drop_raises_a_single_alert() {
        let monitor = monitor(10, 4, 4);
        for _ in 0..4 {
            monitor.record(sample(10, 5, true, 1));
        }
        monitor.establish_baseline().expect("baseline");

        for _ in 0..4 {
            monitor.record(sample(10, 5, false, 1));
        }
        let alerts = monitor.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::CompositionSuccessDrop);
    }

    #[test]
    fn permissive_filtering_and_low_yield_alert() {
        let monitor = monitor(10, 2, 2);
        monitor.record(sample(10, 2, true, 4));
        monitor.record(sample(10, 2, true, 4));
        monitor.establish_baseline().expect("baseline");

        monitor.record(sample(10, 9, true, 1));
        monitor.record(sample(10, 9, true, 1));
        let kinds: Vec<AlertKind> = monitor.alerts().iter().map(|alert| alert.kind).collect();
        assert_eq!(kinds, vec![AlertKind::PassRateSpike, AlertKind::OutfitYieldDrop]);
    }

    #[test]
    fn debug_reasons_report_percentages() {
        let monitor = monitor(10, 10, 1);
        monitor.record(sample(10, 6, true, 1));
        let mut heavy = sample(10, 10, true, 1);
        heavy.rejection_reasons = [("heavy_material_in_heat".to_string(), 4usize)]
            .into_iter()
            .collect();
        monitor.record(heavy);
        monitor.record(sample(4, 2, true, 1));

        let analytics = monitor.debug_reasons(5);
        assert_eq!(analytics.total_rejections, 10);
        assert_eq!(analytics.reasons[0].reason, "formality_out_of_range");
        assert_eq!(analytics.reasons[0].count, 6);
        assert!((analytics.reasons[0].percentage - 60.0).abs() < 1e-9);

        monitor.reset();
        assert_eq!(monitor.debug_reasons(5).total_rejections, 0);
        assert_eq!(monitor.status().total_recorded, 0);
    }
}

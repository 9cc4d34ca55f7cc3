use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use outfit_ai::guardrails::{AlertKind, FilteringMetrics, GuardrailMonitor, MonitorConfig};
use outfit_ai::healing::{GenerationRequest, OutfitGenerationService, SnapshotStore};
use outfit_ai::styling::{FilterMode, StylingRules};
use outfit_ai::wardrobe::{ClothingItem, ItemId, ItemMetadata, UserId, Weather};

fn metrics(success: bool) -> FilteringMetrics {
    FilteringMetrics {
        recorded_at: Utc::now(),
        items_before: 10,
        items_after: 6,
        filter_mode: FilterMode::Semantic,
        composition_success: success,
        outfit_count: usize::from(success),
        latency_ms: 3,
        strategy: "primary".to_string(),
        rejection_reasons: BTreeMap::from([("occasion_mismatch".to_string(), 4)]),
    }
}

fn item(id: &str, name: &str) -> ClothingItem {
    ClothingItem {
        id: ItemId(id.to_string()),
        name: name.to_string(),
        item_type: String::new(),
        owner_id: UserId("guardrail-user".to_string()),
        metadata: ItemMetadata::default(),
    }
}

fn request(occasion: &str) -> GenerationRequest {
    GenerationRequest {
        occasion: occasion.to_string(),
        weather: Weather {
            temperature_f: 72.0,
            ..Weather::default()
        },
        user_id: Some(UserId("guardrail-user".to_string())),
        ..GenerationRequest::default()
    }
}

#[test]
fn concurrent_recording_keeps_a_consistent_history() {
    let monitor = Arc::new(GuardrailMonitor::new(MonitorConfig {
        capacity: 64,
        window: 32,
        baseline_min_samples: 1,
        success_threshold: 0.8,
    }));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                for _ in 0..25 {
                    monitor.record(metrics(worker % 2 == 0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finished");
    }

    let status = monitor.status();
    assert_eq!(status.total_recorded, 64);
    assert_eq!(status.recent.samples, 32);
    assert_eq!(monitor.debug_reasons(5).total_rejections, 8 * 25 * 4);
}

#[tokio::test]
async fn failing_generations_raise_a_drift_alert_once() {
    let wardrobe = vec![
        item("shirt", "Cotton dress shirt"),
        item("trousers", "Dress trousers"),
        item("oxfords", "Oxford shoes"),
    ];
    let monitor = Arc::new(GuardrailMonitor::new(MonitorConfig {
        capacity: 50,
        window: 3,
        baseline_min_samples: 3,
        success_threshold: 0.8,
    }));
    let service = OutfitGenerationService::new(
        Arc::new(SnapshotStore::new(wardrobe)),
        Arc::new(StylingRules::default()),
        Arc::clone(&monitor),
    );

    for _ in 0..3 {
        let response = service
            .generate(request("business"))
            .await
            .expect("business outfit");
        assert!(response.metadata.is_valid, "{:?}", response.errors);
    }
    let baseline = monitor.establish_baseline().expect("baseline established");
    assert!((baseline.summary.composition_success_rate - 1.0).abs() < f64::EPSILON);
    assert!(monitor.alerts().is_empty());

    for _ in 0..4 {
        let response = service
            .generate(request("athletic"))
            .await
            .expect("athletic request still answers");
        assert!(!response.metadata.is_valid);
    }

    let alerts = monitor.alerts();
    let drops = alerts
        .iter()
        .filter(|alert| alert.kind == AlertKind::CompositionSuccessDrop)
        .count();
    assert_eq!(drops, 1);
    assert!(alerts
        .iter()
        .any(|alert| alert.kind == AlertKind::OutfitYieldDrop));
    assert_eq!(monitor.status().active_alerts, alerts.len());

    monitor.reset();
    assert_eq!(monitor.status().total_recorded, 0);
    assert!(monitor.alerts().is_empty());
}

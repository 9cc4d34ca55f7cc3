use std::collections::BTreeSet;
use std::sync::Arc;

use outfit_ai::guardrails::GuardrailMonitor;
use outfit_ai::healing::{
    GenerationRequest, GenerationResponse, GenerationStrategy, OutfitGenerationService,
    SnapshotStore,
};
use outfit_ai::styling::{RejectionReason, StylingRules, MAX_FORMALITY_LEVELS};
use outfit_ai::wardrobe::{
    ClothingItem, CoreCategory, FormalityLevel, ItemId, UserId, WardrobeImporter, Weather,
};

const OWNER: &str = "closet-owner";

fn sample_wardrobe() -> Vec<ClothingItem> {
    let data = include_str!("../sample_wardrobe.csv");
    WardrobeImporter::from_reader(data.as_bytes(), &UserId(OWNER.to_string()))
        .expect("sample wardrobe imports")
}

fn service() -> OutfitGenerationService<SnapshotStore> {
    OutfitGenerationService::new(
        Arc::new(SnapshotStore::new(sample_wardrobe())),
        Arc::new(StylingRules::default()),
        Arc::new(GuardrailMonitor::default()),
    )
}

fn request(occasion: &str, temperature_f: f32) -> GenerationRequest {
    GenerationRequest {
        occasion: occasion.to_string(),
        weather: Weather {
            temperature_f,
            ..Weather::default()
        },
        user_id: Some(UserId(OWNER.to_string())),
        ..GenerationRequest::default()
    }
}

fn count(response: &GenerationResponse, category: CoreCategory) -> usize {
    response
        .items
        .iter()
        .filter(|item| item.category() == category)
        .count()
}

fn assert_composition_invariants(response: &GenerationResponse, rules: &StylingRules) {
    assert!(response.items.len() <= rules.max_items);
    for category in CoreCategory::ordered() {
        assert!(
            count(response, category) <= rules.category_limit(category),
            "{category} over its cap"
        );
    }
    if count(response, CoreCategory::Dress) > 0 {
        assert_eq!(count(response, CoreCategory::Tops), 0);
        assert_eq!(count(response, CoreCategory::Bottoms), 0);
    }

    if response.metadata.is_valid {
        let levels: BTreeSet<FormalityLevel> =
            response.items.iter().map(ClothingItem::formality).collect();
        assert!(levels.len() <= MAX_FORMALITY_LEVELS, "{levels:?}");
        for (index, first) in response.items.iter().enumerate() {
            for second in &response.items[index + 1..] {
                assert!(
                    rules.forbidden_between(first, second).is_none(),
                    "{} with {}",
                    first.name,
                    second.name
                );
            }
        }
    }
}

#[tokio::test]
async fn business_outfit_in_heat_skips_heavy_fabrics() {
    let rules = StylingRules::default();
    let response = service()
        .generate(request("business", 90.0))
        .await
        .expect("generation succeeds");

    assert!(response.metadata.is_valid, "{:?}", response.errors);
    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::Primary
    );
    assert!(response.items.iter().all(|item| !item.is_heavy(&rules)));
    assert_eq!(count(&response, CoreCategory::Tops), 1);
    assert_eq!(count(&response, CoreCategory::Bottoms), 1);
    assert_eq!(count(&response, CoreCategory::Shoes), 1);
    assert_composition_invariants(&response, &rules);
}

#[tokio::test]
async fn freezing_casual_outfit_covers_up() {
    let rules = StylingRules::default();
    let response = service()
        .generate(request("casual", 35.0))
        .await
        .expect("generation succeeds");

    assert!(!response.items.is_empty());
    assert!(response
        .items
        .iter()
        .all(|item| !rules.is_cold_exposure(item)));
    assert_composition_invariants(&response, &rules);
}

#[tokio::test]
async fn every_occasion_yields_a_bounded_outfit() {
    let rules = StylingRules::default();
    let service = service();
    for (occasion, temperature_f) in [
        ("date", 75.0),
        ("athletic", 80.0),
        ("beach", 92.0),
        ("wedding", 55.0),
        ("weekend", 45.0),
        ("gala", 65.0),
    ] {
        let response = service
            .generate(request(occasion, temperature_f))
            .await
            .expect("generation answers");
        assert!(
            !response.healing.tiers.is_empty(),
            "{occasion} recorded no tiers"
        );
        assert_eq!(
            response.healing.final_strategy,
            response.metadata.generation_strategy
        );
        assert_composition_invariants(&response, &rules);
    }
    assert_eq!(service.monitor().status().total_recorded, 6);
}

#[tokio::test]
async fn pinned_heavy_item_skips_the_heat_filter() {
    let mut pinned = request("casual", 90.0);
    pinned.pinned_items = vec![ItemId("top-merino".to_string())];
    pinned.debug = true;

    let response = service().generate(pinned).await.expect("generation succeeds");

    let debug = response.debug.expect("debug report requested");
    let rejected = |id: &str| {
        debug
            .rejections
            .iter()
            .find(|rejection| rejection.item_id.0 == id)
            .map(|rejection| rejection.reason)
    };
    assert_eq!(rejected("top-merino"), None);
    assert_eq!(
        rejected("outer-puffer"),
        Some(RejectionReason::HeavyMaterialInHeat)
    );
}

#[tokio::test]
async fn generation_is_deterministic() {
    let first = service()
        .generate(request("date", 72.0))
        .await
        .expect("first run");
    let second = service()
        .generate(request("date", 72.0))
        .await
        .expect("second run");

    assert_eq!(first.items, second.items);
    assert_eq!(
        first.metadata.generation_strategy,
        second.metadata.generation_strategy
    );
}

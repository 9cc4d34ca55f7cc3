use super::common::*;
use crate::healing::service::{GenerationError, GenerationRequest, GenerationStrategy};
use crate::healing::store::StoreError;
use crate::healing::RepairAction;
use crate::validation::IssueKind;
use crate::wardrobe::domain::{UserId, Weather};

#[tokio::test]
async fn clean_primary_outfit_is_returned_without_healing() {
    let service = build_service(MemoryStore::default());

    let response = service
        .generate(inline_request("business", 90.0, business_wardrobe()))
        .await
        .expect("generation succeeds");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::Primary
    );
    assert!(response.metadata.is_valid);
    assert!(response.errors.is_empty());
    let chosen = ids(&response.items);
    assert!(!chosen.contains(&"blazer".to_string()), "wool in heat: {chosen:?}");
    assert!(!chosen.contains(&"sneakers".to_string()), "too casual: {chosen:?}");
    assert_eq!(response.healing.validation_runs, 1);
    assert_eq!(response.healing.tiers.len(), 1);
    assert_eq!(response.metadata.item_count, response.items.len());
}

#[tokio::test]
async fn targeted_repair_swaps_the_flagged_item() {
    let service = build_flagging_service(MemoryStore::default(), "shirt");

    let response = service
        .generate(inline_request("business", 90.0, business_wardrobe()))
        .await
        .expect("generation succeeds");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::TargetedRepair
    );
    assert!(response.metadata.is_valid);
    let chosen = ids(&response.items);
    assert!(chosen.contains(&"blouse".to_string()), "{chosen:?}");
    assert!(!chosen.contains(&"shirt".to_string()), "{chosen:?}");

    let repair = response
        .healing
        .tiers
        .iter()
        .find(|tier| tier.tier == GenerationStrategy::TargetedRepair)
        .expect("repair tier recorded");
    assert!(repair.accepted);
    assert_eq!(repair.items_replaced, vec![id("shirt")]);
    assert!(matches!(
        repair.actions.as_slice(),
        [RepairAction::Replaced {
            issue: IssueKind::StyleConflict,
            ..
        }]
    ));
    assert_eq!(response.healing.validation_runs, 2);
}

#[tokio::test]
async fn hopeless_wardrobe_falls_back_to_least_bad_outfit() {
    let service = build_service(MemoryStore::default());

    let response = service
        .generate(inline_request("athletic", 72.0, formal_only_wardrobe()))
        .await
        .expect("generation still answers");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::EmergencyDefault
    );
    assert!(!response.metadata.is_valid);
    assert!(!response.errors.is_empty());
    assert!(!response.items.is_empty());
    let last = response.healing.tiers.last().expect("tiers recorded");
    assert_eq!(last.tier, GenerationStrategy::EmergencyDefault);
    assert!(last.note.is_some());
    assert!(response
        .healing
        .tiers
        .iter()
        .any(|tier| tier.tier == GenerationStrategy::FullReassembly));
}

#[tokio::test]
async fn variations_are_distinct_from_the_main_outfit() {
    let service = build_service(MemoryStore::default());
    let mut request = inline_request("business", 90.0, deep_business_wardrobe());
    request.variations = 2;

    let response = service.generate(request).await.expect("generation succeeds");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::Primary
    );
    assert!(!response.variations.is_empty());
    assert!(response.variations.len() <= 2);
    let main = ids(&response.items);
    for variation in &response.variations {
        assert_ne!(ids(&variation.items), main);
    }
}

#[tokio::test]
async fn stored_wardrobe_is_queried_for_the_user() {
    let service = build_service(MemoryStore::with_wardrobe(OWNER, business_wardrobe()));

    let response = service
        .generate(stored_request("business", 90.0, OWNER))
        .await
        .expect("generation succeeds");

    assert!(response.metadata.is_valid);
    assert_eq!(response.items.len(), 3);
}

#[tokio::test]
async fn unknown_user_propagates_store_error() {
    let service = build_service(MemoryStore::with_wardrobe(OWNER, business_wardrobe()));

    match service.generate(stored_request("business", 90.0, "stranger")).await {
        Err(GenerationError::Store(StoreError::UnknownUser(user))) => assert_eq!(user, "stranger"),
        other => panic!("expected unknown user, got {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_store_is_reported() {
    let service = build_service(UnavailableStore);

    let result = service
        .generate(stored_request("business", 90.0, OWNER))
        .await;
    assert!(matches!(
        result,
        Err(GenerationError::Store(StoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn empty_wardrobe_is_rejected() {
    let service = build_service(MemoryStore::default());

    let result = service
        .generate(inline_request("casual", 70.0, Vec::new()))
        .await;
    assert!(matches!(result, Err(GenerationError::EmptyWardrobe)));
}

#[tokio::test]
async fn request_without_user_or_wardrobe_is_rejected() {
    let service = build_service(MemoryStore::default());

    let result = service.generate(request("casual", 70.0)).await;
    assert!(matches!(result, Err(GenerationError::MissingUser)));
}

#[tokio::test]
async fn implausible_weather_is_rejected_before_any_query() {
    let service = build_service(UnavailableStore);
    let request = GenerationRequest {
        weather: Weather {
            temperature_f: 451.0,
            ..Weather::default()
        },
        user_id: Some(UserId(OWNER.to_string())),
        ..request("casual", 70.0)
    };

    let result = service.generate(request).await;
    assert!(matches!(result, Err(GenerationError::InvalidContext(_))));
}

#[tokio::test]
async fn blank_occasion_is_rejected() {
    let service = build_service(MemoryStore::default());

    let result = service
        .generate(inline_request("  ", 70.0, business_wardrobe()))
        .await;
    assert!(matches!(result, Err(GenerationError::InvalidContext(_))));
}

#[tokio::test]
async fn every_generation_is_recorded_by_the_monitor() {
    let service = build_service(MemoryStore::default());

    service
        .generate(inline_request("business", 90.0, business_wardrobe()))
        .await
        .expect("first generation");
    service
        .generate(inline_request("athletic", 72.0, formal_only_wardrobe()))
        .await
        .expect("second generation");

    let status = service.monitor().status();
    assert_eq!(status.total_recorded, 2);
    assert_eq!(status.recent.samples, 2);
    assert!((status.recent.composition_success_rate - 0.5).abs() < f64::EPSILON);

    let analytics = service.monitor().debug_reasons(10);
    assert!(analytics.total_rejections > 0);
}

#[tokio::test]
async fn debug_report_lists_hard_filter_rejections() {
    let service = build_service(MemoryStore::default());
    let mut request = inline_request("business", 90.0, business_wardrobe());
    request.debug = true;

    let response = service.generate(request).await.expect("generation succeeds");

    let debug = response.debug.expect("debug report requested");
    assert_eq!(debug.candidates_considered, 6);
    assert!(debug.candidates_eligible < debug.candidates_considered);
    assert!(debug
        .rejections
        .iter()
        .any(|rejection| rejection.item_id == id("blazer")));
    assert!(debug.selection_failure.is_none());
}

#[tokio::test]
async fn business_in_heat_returns_the_light_core_outfit() {
    let service = build_service(MemoryStore::default());
    let wardrobe = vec![
        item("blazer", "Wool blazer", Some("wool")),
        item("shirt", "Cotton dress shirt", Some("cotton")),
        item("pants", "Dress pants", None),
        item("oxfords", "Oxford shoes", None),
        item("sneakers", "Sneakers", None),
    ];

    let response = service
        .generate(inline_request("business", 90.0, wardrobe))
        .await
        .expect("generation succeeds");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::Primary
    );
    assert!(response.metadata.is_valid, "{:?}", response.errors);
    let mut chosen = ids(&response.items);
    chosen.sort();
    assert_eq!(chosen, vec!["oxfords", "pants", "shirt"]);
}

#[tokio::test]
async fn formal_wardrobe_for_athletic_occasion_is_flagged_not_passed_off() {
    let service = build_service(MemoryStore::default());
    let wardrobe = vec![
        item("suit", "Suit", Some("wool")),
        item("oxfords", "Oxford shoes", None),
        item("heels", "Heels", None),
    ];

    let response = service
        .generate(inline_request("athletic", 72.0, wardrobe))
        .await
        .expect("generation still answers");

    assert_eq!(
        response.metadata.generation_strategy,
        GenerationStrategy::EmergencyDefault
    );
    assert!(!response.metadata.is_valid);
    assert!(
        response
            .errors
            .iter()
            .any(|error| error == "occasion: no athletic-appropriate items in the outfit"),
        "{:?}",
        response.errors
    );
}

#[tokio::test]
async fn stranded_shoes_are_recovered_without_emergency_fallback() {
    let service = build_service(MemoryStore::default());

    let response = service
        .generate(inline_request("business casual", 75.0, stranded_loafers_wardrobe()))
        .await
        .expect("generation succeeds");

    assert!(response.metadata.is_valid, "{:?}", response.errors);
    assert_ne!(
        response.metadata.generation_strategy,
        GenerationStrategy::EmergencyDefault
    );
    let chosen = ids(&response.items);
    assert!(chosen.contains(&"loafers".to_string()), "{chosen:?}");
}

#[tokio::test]
async fn tier_notes_name_the_formality_spread() {
    let service = build_service(MemoryStore::default());

    let response = service
        .generate(inline_request("business casual", 75.0, three_level_wardrobe()))
        .await
        .expect("generation still answers");

    let tiers = &response.healing.tiers;
    assert_eq!(tiers[0].tier, GenerationStrategy::Primary);
    let primary = tiers[0].note.as_deref().unwrap_or_default();
    assert!(primary.contains("no shoes item fits the draft"), "{primary}");
    assert!(primary.contains("formality spread"), "{primary}");

    let reassembly = tiers
        .iter()
        .find(|tier| tier.tier == GenerationStrategy::FullReassembly)
        .and_then(|tier| tier.note.as_deref())
        .expect("reassembly tier noted");
    assert!(reassembly.contains("no shoes fits the draft"), "{reassembly}");
    assert!(reassembly.contains("formality spread"), "{reassembly}");
    assert!(!reassembly.contains("no candidates for shoes"), "{reassembly}");
}

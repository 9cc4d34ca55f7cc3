use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::guardrails::{GuardrailMonitor, MonitorConfig};
use crate::healing::service::{GenerationRequest, OutfitGenerationService};
use crate::healing::store::{ItemFilter, ItemStore, SnapshotStore, StoreError};
use crate::styling::outfit::Outfit;
use crate::styling::rules::StylingRules;
use crate::validation::{
    ColorHarmonyValidator, FitValidator, FormalityValidator, IssueKind, LayeringValidator,
    MaterialValidator, OccasionValidator, OutfitValidator, Severity, StyleValidator,
    ValidationContext, ValidationIssue, ValidationPipeline, ValidationResult, ValidatorError,
    WeatherValidator,
};
use crate::wardrobe::domain::{
    ClothingItem, CoreCategory, ItemId, ItemMetadata, UserId, VisualAttributes, Weather,
};

pub(super) const OWNER: &str = "user-1";

pub(super) fn owner() -> UserId {
    UserId(OWNER.to_string())
}

/// Raw, un-normalized item; stores normalize on the way in.
pub(super) fn item(id: &str, name: &str, material: Option<&str>) -> ClothingItem {
    ClothingItem {
        id: ItemId(id.to_string()),
        name: name.to_string(),
        item_type: String::new(),
        owner_id: owner(),
        metadata: ItemMetadata {
            visual_attributes: material.map(|material| VisualAttributes {
                material: Some(material.to_string()),
                ..VisualAttributes::default()
            }),
            ..ItemMetadata::default()
        },
    }
}

pub(super) fn id(value: &str) -> ItemId {
    ItemId(value.to_string())
}

pub(super) fn ids(items: &[ClothingItem]) -> Vec<String> {
    items.iter().map(|item| item.id.0.clone()).collect()
}

pub(super) fn outfit_ids(outfit: &Outfit) -> Vec<String> {
    outfit.items().map(|item| item.id.0.clone()).collect()
}

pub(super) fn business_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("blazer", "Wool blazer", Some("wool")),
        item("shirt", "Cotton dress shirt", Some("cotton")),
        item("blouse", "Linen blouse", Some("linen")),
        item("pants", "Dress pants", None),
        item("oxfords", "Oxford shoes", None),
        item("sneakers", "Sneakers", None),
    ]
}

/// Two business-ready pieces per required category.
pub(super) fn deep_business_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("shirt", "Cotton dress shirt", Some("cotton")),
        item("linen-shirt", "Linen dress shirt", Some("linen")),
        item("pants", "Dress pants", None),
        item("slacks", "Cotton slacks", Some("cotton")),
        item("oxfords", "Oxford shoes", None),
        item("brogues", "Brogues", None),
    ]
}

pub(super) fn formal_only_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("suit-jacket", "Suit jacket", Some("wool")),
        item("shirt", "Cotton dress shirt", Some("cotton")),
        item("trousers", "Dress trousers", None),
        item("oxfords", "Oxford shoes", None),
        item("tie", "Silk tie", Some("silk")),
    ]
}

/// Six dress shirts that outrank the one shirt the loafers can pair with.
pub(super) fn stranded_loafers_wardrobe() -> Vec<ClothingItem> {
    let mut wardrobe: Vec<ClothingItem> = (1..=6)
        .map(|n| item(&format!("dress-shirt-{n}"), "Cotton dress shirt", Some("cotton")))
        .collect();
    wardrobe.push(item("striped-shirt", "Striped cotton shirt", Some("cotton")));
    wardrobe.push(item("olive-pants", "Olive cotton pants", Some("cotton")));
    wardrobe.push(item("loafers", "Suede loafers", Some("suede")));
    wardrobe
}

/// One piece per required slot, each at a different formality level.
pub(super) fn three_level_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("shirt", "Cotton dress shirt", Some("cotton")),
        item("olive-pants", "Olive cotton pants", Some("cotton")),
        item("loafers", "Suede loafers", Some("suede")),
    ]
}

pub(super) fn request(occasion: &str, temperature_f: f32) -> GenerationRequest {
    GenerationRequest {
        occasion: occasion.to_string(),
        weather: Weather {
            temperature_f,
            ..Weather::default()
        },
        ..GenerationRequest::default()
    }
}

pub(super) fn inline_request(
    occasion: &str,
    temperature_f: f32,
    wardrobe: Vec<ClothingItem>,
) -> GenerationRequest {
    GenerationRequest {
        wardrobe: Some(wardrobe),
        ..request(occasion, temperature_f)
    }
}

pub(super) fn stored_request(occasion: &str, temperature_f: f32, user: &str) -> GenerationRequest {
    GenerationRequest {
        user_id: Some(UserId(user.to_string())),
        ..request(occasion, temperature_f)
    }
}

pub(super) fn monitor() -> Arc<GuardrailMonitor> {
    Arc::new(GuardrailMonitor::new(MonitorConfig {
        baseline_min_samples: 2,
        window: 10,
        ..MonitorConfig::default()
    }))
}

pub(super) fn build_service<S: ItemStore + 'static>(store: S) -> OutfitGenerationService<S> {
    OutfitGenerationService::new(
        Arc::new(store),
        Arc::new(StylingRules::default()),
        monitor(),
    )
}

pub(super) fn build_flagging_service<S: ItemStore + 'static>(
    store: S,
    flagged: &'static str,
) -> OutfitGenerationService<S> {
    OutfitGenerationService::with_pipeline(
        Arc::new(store),
        Arc::new(StylingRules::default()),
        flagging_pipeline(flagged),
        monitor(),
    )
}

/// The standard validators plus one that always objects to `flagged`.
pub(super) fn flagging_pipeline(flagged: &'static str) -> ValidationPipeline {
    ValidationPipeline::with_validators(vec![
        Box::new(WeatherValidator),
        Box::new(OccasionValidator),
        Box::new(StyleValidator),
        Box::new(LayeringValidator),
        Box::new(FormalityValidator),
        Box::new(ColorHarmonyValidator),
        Box::new(MaterialValidator),
        Box::new(FitValidator),
        Box::new(FlagItem(flagged)),
    ])
}

pub(super) struct FlagItem(pub(super) &'static str);

impl OutfitValidator for FlagItem {
    fn name(&self) -> &'static str {
        "flag"
    }

    fn validate(
        &self,
        outfit: &Outfit,
        _ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ValidatorError> {
        let issues = outfit
            .items()
            .filter(|item| item.id.0 == self.0)
            .map(|item| ValidationIssue {
                validator: self.name().to_string(),
                kind: IssueKind::StyleConflict,
                severity: Severity::High,
                message: format!("{} is not wanted", item.name),
                item_ids: vec![item.id.clone()],
                category: Some(item.category()),
            })
            .collect();
        Ok(ValidationResult::from_issues(issues, Vec::new()))
    }
}

/// Per-user wardrobes behind the store seam.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    wardrobes: Arc<HashMap<UserId, SnapshotStore>>,
}

impl MemoryStore {
    pub(super) fn with_wardrobe(user: &str, items: Vec<ClothingItem>) -> Self {
        let mut wardrobes = HashMap::new();
        wardrobes.insert(UserId(user.to_string()), SnapshotStore::new(items));
        Self {
            wardrobes: Arc::new(wardrobes),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn query_items(
        &self,
        user: &UserId,
        category: Option<CoreCategory>,
        filter: &ItemFilter,
    ) -> Result<Vec<ClothingItem>, StoreError> {
        match self.wardrobes.get(user) {
            Some(wardrobe) => wardrobe.query_items(user, category, filter).await,
            None => Err(StoreError::UnknownUser(user.0.clone())),
        }
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl ItemStore for UnavailableStore {
    async fn query_items(
        &self,
        _user: &UserId,
        _category: Option<CoreCategory>,
        _filter: &ItemFilter,
    ) -> Result<Vec<ClothingItem>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use outfit_ai::wardrobe::{
    normalize_item, ClothingItem, CoreCategory, ItemId, ItemMetadata, UserId, VisualAttributes,
};
use proptest::prelude::*;
use proptest::test_runner::Config;

const NAMES: &[&str] = &[
    "Wool blazer",
    "Linen tee",
    "Dress pants",
    "Oxford shoes",
    "Slip dress",
    "Puffer jacket",
    "Leather belt",
    "Mystery object",
    "Running shorts",
    "Cashmere cardigan",
];

fn raw_item() -> impl Strategy<Value = ClothingItem> {
    (
        prop::sample::select(NAMES),
        "[a-z ]{0,12}",
        prop::option::of("[A-Za-z ]{1,10}"),
        prop::collection::vec("[A-Za-z _-]{0,10}", 0..4),
        prop::collection::vec("[A-Za-z ]{0,8}", 0..3),
    )
        .prop_map(|(name, item_type, material, occasion, colors)| ClothingItem {
            id: ItemId(format!("{name}-{item_type}")),
            name: name.to_string(),
            item_type,
            owner_id: UserId("prop-user".to_string()),
            metadata: ItemMetadata {
                visual_attributes: material.map(|material| VisualAttributes {
                    material: Some(material),
                    ..VisualAttributes::default()
                }),
                occasion,
                colors,
                ..ItemMetadata::default()
            },
        })
}

proptest! {
    #![proptest_config(Config::with_cases(256))]
    #[test]
    fn normalization_is_idempotent(item in raw_item()) {
        let once = normalize_item(item);
        let twice = normalize_item(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn every_item_lands_in_one_category(item in raw_item()) {
        let normalized = normalize_item(item);
        prop_assert!(normalized.metadata.core_category.is_some());
        prop_assert!(CoreCategory::ordered().contains(&normalized.category()));
        prop_assert!(normalized.attributes().and_then(|attrs| attrs.formal_level).is_some());
    }

    #[test]
    fn normalized_tags_are_lowercase(item in raw_item()) {
        let tags = normalize_item(item).tags();
        for tag in tags.occasion.iter() {
            prop_assert_eq!(tag.clone(), tag.to_lowercase());
            prop_assert!(!tag.is_empty());
        }
    }
}

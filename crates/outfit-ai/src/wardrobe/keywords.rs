//! Ingestion-time keyword tables.
//!
//! These tables only classify raw uploads; runtime matching goes through the
//! category enum and the compatibility graph.

use super::domain::{CoreCategory, FormalityLevel};

/// Ordered phrase table: multi-word phrases first so `dress shirt` wins over
/// `dress`, then single words by category precedence.
pub(crate) const CATEGORY_KEYWORDS: &[(&str, CoreCategory)] = &[
    ("dress shirt", CoreCategory::Tops),
    ("dress pants", CoreCategory::Bottoms),
    ("dress trousers", CoreCategory::Bottoms),
    ("dress shoes", CoreCategory::Shoes),
    ("dress shoe", CoreCategory::Shoes),
    ("shirt dress", CoreCategory::Dress),
    ("sweater dress", CoreCategory::Dress),
    ("sport coat", CoreCategory::Outerwear),
    ("suit jacket", CoreCategory::Outerwear),
    ("running shoes", CoreCategory::Shoes),
    ("flip flops", CoreCategory::Shoes),
    ("tank top", CoreCategory::Tops),
    ("crop top", CoreCategory::Tops),
    ("button-down", CoreCategory::Tops),
    ("t-shirt", CoreCategory::Tops),
    ("dress", CoreCategory::Dress),
    ("dresses", CoreCategory::Dress),
    ("gown", CoreCategory::Dress),
    ("jumpsuit", CoreCategory::Dress),
    ("romper", CoreCategory::Dress),
    ("pants", CoreCategory::Bottoms),
    ("trousers", CoreCategory::Bottoms),
    ("jeans", CoreCategory::Bottoms),
    ("shorts", CoreCategory::Bottoms),
    ("skirt", CoreCategory::Bottoms),
    ("leggings", CoreCategory::Bottoms),
    ("chinos", CoreCategory::Bottoms),
    ("joggers", CoreCategory::Bottoms),
    ("sweatpants", CoreCategory::Bottoms),
    ("slacks", CoreCategory::Bottoms),
    ("blazer", CoreCategory::Outerwear),
    ("jacket", CoreCategory::Outerwear),
    ("coat", CoreCategory::Outerwear),
    ("parka", CoreCategory::Outerwear),
    ("cardigan", CoreCategory::Outerwear),
    ("suit", CoreCategory::Outerwear),
    ("tuxedo", CoreCategory::Outerwear),
    ("trench", CoreCategory::Outerwear),
    ("windbreaker", CoreCategory::Outerwear),
    ("poncho", CoreCategory::Outerwear),
    ("shirt", CoreCategory::Tops),
    ("tee", CoreCategory::Tops),
    ("blouse", CoreCategory::Tops),
    ("sweater", CoreCategory::Tops),
    ("sweatshirt", CoreCategory::Tops),
    ("hoodie", CoreCategory::Tops),
    ("polo", CoreCategory::Tops),
    ("tank", CoreCategory::Tops),
    ("camisole", CoreCategory::Tops),
    ("top", CoreCategory::Tops),
    ("pullover", CoreCategory::Tops),
    ("jumper", CoreCategory::Tops),
    ("turtleneck", CoreCategory::Tops),
    ("henley", CoreCategory::Tops),
    ("shoe", CoreCategory::Shoes),
    ("shoes", CoreCategory::Shoes),
    ("sneaker", CoreCategory::Shoes),
    ("sneakers", CoreCategory::Shoes),
    ("boot", CoreCategory::Shoes),
    ("boots", CoreCategory::Shoes),
    ("heels", CoreCategory::Shoes),
    ("oxford", CoreCategory::Shoes),
    ("oxfords", CoreCategory::Shoes),
    ("loafer", CoreCategory::Shoes),
    ("loafers", CoreCategory::Shoes),
    ("sandal", CoreCategory::Shoes),
    ("sandals", CoreCategory::Shoes),
    ("flats", CoreCategory::Shoes),
    ("pumps", CoreCategory::Shoes),
    ("trainers", CoreCategory::Shoes),
    ("mules", CoreCategory::Shoes),
    ("slides", CoreCategory::Shoes),
    ("belt", CoreCategory::Accessories),
    ("scarf", CoreCategory::Accessories),
    ("hat", CoreCategory::Accessories),
    ("cap", CoreCategory::Accessories),
    ("bag", CoreCategory::Accessories),
    ("watch", CoreCategory::Accessories),
    ("necklace", CoreCategory::Accessories),
    ("bracelet", CoreCategory::Accessories),
    ("earrings", CoreCategory::Accessories),
    ("tie", CoreCategory::Accessories),
    ("sunglasses", CoreCategory::Accessories),
    ("gloves", CoreCategory::Accessories),
];

/// Names containing these are open layers and sit over a top.
pub(crate) const LAYERING_KEYWORDS: &[&str] = &[
    "open-front",
    "open front",
    "wrap",
    "kimono",
    "duster",
    "shacket",
    "shrug",
    "bolero",
];

/// Type keywords that override a declared bottoms flag.
pub(crate) const SWEATER_FAMILY: &[&str] =
    &["sweater", "sweatshirt", "pullover", "jumper", "hoodie"];

/// Checked top-down; the first tier with a matching phrase wins.
pub(crate) const FORMALITY_KEYWORDS: &[(FormalityLevel, &[&str])] = &[
    (
        FormalityLevel::BlackTie,
        &["tuxedo", "tux", "gown", "tailcoat", "evening gown"],
    ),
    (
        FormalityLevel::Business,
        &[
            "suit",
            "blazer",
            "sport coat",
            "dress shirt",
            "dress pants",
            "dress trousers",
            "dress shoes",
            "oxford",
            "oxfords",
            "heels",
            "pumps",
            "slacks",
            "tie",
            "brogues",
        ],
    ),
    (
        FormalityLevel::BusinessCasual,
        &[
            "chinos",
            "loafer",
            "loafers",
            "blouse",
            "polo",
            "button-down",
            "pencil skirt",
            "trousers",
            "cardigan",
            "turtleneck",
        ],
    ),
    (
        FormalityLevel::Casual,
        &[
            "t-shirt",
            "tee",
            "jeans",
            "shorts",
            "sneaker",
            "sneakers",
            "hoodie",
            "sweatshirt",
            "leggings",
            "joggers",
            "sweatpants",
            "flip flops",
            "sandals",
            "tank",
            "tank top",
            "athletic",
            "running",
            "trainers",
            "cap",
            "slides",
        ],
    ),
];

/// Occasion tags that pin an item's formality when no keyword matched.
pub(crate) const OCCASION_TAG_FORMALITY: &[(&str, FormalityLevel)] = &[
    ("black tie", FormalityLevel::BlackTie),
    ("gala", FormalityLevel::BlackTie),
    ("formal", FormalityLevel::Business),
    ("business", FormalityLevel::Business),
    ("business casual", FormalityLevel::BusinessCasual),
    ("work", FormalityLevel::BusinessCasual),
    ("athletic", FormalityLevel::Casual),
    ("gym", FormalityLevel::Casual),
    ("casual", FormalityLevel::Casual),
];

/// Material keyword to canonical material.
pub(crate) const MATERIAL_KEYWORDS: &[(&str, &str)] = &[
    ("cashmere", "cashmere"),
    ("merino", "wool"),
    ("wool", "wool"),
    ("woolen", "wool"),
    ("tweed", "tweed"),
    ("fleece", "fleece"),
    ("down", "down"),
    ("puffer", "down"),
    ("sherpa", "sherpa"),
    ("shearling", "shearling"),
    ("corduroy", "corduroy"),
    ("velvet", "velvet"),
    ("linen", "linen"),
    ("cotton", "cotton"),
    ("silk", "silk"),
    ("satin", "satin"),
    ("chiffon", "chiffon"),
    ("denim", "denim"),
    ("leather", "leather"),
    ("suede", "suede"),
    ("canvas", "canvas"),
    ("polyester", "polyester"),
    ("nylon", "nylon"),
    ("seersucker", "seersucker"),
    ("mesh", "mesh"),
    ("jersey", "jersey"),
    ("rayon", "rayon"),
];

/// Lower-case, fold separators, and collapse whitespace for tag values.
pub fn normalize_tag(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let folded = cleaned.to_lowercase().replace(['_', '-'], " ");
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split free text into words, keeping hyphenated words intact.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word phrase containment (`"oxford"` matches `"Oxford shoes"` but not
/// `"Oxfordshire"`).
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let haystack = tokenize(text);
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

pub fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(text, phrase))
}

pub(crate) fn category_for_text(text: &str) -> Option<CoreCategory> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(phrase, _)| contains_phrase(text, phrase))
        .map(|(_, category)| *category)
}

pub(crate) fn formality_for_text(text: &str) -> Option<FormalityLevel> {
    FORMALITY_KEYWORDS
        .iter()
        .find(|(_, phrases)| contains_any(text, phrases))
        .map(|(level, _)| *level)
}

pub(crate) fn material_for_text(text: &str) -> Option<&'static str> {
    MATERIAL_KEYWORDS
        .iter()
        .find(|(keyword, _)| contains_phrase(text, keyword))
        .map(|(_, material)| *material)
}

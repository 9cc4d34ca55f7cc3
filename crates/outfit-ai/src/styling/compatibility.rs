use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::rules::{CompatibilityTables, FilterMode};
use crate::wardrobe::keywords::normalize_tag;

/// Graded match between a requested value and an item's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Affinity {
    Mismatch,
    Untagged,
    Adjacent,
    Exact,
}

impl Affinity {
    pub const fn weight(self) -> f32 {
        match self {
            Self::Exact => 1.0,
            Self::Adjacent => 0.6,
            Self::Untagged => 0.5,
            Self::Mismatch => 0.0,
        }
    }

    pub const fn is_match(self) -> bool {
        !matches!(self, Self::Mismatch)
    }
}

/// Adjacency map from a canonical value to the values interchangeable with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
    symmetric: bool,
}

impl CompatibilityGraph {
    /// Build from a raw table. Every node is compatible with itself; with
    /// `enforce_symmetry` each edge is mirrored.
    pub fn from_table(table: &BTreeMap<String, Vec<String>>, enforce_symmetry: bool) -> Self {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (key, values) in table {
            let key = normalize_tag(key);
            if key.is_empty() {
                continue;
            }
            let entry = adjacency.entry(key.clone()).or_default();
            entry.insert(key.clone());
            for value in values {
                let value = normalize_tag(value);
                if !value.is_empty() {
                    entry.insert(value);
                }
            }
        }

        if enforce_symmetry {
            let edges: Vec<(String, String)> = adjacency
                .iter()
                .flat_map(|(from, targets)| {
                    targets
                        .iter()
                        .filter(move |to| *to != from)
                        .map(move |to| (to.clone(), from.clone()))
                })
                .collect();
            for (from, to) in edges {
                let entry = adjacency.entry(from.clone()).or_default();
                entry.insert(from);
                entry.insert(to);
            }
        }

        Self {
            adjacency,
            symmetric: enforce_symmetry,
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// One-way edges `(a, b)`: `a` lists `b` but `b` does not list `a`.
    pub fn asymmetric_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (from, targets) in &self.adjacency {
            for to in targets {
                if to == from {
                    continue;
                }
                let mirrored = self
                    .adjacency
                    .get(to)
                    .map(|back| back.contains(from))
                    .unwrap_or(false);
                if !mirrored {
                    pairs.push((from.clone(), to.clone()));
                }
            }
        }
        pairs
    }

    /// Values considered interchangeable with `value` (always includes it).
    pub fn neighborhood(&self, value: &str) -> BTreeSet<String> {
        let value = normalize_tag(value);
        if value.is_empty() {
            return BTreeSet::new();
        }
        self.adjacency
            .get(&value)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([value]))
    }

    pub fn compatible(&self, requested: &str, candidate: &str) -> bool {
        let requested = normalize_tag(requested);
        let candidate = normalize_tag(candidate);
        requested == candidate
            || self
                .adjacency
                .get(&requested)
                .map(|targets| targets.contains(&candidate))
                .unwrap_or(false)
    }

    pub fn affinity(&self, requested: &str, tags: &BTreeSet<String>, mode: FilterMode) -> Affinity {
        let requested = normalize_tag(requested);
        if requested.is_empty() || tags.is_empty() {
            return Affinity::Untagged;
        }
        if tags.contains(&requested) {
            return Affinity::Exact;
        }
        if mode == FilterMode::Semantic {
            if let Some(targets) = self.adjacency.get(&requested) {
                if tags.iter().any(|tag| targets.contains(tag)) {
                    return Affinity::Adjacent;
                }
            }
        }
        Affinity::Mismatch
    }

    pub fn matches(&self, requested: &str, tags: &BTreeSet<String>, mode: FilterMode) -> bool {
        self.affinity(requested, tags, mode).is_match()
    }
}

/// Style, occasion and mood graphs consulted during filtering and scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityEngine {
    style: CompatibilityGraph,
    occasion: CompatibilityGraph,
    mood: CompatibilityGraph,
    mode: FilterMode,
}

impl CompatibilityEngine {
    pub fn new(tables: &CompatibilityTables, mode: FilterMode) -> Self {
        let engine = Self {
            style: CompatibilityGraph::from_table(&tables.style, tables.enforce_symmetry),
            occasion: CompatibilityGraph::from_table(&tables.occasion, tables.enforce_symmetry),
            mood: CompatibilityGraph::from_table(&tables.mood, tables.enforce_symmetry),
            mode,
        };

        if !tables.enforce_symmetry {
            for (name, graph) in [
                ("style", &engine.style),
                ("occasion", &engine.occasion),
                ("mood", &engine.mood),
            ] {
                let one_way = graph.asymmetric_pairs().len();
                if one_way > 0 {
                    debug!(table = name, one_way, "compatibility table keeps directed edges");
                }
            }
        }

        engine
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn style_graph(&self) -> &CompatibilityGraph {
        &self.style
    }

    pub fn occasion_graph(&self) -> &CompatibilityGraph {
        &self.occasion
    }

    pub fn mood_graph(&self) -> &CompatibilityGraph {
        &self.mood
    }

    pub fn style_matches(&self, requested: &str, tags: &BTreeSet<String>) -> bool {
        self.style.matches(requested, tags, self.mode)
    }

    pub fn occasion_matches(&self, requested: &str, tags: &BTreeSet<String>) -> bool {
        self.occasion.matches(requested, tags, self.mode)
    }

    pub fn mood_matches(&self, requested: &str, tags: &BTreeSet<String>) -> bool {
        self.mood.matches(requested, tags, self.mode)
    }

    pub fn style_affinity(&self, requested: &str, tags: &BTreeSet<String>) -> Affinity {
        self.style.affinity(requested, tags, self.mode)
    }

    pub fn occasion_affinity(&self, requested: &str, tags: &BTreeSet<String>) -> Affinity {
        self.occasion.affinity(requested, tags, self.mode)
    }

    pub fn mood_affinity(&self, requested: &str, tags: &BTreeSet<String>) -> Affinity {
        self.mood.affinity(requested, tags, self.mode)
    }

    pub fn style_neighborhood(&self, style: &str) -> BTreeSet<String> {
        match self.mode {
            FilterMode::Semantic => self.style.neighborhood(style),
            FilterMode::Traditional => {
                let style = normalize_tag(style);
                if style.is_empty() {
                    BTreeSet::new()
                } else {
                    BTreeSet::from([style])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styling::rules::StylingRules;

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn table() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([
            (
                "classic".to_string(),
                vec!["preppy".to_string(), "minimalist".to_string()],
            ),
            ("minimalist".to_string(), vec!["modern".to_string()]),
        ])
    }

    #[test]
    fn exact_match_wins_before_adjacency() {
        let graph = CompatibilityGraph::from_table(&table(), true);
        assert_eq!(
            graph.affinity("classic", &tags(&["classic", "preppy"]), FilterMode::Semantic),
            Affinity::Exact
        );
        assert_eq!(
            graph.affinity("classic", &tags(&["preppy"]), FilterMode::Semantic),
            Affinity::Adjacent
        );
        assert_eq!(
            graph.affinity("classic", &tags(&["grunge"]), FilterMode::Semantic),
            Affinity::Mismatch
        );
        assert_eq!(
            graph.affinity("classic", &BTreeSet::new(), FilterMode::Semantic),
            Affinity::Untagged
        );
    }

    #[test]
    fn symmetric_graph_mirrors_edges() {
        let graph = CompatibilityGraph::from_table(&table(), true);
        assert!(graph.compatible("classic", "preppy"));
        assert!(graph.compatible("preppy", "classic"));
        assert!(graph.compatible("modern", "minimalist"));
        assert!(graph.asymmetric_pairs().is_empty());
    }

    #[test]
    fn directed_graph_keeps_one_way_edges() {
        let graph = CompatibilityGraph::from_table(&table(), false);
        assert!(graph.compatible("classic", "preppy"));
        assert!(!graph.compatible("preppy", "classic"));
        let pairs = graph.asymmetric_pairs();
        assert!(pairs.contains(&("classic".to_string(), "preppy".to_string())));
        assert!(pairs.contains(&("minimalist".to_string(), "modern".to_string())));
        // classic -> minimalist is one-way too: minimalist does not list classic.
        assert!(pairs.contains(&("classic".to_string(), "minimalist".to_string())));
    }

    #[test]
    fn traditional_mode_ignores_adjacency() {
        let graph = CompatibilityGraph::from_table(&table(), true);
        assert!(!graph.matches("classic", &tags(&["preppy"]), FilterMode::Traditional));
        assert!(graph.matches("classic", &tags(&["classic"]), FilterMode::Traditional));
    }

    #[test]
    fn athletic_occasion_accepts_casual_items() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, FilterMode::Semantic);
        assert!(engine.occasion_matches("athletic", &tags(&["casual"])));
        assert!(engine.occasion_matches("athletic", &tags(&["everyday"])));
        assert!(!engine.occasion_matches("athletic", &tags(&["black tie"])));
        // Mirrored by symmetry enforcement.
        assert!(engine.occasion_graph().compatible("gym", "athletic"));
    }

    #[test]
    fn requested_values_are_tag_normalized() {
        let rules = StylingRules::default();
        let engine = CompatibilityEngine::new(&rules.compatibility, FilterMode::Semantic);
        assert!(engine.occasion_matches("Black-Tie", &tags(&["gala"])));
        assert!(engine.style_neighborhood("Classic").contains("preppy"));
    }
}

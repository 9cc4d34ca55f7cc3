use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use outfit_ai::error::AppError;
use outfit_ai::healing::{ItemFilter, ItemStore, StoreError};
use outfit_ai::styling::rules::FilterMode;
use outfit_ai::wardrobe::domain::{ClothingItem, CoreCategory, UserId};
use outfit_ai::wardrobe::import::WardrobeImporter;
use outfit_ai::wardrobe::normalizer::normalize_wardrobe;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Per-user wardrobes held in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryItemStore {
    wardrobes: Arc<Mutex<HashMap<UserId, Vec<ClothingItem>>>>,
}

impl InMemoryItemStore {
    fn guard(&self) -> MutexGuard<'_, HashMap<UserId, Vec<ClothingItem>>> {
        self.wardrobes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the user's wardrobe; items are normalized on the way in.
    pub(crate) fn insert_wardrobe(&self, user: UserId, items: Vec<ClothingItem>) -> usize {
        let mut items = normalize_wardrobe(items);
        items.sort_by(|a, b| a.id.cmp(&b.id));
        let count = items.len();
        self.guard().insert(user, items);
        count
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn query_items(
        &self,
        user: &UserId,
        category: Option<CoreCategory>,
        filter: &ItemFilter,
    ) -> Result<Vec<ClothingItem>, StoreError> {
        let guard = self.guard();
        let wardrobe = guard
            .get(user)
            .ok_or_else(|| StoreError::UnknownUser(user.0.clone()))?;
        Ok(wardrobe
            .iter()
            .filter(|item| category.map_or(true, |wanted| item.category() == wanted))
            .filter(|item| filter.admits(item))
            .cloned()
            .collect())
    }
}

/// Reads a wardrobe export: CSV by extension, a JSON item array otherwise.
pub(crate) fn load_wardrobe(path: &Path, owner: &UserId) -> Result<Vec<ClothingItem>, AppError> {
    let is_csv = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| extension.eq_ignore_ascii_case("csv"));

    if is_csv {
        return Ok(WardrobeImporter::from_path(path, owner)?);
    }

    let raw = std::fs::read_to_string(path)?;
    let mut items: Vec<ClothingItem> = serde_json::from_str(&raw)?;
    for item in &mut items {
        if item.owner_id.0.is_empty() {
            item.owner_id = owner.clone();
        }
    }
    Ok(items)
}

pub(crate) fn parse_filter_mode(raw: &str) -> Result<FilterMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "semantic" => Ok(FilterMode::Semantic),
        "traditional" => Ok(FilterMode::Traditional),
        other => Err(format!(
            "unknown filter mode '{other}', expected semantic or traditional"
        )),
    }
}

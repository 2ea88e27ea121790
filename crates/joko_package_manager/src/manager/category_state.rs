use joko_package_models::package::PackSet;
use ordered_hash_map::OrderedHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CATEGORY_STATE_FILE_NAME: &str = "category_state.json";

/// What the user toggled for one pack. Categories are keyed by their full dotted name.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackState {
    #[serde(rename = "_enabled")]
    pub enabled: bool,
    pub categories: OrderedHashMap<String, bool>,
}

/// Enabled flags of every pack, keyed by pack name. Survives reloads and restarts.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryState(pub OrderedHashMap<String, PackState>);

impl CategoryState {
    /// Lenient reading: entries that are not booleans are skipped instead of rejecting the file.
    pub fn from_json(content: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| format!("invalid category state: {e}"))?;
        let serde_json::Value::Object(packs) = value else {
            return Err("category state is not an object".to_string());
        };
        let mut state = CategoryState::default();
        for (pack_name, pack_value) in packs {
            let mut pack_state = PackState {
                enabled: true,
                categories: OrderedHashMap::new(),
            };
            if let Some(enabled) = pack_value.get("_enabled").and_then(|v| v.as_bool()) {
                pack_state.enabled = enabled;
            }
            if let Some(serde_json::Value::Object(categories)) = pack_value.get("categories") {
                for (path, enabled) in categories {
                    match enabled.as_bool() {
                        Some(enabled) => {
                            pack_state.categories.insert(path.clone(), enabled);
                        }
                        None => debug!(%path, "ignoring non boolean category state"),
                    }
                }
            }
            state.0.insert(pack_name, pack_state);
        }
        Ok(state)
    }

    pub fn load(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).unwrap_or_else(|e| {
                warn!(%e, "failed to parse category state, starting from defaults");
                Self::default()
            }),
            Err(e) => {
                info!(?e, path = %path.display(), "no category state");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &std::path::Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize category state: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("failed to write category state: {e}"))
    }

    /// Restores the saved flags on a freshly built set. Unknown packs and paths are ignored.
    pub fn apply(&self, set: &mut PackSet) {
        for pack in set.packs.iter_mut() {
            let Some(pack_state) = self.0.get(&pack.name) else {
                continue;
            };
            pack.enabled = pack_state.enabled;
            for (path, enabled) in pack_state.categories.iter() {
                pack.categories.set_enabled(path, *enabled);
            }
        }
    }

    /// Records the flags of every pack of `set`. Packs absent from `set` keep their entry.
    pub fn capture(&mut self, set: &PackSet) {
        for pack in set.packs.iter() {
            let mut categories = OrderedHashMap::new();
            for (path, category) in pack.categories.walk() {
                categories.insert(path, category.enabled);
            }
            self.0.insert(
                pack.name.clone(),
                PackState {
                    enabled: pack.enabled,
                    categories,
                },
            );
        }
    }
}

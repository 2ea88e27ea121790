use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// User tunables read by the renderer each frame. Distances are in world units, sizes in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub render_markers: bool,
    pub render_trails: bool,
    pub marker_opacity: f32,
    pub trail_opacity: f32,
    pub marker_scale: f32,
    /// nothing is drawn beyond this, whatever the pack says
    pub max_render_distance: f32,
    pub fade_start_distance: f32,
    pub min_screen_size: f32,
    pub max_screen_size: f32,
    pub trail_width: f32,
    /// trails get thinner with distance instead of keeping a fixed pixel width
    pub trail_perspective_scale: bool,
    pub show_debug_info: bool,
    pub auto_hide_in_combat: bool,
    pub auto_hide_on_mount: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            render_markers: true,
            render_trails: true,
            marker_opacity: 1.0,
            trail_opacity: 0.8,
            marker_scale: 1.0,
            max_render_distance: 5000.0,
            fade_start_distance: 3000.0,
            min_screen_size: 8.0,
            max_screen_size: 64.0,
            trail_width: 0.5,
            trail_perspective_scale: true,
            show_debug_info: false,
            auto_hide_in_combat: false,
            auto_hide_on_mount: false,
        }
    }
}

impl RenderSettings {
    /// Missing or broken files give the defaults.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                info!(?e, path = %path.display(), "no settings file, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(%e, path = %path.display(), "invalid settings file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("failed to serialize settings: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("failed to write settings: {e}"))
    }
}

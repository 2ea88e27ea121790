use joko_package_models::package::PackSet;
use joko_render_models::{
    DrawPrimitive, FrameInput, RenderSettings, RenderStatus, TextureProvider,
};
use tracing::trace;

use crate::billboard::BillBoardRenderer;
use crate::marker::marker_object;
use crate::math::Projection;
use crate::trail::trail_ribbon;

/// Per frame pipeline: filters the packs for the current map, projects, fades and sizes
/// everything, and keeps the resulting draw list until the next frame.
///
/// Never fails, bad camera or viewport values simply give an empty frame.
#[derive(Debug, Default)]
pub struct PathingRenderer {
    billboards: BillBoardRenderer,
    status: RenderStatus,
}

impl PathingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &RenderStatus {
        &self.status
    }

    /// Draw list of the last rendered frame, in submission order.
    pub fn primitives(&self) -> impl Iterator<Item = &DrawPrimitive> + '_ {
        self.billboards.primitives()
    }

    pub fn render_frame(
        &mut self,
        packs: &PackSet,
        input: &FrameInput,
        settings: &RenderSettings,
        textures: &dyn TextureProvider,
        loading: bool,
    ) -> &RenderStatus {
        self.billboards.begin();
        self.status = RenderStatus {
            packs_loaded: packs.len(),
            loading,
            ..Default::default()
        };
        if let Some(projection) = self.frame_projection(input, settings) {
            self.build(&projection, packs, input.map_id, settings, textures);
        }
        self.billboards.swap();
        self.status.markers_drawn = self.billboards.markers.len();
        &self.status
    }

    fn frame_projection(&self, input: &FrameInput, settings: &RenderSettings) -> Option<Projection> {
        if input.map_id == 0 {
            trace!("not in a map");
            return None;
        }
        if (settings.auto_hide_in_combat && input.in_combat)
            || (settings.auto_hide_on_mount && input.mounted)
        {
            trace!("auto hidden");
            return None;
        }
        if !settings.render_markers && !settings.render_trails {
            return None;
        }
        let camera = input.camera.as_ref()?;
        let projection = Projection::new(camera, input.viewport_width, input.viewport_height);
        if projection.is_none() {
            trace!(?camera, input.viewport_width, input.viewport_height, "unusable camera or viewport");
        }
        projection
    }

    fn build(
        &mut self,
        projection: &Projection,
        packs: &PackSet,
        map_id: u32,
        settings: &RenderSettings,
        textures: &dyn TextureProvider,
    ) {
        if settings.render_trails {
            for trail in packs.trails_for_map(map_id) {
                self.status.trails_considered += 1;
                let quads = trail_ribbon(trail, projection, settings, textures);
                if !quads.is_empty() {
                    self.status.trails_drawn += 1;
                    self.billboards.extend_trails(quads);
                }
            }
        }
        if settings.render_markers {
            for marker in packs.markers_for_map(map_id) {
                self.status.markers_considered += 1;
                if let Some(object) = marker_object(marker, projection, settings, textures) {
                    self.billboards.add_marker(object);
                }
            }
        }
    }
}

use joko_render_models::DrawPrimitive;
use tracing::trace;

use crate::marker::MarkerObject;

/// Double buffered output of the renderer.
/// A frame is built in the work in progress lists, then [`BillBoardRenderer::swap`] makes it the visible one.
#[derive(Debug, Default)]
pub struct BillBoardRenderer {
    pub markers: Vec<MarkerObject>,
    pub trails: Vec<DrawPrimitive>,
    markers_wip: Vec<MarkerObject>, //work in progress: this is where the markers are inserted
    trails_wip: Vec<DrawPrimitive>, //work in progress: this is where the trail quads are inserted
}

impl BillBoardRenderer {
    pub fn begin(&mut self) {
        trace!("Begin with a fresh list of markers and trails");
        self.markers_wip.clear();
        self.trails_wip.clear();
    }
    pub fn add_marker(&mut self, marker: MarkerObject) {
        self.markers_wip.push(marker);
    }
    pub fn extend_trails(&mut self, quads: Vec<DrawPrimitive>) {
        self.trails_wip.extend(quads);
    }
    pub fn swap(&mut self) {
        trace!(
            "swap to display {} markers, {} trail quads",
            self.markers_wip.len(),
            self.trails_wip.len()
        );
        self.markers = std::mem::take(&mut self.markers_wip);
        self.trails = std::mem::take(&mut self.trails_wip);
        sort_back_to_front(&mut self.markers);
    }

    /// Draw order of the visible frame: every trail, then markers from the farthest to the nearest.
    pub fn primitives(&self) -> impl Iterator<Item = &DrawPrimitive> + '_ {
        self.trails
            .iter()
            .chain(self.markers.iter().map(|marker| &marker.primitive))
    }
}

/// Markers have transparency and no depth buffer, farther ones must be drawn first.
/// The sort is stable so markers at the same distance keep the pack order.
fn sort_back_to_front(markers: &mut [MarkerObject]) {
    markers.sort_by(|first, second| {
        first
            .distance_squared
            .total_cmp(&second.distance_squared)
            .reverse()
    });
}

use glam::Vec2;
use joko_package_models::trail::Trail;
use joko_render_models::{DrawPrimitive, QuadObject, RenderSettings, ScreenVertex, TextureProvider};

use crate::marker::{distance_alpha, scale_alpha, tint, MIN_VISIBLE_ALPHA};
use crate::math::Projection;

/// fixed half width multiplier when trails do not shrink with distance
const FLAT_WIDTH_PIXELS: f32 = 3.0;
const MIN_SEGMENT_PIXELS: f32 = 0.5;

/// A trail point that survived culling this frame.
#[derive(Debug, Clone, Copy)]
struct RibbonPoint {
    screen: Vec2,
    half_width: f32,
    alpha: f32,
    /// texture v, from the arc length computed at load time
    v: f32,
}

/// Quads of one trail, in point order. Empty when nothing of it is visible.
///
/// Texture coordinates only depend on the arc length of each point, so the tiling does not
/// move when points around a segment get culled.
pub fn trail_ribbon(
    trail: &Trail,
    projection: &Projection,
    settings: &RenderSettings,
    textures: &dyn TextureProvider,
) -> Vec<DrawPrimitive> {
    let mut quads = Vec::new();
    let attrs = &trail.props;
    let trail_alpha = attrs.alpha() * settings.trail_opacity;
    if !(trail_alpha >= MIN_VISIBLE_ALPHA) {
        return quads;
    }
    let texture = trail
        .texture_id
        .as_deref()
        .and_then(|id| textures.texture(id));
    // world half width, a texture tile spans the full width
    let width = settings.trail_width * attrs.trail_scale();
    let tile = if width > 0.001 { 2.0 * width } else { 0.0 };

    let mut previous: Option<RibbonPoint> = None;
    for (index, &node) in trail.nodes.iter().enumerate() {
        let distance = projection.eye.distance(node);
        if !(distance <= settings.max_render_distance) {
            previous = None;
            continue;
        }
        let Some(screen) = projection.world_to_screen(node) else {
            previous = None;
            continue;
        };
        let half_width = if settings.trail_perspective_scale {
            width * projection.pixels_per_unit(distance)
        } else {
            width * FLAT_WIDTH_PIXELS
        }
        .max(1.0);
        let alpha = trail_alpha
            * distance_alpha(
                distance,
                attrs.can_fade(),
                attrs.fade_near(),
                attrs.fade_far(),
                settings,
            );
        let arc_length = trail.arc_length.get(index).copied().unwrap_or_default();
        let current = RibbonPoint {
            screen: screen.position,
            half_width,
            alpha,
            v: if tile > 0.0 { arc_length / tile } else { 0.0 },
        };
        if !(alpha > MIN_VISIBLE_ALPHA) {
            previous = None;
            continue;
        }
        if let Some(previous) = previous {
            if let Some(quad) = segment(previous, current, projection.viewport.x, texture, trail) {
                quads.push(quad);
            }
        }
        previous = Some(current);
    }
    quads
}

fn segment(
    previous: RibbonPoint,
    current: RibbonPoint,
    viewport_width: f32,
    texture: Option<u64>,
    trail: &Trail,
) -> Option<DrawPrimitive> {
    let delta = current.screen - previous.screen;
    let length = delta.length();
    // too short to see, or spanning half the screen which happens when the trail wraps around
    if !(length > MIN_SEGMENT_PIXELS && length < viewport_width * 0.5) {
        return None;
    }
    let perpendicular = Vec2::new(-delta.y, delta.x) / length;
    let alpha = (previous.alpha + current.alpha) * 0.5;
    let color = match texture {
        Some(_) => [255, 255, 255, scale_alpha(255.0, alpha)],
        None => tint(trail.props.trail_color().to_rgba(), alpha),
    };
    let vertex = |point: RibbonPoint, side: f32, u: f32| {
        ScreenVertex::new(
            point.screen + perpendicular * point.half_width * side,
            Vec2::new(u, point.v),
            color,
        )
    };
    Some(DrawPrimitive::Quad(QuadObject {
        vertices: [
            vertex(previous, 1.0, 0.0),
            vertex(current, 1.0, 0.0),
            vertex(current, -1.0, 1.0),
            vertex(previous, -1.0, 1.0),
        ],
        texture,
    }))
}

use glam::Vec2;
use joko_package_models::marker::Marker;
use joko_render_models::{
    CircleObject, DrawPrimitive, QuadObject, RenderSettings, ScreenVertex, TextureProvider,
};

use crate::fade::fade_alpha;
use crate::math::Projection;

/// half size in pixels of an icon with `iconSize` 1, before the distance scaling
pub const BASE_ICON_PIXELS: f32 = 32.0;
pub const SIZE_TUNING: f32 = 0.02;
/// anything fainter is not worth a draw call
pub const MIN_VISIBLE_ALPHA: f32 = 0.01;
const CIRCLE_SEGMENTS: u32 = 16;
const CIRCLE_BORDER_THICKNESS: f32 = 1.5;
const CIRCLE_BORDER_ALPHA: f32 = 200.0;

/// A marker ready to be drawn, with the key used to order markers back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerObject {
    pub primitive: DrawPrimitive,
    pub distance_squared: f32,
}

/// rgba with the color alpha scaled by `alpha`
pub(crate) fn tint(color: [u8; 4], alpha: f32) -> [u8; 4] {
    let [r, g, b, a] = color;
    [r, g, b, scale_alpha(a as f32, alpha)]
}

pub(crate) fn scale_alpha(value: f32, alpha: f32) -> u8 {
    (value * alpha).clamp(0.0, 255.0) as u8
}

/// Opacity of a marker or trail point, `can_fade = false` keeps it opaque up to the hard cap.
pub(crate) fn distance_alpha(
    distance: f32,
    can_fade: bool,
    fade_near: f32,
    fade_far: f32,
    settings: &RenderSettings,
) -> f32 {
    if !can_fade {
        return if distance <= settings.max_render_distance {
            1.0
        } else {
            0.0
        };
    }
    fade_alpha(
        distance,
        fade_near,
        fade_far,
        settings.fade_start_distance,
        settings.max_render_distance,
    )
}

/// Pixel half size of a marker icon, clamped to the marker or global screen size bounds.
pub fn marker_half_size(
    marker: &Marker,
    distance: f32,
    projection: &Projection,
    settings: &RenderSettings,
) -> f32 {
    let attrs = &marker.attrs;
    let half_size = BASE_ICON_PIXELS
        * attrs.icon_size()
        * settings.marker_scale
        * projection.pixels_per_unit(distance)
        * SIZE_TUNING;
    let min_size = if attrs.min_size() >= 0.0 {
        attrs.min_size()
    } else {
        settings.min_screen_size
    };
    let max_size = if attrs.max_size() >= 0.0 {
        attrs.max_size()
    } else {
        settings.max_screen_size
    };
    // not `clamp`, a pack may author min above max
    half_size.max(min_size * 0.5).min(max_size * 0.5)
}

/// Screen geometry of one marker, `None` when it is not visible this frame.
pub fn marker_object(
    marker: &Marker,
    projection: &Projection,
    settings: &RenderSettings,
    textures: &dyn TextureProvider,
) -> Option<MarkerObject> {
    let anchor = marker.anchor();
    let distance_squared = projection.eye.distance_squared(anchor);
    let distance = distance_squared.sqrt();
    // hard clip, a pack fadeFar can never extend visibility
    if !(distance <= settings.max_render_distance) {
        return None;
    }
    let screen = projection.world_to_screen(anchor)?;

    let half_size = marker_half_size(marker, distance, projection, settings);
    let attrs = &marker.attrs;
    let fade = distance_alpha(
        distance,
        attrs.can_fade(),
        attrs.fade_near(),
        attrs.fade_far(),
        settings,
    );
    let alpha = attrs.alpha() * settings.marker_opacity * fade;
    if !(alpha >= MIN_VISIBLE_ALPHA) || !(half_size >= 1.0) {
        return None;
    }

    let center = screen.position;
    let texture = marker
        .texture_id
        .as_deref()
        .and_then(|id| textures.texture(id));
    let primitive = match texture {
        Some(texture) => {
            let color = [255, 255, 255, scale_alpha(255.0, alpha)];
            let corner = |dx: f32, dy: f32, u: f32, v: f32| {
                ScreenVertex::new(
                    center + Vec2::new(dx, dy) * half_size,
                    Vec2::new(u, v),
                    color,
                )
            };
            DrawPrimitive::Quad(QuadObject {
                vertices: [
                    corner(-1.0, -1.0, 0.0, 0.0),
                    corner(1.0, -1.0, 1.0, 0.0),
                    corner(1.0, 1.0, 1.0, 1.0),
                    corner(-1.0, 1.0, 0.0, 1.0),
                ],
                texture: Some(texture),
            })
        }
        None => DrawPrimitive::Circle(CircleObject {
            center: center.into(),
            radius: half_size,
            fill: tint(attrs.color().to_rgba(), alpha),
            border: [255, 255, 255, scale_alpha(CIRCLE_BORDER_ALPHA, alpha)],
            border_thickness: CIRCLE_BORDER_THICKNESS,
            segments: CIRCLE_SEGMENTS,
        }),
    };
    Some(MarkerObject {
        primitive,
        distance_squared,
    })
}

/// Opacity factor of something `distance` away from the camera.
///
/// `fade_near`/`fade_far` come from the pack, negative when unset. They may only shorten the
/// visible range: `max_distance` stays the hard bound. Without a `fade_near` the band starts at
/// `fade_start`. The factor is 1 up to the near bound, 0 from the far bound on, and linear in
/// between. When the near bound reaches the far bound there is no band and nothing is drawn.
pub fn fade_alpha(
    distance: f32,
    fade_near: f32,
    fade_far: f32,
    fade_start: f32,
    max_distance: f32,
) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    let far = if fade_far >= 0.0 {
        fade_far.min(max_distance)
    } else {
        max_distance
    };
    if !(far > 0.0) || distance >= far {
        return 0.0;
    }
    let near = if fade_near >= 0.0 {
        fade_near.min(far)
    } else {
        fade_start.min(far)
    };
    if far <= near {
        return 0.0;
    }
    if distance <= near {
        return 1.0;
    }
    1.0 - (distance - near) / (far - near)
}

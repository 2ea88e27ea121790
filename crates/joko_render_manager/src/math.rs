use glam::{Mat4, Vec2, Vec3, Vec4};
use joko_render_models::CameraPose;

pub const Z_NEAR: f32 = 0.5;
/// well beyond any sensible max render distance
pub const Z_FAR: f32 = 8000.0;
/// about 70 degrees, used until the game reports its fov
pub const DEFAULT_FOV: f32 = 1.222;
pub const DEFAULT_ASPECT: f32 = 1.7778;
/// points slightly outside the viewport still count, so sprites at the edge are drawn partially
pub const NDC_BOUND: f32 = 1.1;

/// The reported fov, or the default when it is missing or unusable.
pub fn effective_fov(fov: Option<f32>) -> f32 {
    match fov {
        Some(fov) if fov.is_finite() && fov > 0.01 && fov < std::f32::consts::PI => fov,
        _ => DEFAULT_FOV,
    }
}

/// Left handed perspective, view space depth `near..far` maps to `0..1`.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let h = 1.0 / (0.5 * fov_y).tan();
    let w = h / aspect;
    let r = far / (far - near);
    Mat4::from_cols(
        Vec4::new(w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, h, 0.0, 0.0),
        Vec4::new(0.0, 0.0, r, 1.0),
        Vec4::new(0.0, 0.0, -r * near, 0.0),
    )
}

/// Orthonormal left handed camera axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl CameraBasis {
    /// `None` when `forward` has no direction.
    /// A zero `up_hint`, or one parallel to `forward`, is replaced by a world axis.
    pub fn new(forward: Vec3, up_hint: Vec3) -> Option<Self> {
        let forward = forward.try_normalize()?;
        let up_hint = if up_hint.length_squared() > 0.01 {
            up_hint
        } else {
            Vec3::Y
        };
        let right = up_hint
            .cross(forward)
            .try_normalize()
            .or_else(|| Vec3::Y.cross(forward).try_normalize())
            .or_else(|| Vec3::Z.cross(forward).try_normalize())?;
        let up = forward.cross(right).normalize();
        Some(Self { right, up, forward })
    }

    /// World to view space, +z in front of the camera.
    pub fn view_matrix(&self, eye: Vec3) -> Mat4 {
        let Self { right, up, forward } = *self;
        Mat4::from_cols(
            Vec4::new(right.x, up.x, forward.x, 0.0),
            Vec4::new(right.y, up.y, forward.y, 0.0),
            Vec4::new(right.z, up.z, forward.z, 0.0),
            Vec4::new(-right.dot(eye), -up.dot(eye), -forward.dot(eye), 1.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// pixels from the top left corner
    pub position: Vec2,
    pub depth: f32,
}

/// Camera transform of one frame. Built once and shared by every marker and trail point.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub fov: f32,
    pub viewport: Vec2,
}

impl Projection {
    /// `None` for a viewport smaller than a pixel or a camera without a usable direction.
    pub fn new(camera: &CameraPose, viewport_width: f32, viewport_height: f32) -> Option<Self> {
        if !(viewport_width >= 1.0 && viewport_height >= 1.0) {
            return None;
        }
        let eye = camera.position.0;
        if !eye.is_finite() {
            return None;
        }
        let basis = CameraBasis::new(camera.forward.0, camera.up.0)?;
        let fov = effective_fov(camera.fov);
        let aspect = viewport_width / viewport_height;
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            DEFAULT_ASPECT
        };
        let proj = perspective(fov, aspect, Z_NEAR, Z_FAR);
        Some(Self {
            view_proj: proj * basis.view_matrix(eye),
            eye,
            fov,
            viewport: Vec2::new(viewport_width, viewport_height),
        })
    }

    /// Rejects points behind the camera or outside the slightly widened viewport.
    pub fn world_to_screen(&self, point: Vec3) -> Option<ScreenPoint> {
        let clip = self.view_proj * point.extend(1.0);
        if !(clip.w > 0.0) {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !(ndc.x.abs() <= NDC_BOUND && ndc.y.abs() <= NDC_BOUND) {
            return None;
        }
        Some(ScreenPoint {
            position: Vec2::new(
                (ndc.x + 1.0) * 0.5 * self.viewport.x,
                (1.0 - ndc.y) * 0.5 * self.viewport.y,
            ),
            depth: ndc.z,
        })
    }

    /// Pixels covered by one world unit at `distance` from the eye.
    pub fn pixels_per_unit(&self, distance: f32) -> f32 {
        (self.viewport.y * 0.5) / ((self.fov * 0.5).tan() * distance.max(0.1))
    }
}

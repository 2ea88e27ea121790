use joko_core::serde_glam::Vec3;
use serde::{Deserialize, Serialize};

/// Live camera as reported by the game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    /// need not be normalized
    pub forward: Vec3,
    /// may be zero, a vertical axis is used instead
    #[serde(default)]
    pub up: Vec3,
    /// vertical field of view in radians, `None` when the game did not report it yet
    #[serde(default)]
    pub fov: Option<f32>,
}

impl CameraPose {
    pub fn new(position: glam::Vec3, forward: glam::Vec3) -> Self {
        Self {
            position: position.into(),
            forward: forward.into(),
            up: glam::Vec3::Y.into(),
            fov: None,
        }
    }
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = Some(fov);
        self
    }
}

/// Everything the renderer needs to know about the current frame besides the packs and settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// `None` while the game is not sending camera data
    pub camera: Option<CameraPose>,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// 0 when not in a playable map
    pub map_id: u32,
    pub in_combat: bool,
    pub mounted: bool,
}

impl FrameInput {
    pub fn new(camera: CameraPose, viewport_width: f32, viewport_height: f32, map_id: u32) -> Self {
        Self {
            camera: Some(camera),
            viewport_width,
            viewport_height,
            map_id,
            in_combat: false,
            mounted: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn frame_input_from_json() {
        let input: FrameInput = serde_json::from_str(
            r#"{
                "camera": {"position": [1, 2, 3], "forward": [0, 0, 1], "fov": 1.2},
                "viewport_width": 1920,
                "viewport_height": 1080,
                "map_id": 15
            }"#,
        )
        .unwrap();
        let camera = input.camera.unwrap();
        assert_eq!(camera.position.0, glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.up.0, glam::Vec3::ZERO);
        assert_eq!(camera.fov, Some(1.2));
        assert_eq!(input.map_id, 15);
        assert!(!input.in_combat);
    }
}

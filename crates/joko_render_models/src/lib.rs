//! Types crossing the boundary of the renderer: what it reads each frame and what it emits.

pub mod camera;
pub mod primitive;
pub mod settings;
pub mod status;
pub mod texture;

pub use camera::{CameraPose, FrameInput};
pub use primitive::{CircleObject, DrawPrimitive, QuadObject, ScreenVertex};
pub use settings::RenderSettings;
pub use status::RenderStatus;
pub use texture::{NoTextures, TextureHandle, TextureProvider};

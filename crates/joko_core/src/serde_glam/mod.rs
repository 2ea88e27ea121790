//! Newtypes over glam vectors that serialize as plain `[x, y(, z)]` arrays.
//! glam's own serde feature is not enabled so the on-disk representation stays under our control.

mod vec2;
mod vec3;

pub use vec2::Vec2;
pub use vec3::Vec3;

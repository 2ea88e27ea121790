use std::collections::HashMap;

/// Opaque handle of a texture registered by the host.
pub type TextureHandle = u64;

/// Asks the host whether a texture is ready to be drawn.
/// `None` is not an error, textures may still be uploading and the renderer falls back to plain shapes.
pub trait TextureProvider {
    fn texture(&self, id: &str) -> Option<TextureHandle>;
}

/// For hosts without any texture support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTextures;

impl TextureProvider for NoTextures {
    fn texture(&self, _id: &str) -> Option<TextureHandle> {
        None
    }
}

impl TextureProvider for HashMap<String, TextureHandle> {
    fn texture(&self, id: &str) -> Option<TextureHandle> {
        self.get(id).copied()
    }
}

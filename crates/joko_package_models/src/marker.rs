use crate::attributes::CommonAttributes;
use glam::Vec3;
use uuid::Uuid;

/// A point of interest. Immutable once the pack is built.
#[derive(Debug, Clone)]
pub struct Marker {
    pub guid: Uuid,
    pub position: Vec3,
    pub map_id: u32,
    /// dotted category path as authored in `type`
    pub category: String,
    /// category chain merged with the attributes inlined on the element
    pub attrs: CommonAttributes,
    /// identifier the host registers the icon under, when the icon exists in the pack
    pub texture_id: Option<String>,
}

impl Marker {
    /// World position the icon is drawn at, the height offset lifts it above the authored point.
    pub fn anchor(&self) -> Vec3 {
        self.position + Vec3::Y * self.attrs.height_offset()
    }
}

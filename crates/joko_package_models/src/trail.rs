use glam::Vec3;
use uuid::Uuid;

use crate::attributes::CommonAttributes;

#[derive(Debug, Clone)]
pub struct Trail {
    pub guid: Uuid,
    pub map_id: u32,
    pub category: String,
    pub props: CommonAttributes,
    pub nodes: Vec<Vec3>,
    /// `arc_length[i]` is the distance travelled from `nodes[0]` to `nodes[i]`
    pub arc_length: Vec<f32>,
    pub texture_id: Option<String>,
}

/// Decoded content of a `.trl` file.
#[derive(Debug, Clone, PartialEq)]
pub struct TBin {
    pub map_id: u32,
    pub nodes: Vec<Vec3>,
}

/// Running sum of segment lengths, starts at 0 and has one entry per node.
/// A non finite node adds nothing and the next segment is measured from the last finite one.
pub fn cumulative_arc_length(nodes: &[Vec3]) -> Vec<f32> {
    let mut result = Vec::with_capacity(nodes.len());
    let mut total = 0.0;
    let mut previous: Option<Vec3> = None;
    for &node in nodes {
        if !node.is_finite() {
            result.push(total);
            continue;
        }
        if let Some(previous) = previous {
            total += previous.distance(node);
        }
        result.push(total);
        previous = Some(node);
    }
    result
}

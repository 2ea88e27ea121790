use serde::{Deserialize, Serialize};

/// Counters of the last rendered frame, for a status overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStatus {
    /// markers of the current map that passed the enabled filters
    pub markers_considered: usize,
    pub trails_considered: usize,
    pub markers_drawn: usize,
    /// trails with at least one emitted segment
    pub trails_drawn: usize,
    pub packs_loaded: usize,
    pub loading: bool,
}

impl RenderStatus {
    pub fn debug_line(&self) -> String {
        format!(
            "[Pathing] POIs: {}  Trails: {}  Packs: {}{}",
            self.markers_considered,
            self.trails_considered,
            self.packs_loaded,
            if self.loading { "  [loading...]" } else { "" }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn debug_line() {
        let mut status = RenderStatus {
            markers_considered: 12,
            trails_considered: 3,
            packs_loaded: 2,
            ..Default::default()
        };
        assert_eq!(status.debug_line(), "[Pathing] POIs: 12  Trails: 3  Packs: 2");
        status.loading = true;
        assert_eq!(
            status.debug_line(),
            "[Pathing] POIs: 12  Trails: 3  Packs: 2  [loading...]"
        );
    }
}

use crate::category::CategoryTree;
use crate::marker::Marker;
use crate::trail::Trail;
use joko_core::RelativePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageImportStatistics {
    pub source_files: usize,         // xml documents found in the pack
    pub invalid_source_files: usize, // documents that could not be read or parsed
    pub categories: usize,           // nodes of the category tree
    pub poi_nodes: usize,            // <POI> elements seen
    pub markers: usize,              // markers kept
    pub markers_without_map_id: usize,
    pub textures: usize,         // distinct icons and trail textures referenced
    pub missing_textures: usize, // how many of those are not in the pack
}

/// Why trails were dropped, each reason counted on its own.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailImportStatistics {
    pub xml_trail_nodes: usize,    // <Trail> elements seen
    pub missing_trail_data: usize, // no trailData attribute
    pub file_not_found: usize,     // trailData does not resolve inside the pack
    pub binary_failed: usize,      // the .trl payload is malformed
    pub no_map_id: usize,          // map id is zero after decode and override
    pub no_points: usize,          // no finite point left after decode
    pub loaded: usize,
    /// first unresolvable trailData, for diagnostics
    pub sample_missing_path: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageImportTelemetry {
    pub total: u128,
    pub file_listing: u128,
    pub categories_pass: u128,
    pub elements_pass: u128,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageImportReport {
    #[serde(skip)]
    pub uuid: Uuid,
    pub pack_name: String,
    pub number_of: PackageImportStatistics, // count everything we can think of
    pub trails: TrailImportStatistics,
    pub telemetry: PackageImportTelemetry, // all the time spent in which step, in ms
}

impl PackageImportReport {
    pub const REPORT_FILE_NAME: &'static str = "import_report.json";

    pub fn found_missing_trail(&mut self, path: &str) {
        self.trails.file_not_found += 1;
        if self.trails.sample_missing_path.is_none() {
            self.trails.sample_missing_path = Some(path.to_string());
        }
    }
}

/// Identifier a texture of `pack_name` is registered under by the host.
pub fn texture_id(pack_name: &str, path: &RelativePath) -> String {
    format!("PATHING_{}_{}", pack_name, path)
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ' ' => '_',
            c => c,
        })
        .collect()
}

/// A fully parsed pack. Geometry is never mutated after the build, only `enabled` flags change.
#[derive(Debug, Clone)]
pub struct Pack {
    pub uuid: Uuid,
    pub name: String,
    /// where the pack came from, an archive or a directory
    pub source: String,
    pub enabled: bool,
    pub categories: CategoryTree,
    pub markers: Vec<Marker>,
    pub trails: Vec<Trail>,
    /// normalized relative path to the location the bytes can be read from
    pub files: BTreeMap<RelativePath, String>,
    pub report: PackageImportReport,
}

impl Pack {
    pub fn new(name: String, source: String) -> Self {
        let uuid = Uuid::new_v4();
        Self {
            uuid,
            report: PackageImportReport {
                uuid,
                pack_name: name.clone(),
                ..Default::default()
            },
            name,
            source,
            enabled: true,
            categories: Default::default(),
            markers: Default::default(),
            trails: Default::default(),
            files: Default::default(),
        }
    }

    pub fn resolve_file(&self, path: &str) -> Option<&str> {
        self.files
            .get(&RelativePath::new(path))
            .map(String::as_str)
    }

    pub fn is_category_enabled(&self, path: &str) -> bool {
        self.enabled && self.categories.is_enabled(path)
    }

    /// Every texture referenced by this pack that the pack actually contains, keyed by texture id.
    /// The value is the location to read the image from.
    pub fn texture_requests(&self) -> BTreeMap<String, String> {
        let icons = self
            .markers
            .iter()
            .filter_map(|m| m.attrs.get_icon_file());
        let textures = self.trails.iter().filter_map(|t| t.props.get_texture());
        let mut requests = BTreeMap::new();
        for path in icons.chain(textures) {
            if let Some(location) = self.files.get(path) {
                requests
                    .entry(texture_id(&self.name, path))
                    .or_insert_with(|| location.clone());
            }
        }
        requests
    }
}

/// The immutable set of packs the render path reads from.
#[derive(Debug, Clone, Default)]
pub struct PackSet {
    pub packs: Vec<Pack>,
}

impl PackSet {
    pub fn new(packs: Vec<Pack>) -> Self {
        debug!("new pack set with {} packs", packs.len());
        Self { packs }
    }
    pub fn len(&self) -> usize {
        self.packs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
    pub fn total_markers(&self) -> usize {
        self.packs.iter().map(|p| p.markers.len()).sum()
    }
    pub fn total_trails(&self) -> usize {
        self.packs.iter().map(|p| p.trails.len()).sum()
    }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pack> {
        self.packs.iter_mut().find(|p| p.name == name)
    }

    /// Markers of `map_id` whose pack and category chain are enabled.
    pub fn markers_for_map(&self, map_id: u32) -> impl Iterator<Item = &Marker> + '_ {
        self.packs
            .iter()
            .filter(|pack| pack.enabled)
            .flat_map(move |pack| {
                pack.markers.iter().filter(move |marker| {
                    marker.map_id == map_id && pack.is_category_enabled(&marker.category)
                })
            })
    }

    /// Trails of `map_id` whose pack and category chain are enabled.
    pub fn trails_for_map(&self, map_id: u32) -> impl Iterator<Item = &Trail> + '_ {
        self.packs
            .iter()
            .filter(|pack| pack.enabled)
            .flat_map(move |pack| {
                pack.trails.iter().filter(move |trail| {
                    trail.map_id == map_id && pack.is_category_enabled(&trail.category)
                })
            })
    }
}

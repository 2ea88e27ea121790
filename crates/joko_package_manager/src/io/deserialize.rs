use crate::io::source::PackSource;
use crate::io::tbin::parse_tbin_from_slice;
use crate::BASE64_ENGINE;
use base64::Engine;
use joko_core::RelativePath;
use joko_package_models::{
    attributes::{CommonAttributes, XotAttributeNameIDs},
    category::{CategoryId, CategoryTree},
    marker::Marker,
    package::{texture_id, Pack},
    trail::{cumulative_arc_length, Trail},
};
use std::collections::HashSet;
use tracing::{debug, info, info_span, trace};
use uuid::Uuid;
use xot::{Element, Node, Xot};

/// One xml document of a pack, parsed once and walked by both passes.
pub struct ParsedDocument {
    pub path: RelativePath,
    tree: Xot,
    names: XotAttributeNameIDs,
    root: Node,
}

impl ParsedDocument {
    pub fn parse(path: RelativePath, bytes: &[u8]) -> Result<Self, String> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_start_matches('\u{feff}');
        let mut tree = Xot::new();
        let names = XotAttributeNameIDs::register_with_xot(&mut tree);
        let document = tree
            .parse(text)
            .map_err(|e| format!("invalid xml in {path}: {e:?}"))?;
        // packs are supposed to have an <OverlayData> root but whatever element is there gets used
        let root = tree
            .document_element(document)
            .or(Err(format!("no document element in {path}")))?;
        Ok(Self {
            path,
            tree,
            names,
            root,
        })
    }
}

/// Distinct textures referenced while parsing, for the report.
#[derive(Default)]
struct TextureTracker {
    seen: HashSet<RelativePath>,
    missing: HashSet<RelativePath>,
}

impl TextureTracker {
    fn resolve(&mut self, pack: &Pack, path: Option<&RelativePath>) -> Option<String> {
        let path = path?;
        self.seen.insert(path.clone());
        if pack.files.contains_key(path) {
            Some(texture_id(&pack.name, path))
        } else {
            if self.missing.insert(path.clone()) {
                debug!(%path, "failed to find this texture in this pack");
            }
            None
        }
    }
}

/// Reads every xml document of `source` and builds the pack in two passes.
/// Nothing below the pack level fails, problems end up in `pack.report`.
pub fn build_pack(name: String, source: &dyn PackSource) -> Pack {
    let _span = info_span!("building pack", name = %name).entered();
    let start = std::time::SystemTime::now();
    let mut pack = Pack::new(name, source.location());

    let files = source.files();
    for file in &files {
        if let Some(location) = source.locate(file) {
            pack.files.insert(file.clone(), location);
        }
    }
    // a stable order, archives do not list their entries in any particular one
    let mut xmls: Vec<&RelativePath> = files.iter().filter(|f| f.is_xml()).collect();
    xmls.sort();
    pack.report.number_of.source_files = xmls.len();

    let mut documents = Vec::with_capacity(xmls.len());
    for path in xmls {
        let Some(bytes) = source.read(path) else {
            info!(%path, "failed to read xml file");
            pack.report.number_of.invalid_source_files += 1;
            continue;
        };
        match ParsedDocument::parse(path.clone(), &bytes) {
            Ok(document) => documents.push(document),
            Err(e) => {
                info!(%e, "skipping xml file");
                pack.report.number_of.invalid_source_files += 1;
            }
        }
    }
    pack.report.telemetry.file_listing = start.elapsed().unwrap_or_default().as_millis();

    parse_documents(&mut pack, &documents, source);

    pack.report.telemetry.total = start.elapsed().unwrap_or_default().as_millis();
    info!(
        markers = pack.markers.len(),
        trails = pack.trails.len(),
        categories = pack.categories.len(),
        "pack built in {} ms",
        pack.report.telemetry.total
    );
    pack
}

/// Categories of every document first, then markers and trails of every document.
/// Document order therefore never decides whether a category exists when an element refers to it.
pub fn parse_documents(pack: &mut Pack, documents: &[ParsedDocument], source: &dyn PackSource) {
    let categories_start = std::time::SystemTime::now();
    for document in documents {
        let _span = info_span!("categories", file = %document.path).entered();
        parse_categories_recursive(
            &mut pack.categories,
            document,
            document.tree.children(document.root),
            None,
        );
    }
    pack.report.number_of.categories = pack.categories.len();
    pack.report.telemetry.categories_pass =
        categories_start.elapsed().unwrap_or_default().as_millis();

    let elements_start = std::time::SystemTime::now();
    let mut textures = TextureTracker::default();
    for document in documents {
        let _span = info_span!("elements", file = %document.path).entered();
        parse_map_elements(pack, document, source, &mut textures);
    }
    pack.report.number_of.markers = pack.markers.len();
    pack.report.number_of.textures = textures.seen.len();
    pack.report.number_of.missing_textures = textures.missing.len();
    pack.report.telemetry.elements_pass = elements_start.elapsed().unwrap_or_default().as_millis();
}

// a recursive function to parse the marker category tree.
fn parse_categories_recursive(
    categories: &mut CategoryTree,
    document: &ParsedDocument,
    tags: impl Iterator<Item = Node>,
    parent: Option<CategoryId>,
) {
    let tree = &document.tree;
    let names = &document.names;
    for tag in tags {
        let ele = match tree.element(tag) {
            Some(ele) => ele,
            None => continue,
        };
        if ele.name() != names.marker_category {
            continue;
        }

        let name = ele.get_attribute(names.name).unwrap_or_default().trim();
        if name.is_empty() {
            trace!("category without a name, skipping its subtree");
            continue;
        }
        let display_name = ele
            .get_attribute(names.capital_display_name)
            .or_else(|| ele.get_attribute(names.display_name))
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let mut common_attributes = CommonAttributes::default();
        common_attributes.update_common_attributes_from_element(ele, names);

        let (id, created) = categories.find_or_create_child(parent, name);
        if let Some(category) = categories.get_mut(id) {
            if created {
                trace!(name, "new category");
                category.props = common_attributes;
                category.enabled = ele
                    .get_attribute(names.default_toggle)
                    .and_then(|t| t.trim().parse::<u8>().ok())
                    .map(|t| t != 0)
                    .unwrap_or(true);
            } else {
                // a category split over several documents, the first definition wins
                category.props.inherit_if_attr_none(&common_attributes);
            }
            if let Some(display_name) = display_name {
                if created || category.display_name.eq_ignore_ascii_case(name) {
                    category.display_name = display_name.to_string();
                }
            }
        }
        parse_categories_recursive(categories, document, tree.children(tag), Some(id));
    }
}

fn parse_map_elements(
    pack: &mut Pack,
    document: &ParsedDocument,
    source: &dyn PackSource,
    textures: &mut TextureTracker,
) {
    let tree = &document.tree;
    let names = &document.names;
    for child in tree.children(document.root) {
        let Some(ele) = tree.element(child) else {
            continue;
        };
        if ele.name() == names.pois {
            for poi in tree.children(child) {
                if let Some(poi_element) = tree.element(poi) {
                    parse_element(pack, names, poi_element, source, textures);
                }
            }
        } else {
            // some packs put their elements directly under the root
            parse_element(pack, names, ele, source, textures);
        }
    }
}

fn parse_element(
    pack: &mut Pack,
    names: &XotAttributeNameIDs,
    ele: &Element,
    source: &dyn PackSource,
    textures: &mut TextureTracker,
) {
    if ele.name() == names.poi {
        if let Some(marker) = parse_marker(pack, names, ele, textures) {
            pack.markers.push(marker);
        }
    } else if ele.name() == names.trail {
        if let Some(trail) = parse_trail(pack, names, ele, source, textures) {
            pack.trails.push(trail);
        }
    }
}

fn parse_optional_guid(names: &XotAttributeNameIDs, ele: &Element) -> Option<Uuid> {
    let guid = ele.get_attribute(names.guid)?;
    let bytes = BASE64_ENGINE.decode(guid.trim()).ok()?;
    let bytes: [u8; 16] = bytes.as_slice().try_into().ok()?;
    Some(Uuid::from_bytes(bytes))
}

fn parse_guid(names: &XotAttributeNameIDs, ele: &Element) -> Uuid {
    parse_optional_guid(names, ele).unwrap_or_else(Uuid::new_v4)
}

fn parse_map_id(names: &XotAttributeNameIDs, ele: &Element) -> u32 {
    ele.get_attribute(names.map_id)
        .and_then(|map_id| map_id.trim().parse::<u32>().ok())
        .unwrap_or_default()
}

fn parse_float(ele: &Element, name: xot::NameId) -> f32 {
    ele.get_attribute(name)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

/// Category attributes first, then whatever is inlined on the element.
fn resolve_attributes(
    categories: &CategoryTree,
    names: &XotAttributeNameIDs,
    ele: &Element,
    category: &str,
) -> CommonAttributes {
    let mut attrs = CommonAttributes::default();
    attrs.update_common_attributes_from_element(ele, names);
    attrs.inherit_if_attr_none(&categories.resolve(category));
    attrs
}

fn parse_marker(
    pack: &mut Pack,
    names: &XotAttributeNameIDs,
    poi_element: &Element,
    textures: &mut TextureTracker,
) -> Option<Marker> {
    pack.report.number_of.poi_nodes += 1;
    let map_id = parse_map_id(names, poi_element);
    if map_id == 0 {
        debug!("missing map id");
        pack.report.number_of.markers_without_map_id += 1;
        return None;
    }
    let category = poi_element
        .get_attribute(names.category)
        .unwrap_or_default()
        .trim()
        .to_string();
    let attrs = resolve_attributes(&pack.categories, names, poi_element, &category);
    let texture_id = textures.resolve(pack, attrs.get_icon_file());
    Some(Marker {
        guid: parse_guid(names, poi_element),
        position: glam::Vec3::new(
            parse_float(poi_element, names.xpos),
            parse_float(poi_element, names.ypos),
            parse_float(poi_element, names.zpos),
        ),
        map_id,
        category,
        attrs,
        texture_id,
    })
}

fn parse_trail(
    pack: &mut Pack,
    names: &XotAttributeNameIDs,
    trail_element: &Element,
    source: &dyn PackSource,
    textures: &mut TextureTracker,
) -> Option<Trail> {
    pack.report.trails.xml_trail_nodes += 1;

    let Some(trail_data) = trail_element
        .get_attribute(names.trail_data)
        .or_else(|| trail_element.get_attribute(names.capital_trail_data))
        .filter(|t| !t.trim().is_empty())
    else {
        debug!("trail without trailData");
        pack.report.trails.missing_trail_data += 1;
        return None;
    };
    //fix the path which may be a mix of windows and linux path
    let file_path = RelativePath::new(trail_data);
    let Some(bytes) = pack
        .resolve_file(trail_data)
        .and_then(|_| source.read(&file_path))
    else {
        debug!(%file_path, "trail binary not found in pack");
        pack.report.found_missing_trail(trail_data);
        return None;
    };
    let mut tbin = match parse_tbin_from_slice(&bytes) {
        Ok(tbin) => tbin,
        Err(e) => {
            debug!(%file_path, %e, "invalid trail binary");
            pack.report.trails.binary_failed += 1;
            return None;
        }
    };
    tbin.nodes.retain(|node| node.is_finite());
    if tbin.nodes.is_empty() {
        debug!(%file_path, "trail binary has no usable points");
        pack.report.trails.no_points += 1;
        return None;
    }
    // the binary is authoritative unless the markup overrides it
    let map_id = match parse_map_id(names, trail_element) {
        0 => tbin.map_id,
        map_id => map_id,
    };
    if map_id == 0 {
        debug!(%file_path, "trail without map id");
        pack.report.trails.no_map_id += 1;
        return None;
    }

    let category = trail_element
        .get_attribute(names.category)
        .unwrap_or_default()
        .trim()
        .to_string();
    let props = resolve_attributes(&pack.categories, names, trail_element, &category);
    let texture_id = textures.resolve(pack, props.get_texture());
    let arc_length = cumulative_arc_length(&tbin.nodes);
    pack.report.trails.loaded += 1;
    Some(Trail {
        guid: parse_guid(names, trail_element),
        map_id,
        category,
        props,
        nodes: tbin.nodes,
        arc_length,
        texture_id,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::source::MemorySource;
    use crate::io::tbin::test::encode;
    use glam::Vec3;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    const CATEGORIES_XML: &str = r#"
        <OverlayData>
            <MarkerCategory name="Tyria" DisplayName="Central Tyria" iconSize="2" fadeFar="900">
                <MarkerCategory name="Chests" iconFile="Data/Chest.png" alpha="0.5" defaulttoggle="0">
                    <MarkerCategory name="Rare" color="ff0000"/>
                </MarkerCategory>
            </MarkerCategory>
        </OverlayData>"#;

    const MARKERS_XML: &str = r#"
        <OverlayData>
            <POIs>
                <POI MapID="15" xpos="1" ypos="2" zpos="3" type="tyria.chests.rare" iconSize="4" GUID="AAECAwQFBgcICQoLDA0ODw=="/>
                <POI MapID="0" xpos="1" ypos="2" zpos="3" type="tyria"/>
                <POI xpos="1" type="tyria"/>
                <Trail trailData="trails/run.trl" type="tyria.chests" texture="Data/trail.png"/>
                <Trail TrailData="Trails\Run.trl" MapID="20" type="tyria"/>
                <Trail type="tyria"/>
                <Trail trailData="trails/missing.trl"/>
                <Trail trailData="trails/broken.trl"/>
                <Trail trailData="trails/nomap.trl"/>
                <Trail trailData="trails/empty.trl"/>
                <Trail trailData="trails/nan.trl"/>
            </POIs>
            <POI MapID="16" type="Unknown.Category"/>
        </OverlayData>"#;

    fn source() -> MemorySource {
        MemorySource::new("test")
            .with_file("categories.xml", CATEGORIES_XML)
            .with_file("markers.xml", MARKERS_XML)
            .with_file("Data/Chest.png", b"png".to_vec())
            .with_file(
                "Trails/Run.trl",
                encode(0, 15, &[Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0), Vec3::new(3.0, 4.0, 1.0)]),
            )
            .with_file("trails/broken.trl", vec![1, 2, 3])
            .with_file("trails/nomap.trl", encode(0, 0, &[Vec3::ONE]))
            .with_file("trails/empty.trl", encode(0, 15, &[]))
            .with_file("trails/nan.trl", encode(0, 15, &[Vec3::NAN, Vec3::new(1.0, f32::INFINITY, 0.0)]))
    }

    fn parse_in_order(order: &[&str], source: &MemorySource) -> Pack {
        let mut pack = Pack::new("test".into(), source.location());
        for file in source.files() {
            pack.files.insert(file.clone(), file.to_string());
        }
        let documents: Vec<ParsedDocument> = order
            .iter()
            .map(|name| {
                let path = RelativePath::new(name);
                ParsedDocument::parse(path.clone(), &source.read(&path).unwrap()).unwrap()
            })
            .collect();
        parse_documents(&mut pack, &documents, source);
        pack
    }

    #[test]
    fn builds_category_tree() {
        let pack = build_pack("test".into(), &source());
        let categories = &pack.categories;
        assert_eq!(categories.len(), 3);
        let tyria = categories.get(categories.find("tyria").unwrap()).unwrap();
        assert_eq!(tyria.display_name, "Central Tyria");
        let chests = categories.get(categories.find("Tyria.Chests").unwrap()).unwrap();
        assert_eq!(chests.display_name, "Chests");
        assert!(!chests.enabled);
        assert!(!pack.is_category_enabled("tyria.chests.rare"));
        assert!(pack.is_category_enabled("tyria"));
        assert_eq!(pack.report.number_of.source_files, 2);
        assert_eq!(pack.report.number_of.categories, 3);
    }

    #[test]
    fn markers_resolve_category_then_inline() {
        let pack = build_pack("test".into(), &source());
        assert_eq!(pack.markers.len(), 2);
        let marker = &pack.markers[0];
        assert_eq!(marker.map_id, 15);
        assert_eq!(marker.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(marker.category, "tyria.chests.rare");
        assert_eq!(marker.attrs.icon_size(), 4.0);
        assert_eq!(marker.attrs.alpha(), 0.5);
        assert_eq!(marker.attrs.fade_far(), 900.0);
        assert_eq!(marker.attrs.color().0, 0xFFFF0000);
        assert_eq!(marker.texture_id.as_deref(), Some("PATHING_test_data_chest_png"));
        assert_eq!(
            marker.guid,
            Uuid::from_bytes([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15])
        );
        // an unknown category still yields a marker with default attributes
        assert_eq!(pack.markers[1].map_id, 16);
        assert!(pack.markers[1].attrs.is_empty());
        assert_eq!(pack.report.number_of.poi_nodes, 4);
        assert_eq!(pack.report.number_of.markers_without_map_id, 2);
        assert_eq!(pack.report.number_of.textures, 2);
        assert_eq!(pack.report.number_of.missing_textures, 1);
    }

    #[test]
    fn trails_count_every_drop_reason() {
        let pack = build_pack("test".into(), &source());
        let stats = &pack.report.trails;
        assert_eq!(stats.xml_trail_nodes, 8);
        assert_eq!(stats.missing_trail_data, 1);
        assert_eq!(stats.file_not_found, 1);
        assert_eq!(stats.sample_missing_path.as_deref(), Some("trails/missing.trl"));
        // broken.trl has no header, empty.trl a header and no node
        assert_eq!(stats.binary_failed, 2);
        assert_eq!(stats.no_map_id, 1);
        // every node of nan.trl is unusable
        assert_eq!(stats.no_points, 1);
        assert_eq!(stats.loaded, 2);

        assert_eq!(pack.trails.len(), 2);
        let trail = &pack.trails[0];
        assert_eq!(trail.map_id, 15);
        assert_eq!(trail.nodes.len(), 3);
        assert_eq!(trail.arc_length, vec![0.0, 5.0, 6.0]);
        assert_eq!(trail.props.alpha(), 0.5);
        assert_eq!(trail.texture_id, None);
        // markup map id overrides the binary
        assert_eq!(pack.trails[1].map_id, 20);
    }

    #[test]
    fn non_finite_trail_nodes_are_dropped() {
        let xml = r#"<OverlayData><POIs><Trail trailData="run.trl"/></POIs></OverlayData>"#;
        let nodes = [
            Vec3::ZERO,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ];
        let source = MemorySource::new("nan")
            .with_file("trails.xml", xml)
            .with_file("run.trl", encode(0, 15, &nodes));
        let pack = build_pack("nan".into(), &source);
        assert_eq!(pack.report.trails.loaded, 1);
        let trail = &pack.trails[0];
        assert_eq!(trail.nodes.len(), 3);
        assert_eq!(trail.arc_length, vec![0.0, 2.0, 4.0]);
    }

    #[rstest]
    fn category_order_does_not_matter(
        #[values(["categories.xml", "markers.xml"], ["markers.xml", "categories.xml"])] order: [&str; 2],
    ) {
        let source = source();
        let reference = parse_in_order(&["categories.xml", "markers.xml"], &source);
        let pack = parse_in_order(&order, &source);
        assert_eq!(pack.markers.len(), reference.markers.len());
        for (a, b) in pack.markers.iter().zip(reference.markers.iter()) {
            assert_eq!(a.attrs, b.attrs);
        }
        assert_eq!(pack.trails[0].props, reference.trails[0].props);
    }

    #[test]
    fn categories_merge_across_documents() {
        let first = r#"<OverlayData><MarkerCategory name="a" iconSize="2"/></OverlayData>"#;
        let second = r#"<OverlayData>
            <MarkerCategory name="A" DisplayName="Alpha" iconSize="5" alpha="0.3">
                <MarkerCategory name="b"/>
            </MarkerCategory>
        </OverlayData>"#;
        let source = MemorySource::new("merge")
            .with_file("1.xml", first)
            .with_file("2.xml", second);
        let pack = build_pack("merge".into(), &source);
        assert_eq!(pack.categories.len(), 2);
        let a = pack.categories.get(pack.categories.find("a").unwrap()).unwrap();
        assert_eq!(a.display_name, "Alpha");
        assert_eq!(a.props.icon_size(), 2.0);
        assert_eq!(a.props.alpha(), 0.3);
        assert_eq!(pack.categories.resolve("a.b").icon_size(), 2.0);
    }

    #[test]
    fn invalid_documents_are_skipped() {
        let source = MemorySource::new("broken")
            .with_file("bad.xml", "<OverlayData><POIs>")
            .with_file(
                "good.xml",
                "\u{feff}<OverlayData><POI MapID=\"1\" xpos=\"nan\"/></OverlayData>",
            );
        let pack = build_pack("broken".into(), &source);
        assert_eq!(pack.report.number_of.invalid_source_files, 1);
        assert_eq!(pack.markers.len(), 1);
        assert_eq!(pack.markers[0].position, Vec3::ZERO);
    }
}

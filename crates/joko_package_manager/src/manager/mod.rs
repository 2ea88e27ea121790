mod category_state;

pub use category_state::{CategoryState, PackState, CATEGORY_STATE_FILE_NAME};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use joko_core::task::AsyncTaskGuard;
use joko_package_models::package::{Pack, PackSet};
use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::io::deserialize::build_pack;
use crate::io::source::{open_pack_source, pack_name_from_path};

pub const PACKS_DIRECTORY_NAME: &str = "packs";

struct LoadRequest {
    packs_path: PathBuf,
    /// applied to the new set before it is handed over
    category_state: CategoryState,
}

/// Builds every pack found directly inside `packs_path`, one rayon job per pack.
/// Entries that are neither a directory nor a `.taco`/`.zip` archive are skipped.
/// Packs are ordered by file name whatever the order they finished in.
pub fn load_all_from_dir(packs_path: &Path) -> Result<PackSet, String> {
    let _span = info_span!("load all packs", path = %packs_path.display()).entered();
    let start = Instant::now();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(packs_path)
        .map_err(|e| format!("could not list packs directory: {e}"))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();

    let packs: Vec<_> = entries
        .par_iter()
        .filter_map(|path| isolate_pack(path, || load_pack(path)))
        .collect();
    info!(
        packs = packs.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "all packs loaded"
    );
    Ok(PackSet::new(packs))
}

fn load_pack(path: &Path) -> Option<Pack> {
    let source = match open_pack_source(path)? {
        Ok(source) => source,
        Err(e) => {
            error!(%e, path = %path.display(), "failed to open pack");
            return None;
        }
    };
    let name = pack_name_from_path(path);
    let pack = build_pack(name, source.as_ref());
    info!(
        pack = %pack.name,
        markers = pack.markers.len(),
        trails = pack.trails.len(),
        categories = pack.categories.len(),
        "pack loaded"
    );
    Some(pack)
}

/// Runs the build of one pack so that a panic inside it only omits that pack.
fn isolate_pack(path: &Path, build: impl FnOnce() -> Option<Pack>) -> Option<Pack> {
    match catch_unwind(AssertUnwindSafe(build)) {
        Ok(pack) => pack,
        Err(_) => {
            error!(path = %path.display(), "pack loading panicked, pack omitted");
            None
        }
    }
}

/// Owns the currently published [`PackSet`] and the background loader that replaces it.
///
/// The render path only ever reads [`PackManager::packs`]. A finished load is adopted in
/// [`PackManager::begin_frame`], so a set is never swapped while a frame is being built.
pub struct PackManager {
    packs_path: PathBuf,
    category_state_path: PathBuf,
    load_task: AsyncTaskGuard<LoadRequest, Result<PackSet, String>>,
    current: Arc<PackSet>,
    category_state: CategoryState,
    /// bumped each time a new set is adopted
    generation: u64,
}

impl PackManager {
    /// `data_dir` holds the `packs` directory and the category state file.
    pub fn new(data_dir: &Path) -> Result<Self, String> {
        let packs_path = data_dir.join(PACKS_DIRECTORY_NAME);
        if let Err(e) = std::fs::create_dir_all(&packs_path) {
            warn!(?e, path = %packs_path.display(), "could not create packs directory");
        }
        let category_state_path = data_dir.join(CATEGORY_STATE_FILE_NAME);
        let category_state = CategoryState::load(&category_state_path);
        let load_task = AsyncTaskGuard::new("pack loader", |request: LoadRequest| -> Result<PackSet, String> {
            // keeps the loader thread alive for the next reload
            let mut set = catch_unwind(AssertUnwindSafe(|| load_all_from_dir(&request.packs_path)))
                .unwrap_or_else(|_| Err("pack loading panicked".to_string()))?;
            request.category_state.apply(&mut set);
            Ok(set)
        })
        .map_err(|e| format!("could not spawn pack loader: {e}"))?;
        Ok(Self {
            packs_path,
            category_state_path,
            load_task,
            current: Default::default(),
            category_state,
            generation: 0,
        })
    }

    pub fn packs_path(&self) -> &Path {
        &self.packs_path
    }

    /// The set the render path works on. Empty until the first load is adopted.
    pub fn packs(&self) -> &PackSet {
        &self.current
    }

    /// A handle on the current set that stays valid after later loads are adopted.
    pub fn snapshot(&self) -> Arc<PackSet> {
        Arc::clone(&self.current)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.load_task.is_running()
    }

    /// Starts loading every pack in the background.
    /// Ignored while a previous load is still running, returns whether a load was started.
    pub fn reload(&mut self) -> bool {
        if self.load_task.is_running() {
            debug!("pack load already in progress, reload ignored");
            return false;
        }
        // flags toggled on the current set carry over to the new one
        self.category_state.capture(&self.current);
        let request = LoadRequest {
            packs_path: self.packs_path.clone(),
            category_state: self.category_state.clone(),
        };
        match self.load_task.send(request) {
            Ok(()) => {
                info!(path = %self.packs_path.display(), "pack load started");
                true
            }
            Err(_) => {
                error!("pack loader thread is gone");
                false
            }
        }
    }

    /// Adopts a finished load if there is one. Returns whether the set changed.
    pub fn begin_frame(&mut self) -> bool {
        match self.load_task.try_recv() {
            Ok(result) => self.adopt(result),
            Err(std::sync::mpsc::TryRecvError::Empty) => false,
            Err(std::sync::mpsc::TryRecvError::Disconnected) => false,
        }
    }

    /// Blocks until the running load finishes and adopts it. Does nothing when idle.
    pub fn wait_for_load(&mut self) -> bool {
        if !self.load_task.is_running() {
            return self.begin_frame();
        }
        match self.load_task.recv() {
            Ok(result) => self.adopt(result),
            Err(_) => false,
        }
    }

    fn adopt(&mut self, result: Result<PackSet, String>) -> bool {
        match result {
            Ok(set) => {
                info!(
                    packs = set.len(),
                    markers = set.total_markers(),
                    trails = set.total_trails(),
                    "publishing new pack set"
                );
                self.current = Arc::new(set);
                self.generation += 1;
                true
            }
            Err(e) => {
                // the previous set stays published
                error!(%e, "pack load failed");
                false
            }
        }
    }

    pub fn set_pack_enabled(&mut self, pack_name: &str, enabled: bool) -> bool {
        let set = Arc::make_mut(&mut self.current);
        match set.get_mut(pack_name) {
            Some(pack) => {
                pack.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns false when either the pack or the category is unknown.
    pub fn set_category_enabled(&mut self, pack_name: &str, path: &str, enabled: bool) -> bool {
        let set = Arc::make_mut(&mut self.current);
        match set.get_mut(pack_name) {
            Some(pack) => pack.categories.set_enabled(path, enabled),
            None => false,
        }
    }

    pub fn save_category_state(&mut self) -> Result<(), String> {
        self.category_state.capture(&self.current);
        self.category_state.save(&self.category_state_path)?;
        debug!(path = %self.category_state_path.display(), "category state saved");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::source::test::zip_bytes;
    use crate::io::tbin::test::encode;
    use glam::Vec3;
    use similar_asserts::assert_eq;

    const PACK_XML: &str = r#"<OverlayData>
  <MarkerCategory name="Root">
    <MarkerCategory name="Leaf" iconSize="2"/>
  </MarkerCategory>
  <POIs>
    <POI MapID="15" xpos="1" ypos="2" zpos="3" type="root.leaf"/>
    <Trail trailData="data/t.trl" type="root.leaf"/>
  </POIs>
</OverlayData>"#;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jokolay_{name}_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join(PACKS_DIRECTORY_NAME)).unwrap();
        dir
    }

    fn write_pack(data_dir: &Path, file_name: &str) {
        let trl = encode(0, 15, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
        let bytes = zip_bytes(&[("pack.xml", PACK_XML.as_bytes()), ("data/t.trl", &trl)]);
        std::fs::write(data_dir.join(PACKS_DIRECTORY_NAME).join(file_name), bytes).unwrap();
    }

    #[test]
    fn loads_archives_and_directories() {
        let dir = temp_dir("load");
        write_pack(&dir, "b.taco");
        let extracted = dir.join(PACKS_DIRECTORY_NAME).join("a");
        std::fs::create_dir_all(&extracted).unwrap();
        std::fs::write(extracted.join("pack.xml"), PACK_XML).unwrap();
        std::fs::write(dir.join(PACKS_DIRECTORY_NAME).join("notes.txt"), "hi").unwrap();

        let set = load_all_from_dir(&dir.join(PACKS_DIRECTORY_NAME)).unwrap();
        let names: Vec<&str> = set.packs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(set.total_markers(), 2);
        // the extracted copy has no trail binary
        assert_eq!(set.total_trails(), 1);
        assert_eq!(set.packs[0].report.trails.file_not_found, 1);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn a_panicking_pack_is_omitted() {
        let path = Path::new("huge.taco");
        assert!(isolate_pack(path, || panic!("capacity overflow")).is_none());
        let pack = isolate_pack(path, || Some(Pack::new("huge".into(), "huge.taco".into())));
        assert_eq!(pack.map(|p| p.name), Some("huge".to_string()));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(load_all_from_dir(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn publishes_only_on_begin_frame() {
        let dir = temp_dir("publish");
        write_pack(&dir, "tekkit.taco");
        let mut manager = PackManager::new(&dir).unwrap();
        assert!(manager.packs().is_empty());

        assert!(manager.reload());
        assert!(manager.packs().is_empty());
        assert!(manager.wait_for_load());
        assert_eq!(manager.generation(), 1);
        assert_eq!(manager.packs().len(), 1);
        assert_eq!(manager.packs().total_markers(), 1);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn reload_while_loading_is_ignored() {
        let dir = temp_dir("reload");
        write_pack(&dir, "tekkit.taco");
        let mut manager = PackManager::new(&dir).unwrap();
        assert!(manager.reload());
        // the pending counter is raised synchronously by `reload`
        assert!(manager.is_loading());
        assert!(!manager.reload());
        assert!(manager.wait_for_load());
        assert_eq!(manager.generation(), 1);
        assert!(!manager.begin_frame());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn toggles_survive_reload_and_restart() {
        let dir = temp_dir("toggles");
        write_pack(&dir, "tekkit.taco");
        let mut manager = PackManager::new(&dir).unwrap();
        manager.reload();
        manager.wait_for_load();

        let before = manager.snapshot();
        assert!(manager.set_category_enabled("tekkit", "root.leaf", false));
        assert!(!manager.set_category_enabled("tekkit", "root.nope", false));
        assert!(!manager.set_pack_enabled("other", false));
        // the snapshot taken before the toggle is untouched
        assert!(before.packs[0].categories.is_enabled("root.leaf"));
        assert!(!manager.packs().packs[0].categories.is_enabled("root.leaf"));
        manager.save_category_state().unwrap();

        // let the loader lower its counter before reloading
        while manager.is_loading() {
            std::thread::yield_now();
        }
        assert!(manager.reload());
        manager.wait_for_load();
        assert!(!manager.packs().packs[0].categories.is_enabled("root.leaf"));

        let mut restarted = PackManager::new(&dir).unwrap();
        restarted.reload();
        restarted.wait_for_load();
        assert!(!restarted.packs().packs[0].categories.is_enabled("root.leaf"));
        std::fs::remove_dir_all(dir).unwrap();
    }
}

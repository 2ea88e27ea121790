use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use joko_core::RelativePath;
use tracing::{debug, info, info_span, instrument};

/// Where the bytes of a pack come from.
/// Paths are always normalized, see [`RelativePath`].
pub trait PackSource: Send + Sync {
    /// Human readable location of the whole pack.
    fn location(&self) -> String;
    /// Every file of the pack, in the order the source lists them.
    fn files(&self) -> Vec<RelativePath>;
    /// `None` when the file does not exist or cannot be read.
    fn read(&self, path: &RelativePath) -> Option<Vec<u8>>;
    /// Location of one file, handed to the texture host.
    fn locate(&self, path: &RelativePath) -> Option<String>;
}

/// Pack name derived from the file stem of the archive or the directory name.
pub fn pack_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Files kept in memory, in insertion order.
/// Also what an archive becomes once read.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    location: String,
    entries: IndexMap<RelativePath, Vec<u8>>,
}

impl MemorySource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            entries: Default::default(),
        }
    }
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(RelativePath::new(path), bytes.into());
    }
}

impl PackSource for MemorySource {
    fn location(&self) -> String {
        self.location.clone()
    }
    fn files(&self) -> Vec<RelativePath> {
        self.entries.keys().cloned().collect()
    }
    fn read(&self, path: &RelativePath) -> Option<Vec<u8>> {
        self.entries.get(path).cloned()
    }
    fn locate(&self, path: &RelativePath) -> Option<String> {
        self.entries
            .contains_key(path)
            .then(|| format!("{}/{}", self.location, path))
    }
}

/// A `.taco` / `.zip` archive, read fully into memory when opened.
pub struct ZipSource(MemorySource);

impl ZipSource {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("could not read archive: {e}"))?;
        Self::from_bytes(path.display().to_string(), bytes)
    }

    pub fn from_bytes(location: String, bytes: Vec<u8>) -> Result<Self, String> {
        let mut zip_archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .or(Err("failed to read zip archive"))?;
        let mut source = MemorySource::new(location);
        for index in 0..zip_archive.len() {
            let mut file = match zip_archive.by_index(index) {
                Ok(file) => file,
                Err(e) => {
                    info!(?e, index, "failed to get file from zip");
                    continue;
                }
            };
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            // the size in the entry header is not trusted
            let mut content = Vec::new();
            match file.read_to_end(&mut content) {
                Ok(0) => debug!(%name, "empty file"),
                Ok(_) => source.insert(&name, content),
                Err(e) => info!(?e, %name, "failed to read file from zip"),
            }
        }
        Ok(Self(source))
    }
}

impl PackSource for ZipSource {
    fn location(&self) -> String {
        self.0.location()
    }
    fn files(&self) -> Vec<RelativePath> {
        self.0.files()
    }
    fn read(&self, path: &RelativePath) -> Option<Vec<u8>> {
        self.0.read(path)
    }
    fn locate(&self, path: &RelativePath) -> Option<String> {
        self.0.locate(path)
    }
}

/// An already extracted pack. Files are read lazily.
pub struct DirSource {
    root: PathBuf,
    /// normalized path to the real file name on disk, which keeps its authored casing
    entries: IndexMap<RelativePath, PathBuf>,
}

impl DirSource {
    pub fn open(root: &Path) -> Result<Self, String> {
        let _span = info_span!("listing pack directory", root = %root.display()).entered();
        let mut entries = IndexMap::new();
        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            let entry = entry.or(Err("Could not walk directory"))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy();
            entries.insert(RelativePath::new(&relative), entry.path().to_path_buf());
        }
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }
}

impl PackSource for DirSource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }
    fn files(&self) -> Vec<RelativePath> {
        self.entries.keys().cloned().collect()
    }
    fn read(&self, path: &RelativePath) -> Option<Vec<u8>> {
        let real = self.entries.get(path)?;
        match std::fs::read(real) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                info!(?e, %path, "failed to read file");
                None
            }
        }
    }
    fn locate(&self, path: &RelativePath) -> Option<String> {
        self.entries.get(path).map(|p| p.display().to_string())
    }
}

/// Opens a pack directory or archive. `None` for anything else found in the packs directory.
pub fn open_pack_source(path: &Path) -> Option<Result<Box<dyn PackSource>, String>> {
    if path.is_dir() {
        return Some(DirSource::open(path).map(|s| Box::new(s) as Box<dyn PackSource>));
    }
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "taco" | "zip" => Some(ZipSource::open(path).map(|s| Box::new(s) as Box<dyn PackSource>)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use similar_asserts::assert_eq;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn zip_entries_are_normalized() {
        let bytes = zip_bytes(&[("Data\\Icon.PNG", b"png"), ("Pack.xml", b"<OverlayData/>")]);
        let source = ZipSource::from_bytes("test.taco".into(), bytes).unwrap();
        assert_eq!(
            source.files(),
            vec![RelativePath::new("data/icon.png"), RelativePath::new("pack.xml")]
        );
        assert_eq!(source.read(&RelativePath::new("DATA/icon.png")).unwrap(), b"png");
        assert!(source.read(&RelativePath::new("missing.png")).is_none());
        assert_eq!(
            source.locate(&RelativePath::new("pack.xml")).as_deref(),
            Some("test.taco/pack.xml")
        );
    }

    #[test]
    fn garbage_is_not_an_archive() {
        assert!(ZipSource::from_bytes("bad".into(), b"not a zip".to_vec()).is_err());
    }

    #[test]
    fn pack_names_come_from_file_stem() {
        assert_eq!(pack_name_from_path(Path::new("/x/Tekkit's All-In-One.taco")), "Tekkit's All-In-One");
        assert_eq!(pack_name_from_path(Path::new("/x/extracted")), "extracted");
    }
}

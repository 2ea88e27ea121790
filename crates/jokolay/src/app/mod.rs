use std::collections::HashMap;
use std::path::{Path, PathBuf};

use joko_package_manager::PackManager;
use joko_package_models::package::PackageImportReport;
use joko_render_manager::PathingRenderer;
use joko_render_models::{
    settings::SETTINGS_FILE_NAME, FrameInput, RenderSettings, RenderStatus, TextureHandle,
};
use miette::{Context, IntoDiagnostic, Result};
use tracing::{error, info, info_span, warn};

mod init;
use init::get_jokolay_path;

/// Camera and viewport read when no file is given on the command line.
const FRAME_FILE_NAME: &str = "frame.json";

pub struct Jokolay {
    root_path: PathBuf,
    settings: RenderSettings,
    package_manager: PackManager,
    renderer: PathingRenderer,
    /// Every texture a pack can provide, as if the host had uploaded them all.
    textures: HashMap<String, TextureHandle>,
}

impl Jokolay {
    pub fn new(root_path: PathBuf) -> Result<Self> {
        let settings = RenderSettings::load(&root_path.join(SETTINGS_FILE_NAME));
        let package_manager = PackManager::new(&root_path)
            .map_err(|e| miette::miette!(e))
            .wrap_err("failed to create the pack manager")?;
        Ok(Self {
            root_path,
            settings,
            package_manager,
            renderer: PathingRenderer::new(),
            textures: Default::default(),
        })
    }

    /// Loads every pack and waits for the result to be published.
    pub fn load_packs(&mut self) {
        let _span = info_span!("loading packs", path = %self.package_manager.packs_path().display()).entered();
        if !self.package_manager.reload() {
            return;
        }
        if !self.package_manager.wait_for_load() {
            warn!("no pack set was published");
            return;
        }
        let packs = self.package_manager.packs();
        self.textures = packs
            .packs
            .iter()
            .flat_map(|pack| pack.texture_requests().into_keys())
            .zip(1..)
            .collect();
        let reports: Vec<&PackageImportReport> = packs.packs.iter().map(|p| &p.report).collect();
        for report in reports.iter() {
            info!(
                pack = %report.pack_name,
                markers = report.number_of.markers,
                trails = report.trails.loaded,
                missing_trail_data = report.trails.missing_trail_data,
                file_not_found = report.trails.file_not_found,
                binary_failed = report.trails.binary_failed,
                "import report"
            );
        }
        let report_path = self.root_path.join(PackageImportReport::REPORT_FILE_NAME);
        match serde_json::to_string_pretty(&reports) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&report_path, content) {
                    warn!(?e, path = %report_path.display(), "could not write import report");
                }
            }
            Err(e) => error!(?e, "could not serialize import reports"),
        }
    }

    pub fn render(&mut self, input: &FrameInput) -> RenderStatus {
        self.package_manager.begin_frame();
        *self.renderer.render_frame(
            self.package_manager.packs(),
            input,
            &self.settings,
            &self.textures,
            self.package_manager.is_loading(),
        )
    }

    pub fn primitives_as_json(&self) -> Result<String> {
        let primitives: Vec<_> = self.renderer.primitives().collect();
        serde_json::to_string_pretty(&primitives).into_diagnostic()
    }

    pub fn shutdown(mut self) {
        if let Err(e) = self.package_manager.save_category_state() {
            error!(%e, "failed to save category state");
        }
        if let Err(e) = self
            .settings
            .save(&self.root_path.join(SETTINGS_FILE_NAME))
        {
            error!(%e, "failed to save settings");
        }
    }
}

fn read_frame_input(path: &Path) -> Result<FrameInput> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(path.display().to_string())
        .wrap_err("failed to read frame input")?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err("invalid frame input")
}

/// `jokolay [frame.json] [--dump]`
pub fn start_jokolay() -> Result<()> {
    let jokolay_path = get_jokolay_path()?;
    let log_file_flush_guard = joko_core::trace::install_tracing(&jokolay_path)?;

    if let Err(e) = rayon::ThreadPoolBuilder::default()
        .panic_handler(|panic_info| {
            error!(?panic_info, "rayon thread paniced.");
        })
        .build_global()
    {
        error!(
            ?e,
            "failed to set panic handler and build global threadpool for rayon"
        );
    }

    let mut frame_path = jokolay_path.join(FRAME_FILE_NAME);
    let mut dump = false;
    for arg in std::env::args().skip(1) {
        if arg == "--dump" {
            dump = true;
        } else {
            frame_path = PathBuf::from(arg);
        }
    }

    let mut jokolay = Jokolay::new(jokolay_path)?;
    jokolay.load_packs();
    let input = match read_frame_input(&frame_path) {
        Ok(input) => input,
        Err(e) => {
            warn!(?e, "no usable frame input, rendering an empty frame");
            FrameInput::default()
        }
    };
    let status = jokolay.render(&input);
    println!("{}", status.debug_line());
    if dump {
        println!("{}", jokolay.primitives_as_json()?);
    }
    jokolay.shutdown();
    std::mem::drop(log_file_flush_guard);
    Ok(())
}

use miette::{Context, IntoDiagnostic, Result};

/// Jokolay Configuration
/// We will read a path from env `JOKOLAY_DATA_DIR` or create a folder at data_local_dir/jokolay, where data_local_dir is platform specific
/// Inside this directory, we will store all of jokolay's data like settings, packs, logs etc..
pub fn get_jokolay_path() -> Result<std::path::PathBuf> {
    let path = if let Ok(env_dir) = std::env::var("JOKOLAY_DATA_DIR") {
        std::path::PathBuf::from(env_dir) //may still be an invalid path
    } else if let Some(project_dir) =
        directories_next::ProjectDirs::from("com.jokolay", "", "jokolay")
    {
        project_dir.data_local_dir().to_path_buf()
    } else {
        return Err(miette::miette!(
            "getting project path failed for some reason"
        ));
    };
    std::fs::create_dir_all(&path)
        .into_diagnostic()
        .wrap_err(path.display().to_string())
        .wrap_err("failed to create jokolay directory")?;
    Ok(path)
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::USER_DATA_DIR_ENV;

const USER_DATA_SUBDIRS: [&str; 3] = ["voices", "presets", "output"];

/// `SAYAS_USER_DATA_DIR`, else `~/.sayas`.
pub(crate) fn default_user_data_dir() -> Option<PathBuf> {
    resolve_user_data_dir(None)
}

/// `SAYAS_USER_DATA_DIR`, else `~/.sayas`, else `app_data_dir`.
pub(crate) fn resolve_user_data_dir(app_data_dir: Option<PathBuf>) -> Option<PathBuf> {
    pick_user_data_dir(
        env::var(USER_DATA_DIR_ENV).ok().as_deref(),
        home::home_dir(),
        app_data_dir,
    )
}

fn pick_user_data_dir(
    override_dir: Option<&str>,
    home_dir: Option<PathBuf>,
    app_data_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(raw) = override_dir {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    home_dir.map(|home| home.join(".sayas")).or(app_data_dir)
}

/// Filesystem locations handed to the UI through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimePaths {
    pub(crate) app_root: PathBuf,
    pub(crate) user_data: PathBuf,
    pub(crate) voices: PathBuf,
    pub(crate) presets: PathBuf,
    pub(crate) output: PathBuf,
}

impl RuntimePaths {
    pub(crate) fn new(app_root: PathBuf, user_data: PathBuf) -> Self {
        Self {
            voices: user_data.join(USER_DATA_SUBDIRS[0]),
            presets: user_data.join(USER_DATA_SUBDIRS[1]),
            output: user_data.join(USER_DATA_SUBDIRS[2]),
            app_root,
            user_data,
        }
    }

    /// Create `voices/`, `presets/` and `output/` if they are missing.
    pub(crate) fn ensure_user_data_layout<F>(&self, log: F) -> Result<(), String>
    where
        F: Fn(&str),
    {
        for dir in [&self.voices, &self.presets, &self.output] {
            ensure_dir(dir, &log)?;
        }
        Ok(())
    }
}

fn ensure_dir<F>(dir: &Path, log: F) -> Result<(), String>
where
    F: Fn(&str),
{
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .map_err(|error| format!("Failed to create directory {}: {}", dir.display(), error))?;
    log(&format!("created directory: {}", dir.display()));
    Ok(())
}

pub(crate) fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

use std::{collections::BTreeMap, env, path::PathBuf};

use crate::CUDA_BIN_ENV;

/// Environment overrides applied to every backend child on top of the
/// inherited environment.
pub(crate) fn build_backend_env<E>(env_lookup: E) -> BTreeMap<String, String>
where
    E: Fn(&str) -> Option<String>,
{
    let mut overrides = BTreeMap::new();
    overrides.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
    overrides.insert(
        "PYTHONUTF8".to_string(),
        env_lookup("PYTHONUTF8").unwrap_or_else(|| "1".to_string()),
    );
    overrides.insert(
        "PYTHONIOENCODING".to_string(),
        env_lookup("PYTHONIOENCODING").unwrap_or_else(|| "utf-8".to_string()),
    );
    overrides.insert("SAYAS_DESKTOP_CLIENT".to_string(), "1".to_string());

    if let Some(cuda_bin) = resolve_cuda_bin(&env_lookup) {
        match extend_path(env_lookup("PATH"), cuda_bin) {
            Ok(path) => {
                overrides.insert("PATH".to_string(), path);
            }
            Err(error) => crate::append_startup_log(&format!(
                "failed to extend PATH with CUDA runtime: {error}"
            )),
        }
    }

    overrides
}

fn resolve_cuda_bin<E>(env_lookup: &E) -> Option<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env_lookup(CUDA_BIN_ENV) {
        let trimmed = raw.trim();
        return (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
    }
    default_cuda_bin()
}

#[cfg(target_os = "windows")]
fn default_cuda_bin() -> Option<PathBuf> {
    Some(PathBuf::from(crate::DEFAULT_CUDA_BIN))
}

#[cfg(not(target_os = "windows"))]
fn default_cuda_bin() -> Option<PathBuf> {
    None
}

/// Append `extra` to a `PATH` value unless it is already listed.
fn extend_path(current: Option<String>, extra: PathBuf) -> Result<String, String> {
    let mut entries: Vec<PathBuf> = current
        .as_deref()
        .map(|raw| env::split_paths(raw).collect())
        .unwrap_or_default();
    if !entries.iter().any(|entry| entry == &extra) {
        entries.push(extra);
    }
    env::join_paths(entries)
        .map(|joined| joined.to_string_lossy().to_string())
        .map_err(|error| error.to_string())
}

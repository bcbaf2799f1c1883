use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    API_SCRIPT_ENV, APP_ROOT_ENV, PYTHON_ENV, RUNTIME_MANIFEST_RESOURCE, UI_SCRIPT_ENV,
};

/// Optional `backend/runtime-manifest.json` shipped with packaged builds.
/// Paths are relative to the manifest directory.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuntimeManifest {
    pub(crate) python: Option<String>,
    pub(crate) ui_entrypoint: Option<String>,
    pub(crate) api_entrypoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchPlan {
    pub(crate) python: PathBuf,
    pub(crate) ui_script: PathBuf,
    pub(crate) api_script: PathBuf,
    pub(crate) app_root: PathBuf,
    pub(crate) packaged_mode: bool,
}

pub(crate) fn is_dev_mode(desktop_env: Option<&str>) -> bool {
    match desktop_env.map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("development") => true,
        Some(value) if value.eq_ignore_ascii_case("production") => false,
        _ => cfg!(debug_assertions),
    }
}

pub(crate) fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    candidate.canonicalize().unwrap_or(candidate)
}

pub(crate) fn venv_python(venv_parent: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        venv_parent.join("venv").join("Scripts").join("python.exe")
    } else {
        venv_parent.join("venv").join("bin").join("python3")
    }
}

fn read_runtime_manifest(manifest_path: &Path) -> Result<RuntimeManifest, String> {
    let manifest_text = fs::read_to_string(manifest_path).map_err(|error| {
        format!(
            "Failed to read backend manifest {}: {}",
            manifest_path.display(),
            error
        )
    })?;
    serde_json::from_str(&manifest_text).map_err(|error| {
        format!(
            "Failed to parse backend manifest {}: {}",
            manifest_path.display(),
            error
        )
    })
}

fn env_path<E>(env_lookup: &E, key: &str) -> Option<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    env_lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Work out interpreter, scripts and working directory.
///
/// Development builds run from the workspace checkout; packaged builds run
/// next to the executable and take the interpreter from the bundled
/// resources. Environment overrides win over both.
pub(crate) fn resolve_launch_plan<E>(
    dev_mode: bool,
    dev_root: PathBuf,
    exe_dir: Option<PathBuf>,
    resource_dir: Option<PathBuf>,
    env_lookup: E,
) -> Result<LaunchPlan, String>
where
    E: Fn(&str) -> Option<String>,
{
    let packaged_mode = !dev_mode;
    let app_root = env_path(&env_lookup, APP_ROOT_ENV).unwrap_or_else(|| {
        if packaged_mode {
            exe_dir.unwrap_or_else(|| dev_root.clone())
        } else {
            dev_root.clone()
        }
    });

    let mut python = if packaged_mode {
        resource_dir
            .as_deref()
            .map(|resources| venv_python(&resources.join("python")))
            .unwrap_or_else(|| venv_python(&app_root))
    } else {
        venv_python(&app_root)
    };
    let mut ui_script = app_root.join("src").join("webui.py");
    let mut api_script = app_root.join("src").join("api.py");

    if packaged_mode {
        if let Some(manifest_path) = resource_dir
            .as_deref()
            .map(|resources| resources.join(RUNTIME_MANIFEST_RESOURCE))
            .filter(|path| path.is_file())
        {
            let manifest = read_runtime_manifest(&manifest_path)?;
            let manifest_dir = manifest_path.parent().ok_or_else(|| {
                format!("Invalid backend manifest path: {}", manifest_path.display())
            })?;
            if let Some(relative) = manifest.python.as_deref() {
                python = manifest_dir.join(relative);
            }
            if let Some(relative) = manifest.ui_entrypoint.as_deref() {
                ui_script = manifest_dir.join(relative);
            }
            if let Some(relative) = manifest.api_entrypoint.as_deref() {
                api_script = manifest_dir.join(relative);
            }
        }
    }

    if let Some(path) = env_path(&env_lookup, PYTHON_ENV) {
        python = path;
    }
    if let Some(path) = env_path(&env_lookup, UI_SCRIPT_ENV) {
        ui_script = path;
    }
    if let Some(path) = env_path(&env_lookup, API_SCRIPT_ENV) {
        api_script = path;
    }

    Ok(LaunchPlan {
        python,
        ui_script,
        api_script,
        app_root,
        packaged_mode,
    })
}

pub(crate) fn build_debug_command(plan: &LaunchPlan) -> Vec<String> {
    vec![
        plan.python.to_string_lossy().to_string(),
        plan.ui_script.to_string_lossy().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn dev_plan_uses_workspace_venv_and_src_scripts() {
        let root = PathBuf::from("/work/sayas");
        let plan = resolve_launch_plan(true, root.clone(), None, None, lookup(&[]))
            .expect("plan");

        assert!(!plan.packaged_mode);
        assert_eq!(plan.app_root, root);
        assert_eq!(plan.python, venv_python(&root));
        assert_eq!(plan.ui_script, root.join("src").join("webui.py"));
        assert_eq!(plan.api_script, root.join("src").join("api.py"));
    }

    #[test]
    fn packaged_plan_uses_exe_dir_and_bundled_python() {
        let plan = resolve_launch_plan(
            false,
            PathBuf::from("/work/sayas"),
            Some(PathBuf::from("/opt/sayas")),
            Some(PathBuf::from("/opt/sayas/resources")),
            lookup(&[]),
        )
        .expect("plan");

        assert!(plan.packaged_mode);
        assert_eq!(plan.app_root, PathBuf::from("/opt/sayas"));
        assert_eq!(
            plan.python,
            venv_python(Path::new("/opt/sayas/resources/python"))
        );
        assert_eq!(plan.ui_script, PathBuf::from("/opt/sayas/src/webui.py"));
    }

    #[test]
    fn packaged_plan_reads_runtime_manifest() {
        let resources = tempfile::tempdir().expect("tempdir");
        let backend_dir = resources.path().join("backend");
        fs::create_dir_all(&backend_dir).expect("backend dir");
        fs::write(
            backend_dir.join("runtime-manifest.json"),
            r#"{ "python": "runtime/python", "uiEntrypoint": "app/webui.py" }"#,
        )
        .expect("manifest");

        let plan = resolve_launch_plan(
            false,
            PathBuf::from("/work/sayas"),
            Some(PathBuf::from("/opt/sayas")),
            Some(resources.path().to_path_buf()),
            lookup(&[]),
        )
        .expect("plan");

        assert_eq!(plan.python, backend_dir.join("runtime/python"));
        assert_eq!(plan.ui_script, backend_dir.join("app/webui.py"));
        assert_eq!(plan.api_script, PathBuf::from("/opt/sayas/src/api.py"));
    }

    #[test]
    fn broken_runtime_manifest_is_an_error() {
        let resources = tempfile::tempdir().expect("tempdir");
        let backend_dir = resources.path().join("backend");
        fs::create_dir_all(&backend_dir).expect("backend dir");
        fs::write(backend_dir.join("runtime-manifest.json"), "{ nope").expect("manifest");

        let error = resolve_launch_plan(
            false,
            PathBuf::from("/work/sayas"),
            None,
            Some(resources.path().to_path_buf()),
            lookup(&[]),
        )
        .expect_err("parse failure");
        assert!(error.starts_with("Failed to parse backend manifest"));
    }

    #[test]
    fn env_overrides_win() {
        let plan = resolve_launch_plan(
            true,
            PathBuf::from("/work/sayas"),
            None,
            None,
            lookup(&[
                (APP_ROOT_ENV, "/srv/app"),
                (PYTHON_ENV, "/usr/bin/python3"),
                (UI_SCRIPT_ENV, " /srv/app/ui.py "),
                (API_SCRIPT_ENV, ""),
            ]),
        )
        .expect("plan");

        assert_eq!(plan.app_root, PathBuf::from("/srv/app"));
        assert_eq!(plan.python, PathBuf::from("/usr/bin/python3"));
        assert_eq!(plan.ui_script, PathBuf::from("/srv/app/ui.py"));
        assert_eq!(plan.api_script, PathBuf::from("/srv/app/src/api.py"));
    }

    #[test]
    fn dev_mode_follows_desktop_env() {
        assert!(is_dev_mode(Some("development")));
        assert!(!is_dev_mode(Some("Production")));
        assert_eq!(is_dev_mode(None), cfg!(debug_assertions));
        assert_eq!(is_dev_mode(Some("staging")), cfg!(debug_assertions));
    }
}

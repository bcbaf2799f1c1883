use std::{env, time::Duration};

use sayas_supervisor::{SupervisorConfig, DEFAULT_UI_PORT};

use crate::{
    backend_env, launch_plan::LaunchPlan, BACKEND_TIMEOUT_ENV, DEFAULT_BACKEND_TIMEOUT_MS,
    OUTPUT_DRAIN_TIMEOUT, REQUIRE_API_ENV, UI_PORT_ENV,
};

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn resolve_ui_port(raw: Option<&str>) -> u16 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|port| *port > 0)
        .unwrap_or(DEFAULT_UI_PORT)
}

pub(crate) fn resolve_backend_timeout(raw: Option<&str>) -> Duration {
    let timeout_ms = raw
        .map(str::trim)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS);
    Duration::from_millis(timeout_ms)
}

pub(crate) fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

pub(crate) fn build_supervisor_config<E>(plan: &LaunchPlan, env_lookup: E) -> SupervisorConfig
where
    E: Fn(&str) -> Option<String>,
{
    let ui_port = resolve_ui_port(env_lookup(UI_PORT_ENV).as_deref());
    let startup_timeout = resolve_backend_timeout(env_lookup(BACKEND_TIMEOUT_ENV).as_deref());
    let require_api = parse_flag(env_lookup(REQUIRE_API_ENV).as_deref());

    SupervisorConfig::new(&plan.python, &plan.ui_script, &plan.app_root)
        .api_script(&plan.api_script)
        .envs(backend_env::build_backend_env(&env_lookup))
        .ui_port(ui_port)
        .startup_timeout(startup_timeout)
        .require_api(require_api)
        .output_drain_timeout(OUTPUT_DRAIN_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, path::PathBuf};

    fn plan() -> LaunchPlan {
        LaunchPlan {
            python: PathBuf::from("/work/venv/bin/python3"),
            ui_script: PathBuf::from("/work/src/webui.py"),
            api_script: PathBuf::from("/work/src/api.py"),
            app_root: PathBuf::from("/work"),
            packaged_mode: false,
        }
    }

    #[test]
    fn ui_port_falls_back_on_invalid_values() {
        assert_eq!(resolve_ui_port(None), DEFAULT_UI_PORT);
        assert_eq!(resolve_ui_port(Some(" 7861 ")), 7861);
        assert_eq!(resolve_ui_port(Some("0")), DEFAULT_UI_PORT);
        assert_eq!(resolve_ui_port(Some("99999")), DEFAULT_UI_PORT);
        assert_eq!(resolve_ui_port(Some("http")), DEFAULT_UI_PORT);
    }

    #[test]
    fn backend_timeout_defaults_to_sixty_seconds() {
        assert_eq!(resolve_backend_timeout(None), Duration::from_secs(60));
        assert_eq!(resolve_backend_timeout(Some("0")), Duration::from_secs(60));
        assert_eq!(resolve_backend_timeout(Some("-5")), Duration::from_secs(60));
        assert_eq!(
            resolve_backend_timeout(Some("1500")),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        for value in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(Some(value)), "{value} should be truthy");
        }
        for value in ["0", "false", "", "maybe"] {
            assert!(!parse_flag(Some(value)), "{value} should be falsy");
        }
        assert!(!parse_flag(None));
    }

    #[test]
    fn supervisor_config_follows_plan_and_env() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (UI_PORT_ENV, "7999"),
            (BACKEND_TIMEOUT_ENV, "2500"),
            (REQUIRE_API_ENV, "true"),
            (crate::CUDA_BIN_ENV, ""),
        ]);
        let config = build_supervisor_config(&plan(), |key| {
            vars.get(key).map(|value| value.to_string())
        });

        assert_eq!(config.executable, PathBuf::from("/work/venv/bin/python3"));
        assert_eq!(config.ui_script, PathBuf::from("/work/src/webui.py"));
        assert_eq!(config.api_script, Some(PathBuf::from("/work/src/api.py")));
        assert_eq!(config.working_dir, PathBuf::from("/work"));
        assert_eq!(config.ui_port, 7999);
        assert_eq!(config.startup_timeout, Duration::from_millis(2500));
        assert!(config.require_api);
        assert_eq!(config.ui_url(), "http://localhost:7999/");
        assert_eq!(
            config.env.get("PYTHONUNBUFFERED").map(String::as_str),
            Some("1")
        );
    }
}

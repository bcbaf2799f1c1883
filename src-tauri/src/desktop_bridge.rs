use url::Url;

use crate::{BACKEND_ERROR_EVENT, BACKEND_EXIT_EVENT};

/// `sayasAPI` methods that forward straight to a command without arguments.
const PLAIN_BRIDGE_COMMANDS: [(&str, &str); 7] = [
    ("getAppPath", "get_app_path"),
    ("getUserDataPath", "get_user_data_path"),
    ("getVoicesPath", "get_voices_path"),
    ("getPresetsPath", "get_presets_path"),
    ("getOutputPath", "get_output_path"),
    ("getVersion", "get_version"),
    ("isDev", "is_dev"),
];

/// Inject only into pages served from the UI backend's origin.
pub(crate) fn should_inject_desktop_bridge(ui_url: &str, page_url: &Url) -> bool {
    let Ok(ui_url) = Url::parse(ui_url) else {
        return false;
    };
    ui_url.origin() == page_url.origin()
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn desktop_bridge_script() -> String {
    let plain_methods = PLAIN_BRIDGE_COMMANDS
        .iter()
        .map(|(method, command)| format!("    {method}: () => invoke({}),\n", js_string(command)))
        .collect::<String>();
    let error_event = js_string(BACKEND_ERROR_EVENT);
    let exit_event = js_string(BACKEND_EXIT_EVENT);

    format!(
        r#"(() => {{
  if (window.sayasAPI) {{
    return;
  }}
  const tauri = window.__TAURI__;
  if (!tauri || !tauri.core || !tauri.event) {{
    console.warn('[sayas] desktop bridge unavailable: Tauri globals missing');
    return;
  }}
  const invoke = (command, args) => tauri.core.invoke(command, args || {{}});
  const subscriptions = new Set();
  const subscribe = (eventName, callback) => {{
    let active = true;
    let unlisten = null;
    const unsubscribe = () => {{
      if (!active) {{
        return;
      }}
      active = false;
      subscriptions.delete(unsubscribe);
      if (unlisten) {{
        unlisten();
      }}
    }};
    subscriptions.add(unsubscribe);
    tauri.event
      .listen(eventName, (event) => {{
        if (active) {{
          callback(event.payload);
        }}
      }})
      .then((stop) => {{
        unlisten = stop;
        if (!active) {{
          stop();
        }}
      }})
      .catch((error) => console.warn('[sayas] failed to listen for', eventName, error));
    return unsubscribe;
  }};

  window.sayasAPI = Object.freeze({{
{plain_methods}    selectFile: (options) => invoke('select_file', {{ options: options || {{}} }}),
    saveFile: (options) => invoke('save_file', {{ options: options || {{}} }}),
    showNotification: (message, severity) =>
      invoke('show_notification', {{ message: String(message), severity: severity || 'info' }}),
    onBackendError: (callback) => subscribe({error_event}, callback),
    onBackendExit: (callback) => subscribe({exit_event}, callback),
    onPythonError: (callback) => subscribe({error_event}, callback),
    onPythonExit: (callback) => subscribe({exit_event}, callback),
    removeAllListeners: () => {{
      Array.from(subscriptions).forEach((unsubscribe) => unsubscribe());
    }},
  }});
}})();"#
    )
}

pub(crate) fn inject_desktop_bridge<F>(webview: &tauri::Webview<tauri::Wry>, log: F)
where
    F: Fn(&str),
{
    if let Err(error) = webview.eval(&desktop_bridge_script()) {
        log(&format!("failed to inject desktop bridge: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_is_injected_for_ui_origin_only() {
        let ui_url = "http://localhost:7860/";
        let same = Url::parse("http://localhost:7860/?__theme=dark").unwrap();
        let other_port = Url::parse("http://localhost:8765/docs").unwrap();
        let other_host = Url::parse("http://127.0.0.1:7860/").unwrap();
        let remote = Url::parse("https://example.com/").unwrap();

        assert!(should_inject_desktop_bridge(ui_url, &same));
        assert!(!should_inject_desktop_bridge(ui_url, &other_port));
        assert!(!should_inject_desktop_bridge(ui_url, &other_host));
        assert!(!should_inject_desktop_bridge(ui_url, &remote));
        assert!(!should_inject_desktop_bridge("not a url", &same));
    }

    #[test]
    fn bridge_script_exposes_every_operation() {
        let script = desktop_bridge_script();
        for method in [
            "getAppPath",
            "getUserDataPath",
            "getVoicesPath",
            "getPresetsPath",
            "getOutputPath",
            "selectFile",
            "saveFile",
            "showNotification",
            "getVersion",
            "isDev",
            "onBackendError",
            "onBackendExit",
            "removeAllListeners",
        ] {
            assert!(script.contains(&format!("{method}:")), "missing {method}");
        }
        assert!(script.contains(r#"getVoicesPath: () => invoke("get_voices_path")"#));
        assert!(script.contains(r#"subscribe("python-error", callback)"#));
        assert!(script.contains(r#"subscribe("python-exit", callback)"#));
    }

    #[test]
    fn bridge_script_is_guarded_against_double_injection() {
        let script = desktop_bridge_script();
        assert!(script.starts_with("(() => {\n  if (window.sayasAPI) {"));
        assert!(script.ends_with("})();"));
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct FileFilter {
    pub(crate) name: String,
    pub(crate) extensions: Vec<String>,
}

/// Options accepted by `sayasAPI.selectFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct OpenDialogOptions {
    pub(crate) title: Option<String>,
    pub(crate) default_path: Option<String>,
    pub(crate) filters: Vec<FileFilter>,
    pub(crate) properties: Vec<String>,
    pub(crate) multiple: bool,
}

impl OpenDialogOptions {
    pub(crate) fn wants_directory(&self) -> bool {
        self.has_property("openDirectory")
    }

    pub(crate) fn wants_multiple(&self) -> bool {
        self.multiple || self.has_property("multiSelections")
    }

    fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|property| property == name)
    }
}

/// Options accepted by `sayasAPI.saveFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SaveDialogOptions {
    pub(crate) title: Option<String>,
    pub(crate) default_path: Option<String>,
    pub(crate) filters: Vec<FileFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenDialogResult {
    pub(crate) canceled: bool,
    pub(crate) file_paths: Vec<String>,
}

impl OpenDialogResult {
    pub(crate) fn from_selection(paths: Vec<String>) -> Self {
        Self {
            canceled: paths.is_empty(),
            file_paths: paths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveDialogResult {
    pub(crate) canceled: bool,
    pub(crate) file_path: Option<String>,
}

impl SaveDialogResult {
    pub(crate) fn from_selection(path: Option<String>) -> Self {
        Self {
            canceled: path.is_none(),
            file_path: path,
        }
    }
}

/// Split a caller-supplied default path into the directory to open and the
/// file name to prefill. An existing directory is used as is.
pub(crate) fn split_default_path(raw: Option<&str>) -> (Option<PathBuf>, Option<String>) {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return (None, None);
    };
    let path = Path::new(raw);
    if path.is_dir() {
        return (Some(path.to_path_buf()), None);
    }

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    (directory, file_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NotificationSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationSeverity {
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        match raw
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("success") => Self::Success,
            Some("warning" | "warn") => Self::Warning,
            Some("error") => Self::Error,
            _ => Self::Info,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

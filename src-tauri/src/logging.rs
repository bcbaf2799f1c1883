use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DesktopLogCategory {
    Startup,
    Runtime,
    Backend,
    Shutdown,
}

impl DesktopLogCategory {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Backend => "backend",
            Self::Shutdown => "shutdown",
        }
    }
}

pub(crate) fn resolve_desktop_log_path(root_dir: Option<PathBuf>, file_name: &str) -> PathBuf {
    match root_dir {
        Some(root) => root.join("logs").join(file_name),
        None => std::env::temp_dir().join("sayas").join(file_name),
    }
}

pub(crate) fn format_log_line(category: DesktopLogCategory, message: &str) -> String {
    format!(
        "[{}] [{}] {}\n",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
        category.as_str(),
        message
    )
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(format!(".{index}"));
    PathBuf::from(raw)
}

/// Shift `log -> log.1 -> ... -> log.N` when `log` has reached `max_bytes`.
pub(crate) fn rotate_log_if_needed(
    path: &Path,
    max_bytes: u64,
    backup_count: usize,
) -> std::io::Result<()> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };
    if size < max_bytes {
        return Ok(());
    }
    if backup_count == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backup_count).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

pub(crate) fn append_desktop_log(
    category: DesktopLogCategory,
    message: &str,
    root_dir: Option<PathBuf>,
    file_name: &str,
    max_bytes: u64,
    backup_count: usize,
    write_lock: &OnceLock<Mutex<()>>,
) {
    let line = format_log_line(category, message);
    if cfg!(debug_assertions) {
        eprint!("{line}");
    }

    let lock = write_lock.get_or_init(|| Mutex::new(()));
    let _guard = match lock.lock() {
        Ok(guard) => guard,
        Err(error) => error.into_inner(),
    };

    let path = resolve_desktop_log_path(root_dir, file_name);
    if let Err(error) = write_log_line(&path, &line, max_bytes, backup_count) {
        eprintln!("failed to write desktop log {}: {}", path.display(), error);
    }
}

fn write_log_line(
    path: &Path,
    line: &str,
    max_bytes: u64,
    backup_count: usize,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_log_if_needed(path, max_bytes, backup_count)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

const CONFIG_FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControllerConfig {
    pub git_executable: PathBuf,
    pub commit_page_size: usize,
    pub commit_batch_size: usize,
    pub tag_page_size: usize,
    pub tag_batch_size: usize,
    pub live_reload: bool,
    pub watch_debounce: Duration,
    pub watch_max_delay: Duration,
    pub refresh_delay: Duration,
    pub command_log_limit: usize,
    pub worker_threads: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            git_executable: PathBuf::from("git"),
            commit_page_size: 200,
            commit_batch_size: 200,
            tag_page_size: 100,
            tag_batch_size: 100,
            live_reload: true,
            watch_debounce: Duration::from_millis(400),
            watch_max_delay: Duration::from_secs(2),
            refresh_delay: Duration::from_millis(300),
            command_log_limit: 200,
            worker_threads: default_worker_threads(),
        }
    }
}

pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().clamp(1, 8))
        .unwrap_or(2)
}

/// On-disk shape; every field is optional so partial files work.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct ConfigFileV1 {
    version: u32,
    git_executable: Option<String>,
    commit_page_size: Option<usize>,
    commit_batch_size: Option<usize>,
    tag_page_size: Option<usize>,
    tag_batch_size: Option<usize>,
    live_reload: Option<bool>,
    watch_debounce_ms: Option<u64>,
    watch_max_delay_ms: Option<u64>,
    refresh_delay_ms: Option<u64>,
    command_log_limit: Option<usize>,
    worker_threads: Option<usize>,
}

impl ConfigFileV1 {
    fn into_config(self) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        ControllerConfig {
            git_executable: self
                .git_executable
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.git_executable),
            commit_page_size: positive(self.commit_page_size).unwrap_or(defaults.commit_page_size),
            commit_batch_size: positive(self.commit_batch_size)
                .unwrap_or(defaults.commit_batch_size),
            tag_page_size: positive(self.tag_page_size).unwrap_or(defaults.tag_page_size),
            tag_batch_size: positive(self.tag_batch_size).unwrap_or(defaults.tag_batch_size),
            live_reload: self.live_reload.unwrap_or(defaults.live_reload),
            watch_debounce: self
                .watch_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.watch_debounce),
            watch_max_delay: self
                .watch_max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.watch_max_delay),
            refresh_delay: self
                .refresh_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.refresh_delay),
            command_log_limit: self.command_log_limit.unwrap_or(defaults.command_log_limit),
            worker_threads: self
                .worker_threads
                .map(|n| n.clamp(1, 64))
                .unwrap_or(defaults.worker_threads),
        }
    }

    fn from_config(config: &ControllerConfig) -> Self {
        Self {
            version: CONFIG_FILE_VERSION,
            git_executable: Some(config.git_executable.to_string_lossy().into_owned()),
            commit_page_size: Some(config.commit_page_size),
            commit_batch_size: Some(config.commit_batch_size),
            tag_page_size: Some(config.tag_page_size),
            tag_batch_size: Some(config.tag_batch_size),
            live_reload: Some(config.live_reload),
            watch_debounce_ms: Some(config.watch_debounce.as_millis() as u64),
            watch_max_delay_ms: Some(config.watch_max_delay.as_millis() as u64),
            refresh_delay_ms: Some(config.refresh_delay.as_millis() as u64),
            command_log_limit: Some(config.command_log_limit),
            worker_threads: Some(config.worker_threads),
        }
    }
}

fn positive(value: Option<usize>) -> Option<usize> {
    value.filter(|v| *v > 0)
}

pub fn load() -> ControllerConfig {
    let Some(path) = default_config_path() else {
        return ControllerConfig::default();
    };
    load_from_path(&path)
}

/// Missing, unreadable or unknown-version files fall back to defaults.
pub fn load_from_path(path: &Path) -> ControllerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ControllerConfig::default();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) else {
        log::warn!("ignoring malformed config file {}", path.display());
        return ControllerConfig::default();
    };
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(CONFIG_FILE_VERSION as u64) as u32;
    if version != CONFIG_FILE_VERSION {
        log::warn!(
            "ignoring config file {} with unsupported version {version}",
            path.display()
        );
        return ControllerConfig::default();
    }
    match serde_json::from_value::<ConfigFileV1>(value) {
        Ok(file) => file.into_config(),
        Err(e) => {
            log::warn!("ignoring config file {}: {e}", path.display());
            ControllerConfig::default()
        }
    }
}

pub fn persist_to_path(config: &ControllerConfig, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let contents = serde_json::to_vec_pretty(&ConfigFileV1::from_config(config))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, contents)?;

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Windows can't overwrite an existing file via rename.
            let copy_res = fs::copy(&tmp_path, path);
            let _ = fs::remove_file(&tmp_path);
            match copy_res {
                Ok(_) => Ok(()),
                Err(copy_err) => Err(io::Error::new(
                    copy_err.kind(),
                    format!("rename failed: {rename_err}; copy failed: {copy_err}"),
                )),
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if cfg!(test) {
        return None;
    }

    Some(app_config_dir()?.join("config.json"))
}

fn app_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(config_home).join("gitpane"));
        }
        let home = env::var_os("HOME")?;
        Some(PathBuf::from(home).join(".config/gitpane"))
    }

    #[cfg(target_os = "macos")]
    {
        let home = env::var_os("HOME")?;
        return Some(PathBuf::from(home).join("Library/Application Support/gitpane"));
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = env::var_os("APPDATA")?;
        return Some(PathBuf::from(appdata).join("gitpane"));
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".gitpane"))
    }
}

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use webapp_core::LaunchPolicy;

pub const SETTINGS_ENV_VAR: &str = "WEBAPP_LAUNCHER_SETTINGS";
pub const DEFAULT_FIRST_USE_MARKER_PATH: &str = "/var/luna/preferences/ran-first-use";
pub const DEFAULT_DEVICE_INFO: &str = "{\"modelName\":\"unknown\",\"platformVersion\":\"0.0.0\"}";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Device-wide launcher configuration.
///
/// Every key is optional; missing keys take the built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub apps_to_launch_at_boot: Vec<String>,
    pub compat_apps: Vec<String>,
    pub layout_scale: f64,
    pub layout_scale_compat: f64,
    pub show_window_timeout_ms: u64,
    pub first_use_marker_path: PathBuf,
    pub locale: String,
    pub locale_region: String,
    pub time_format: String,
    pub time_zone: String,
    pub phone_region: String,
    pub device_info: String,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = LaunchPolicy::default();
        Self {
            apps_to_launch_at_boot: Vec::new(),
            compat_apps: Vec::new(),
            layout_scale: policy.layout_scale,
            layout_scale_compat: policy.layout_scale_compat,
            show_window_timeout_ms: policy.show_window_timeout.as_millis() as u64,
            first_use_marker_path: PathBuf::from(DEFAULT_FIRST_USE_MARKER_PATH),
            locale: "en".to_owned(),
            locale_region: "us".to_owned(),
            time_format: "HH12".to_owned(),
            time_zone: "Etc/UTC".to_owned(),
            phone_region: String::new(),
            device_info: DEFAULT_DEVICE_INFO.to_owned(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// An explicit path wins over the environment; with neither, defaults apply.
    pub fn resolve(
        cli_path: Option<&Path>,
        env_path: Option<OsString>,
    ) -> Result<Self, SettingsError> {
        if let Some(path) = cli_path {
            return Self::load(path);
        }
        match env_path.filter(|value| !value.is_empty()) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn launch_policy(&self) -> LaunchPolicy {
        LaunchPolicy {
            apps_to_launch_at_boot: self.apps_to_launch_at_boot.iter().cloned().collect(),
            compat_apps: self.compat_apps.iter().cloned().collect(),
            layout_scale: self.layout_scale,
            layout_scale_compat: self.layout_scale_compat,
            show_window_timeout: Duration::from_millis(self.show_window_timeout_ms),
        }
    }
}

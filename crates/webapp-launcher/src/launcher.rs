use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use webapp_core::{ApplicationDescription, DescriptionError, DEFAULT_ICON};

/// Legacy applications still allowed to run with an invisible main window. New applications
/// are refused headless mode and this list stays fixed.
pub const HEADLESS_ALLOW_LIST: &[&str] = &[
    "com.palm.app.email",
    "com.palm.app.calendar",
    "com.palm.app.clock",
    "org.webosinternals.tweaks",
];

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to read application manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid application manifest {path}: {source}")]
    Description {
        path: PathBuf,
        #[source]
        source: DescriptionError,
    },
    #[error("application description has no id")]
    MissingId,
    #[error("entry point of {app_id} does not exist: {path}")]
    EntryPointMissing { app_id: String, path: PathBuf },
    #[error("application {0} is not allowed to run headless")]
    HeadlessNotAllowed(String),
    #[error("launch parameters are not valid JSON: {0}")]
    InvalidParameters(#[source] serde_json::Error),
}

/// Reads, resolves and validates the manifest at `manifest_path`. The manifest's directory
/// becomes the application base path.
pub fn load_description(manifest_path: &Path) -> Result<ApplicationDescription, LaunchError> {
    let data = std::fs::read_to_string(manifest_path).map_err(|source| {
        LaunchError::ReadManifest {
            path: manifest_path.to_path_buf(),
            source,
        }
    })?;

    let base_path = manifest_path
        .canonicalize()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| {
            manifest_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });
    debug!(base_path = %base_path.display(), "resolved application base path");

    let mut description =
        ApplicationDescription::from_manifest(&data, base_path).map_err(|source| {
            LaunchError::Description {
                path: manifest_path.to_path_buf(),
                source,
            }
        })?;

    if let Some(icon) = description.icon_local_path() {
        if !icon.exists() {
            debug!(icon = %icon.display(), "application icon missing, using default");
            description.icon = DEFAULT_ICON.to_owned();
        }
    }

    validate_application(&description)?;
    Ok(description)
}

pub fn validate_application(description: &ApplicationDescription) -> Result<(), LaunchError> {
    if description.id.is_empty() {
        return Err(LaunchError::MissingId);
    }

    if let Some(entry_point) = description.entry_point_local_path() {
        if !entry_point.exists() {
            return Err(LaunchError::EntryPointMissing {
                app_id: description.id.clone(),
                path: entry_point.to_path_buf(),
            });
        }
    }

    if description.headless && !HEADLESS_ALLOW_LIST.contains(&description.id.as_str()) {
        warn!(app_id = %description.id, "refusing headless launch");
        return Err(LaunchError::HeadlessNotAllowed(description.id.clone()));
    }

    Ok(())
}

/// Launch parameters are passed through verbatim but must be JSON. Absent parameters become
/// an empty object.
pub fn normalize_parameters(parameters: Option<&str>) -> Result<String, LaunchError> {
    let parameters = parameters.map(str::trim).unwrap_or_default();
    if parameters.is_empty() {
        return Ok("{}".to_owned());
    }
    serde_json::from_str::<serde_json::Value>(parameters).map_err(LaunchError::InvalidParameters)?;
    Ok(parameters.to_owned())
}

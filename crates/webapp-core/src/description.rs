use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::identity::TrustScope;

pub const DEFAULT_ICON: &str = "qrc:///qml/images/default-app-icon.png";

const FILE_SCHEME: &str = "file://";

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("failed to parse application description: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("application description must be a JSON object")]
    NotAnObject,
}

/// Read-only record produced from an `appinfo.json` manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescription {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub entry_point: String,
    pub headless: bool,
    pub trust_scope: TrustScope,
    pub plugin_name: String,
    pub urls_allowed: Vec<String>,
    pub user_agent: String,
    pub base_path: PathBuf,
    pub flickable: bool,
    pub internet_connectivity_required: bool,
    pub loading_animation_disabled: bool,
}

impl Default for ApplicationDescription {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            icon: DEFAULT_ICON.to_owned(),
            entry_point: String::new(),
            headless: false,
            trust_scope: TrustScope::System,
            plugin_name: String::new(),
            urls_allowed: Vec::new(),
            user_agent: String::new(),
            base_path: PathBuf::new(),
            flickable: false,
            internet_connectivity_required: false,
            loading_animation_disabled: false,
        }
    }
}

impl ApplicationDescription {
    /// Keys with an unexpected type are ignored and keep their default.
    pub fn from_manifest(
        data: &str,
        base_path: impl Into<PathBuf>,
    ) -> Result<Self, DescriptionError> {
        let document: Value = serde_json::from_str(data)?;
        let root = document.as_object().ok_or(DescriptionError::NotAnObject)?;
        let base_path = base_path.into();

        let mut description = Self {
            base_path,
            ..Self::default()
        };

        if let Some(id) = string_field(root, "id") {
            description.id = id.to_owned();
        }
        if let Some(main) = string_field(root, "main") {
            description.entry_point = resolve_entry_point(main, &description.base_path);
        }
        if let Some(headless) = bool_field(root, "noWindow") {
            description.headless = headless;
        }
        if let Some(title) = string_field(root, "title") {
            description.title = title.to_owned();
        }
        if let Some(icon) = string_field(root, "icon").filter(|icon| !icon.is_empty()) {
            description.icon = resolve_local_url(icon, &description.base_path);
        }
        if let Some(scope) = string_field(root, "trustScope").and_then(TrustScope::parse) {
            description.trust_scope = scope;
        }
        if let Some(plugin) = string_field(root, "plugin") {
            description.plugin_name = plugin.to_owned();
        }
        if let Some(Value::Array(urls)) = root.get("urlsAllowed") {
            description.urls_allowed = urls
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
        }
        if let Some(user_agent) = string_field(root, "userAgent") {
            description.user_agent = user_agent.to_owned();
        }
        if let Some(flickable) = bool_field(root, "flickable") {
            description.flickable = flickable;
        }
        if let Some(required) = bool_field(root, "internetConnectivityRequired") {
            description.internet_connectivity_required = required;
        }
        if let Some(disabled) = bool_field(root, "disableLoadingAnimation") {
            description.loading_animation_disabled = disabled;
        }

        Ok(description)
    }

    pub fn has_remote_entry_point(&self) -> bool {
        self.entry_point.starts_with("http://") || self.entry_point.starts_with("https://")
    }

    pub fn entry_point_local_path(&self) -> Option<&Path> {
        self.entry_point.strip_prefix(FILE_SCHEME).map(Path::new)
    }

    pub fn icon_local_path(&self) -> Option<&Path> {
        self.icon.strip_prefix(FILE_SCHEME).map(Path::new)
    }

    pub fn plugin_path(&self) -> Option<PathBuf> {
        if self.plugin_name.is_empty() {
            return None;
        }
        Some(self.base_path.join("plugins").join(&self.plugin_name))
    }
}

fn string_field<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    root.get(key).and_then(Value::as_str)
}

fn bool_field(root: &Map<String, Value>, key: &str) -> Option<bool> {
    root.get(key).and_then(Value::as_bool)
}

fn resolve_entry_point(main: &str, base_path: &Path) -> String {
    if main.contains("://") {
        return main.to_owned();
    }
    resolve_local_url(main, base_path)
}

fn resolve_local_url(value: &str, base_path: &Path) -> String {
    if value.starts_with(FILE_SCHEME) || value.starts_with("qrc:") {
        return value.to_owned();
    }
    let path = Path::new(value);
    if path.is_absolute() {
        format!("{FILE_SCHEME}{value}")
    } else {
        format!("{FILE_SCHEME}{}", base_path.join(path).display())
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationDescription, DescriptionError, DEFAULT_ICON};
    use crate::identity::TrustScope;

    #[test]
    fn parses_full_manifest() {
        let manifest = r#"{
            "id": "org.webosports.app.browser",
            "title": "Web",
            "main": "index.html",
            "icon": "icon.png",
            "noWindow": true,
            "trustScope": "remote",
            "plugin": "libbrowser.so",
            "urlsAllowed": ["https://example.com", 7],
            "userAgent": "LuneOS",
            "flickable": true,
            "internetConnectivityRequired": true,
            "disableLoadingAnimation": true
        }"#;
        let description = ApplicationDescription::from_manifest(manifest, "/usr/palm/applications/web")
            .expect("manifest should parse");

        assert_eq!(description.id, "org.webosports.app.browser");
        assert_eq!(description.title, "Web");
        assert_eq!(
            description.entry_point,
            "file:///usr/palm/applications/web/index.html"
        );
        assert_eq!(description.icon, "file:///usr/palm/applications/web/icon.png");
        assert!(description.headless);
        assert_eq!(description.trust_scope, TrustScope::Remote);
        assert_eq!(description.urls_allowed, vec!["https://example.com".to_owned()]);
        assert_eq!(
            description.plugin_path().expect("plugin configured"),
            std::path::Path::new("/usr/palm/applications/web/plugins/libbrowser.so")
        );
        assert!(description.flickable);
        assert!(description.internet_connectivity_required);
        assert!(description.loading_animation_disabled);
        assert!(!description.has_remote_entry_point());
    }

    #[test]
    fn ill_typed_keys_keep_defaults() {
        let manifest = r#"{"id": 12, "noWindow": "yes", "trustScope": "galaxy", "main": "https://example.com/app"}"#;
        let description =
            ApplicationDescription::from_manifest(manifest, "/tmp").expect("manifest should parse");

        assert!(description.id.is_empty());
        assert!(!description.headless);
        assert_eq!(description.trust_scope, TrustScope::System);
        assert_eq!(description.icon, DEFAULT_ICON);
        assert!(description.has_remote_entry_point());
        assert!(description.entry_point_local_path().is_none());
        assert!(description.plugin_path().is_none());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(
            ApplicationDescription::from_manifest("[1, 2]", "/tmp"),
            Err(DescriptionError::NotAnObject)
        ));
        assert!(matches!(
            ApplicationDescription::from_manifest("{not json", "/tmp"),
            Err(DescriptionError::InvalidJson(_))
        ));
    }

    #[test]
    fn absolute_paths_gain_file_scheme() {
        let manifest = r#"{"id": "a", "main": "/opt/app/index.html", "icon": "file:///opt/app/icon.png"}"#;
        let description =
            ApplicationDescription::from_manifest(manifest, "/ignored").expect("manifest should parse");
        assert_eq!(description.entry_point, "file:///opt/app/index.html");
        assert_eq!(description.icon, "file:///opt/app/icon.png");
        assert_eq!(
            description.entry_point_local_path(),
            Some(std::path::Path::new("/opt/app/index.html"))
        );
    }
}

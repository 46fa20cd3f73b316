use std::path::Path;

use serde_json::Value;
use tracing::debug;
use webapp_plugin_sys::{PluginLibrary, PluginLoadError};

use crate::bridge::{Extension, ExtensionContext};

/// Native per-application plugin exposed to content under the name it reports.
#[derive(Debug)]
pub struct PluginExtension {
    name: String,
    library: PluginLibrary,
}

impl PluginExtension {
    pub fn load(path: &Path) -> Result<Self, PluginLoadError> {
        // SAFETY: plugins ship inside the application bundle and implement the plugin ABI.
        let library = unsafe { PluginLibrary::open(path)? };
        let name = match library.name() {
            "" => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default(),
            name => name.to_owned(),
        };
        Ok(Self { name, library })
    }
}

impl Extension for PluginExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_sync_call(
        &mut self,
        _ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
    ) -> String {
        let params = Value::Array(params.to_vec()).to_string();
        self.library.call(func, &params).unwrap_or_else(|| {
            debug!(plugin = %self.name, func, "plugin returned no result");
            String::new()
        })
    }
}

pub mod palm_service_bridge;
pub mod palm_system;
pub mod plugin;

use tracing::{info, warn};
use webapp_core::ApplicationDescription;

use crate::bridge::ExtensionRegistry;
use palm_service_bridge::PalmServiceBridge;
use palm_system::PalmSystem;
use plugin::PluginExtension;

/// Builds the extension set injected into every window of the application.
///
/// A plugin that is missing or fails to load is skipped.
pub fn registry_for_window(description: &ApplicationDescription) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::default();
    for extension in [
        Box::new(PalmSystem::new()) as Box<dyn crate::bridge::Extension>,
        Box::new(PalmServiceBridge::new()),
    ] {
        if let Err(error) = registry.register(extension) {
            warn!(%error, "failed to register builtin extension");
        }
    }

    let Some(plugin_path) = description.plugin_path() else {
        return registry;
    };
    match PluginExtension::load(&plugin_path) {
        Ok(plugin) => {
            info!(app_id = %description.id, path = %plugin_path.display(), "loaded application plugin");
            if let Err(error) = registry.register(Box::new(plugin)) {
                warn!(%error, "plugin name clashes with an existing extension");
            }
        }
        Err(error) => {
            warn!(app_id = %description.id, path = %plugin_path.display(), %error, "skipping application plugin");
        }
    }
    registry
}

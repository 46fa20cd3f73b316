#![allow(non_camel_case_types)]

pub mod loader;
pub mod raw;

pub use loader::{PluginApi, PluginLibrary, PluginLoadError};
pub use raw::WEBAPP_PLUGIN_API_VERSION;

use std::os::raw::{c_char, c_uint};

/// Version a plugin must report from `webapp_plugin_api_version`.
pub const WEBAPP_PLUGIN_API_VERSION: c_uint = 1;

pub const WEBAPP_PLUGIN_API_VERSION_SYMBOL: &str = "webapp_plugin_api_version";
pub const WEBAPP_PLUGIN_NAME_SYMBOL: &str = "webapp_plugin_name";
pub const WEBAPP_PLUGIN_CALL_SYMBOL: &str = "webapp_plugin_call";
pub const WEBAPP_PLUGIN_FREE_STRING_SYMBOL: &str = "webapp_plugin_free_string";

pub type webapp_plugin_api_version_fn = unsafe extern "C" fn() -> c_uint;

/// Returns a NUL-terminated name owned by the plugin for its whole lifetime.
pub type webapp_plugin_name_fn = unsafe extern "C" fn() -> *const c_char;

/// `function` and `params_json` are NUL-terminated UTF-8. The returned string is owned by the
/// plugin and must be handed back through `webapp_plugin_free_string`. A null return means the
/// plugin has no result.
pub type webapp_plugin_call_fn =
    unsafe extern "C" fn(function: *const c_char, params_json: *const c_char) -> *mut c_char;

pub type webapp_plugin_free_string_fn = unsafe extern "C" fn(value: *mut c_char);

use std::ffi::{c_char, c_void, CStr, CString};
use std::mem::transmute_copy;
use std::os::raw::c_uint;
use std::path::Path;
use std::ptr::NonNull;

use crate::raw::{
    webapp_plugin_api_version_fn, webapp_plugin_call_fn, webapp_plugin_free_string_fn,
    webapp_plugin_name_fn, WEBAPP_PLUGIN_API_VERSION, WEBAPP_PLUGIN_API_VERSION_SYMBOL,
    WEBAPP_PLUGIN_CALL_SYMBOL, WEBAPP_PLUGIN_FREE_STRING_SYMBOL, WEBAPP_PLUGIN_NAME_SYMBOL,
};

const RTLD_NOW: i32 = 0x2;
const RTLD_LOCAL: i32 = 0x4;

#[derive(Debug, thiserror::Error)]
pub enum PluginLoadError {
    #[error("plugin library not found at path: {0}")]
    NotFound(String),
    #[error("missing plugin symbol {0}: {1}")]
    SymbolMissing(&'static str, String),
    #[error("dynamic loader error: {0}")]
    DlError(String),
    #[error("plugin api version {found} does not match expected {expected}")]
    ApiMismatch { expected: c_uint, found: c_uint },
    #[error("dynamic plugin loading not supported on this platform")]
    UnsupportedPlatform,
}

#[derive(Clone, Copy)]
pub struct PluginApi {
    pub api_version: webapp_plugin_api_version_fn,
    pub name: webapp_plugin_name_fn,
    pub call: webapp_plugin_call_fn,
    pub free_string: webapp_plugin_free_string_fn,
}

/// A native per-application plugin opened with `dlopen`.
///
/// The library stays mapped until this value is dropped.
pub struct PluginLibrary {
    handle: NonNull<c_void>,
    name: String,
    pub api: PluginApi,
}

impl std::fmt::Debug for PluginLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLibrary")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PluginLibrary {
    /// # Safety
    ///
    /// Opening runs the library's initializers. The library must implement the plugin ABI
    /// declared in [`crate::raw`].
    pub unsafe fn open<P: AsRef<Path>>(path: P) -> Result<Self, PluginLoadError> {
        #[cfg(any(target_os = "macos", target_os = "linux"))]
        {
            let path_string = path.as_ref().to_string_lossy().to_string();
            if !path.as_ref().exists() {
                return Err(PluginLoadError::NotFound(path_string));
            }

            let path_cstr = CString::new(path_string).map_err(|_| {
                PluginLoadError::DlError("library path contained interior NUL".to_owned())
            })?;

            let raw = dlopen(path_cstr.as_ptr(), RTLD_NOW | RTLD_LOCAL);
            let handle =
                NonNull::new(raw).ok_or_else(|| PluginLoadError::DlError(last_dl_error()))?;

            let load = |symbol: &'static str| -> Result<*mut c_void, PluginLoadError> {
                let symbol_cstr = CString::new(symbol).map_err(|_| {
                    PluginLoadError::DlError("symbol name contained interior NUL".to_owned())
                })?;
                let ptr = dlsym(handle.as_ptr(), symbol_cstr.as_ptr());
                if ptr.is_null() {
                    return Err(PluginLoadError::SymbolMissing(symbol, last_dl_error()));
                }
                Ok(ptr)
            };

            let resolved = (|| -> Result<PluginApi, PluginLoadError> {
                Ok(PluginApi {
                    api_version: load_symbol::<webapp_plugin_api_version_fn>(
                        &load,
                        WEBAPP_PLUGIN_API_VERSION_SYMBOL,
                    )?,
                    name: load_symbol::<webapp_plugin_name_fn>(&load, WEBAPP_PLUGIN_NAME_SYMBOL)?,
                    call: load_symbol::<webapp_plugin_call_fn>(&load, WEBAPP_PLUGIN_CALL_SYMBOL)?,
                    free_string: load_symbol::<webapp_plugin_free_string_fn>(
                        &load,
                        WEBAPP_PLUGIN_FREE_STRING_SYMBOL,
                    )?,
                })
            })();
            let api = match resolved {
                Ok(api) => api,
                Err(error) => {
                    let _ = dlclose(handle.as_ptr());
                    return Err(error);
                }
            };

            let found = (api.api_version)();
            if found != WEBAPP_PLUGIN_API_VERSION {
                let _ = dlclose(handle.as_ptr());
                return Err(PluginLoadError::ApiMismatch {
                    expected: WEBAPP_PLUGIN_API_VERSION,
                    found,
                });
            }

            let name_ptr = (api.name)();
            let name = if name_ptr.is_null() {
                String::new()
            } else {
                CStr::from_ptr(name_ptr).to_string_lossy().to_string()
            };

            Ok(Self { handle, name, api })
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            let _ = path;
            Err(PluginLoadError::UnsupportedPlatform)
        }
    }

    /// Name the plugin registers itself under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forwards a synchronous call. `None` when the arguments cannot cross the C boundary or
    /// the plugin returned no result.
    pub fn call(&self, function: &str, params_json: &str) -> Option<String> {
        let function = CString::new(function).ok()?;
        let params = CString::new(params_json).ok()?;

        // SAFETY: the symbols were resolved and version-checked in `open`, and the handle is
        // held open for as long as `self` lives.
        unsafe {
            let result = (self.api.call)(function.as_ptr(), params.as_ptr());
            if result.is_null() {
                return None;
            }
            let value = CStr::from_ptr(result).to_string_lossy().to_string();
            (self.api.free_string)(result);
            Some(value)
        }
    }
}

impl Drop for PluginLibrary {
    fn drop(&mut self) {
        #[cfg(any(target_os = "macos", target_os = "linux"))]
        unsafe {
            let _ = dlclose(self.handle.as_ptr());
        }
    }
}

unsafe fn load_symbol<F>(
    load: &impl Fn(&'static str) -> Result<*mut c_void, PluginLoadError>,
    symbol: &'static str,
) -> Result<F, PluginLoadError>
where
    F: Copy,
{
    let ptr = load(symbol)?;
    Ok(transmute_copy::<*mut c_void, F>(&ptr))
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
unsafe fn last_dl_error() -> String {
    let err = dlerror();
    if err.is_null() {
        return "unknown error".to_owned();
    }
    CStr::from_ptr(err).to_string_lossy().to_string()
}

#[cfg(target_os = "linux")]
#[link(name = "dl")]
extern "C" {
    fn dlopen(filename: *const c_char, flag: i32) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> i32;
    fn dlerror() -> *const c_char;
}

#[cfg(target_os = "macos")]
#[link(name = "System")]
extern "C" {
    fn dlopen(filename: *const c_char, flag: i32) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> i32;
    fn dlerror() -> *const c_char;
}

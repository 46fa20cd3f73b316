use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_SHOW_WINDOW_TIMEOUT: Duration = Duration::from_millis(3000);

/// Device-wide launch settings consulted when an application is created.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPolicy {
    pub apps_to_launch_at_boot: BTreeSet<String>,
    pub compat_apps: BTreeSet<String>,
    pub layout_scale: f64,
    pub layout_scale_compat: f64,
    pub show_window_timeout: Duration,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            apps_to_launch_at_boot: BTreeSet::new(),
            compat_apps: BTreeSet::new(),
            layout_scale: 1.0,
            layout_scale_compat: 1.0,
            show_window_timeout: DEFAULT_SHOW_WINDOW_TIMEOUT,
        }
    }
}

impl LaunchPolicy {
    pub fn launched_at_boot(&self, app_id: &str) -> bool {
        self.apps_to_launch_at_boot.contains(app_id)
    }

    /// Some core apps are not scaled properly and get the compat layout scale instead.
    pub fn zoom_factor_for(&self, app_id: &str) -> f64 {
        if self.compat_apps.contains(app_id) {
            self.layout_scale_compat
        } else {
            self.layout_scale
        }
    }
}

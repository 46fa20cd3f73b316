use std::time::Duration;

use crate::ids::WindowId;
use crate::window::WindowType;

/// Host-side work requested by a state transition.
///
/// Effects are returned only after the state change that produced them is complete, so a
/// consumer never observes `ApplicationClosed` ahead of the window teardown it follows.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CreateWindow {
        window_id: WindowId,
        url: String,
        window_type: WindowType,
        headless: bool,
    },
    DestroyWindow {
        window_id: WindowId,
    },
    ShowWindow {
        window_id: WindowId,
    },
    HideWindow {
        window_id: WindowId,
    },
    SetupPage {
        window_id: WindowId,
        zoom_factor: f64,
    },
    StartShowTimer {
        window_id: WindowId,
        delay: Duration,
    },
    CancelShowTimer {
        window_id: WindowId,
    },
    ExecuteScript {
        window_id: WindowId,
        script: String,
    },
    ActivityFocusChanged {
        focused: bool,
    },
    ParametersChanged {
        parameters: String,
    },
    ApplicationClosed,
}

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use webapp_core::{ApplicationDescription, LoadStatus, WindowId, WindowType};

/// Work the runtime asks of the browser host. Rendering lives entirely behind this seam.
///
/// The host never calls back into the runtime. The runtime pulls inputs with
/// [`WebHost::next_input`] and answers synchronous bridge messages through
/// [`WebHost::respond`].
pub trait WebHost {
    type Error;

    fn create_window(
        &mut self,
        window_id: WindowId,
        url: &str,
        window_type: WindowType,
        headless: bool,
        options: &WindowOptions,
    ) -> Result<(), Self::Error>;

    fn destroy_window(&mut self, window_id: WindowId) -> Result<(), Self::Error>;

    fn set_window_visible(&mut self, window_id: WindowId, visible: bool)
        -> Result<(), Self::Error>;

    fn setup_page(&mut self, window_id: WindowId, zoom_factor: f64) -> Result<(), Self::Error>;

    /// Arms the one-shot fallback show timer of a window. Firing comes back as
    /// [`WindowEvent::ShowTimerFired`] from [`WebHost::next_input`].
    fn start_timer(&mut self, window_id: WindowId, delay: Duration) -> Result<(), Self::Error>;

    fn cancel_timer(&mut self, window_id: WindowId) -> Result<(), Self::Error>;

    fn execute_script(&mut self, window_id: WindowId, script: &str) -> Result<(), Self::Error>;

    /// Blocks until the next renderer or system input. `None` ends the event loop.
    fn next_input(&mut self) -> Result<Option<HostInput>, Self::Error>;

    /// Synchronous answer to the last [`HostInput::Bridge`] message of `window_id`.
    fn respond(&mut self, window_id: WindowId, response: String);

    fn quit_event_loop(&mut self);
}

/// Per-application page settings taken from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowOptions {
    pub user_agent: Option<String>,
    pub flickable: bool,
    pub urls_allowed: Vec<String>,
}

impl WindowOptions {
    pub fn for_application(description: &ApplicationDescription) -> Self {
        Self {
            user_agent: Some(description.user_agent.clone()).filter(|agent| !agent.is_empty()),
            flickable: description.flickable,
            urls_allowed: description.urls_allowed.clone(),
        }
    }
}

/// Renderer-side events for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    LoadChanged {
        window_id: WindowId,
        status: LoadStatus,
    },
    ShowTimerFired {
        window_id: WindowId,
    },
    Closed {
        window_id: WindowId,
    },
    NewWindowRequested {
        url: String,
    },
}

/// System lifecycle notifications addressed to the running application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    Relaunch { parameters: String },
    Activate,
    Deactivate,
    Suspend,
    LowMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostInput {
    Window(WindowEvent),
    Bridge { window_id: WindowId, message: String },
    Lifecycle(LifecycleSignal),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("host has no window {0}")]
    WindowNotFound(WindowId),
    #[error("host already has window {0}")]
    DuplicateWindow(WindowId),
}

/// Calls the runtime made on the host, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    WindowCreated {
        window_id: WindowId,
        url: String,
        window_type: WindowType,
        headless: bool,
        options: WindowOptions,
    },
    WindowDestroyed {
        window_id: WindowId,
    },
    VisibilityChanged {
        window_id: WindowId,
        visible: bool,
    },
    PageSetup {
        window_id: WindowId,
        zoom_factor: f64,
    },
    TimerStarted {
        window_id: WindowId,
        delay: Duration,
    },
    TimerCancelled {
        window_id: WindowId,
    },
    ScriptExecuted {
        window_id: WindowId,
        script: String,
    },
    QuitRequested,
}

/// Host without a renderer. Windows exist only as tracked state, every call is recorded as a
/// [`HostCall`], and inputs come from a fixed queue. With an empty queue the event loop ends
/// right after launch.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    windows: BTreeMap<WindowId, bool>,
    timers: BTreeMap<WindowId, Duration>,
    calls: Vec<HostCall>,
    pending: VecDeque<HostInput>,
    bridge_responses: Vec<(WindowId, String)>,
    quit_requested: bool,
}

impl HeadlessHost {
    pub fn with_inputs(inputs: impl IntoIterator<Item = HostInput>) -> Self {
        Self {
            pending: inputs.into_iter().collect(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    #[cfg(test)]
    pub fn bridge_responses(&self) -> &[(WindowId, String)] {
        &self.bridge_responses
    }

    #[cfg(test)]
    pub fn pending_inputs(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_visible(&self, window_id: WindowId) -> bool {
        self.windows.get(&window_id).copied().unwrap_or(false)
    }

    #[cfg(test)]
    pub fn has_window(&self, window_id: WindowId) -> bool {
        self.windows.contains_key(&window_id)
    }

    #[cfg(test)]
    pub fn armed_timer(&self, window_id: WindowId) -> Option<Duration> {
        self.timers.get(&window_id).copied()
    }

    #[cfg(test)]
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    fn ensure_window(&self, window_id: WindowId) -> Result<(), HostError> {
        if self.windows.contains_key(&window_id) {
            Ok(())
        } else {
            Err(HostError::WindowNotFound(window_id))
        }
    }
}

impl WebHost for HeadlessHost {
    type Error = HostError;

    fn create_window(
        &mut self,
        window_id: WindowId,
        url: &str,
        window_type: WindowType,
        headless: bool,
        options: &WindowOptions,
    ) -> Result<(), Self::Error> {
        if self.windows.contains_key(&window_id) {
            return Err(HostError::DuplicateWindow(window_id));
        }
        self.windows.insert(window_id, false);
        self.calls.push(HostCall::WindowCreated {
            window_id,
            url: url.to_owned(),
            window_type,
            headless,
            options: options.clone(),
        });
        Ok(())
    }

    fn destroy_window(&mut self, window_id: WindowId) -> Result<(), Self::Error> {
        self.ensure_window(window_id)?;
        self.windows.remove(&window_id);
        self.timers.remove(&window_id);
        self.calls.push(HostCall::WindowDestroyed { window_id });
        Ok(())
    }

    fn set_window_visible(
        &mut self,
        window_id: WindowId,
        visible: bool,
    ) -> Result<(), Self::Error> {
        let slot = self
            .windows
            .get_mut(&window_id)
            .ok_or(HostError::WindowNotFound(window_id))?;
        *slot = visible;
        self.calls
            .push(HostCall::VisibilityChanged { window_id, visible });
        Ok(())
    }

    fn setup_page(&mut self, window_id: WindowId, zoom_factor: f64) -> Result<(), Self::Error> {
        self.ensure_window(window_id)?;
        self.calls.push(HostCall::PageSetup {
            window_id,
            zoom_factor,
        });
        Ok(())
    }

    fn start_timer(&mut self, window_id: WindowId, delay: Duration) -> Result<(), Self::Error> {
        self.ensure_window(window_id)?;
        self.timers.insert(window_id, delay);
        self.calls.push(HostCall::TimerStarted { window_id, delay });
        Ok(())
    }

    fn cancel_timer(&mut self, window_id: WindowId) -> Result<(), Self::Error> {
        self.timers.remove(&window_id);
        self.calls.push(HostCall::TimerCancelled { window_id });
        Ok(())
    }

    fn execute_script(&mut self, window_id: WindowId, script: &str) -> Result<(), Self::Error> {
        self.ensure_window(window_id)?;
        self.calls.push(HostCall::ScriptExecuted {
            window_id,
            script: script.to_owned(),
        });
        Ok(())
    }

    fn next_input(&mut self) -> Result<Option<HostInput>, Self::Error> {
        if self.quit_requested {
            return Ok(None);
        }
        Ok(self.pending.pop_front())
    }

    fn respond(&mut self, window_id: WindowId, response: String) {
        self.bridge_responses.push((window_id, response));
    }

    fn quit_event_loop(&mut self) {
        self.quit_requested = true;
        self.calls.push(HostCall::QuitRequested);
    }
}

pub type DefaultHost = HeadlessHost;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use webapp_core::{ApplicationDescription, WindowId, WindowType};

    use super::{HeadlessHost, HostError, HostInput, LifecycleSignal, WebHost, WindowOptions};

    #[test]
    fn headless_host_tracks_window_visibility_and_timers() {
        let mut host = HeadlessHost::default();
        let options = WindowOptions::default();
        host.create_window(WindowId(1), "file:///index.html", WindowType::Card, false, &options)
            .expect("window should be created");
        assert_eq!(
            host.create_window(WindowId(1), "file:///index.html", WindowType::Card, false, &options),
            Err(HostError::DuplicateWindow(WindowId(1)))
        );

        host.start_timer(WindowId(1), Duration::from_millis(5))
            .expect("timer should start");
        host.set_window_visible(WindowId(1), true)
            .expect("window should show");
        assert!(host.is_visible(WindowId(1)));

        host.destroy_window(WindowId(1))
            .expect("window should be destroyed");
        assert!(!host.has_window(WindowId(1)));
        assert_eq!(host.armed_timer(WindowId(1)), None);
        assert_eq!(
            host.execute_script(WindowId(1), "1;"),
            Err(HostError::WindowNotFound(WindowId(1)))
        );
    }

    #[test]
    fn inputs_stop_after_quit() {
        let mut host = HeadlessHost::with_inputs([
            HostInput::Lifecycle(LifecycleSignal::Activate),
            HostInput::Lifecycle(LifecycleSignal::Suspend),
        ]);

        assert_eq!(
            host.next_input().expect("queue should yield"),
            Some(HostInput::Lifecycle(LifecycleSignal::Activate))
        );
        host.quit_event_loop();
        assert_eq!(host.next_input().expect("quit host should yield"), None);
        assert_eq!(host.pending_inputs(), 1);
    }

    #[test]
    fn window_options_follow_manifest() {
        let description = ApplicationDescription {
            user_agent: String::new(),
            flickable: true,
            urls_allowed: vec!["https://example.com".to_owned()],
            ..ApplicationDescription::default()
        };

        let options = WindowOptions::for_application(&description);

        assert_eq!(options.user_agent, None);
        assert!(options.flickable);
        assert_eq!(options.urls_allowed, vec!["https://example.com".to_owned()]);
    }
}

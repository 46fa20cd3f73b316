use crate::description::ApplicationDescription;
use crate::effect::Effect;
use crate::event::AppEvent;
use crate::identity::ApplicationIdentity;
use crate::ids::WindowId;
use crate::policy::LaunchPolicy;
use crate::window::{WindowState, WindowType};

pub const MAIN_WINDOW_ID: WindowId = WindowId(1);
pub const RELAUNCH_SCRIPT: &str = "Mojo.relaunch();";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationError {
    #[error("window not found: {0}")]
    WindowNotFound(WindowId),
    #[error("application is already closed")]
    Closed,
    #[error("child windows may only be opened by a headless application")]
    ChildWindowsRequireHeadless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub id: i64,
    pub focused: bool,
}

/// One launched web application: its identity and the window tree it owns.
///
/// Every state change goes through [`Application::dispatch`], which returns the host work
/// the change requires.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    description: ApplicationDescription,
    identity: ApplicationIdentity,
    policy: LaunchPolicy,
    main_window: Option<WindowState>,
    child_windows: Vec<WindowState>,
    launched_at_boot: bool,
    activity: Activity,
    closed: bool,
    next_window_id: u64,
}

impl Application {
    pub fn launch(
        description: ApplicationDescription,
        process_id: impl Into<String>,
        parameters: impl Into<String>,
        window_type: WindowType,
        policy: LaunchPolicy,
    ) -> (Self, Vec<Effect>) {
        let identity = ApplicationIdentity::new(&description, process_id, parameters);
        let launched_at_boot = policy.launched_at_boot(identity.id());
        let activity = Activity {
            id: identity.process_id().parse().unwrap_or_default(),
            focused: false,
        };
        let main_window = WindowState::new(
            MAIN_WINDOW_ID,
            description.entry_point.clone(),
            window_type,
            description.headless,
            policy.zoom_factor_for(identity.id()),
            policy.show_window_timeout,
        );
        let effects = vec![main_window.creation_effect()];

        let application = Self {
            description,
            identity,
            policy,
            main_window: Some(main_window),
            child_windows: Vec::new(),
            launched_at_boot,
            activity,
            closed: false,
            next_window_id: MAIN_WINDOW_ID.0 + 1,
        };
        (application, effects)
    }

    pub fn id(&self) -> &str {
        self.identity.id()
    }

    pub fn identity(&self) -> &ApplicationIdentity {
        &self.identity
    }

    pub fn description(&self) -> &ApplicationDescription {
        &self.description
    }

    pub fn privileged(&self) -> bool {
        self.identity.privileged()
    }

    pub fn parameters(&self) -> &str {
        self.identity.parameters()
    }

    pub fn headless(&self) -> bool {
        self.description.headless
    }

    pub fn launched_at_boot(&self) -> bool {
        self.launched_at_boot
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn main_window(&self) -> Option<&WindowState> {
        self.main_window.as_ref()
    }

    pub fn child_windows(&self) -> &[WindowState] {
        &self.child_windows
    }

    pub fn window(&self, window_id: WindowId) -> Option<&WindowState> {
        self.main_window
            .iter()
            .chain(self.child_windows.iter())
            .find(|window| window.id() == window_id)
    }

    fn window_mut(&mut self, window_id: WindowId) -> Result<&mut WindowState, ApplicationError> {
        self.main_window
            .iter_mut()
            .chain(self.child_windows.iter_mut())
            .find(|window| window.id() == window_id)
            .ok_or(ApplicationError::WindowNotFound(window_id))
    }

    pub fn dispatch(&mut self, event: AppEvent) -> Result<Vec<Effect>, ApplicationError> {
        if self.closed {
            return Err(ApplicationError::Closed);
        }

        match event {
            AppEvent::StagePreparing { window_id } => {
                Ok(self.window_mut(window_id)?.stage_preparing())
            }
            AppEvent::StageReady { window_id } => Ok(self.window_mut(window_id)?.stage_ready()),
            AppEvent::Show { window_id } => Ok(self.window_mut(window_id)?.show()),
            AppEvent::Hide { window_id } => Ok(self.window_mut(window_id)?.hide()),
            AppEvent::SetKeepAlive {
                window_id,
                keep_alive,
            } => {
                self.window_mut(window_id)?.set_keep_alive(keep_alive);
                Ok(Vec::new())
            }
            AppEvent::LoadChanged { window_id, status } => {
                Ok(self.window_mut(window_id)?.load_changed(status))
            }
            AppEvent::ShowTimerFired { window_id } => {
                Ok(self.window_mut(window_id)?.show_timer_fired())
            }
            AppEvent::ExecuteScript { window_id, script } => {
                Ok(vec![self.window_mut(window_id)?.execute_script(script)])
            }
            AppEvent::WindowClosed { window_id } => self.window_closed(window_id),
            AppEvent::NewWindowRequested { url } => self.open_child_window(url),
            AppEvent::Relaunch { parameters } => self.relaunch(parameters),
            AppEvent::ActivityFocusChanged { focused } => {
                if self.activity.focused == focused {
                    return Ok(Vec::new());
                }
                self.activity.focused = focused;
                Ok(vec![Effect::ActivityFocusChanged { focused }])
            }
        }
    }

    fn window_closed(&mut self, window_id: WindowId) -> Result<Vec<Effect>, ApplicationError> {
        let window = self
            .window(window_id)
            .ok_or(ApplicationError::WindowNotFound(window_id))?;
        if window.keep_alive() {
            return Ok(Vec::new());
        }

        if let Some(index) = self
            .child_windows
            .iter()
            .position(|child| child.id() == window_id)
        {
            let mut child = self.child_windows.remove(index);
            let mut effects = child.teardown();

            // the last child took the (headless) main window's purpose with it
            if self.child_windows.is_empty() && !self.launched_at_boot {
                effects.extend(self.close_main_window());
            }
            return Ok(effects);
        }

        Ok(self.close_main_window())
    }

    fn close_main_window(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(mut main_window) = self.main_window.take() {
            effects.extend(main_window.teardown());
        }
        for mut child in self.child_windows.drain(..) {
            effects.extend(child.teardown());
        }
        self.closed = true;
        effects.push(Effect::ApplicationClosed);
        effects
    }

    fn open_child_window(&mut self, url: String) -> Result<Vec<Effect>, ApplicationError> {
        if !self.headless() {
            return Err(ApplicationError::ChildWindowsRequireHeadless);
        }

        let window_id = WindowId(self.next_window_id);
        self.next_window_id += 1;

        // child windows can never be headless ones
        let mut child = WindowState::new(
            window_id,
            url,
            WindowType::Card,
            false,
            self.policy.zoom_factor_for(self.identity.id()),
            self.policy.show_window_timeout,
        );
        let mut effects = vec![child.creation_effect()];
        effects.extend(child.show());
        self.child_windows.push(child);
        Ok(effects)
    }

    fn relaunch(&mut self, parameters: String) -> Result<Vec<Effect>, ApplicationError> {
        self.identity.replace_parameters(parameters.clone());
        let mut effects = vec![Effect::ParametersChanged { parameters }];
        if let Some(main_window) = self.main_window.as_ref() {
            effects.push(main_window.execute_script(RELAUNCH_SCRIPT));
        }
        Ok(effects)
    }
}

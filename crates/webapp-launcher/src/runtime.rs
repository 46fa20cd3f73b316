use std::collections::BTreeMap;
use std::fmt::Display;

use tracing::{debug, info, warn};
use webapp_core::{
    AppEvent, Application, ApplicationDescription, ApplicationError,
    ApplicationLifecycleObserver, Effect, ResourcePathValidator, WindowId, WindowType,
};

use crate::bridge::{ExtensionContext, ExtensionRegistry};
use crate::bus::ServiceBus;
use crate::extensions::registry_for_window;
use crate::host::{HostInput, LifecycleSignal, WebHost, WindowEvent, WindowOptions};
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError<HError> {
    #[error("host error: {0}")]
    Host(HError),
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Drives one launched application: routes host events and bridge messages into the
/// application controller and applies the resulting effects to the host.
pub struct AppRuntime<H: WebHost> {
    application: Application,
    host: H,
    bus: Box<dyn ServiceBus>,
    settings: Settings,
    validator: ResourcePathValidator,
    registries: BTreeMap<WindowId, ExtensionRegistry>,
}

impl<H> AppRuntime<H>
where
    H: WebHost,
    H::Error: Display,
{
    pub fn bootstrap(
        host: H,
        bus: Box<dyn ServiceBus>,
        settings: Settings,
        description: ApplicationDescription,
        parameters: String,
    ) -> Result<Self, RuntimeError<H::Error>> {
        let process_id = std::process::id().to_string();
        let (application, effects) = Application::launch(
            description,
            process_id,
            parameters,
            WindowType::Card,
            settings.launch_policy(),
        );
        info!(
            app_id = application.id(),
            privileged = application.privileged(),
            headless = application.headless(),
            launched_at_boot = application.launched_at_boot(),
            "launching application"
        );

        let mut runtime = Self {
            application,
            host,
            bus,
            settings,
            validator: ResourcePathValidator::default(),
            registries: BTreeMap::new(),
        };
        runtime.apply_effects(effects)?;
        Ok(runtime)
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[cfg(test)]
    pub fn has_registry(&self, window_id: WindowId) -> bool {
        self.registries.contains_key(&window_id)
    }

    /// Pulls host inputs until the host runs dry or the application closes. Inputs still
    /// queued after the close are never delivered.
    pub fn run(&mut self) -> Result<(), RuntimeError<H::Error>> {
        while !self.application.is_closed() {
            let Some(input) = self.host.next_input().map_err(RuntimeError::Host)? else {
                debug!(app_id = self.application.id(), "host has no more input");
                break;
            };
            self.handle_input(input);
        }
        Ok(())
    }

    pub fn handle_input(&mut self, input: HostInput) {
        match input {
            HostInput::Window(event) => {
                if let Err(error) = self.handle_window_event(event) {
                    warn!(%error, "window event failed");
                }
            }
            HostInput::Bridge { window_id, message } => {
                let response = self.handle_bridge_message(window_id, &message);
                self.host.respond(window_id, response);
            }
            HostInput::Lifecycle(signal) => self.handle_lifecycle_signal(signal),
        }
    }

    pub fn handle_window_event(&mut self, event: WindowEvent) -> Result<(), RuntimeError<H::Error>> {
        let event = match event {
            WindowEvent::LoadChanged { window_id, status } => {
                debug!(%window_id, ?status, "load status changed");
                AppEvent::LoadChanged { window_id, status }
            }
            WindowEvent::ShowTimerFired { window_id } => AppEvent::ShowTimerFired { window_id },
            WindowEvent::Closed { window_id } => AppEvent::WindowClosed { window_id },
            WindowEvent::NewWindowRequested { url } => AppEvent::NewWindowRequested { url },
        };
        self.dispatch(event)
    }

    /// Malformed messages and failed extension calls answer `""`.
    pub fn handle_bridge_message(&mut self, window_id: WindowId, message: &str) -> String {
        let Some(registry) = self.registries.get_mut(&window_id) else {
            warn!(%window_id, "bridge message for unknown window");
            return String::new();
        };

        let mut ctx = ExtensionContext::new(
            window_id,
            &mut self.application,
            &self.validator,
            self.bus.as_mut(),
            &self.settings,
        );
        let response = registry.handle_message(&mut ctx, message);
        let effects = ctx.into_effects();

        if let Err(error) = self.apply_effects(effects) {
            warn!(%window_id, %error, "failed to apply extension effects");
        }
        response
    }

    pub fn handle_lifecycle_signal(&mut self, signal: LifecycleSignal) {
        match signal {
            LifecycleSignal::Relaunch { parameters } => self.on_relaunch(parameters),
            LifecycleSignal::Activate => self.on_activate(),
            LifecycleSignal::Deactivate => self.on_deactivate(),
            LifecycleSignal::Suspend => self.on_suspend(),
            LifecycleSignal::LowMemory => self.on_low_memory(),
        }
    }

    pub fn dispatch(&mut self, event: AppEvent) -> Result<(), RuntimeError<H::Error>> {
        let effects = self.application.dispatch(event)?;
        self.apply_effects(effects)
    }

    fn dispatch_logged(&mut self, event: AppEvent) {
        if let Err(error) = self.dispatch(event) {
            warn!(app_id = self.application.id(), %error, "lifecycle event failed");
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Result<(), RuntimeError<H::Error>> {
        for effect in effects {
            match effect {
                Effect::CreateWindow {
                    window_id,
                    url,
                    window_type,
                    headless,
                } => {
                    debug!(%window_id, %url, %window_type, headless, "creating window");
                    let options = WindowOptions::for_application(self.application.description());
                    self.host
                        .create_window(window_id, &url, window_type, headless, &options)
                        .map_err(RuntimeError::Host)?;
                    self.registries.insert(
                        window_id,
                        registry_for_window(self.application.description()),
                    );
                }
                Effect::DestroyWindow { window_id } => {
                    debug!(%window_id, "destroying window");
                    self.registries.remove(&window_id);
                    self.host
                        .destroy_window(window_id)
                        .map_err(RuntimeError::Host)?;
                }
                Effect::ShowWindow { window_id } => self
                    .host
                    .set_window_visible(window_id, true)
                    .map_err(RuntimeError::Host)?,
                Effect::HideWindow { window_id } => self
                    .host
                    .set_window_visible(window_id, false)
                    .map_err(RuntimeError::Host)?,
                Effect::SetupPage {
                    window_id,
                    zoom_factor,
                } => self
                    .host
                    .setup_page(window_id, zoom_factor)
                    .map_err(RuntimeError::Host)?,
                Effect::StartShowTimer { window_id, delay } => self
                    .host
                    .start_timer(window_id, delay)
                    .map_err(RuntimeError::Host)?,
                Effect::CancelShowTimer { window_id } => self
                    .host
                    .cancel_timer(window_id)
                    .map_err(RuntimeError::Host)?,
                Effect::ExecuteScript { window_id, script } => {
                    if let Err(error) = self.host.execute_script(window_id, &script) {
                        warn!(%window_id, %error, "script execution failed");
                    }
                }
                Effect::ActivityFocusChanged { focused } => {
                    info!(activity_id = self.application.activity().id, focused, "activity focus changed");
                }
                Effect::ParametersChanged { parameters } => {
                    let effects = self.notify_parameters_changed(&parameters);
                    self.apply_effects(effects)?;
                }
                Effect::ApplicationClosed => {
                    info!(app_id = self.application.id(), "application closed");
                    self.host.quit_event_loop();
                }
            }
        }
        Ok(())
    }

    fn notify_parameters_changed(&mut self, parameters: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (window_id, registry) in &mut self.registries {
            let mut ctx = ExtensionContext::new(
                *window_id,
                &mut self.application,
                &self.validator,
                self.bus.as_mut(),
                &self.settings,
            );
            registry.notify_parameters_changed(&mut ctx, parameters);
            effects.extend(ctx.into_effects());
        }
        effects
    }
}

impl<H> ApplicationLifecycleObserver for AppRuntime<H>
where
    H: WebHost,
    H::Error: Display,
{
    fn on_relaunch(&mut self, parameters: String) {
        info!(app_id = self.application.id(), "relaunching application");
        self.dispatch_logged(AppEvent::Relaunch { parameters });
    }

    fn on_activate(&mut self) {
        self.dispatch_logged(AppEvent::ActivityFocusChanged { focused: true });
    }

    fn on_deactivate(&mut self) {
        self.dispatch_logged(AppEvent::ActivityFocusChanged { focused: false });
    }

    fn on_suspend(&mut self) {
        debug!(app_id = self.application.id(), "suspend requested");
    }

    fn on_low_memory(&mut self) {
        warn!(app_id = self.application.id(), "system reported low memory");
    }
}

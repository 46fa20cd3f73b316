use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use webapp_core::{AppEvent, Application, CallbackId, Effect, ResourcePathValidator, WindowId};

use crate::bus::{BusCredential, BusError, BusRequest, ServiceBus};
use crate::settings::Settings;

/// Structured content-to-native message, discriminated by `messageType`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "messageType")]
pub enum BridgeMessage {
    #[serde(rename = "callSyncExtensionFunction")]
    CallSync {
        extension: String,
        func: String,
        params: Vec<Value>,
    },
    #[serde(rename = "callExtensionFunction")]
    Call {
        extension: String,
        func: String,
        params: Vec<Value>,
        #[serde(default, rename = "successCallbackId")]
        success_callback_id: Option<u64>,
        #[serde(default, rename = "errorCallbackId")]
        error_callback_id: Option<u64>,
    },
}

impl BridgeMessage {
    /// Accepts the bare message or the renderer's `{"data": "<json>"}` envelope.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw)?;
        if let Some(Value::String(inner)) = value.get("data") {
            return Ok(serde_json::from_str(inner)?);
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("extension already registered: {0}")]
    DuplicateExtension(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Callbacks {
    pub success: Option<CallbackId>,
    pub error: Option<CallbackId>,
}

/// Everything an extension may touch while serving one call from one window.
///
/// Host work produced during the call is collected and applied by the runtime afterwards.
pub struct ExtensionContext<'a> {
    window_id: WindowId,
    application: &'a mut Application,
    validator: &'a ResourcePathValidator,
    bus: &'a mut dyn ServiceBus,
    settings: &'a Settings,
    effects: Vec<Effect>,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(
        window_id: WindowId,
        application: &'a mut Application,
        validator: &'a ResourcePathValidator,
        bus: &'a mut dyn ServiceBus,
        settings: &'a Settings,
    ) -> Self {
        Self {
            window_id,
            application,
            validator,
            bus,
            settings,
            effects: Vec::new(),
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn application(&self) -> &Application {
        self.application
    }

    pub fn validator(&self) -> &ResourcePathValidator {
        self.validator
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn credential(&self) -> BusCredential {
        BusCredential {
            app_id: self.application.id().to_owned(),
            privileged: self.application.privileged(),
        }
    }

    pub fn call_bus(&mut self, uri: &str, payload: Value) -> Result<Value, BusError> {
        let request = BusRequest::new(uri, self.credential(), payload)?;
        self.bus.call(&request)
    }

    /// Failures are logged; content never observes controller errors.
    pub fn dispatch(&mut self, event: AppEvent) {
        match self.application.dispatch(event) {
            Ok(effects) => self.effects.extend(effects),
            Err(error) => {
                warn!(window_id = %self.window_id, %error, "extension event rejected");
            }
        }
    }

    pub fn execute_script(&mut self, script: String) {
        self.effects.push(Effect::ExecuteScript {
            window_id: self.window_id,
            script,
        });
    }

    pub fn callback(&mut self, callback_id: CallbackId, payload: &Value) {
        self.execute_script(format!("_webOS.callback({}, {payload});", callback_id.0));
    }

    /// For subscriptions that must stay registered on the content side.
    pub fn callback_without_remove(&mut self, callback_id: CallbackId, payload: &Value) {
        self.execute_script(format!(
            "_webOS.callbackWithoutRemove({}, {payload});",
            callback_id.0
        ));
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

pub trait Extension {
    fn name(&self) -> &str;

    /// Unknown functions answer `"{}"`; bad arity or parameter types answer `""`.
    fn handle_sync_call(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
    ) -> String;

    /// Runs the synchronous variant. An empty result is a failure and goes to the error
    /// callback when content registered one.
    fn handle_call(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
        callbacks: Callbacks,
    ) {
        let result = self.handle_sync_call(ctx, func, params);
        if result.is_empty() {
            let failure = json!({
                "returnValue": false,
                "errorText": format!("{}.{func} failed", self.name()),
            });
            if let Some(callback_id) = callbacks.error.or(callbacks.success) {
                ctx.callback(callback_id, &failure);
            }
            return;
        }
        if let Some(callback_id) = callbacks.success {
            ctx.callback(callback_id, &result_payload(result));
        }
    }

    fn on_parameters_changed(&mut self, _ctx: &mut ExtensionContext<'_>, _parameters: &str) {}
}

/// Extensions registered for one window, keyed by name.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn register(&mut self, extension: Box<dyn Extension>) -> Result<(), BridgeError> {
        let name = extension.name().to_owned();
        if self.extensions.contains_key(&name) {
            return Err(BridgeError::DuplicateExtension(name));
        }
        self.extensions.insert(name, extension);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    pub fn dispatch(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        extension_name: &str,
        func: &str,
        params: &[Value],
    ) -> String {
        let Some(extension) = self.extensions.get_mut(extension_name) else {
            debug!(extension = extension_name, func, "call to unknown extension ignored");
            return String::new();
        };
        extension.handle_sync_call(ctx, func, params)
    }

    pub fn dispatch_async(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        extension_name: &str,
        func: &str,
        params: &[Value],
        callbacks: Callbacks,
    ) {
        let Some(extension) = self.extensions.get_mut(extension_name) else {
            debug!(extension = extension_name, func, "call to unknown extension ignored");
            return;
        };
        extension.handle_call(ctx, func, params, callbacks);
    }

    /// Entry point for raw renderer messages. The return value is the synchronous response.
    pub fn handle_message(&mut self, ctx: &mut ExtensionContext<'_>, raw: &str) -> String {
        let message = match BridgeMessage::parse(raw) {
            Ok(message) => message,
            Err(error) => {
                warn!(window_id = %ctx.window_id(), %error, "dropping bridge message");
                return String::new();
            }
        };

        match message {
            BridgeMessage::CallSync {
                extension,
                func,
                params,
            } => self.dispatch(ctx, &extension, &func, &params),
            BridgeMessage::Call {
                extension,
                func,
                params,
                success_callback_id,
                error_callback_id,
            } => {
                let callbacks = Callbacks {
                    success: success_callback_id.map(CallbackId),
                    error: error_callback_id.map(CallbackId),
                };
                self.dispatch_async(ctx, &extension, &func, &params, callbacks);
                String::new()
            }
        }
    }

    pub fn notify_parameters_changed(&mut self, ctx: &mut ExtensionContext<'_>, parameters: &str) {
        for extension in self.extensions.values_mut() {
            extension.on_parameters_changed(ctx, parameters);
        }
    }
}

pub fn string_param(params: &[Value], index: usize) -> Option<&str> {
    params.get(index).and_then(Value::as_str)
}

pub fn bool_param(params: &[Value], index: usize) -> Option<bool> {
    params.get(index).and_then(Value::as_bool)
}

pub fn callback_param(params: &[Value], index: usize) -> Option<CallbackId> {
    params.get(index).and_then(Value::as_u64).map(CallbackId)
}

fn result_payload(result: String) -> Value {
    serde_json::from_str(&result).unwrap_or(Value::String(result))
}

#[cfg(test)]
pub(crate) mod testing {
    use webapp_core::{
        Application, ApplicationDescription, LaunchPolicy, ResourcePathValidator, TrustScope,
        WindowId, WindowType,
    };

    use super::ExtensionContext;
    use crate::bus::MockServiceBus;
    use crate::settings::Settings;

    /// Owns everything an [`ExtensionContext`] borrows.
    pub struct Harness {
        pub application: Application,
        pub validator: ResourcePathValidator,
        pub bus: MockServiceBus,
        pub settings: Settings,
    }

    impl Harness {
        pub fn new(app_id: &str, trust_scope: TrustScope, headless: bool) -> Self {
            let description = ApplicationDescription {
                id: app_id.to_owned(),
                title: "Test".to_owned(),
                entry_point: "https://example.com/index.html".to_owned(),
                headless,
                trust_scope,
                ..ApplicationDescription::default()
            };
            let (application, _) = Application::launch(
                description,
                "1001",
                "{\"launched\":true}",
                WindowType::Card,
                LaunchPolicy::default(),
            );
            Self {
                application,
                validator: ResourcePathValidator::default(),
                bus: MockServiceBus::default(),
                settings: Settings::default(),
            }
        }

        pub fn privileged() -> Self {
            Self::new("com.palm.app.email", TrustScope::System, true)
        }

        pub fn unprivileged() -> Self {
            Self::new("net.example.app", TrustScope::System, false)
        }

        pub fn context(&mut self, window_id: WindowId) -> ExtensionContext<'_> {
            ExtensionContext::new(
                window_id,
                &mut self.application,
                &self.validator,
                &mut self.bus,
                &self.settings,
            )
        }
    }
}

use std::fs::{self, OpenOptions};
use std::path::{Component, Path};

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use webapp_core::{AppEvent, CallbackId};

use crate::bridge::{bool_param, callback_param, string_param, Callbacks, Extension, ExtensionContext};

pub const NAME: &str = "PalmSystem";
pub const NOTIFICATION_CREATE_URI: &str = "luna://org.webosports.notifications/create";
pub const NOTIFICATION_CLOSE_URI: &str = "luna://org.webosports.notifications/close";

const FILE_SCHEME: &str = "file://";

/// The `PalmSystem` object scripted content uses to talk to its window and the system.
#[derive(Debug, Default)]
pub struct PalmSystem {
    banner_ids: Vec<String>,
    property_change_handler: Option<CallbackId>,
}

impl PalmSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn banner_ids(&self) -> &[String] {
        &self.banner_ids
    }

    fn get_resource(&self, ctx: &ExtensionContext<'_>, params: &[Value]) -> String {
        let [Value::String(path), _mode] = params else {
            return String::new();
        };
        let path = path.strip_prefix(FILE_SCHEME).unwrap_or(path);

        // prefix matching only holds for absolute paths without parent components
        let resolved = Path::new(path);
        if !resolved.is_absolute()
            || resolved
                .components()
                .any(|component| component == Component::ParentDir)
        {
            warn!(app_id = ctx.application().id(), path, "resource path rejected");
            return String::new();
        }

        if !ctx.validator().validate(path, ctx.application().privileged()) {
            warn!(app_id = ctx.application().id(), path, "resource access denied");
            return String::new();
        }

        match fs::read(path) {
            Ok(data) => String::from_utf8_lossy(&data).into_owned(),
            Err(error) => {
                debug!(path, %error, "resource not readable");
                String::new()
            }
        }
    }

    fn add_banner_message(&mut self, ctx: &mut ExtensionContext<'_>, params: &[Value]) -> String {
        let Some(message) = string_param(params, 0) else {
            return String::new();
        };
        let description = ctx.application().description();
        let icon = string_param(params, 2)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(&description.icon);
        let payload = json!({
            "ownerId": ctx.application().id(),
            "launchId": ctx.application().id(),
            "launchParams": string_param(params, 1).unwrap_or_default(),
            "title": description.title,
            "body": message,
            "iconUrl": icon,
            "soundClass": string_param(params, 3).unwrap_or_default(),
            "soundFile": string_param(params, 4).unwrap_or_default(),
            "duration": params.get(5).and_then(Value::as_i64).unwrap_or_default(),
            "doNotSuppress": bool_param(params, 6).unwrap_or_default(),
        });

        let reply = match ctx.call_bus(NOTIFICATION_CREATE_URI, payload) {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%error, "failed to post banner message");
                return String::new();
            }
        };

        let Some(id) = reply.get("id").and_then(notification_id) else {
            warn!(%reply, "notification service returned no id");
            return String::new();
        };
        self.banner_ids.push(id.clone());
        id
    }

    fn close_banner(ctx: &mut ExtensionContext<'_>, id: &str) {
        if let Err(error) = ctx.call_bus(NOTIFICATION_CLOSE_URI, json!({ "id": id })) {
            warn!(id, %error, "failed to close banner message");
        }
    }

    fn mark_first_use_done(ctx: &ExtensionContext<'_>) {
        let marker = &ctx.settings().first_use_marker_path;
        if let Err(error) = OpenOptions::new().write(true).create(true).open(marker) {
            warn!(path = %marker.display(), %error, "failed to create first-use marker");
        }
    }

    fn properties(ctx: &ExtensionContext<'_>) -> Value {
        let application = ctx.application();
        let settings = ctx.settings();
        json!({
            "launchParams": application.parameters(),
            "hasAlphaHole": false,
            "locale": settings.locale,
            "localeRegion": settings.locale_region,
            "timeFormat": settings.time_format,
            "timeZone": settings.time_zone,
            "isMinimal": false,
            "identifier": application.id(),
            "version": "",
            "screenOrientation": "",
            "windowOrientation": "",
            "specifiedWindowOrientation": "",
            "videoOrientation": "",
            "deviceInfo": settings.device_info,
            "isActivated": true,
            "activityId": application.activity().id,
            "phoneRegion": settings.phone_region,
        })
    }

    fn property(ctx: &ExtensionContext<'_>, name: &str) -> Option<String> {
        let application = ctx.application();
        match name {
            "launchParams" => Some(application.parameters().to_owned()),
            "identifier" => Some(application.id().to_owned()),
            "activityId" => Some(application.activity().id.to_string()),
            _ => None,
        }
    }
}

impl Extension for PalmSystem {
    fn name(&self) -> &str {
        NAME
    }

    fn handle_sync_call(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
    ) -> String {
        let window_id = ctx.window_id();
        match func {
            "getResource" => self.get_resource(ctx, params),
            "getIdentifier" => ctx.application().id().to_owned(),
            "getIdentifierForFrame" => match params {
                [_, _] => ctx.application().identity().identifier().to_owned(),
                _ => String::new(),
            },
            "getActivityId" => ctx.application().activity().id.to_string(),
            "addBannerMessage" => self.add_banner_message(ctx, params),
            "removeBannerMessage" => {
                let Some(id) = params.first().and_then(notification_id) else {
                    return String::new();
                };
                Self::close_banner(ctx, &id);
                self.banner_ids.retain(|banner| *banner != id);
                String::new()
            }
            "clearBannerMessages" => {
                for id in std::mem::take(&mut self.banner_ids) {
                    Self::close_banner(ctx, &id);
                }
                String::new()
            }
            "stagePreparing" => {
                ctx.dispatch(AppEvent::StagePreparing { window_id });
                String::new()
            }
            "stageReady" => {
                ctx.dispatch(AppEvent::StageReady { window_id });
                String::new()
            }
            "show" => {
                ctx.dispatch(AppEvent::Show { window_id });
                String::new()
            }
            "hide" => {
                ctx.dispatch(AppEvent::Hide { window_id });
                String::new()
            }
            "keepAlive" => {
                let Some(keep_alive) = bool_param(params, 0) else {
                    return String::new();
                };
                ctx.dispatch(AppEvent::SetKeepAlive {
                    window_id,
                    keep_alive,
                });
                String::new()
            }
            "activate" | "deactivate" => {
                ctx.dispatch(AppEvent::ActivityFocusChanged {
                    focused: func == "activate",
                });
                String::new()
            }
            "markFirstUseDone" => {
                Self::mark_first_use_done(ctx);
                String::new()
            }
            "setWindowProperties" | "enableFullScreenMode" | "setProperty" => {
                info!(%window_id, func, ?params, "window property request");
                String::new()
            }
            "initializeProperties" => Self::properties(ctx).to_string(),
            "getProperty" => string_param(params, 0)
                .and_then(|name| Self::property(ctx, name))
                .unwrap_or_default(),
            _ => "{}".to_owned(),
        }
    }

    fn handle_call(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
        callbacks: Callbacks,
    ) {
        match func {
            "initializeProperties" => {
                if let Some(callback_id) = callbacks.success.or_else(|| callback_param(params, 0)) {
                    let properties = Self::properties(ctx);
                    ctx.callback(callback_id, &properties);
                }
            }
            "getProperty" => {
                let Some(callback_id) = callbacks.success else {
                    return;
                };
                let value = string_param(params, 0).and_then(|name| Self::property(ctx, name));
                if let Some(value) = value {
                    ctx.callback_without_remove(callback_id, &Value::String(value));
                }
            }
            "registerPropertyChangeHandler" => {
                self.property_change_handler =
                    callbacks.success.or_else(|| callback_param(params, 0));
            }
            _ => {
                self.handle_sync_call(ctx, func, params);
            }
        }
    }

    fn on_parameters_changed(&mut self, ctx: &mut ExtensionContext<'_>, parameters: &str) {
        let Some(callback_id) = self.property_change_handler else {
            return;
        };
        ctx.execute_script(format!(
            "_webOS.callbackWithoutRemove({}, \"launchParams\", {});",
            callback_id.0,
            Value::String(parameters.to_owned())
        ));
    }
}

fn notification_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

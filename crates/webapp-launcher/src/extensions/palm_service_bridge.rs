use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::debug;

use crate::bridge::{Callbacks, Extension, ExtensionContext};

pub const NAME: &str = "PalmServiceBridge";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BridgeInstance {
    cancelled: bool,
}

/// Service bus access for scripted content. Each content-side bridge object owns one
/// instance, identified by the number content picked for it.
#[derive(Debug, Default)]
pub struct PalmServiceBridge {
    instances: BTreeMap<u64, BridgeInstance>,
}

impl PalmServiceBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn call(&mut self, ctx: &mut ExtensionContext<'_>, params: &[Value]) -> Option<Value> {
        let [instance_id, Value::String(uri), payload] = params else {
            debug!(?params, "service call with bad arguments");
            return None;
        };
        let instance_id = instance_id.as_u64()?;

        match self.instances.get(&instance_id) {
            Some(instance) if !instance.cancelled => {}
            Some(_) => {
                debug!(instance_id, uri, "dropping call on cancelled instance");
                return None;
            }
            None => {
                debug!(instance_id, uri, "dropping call on unknown instance");
                return None;
            }
        }

        let payload = match payload {
            Value::String(raw) => match serde_json::from_str(raw) {
                Ok(payload) => payload,
                Err(error) => return Some(failure(format!("invalid payload: {error}"))),
            },
            other => other.clone(),
        };

        let reply = match ctx.call_bus(uri, payload) {
            Ok(reply) => reply,
            Err(error) => failure(error.to_string()),
        };
        Some(reply)
    }
}

impl Extension for PalmServiceBridge {
    fn name(&self) -> &str {
        NAME
    }

    fn handle_sync_call(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        func: &str,
        params: &[Value],
    ) -> String {
        let instance_id = params.first().and_then(Value::as_u64);
        match func {
            "createInstance" => {
                if let Some(instance_id) = instance_id {
                    self.instances.entry(instance_id).or_default();
                }
                String::new()
            }
            "releaseInstance" => {
                if let Some(instance_id) = instance_id {
                    self.instances.remove(&instance_id);
                }
                String::new()
            }
            "cancel" => {
                if let Some(instance) = instance_id.and_then(|id| self.instances.get_mut(&id)) {
                    instance.cancelled = true;
                }
                String::new()
            }
            "call" => self
                .call(ctx, params)
                .map(|reply| reply.to_string())
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
        if func != "call" {
            self.handle_sync_call(ctx, func, params);
            return;
        }

        // content registers one handler for both outcomes
        if let Some(reply) = self.call(ctx, params) {
            if let Some(callback_id) = callbacks.success {
                ctx.callback(callback_id, &reply);
            }
        }
    }
}

fn failure(error_text: String) -> Value {
    json!({ "returnValue": false, "errorText": error_text })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use webapp_core::{CallbackId, Effect, MAIN_WINDOW_ID};

    use super::PalmServiceBridge;
    use crate::bridge::testing::Harness;
    use crate::bridge::{Callbacks, Extension};

    const URI: &str = "luna://com.palm.systemservice/time/getSystemTime";

    fn callbacks(id: u64) -> Callbacks {
        Callbacks {
            success: Some(CallbackId(id)),
            error: Some(CallbackId(id + 1)),
        }
    }

    fn scripts(effects: Vec<Effect>) -> Vec<String> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::ExecuteScript { script, .. } => Some(script),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn call_forwards_reply_to_success_callback() {
        let mut harness = Harness::privileged();
        harness.bus = std::mem::take(&mut harness.bus)
            .reply(URI, Ok(json!({"returnValue": true, "utc": 42})));
        let mut bridge = PalmServiceBridge::new();

        let mut ctx = harness.context(MAIN_WINDOW_ID);
        bridge.handle_call(&mut ctx, "createInstance", &[json!(1)], Callbacks::default());
        bridge.handle_call(
            &mut ctx,
            "call",
            &[json!(1), json!(URI), json!("{\"subscribe\":false}")],
            callbacks(10),
        );
        let scripts = scripts(ctx.into_effects());

        assert_eq!(
            scripts,
            vec!["_webOS.callback(10, {\"returnValue\":true,\"utc\":42});".to_owned()]
        );
        let request = &harness.bus.requests()[0];
        assert_eq!(request.uri, URI);
        assert_eq!(request.payload, json!({"subscribe": false}));
        assert_eq!(request.credential.app_id, "com.palm.app.email");
    }

    #[test]
    fn bus_failure_is_reported_through_the_same_callback() {
        let mut harness = Harness::unprivileged();
        let mut bridge = PalmServiceBridge::new();

        let mut ctx = harness.context(MAIN_WINDOW_ID);
        bridge.handle_call(&mut ctx, "createInstance", &[json!(2)], Callbacks::default());
        bridge.handle_call(&mut ctx, "call", &[json!(2), json!(URI), json!("{}")], callbacks(20));
        let scripts = scripts(ctx.into_effects());

        assert_eq!(scripts.len(), 1);
        let payload = scripts[0]
            .strip_prefix("_webOS.callback(20, ")
            .and_then(|rest| rest.strip_suffix(");"))
            .expect("callback script shape");
        let reply: Value = serde_json::from_str(payload).expect("reply should be json");
        assert_eq!(reply["returnValue"], false);
        assert!(reply["errorText"]
            .as_str()
            .expect("error text")
            .contains("unavailable"));
    }

    #[test]
    fn cancelled_and_unknown_instances_drop_calls() {
        let mut harness = Harness::privileged();
        let mut bridge = PalmServiceBridge::new();

        let mut ctx = harness.context(MAIN_WINDOW_ID);
        bridge.handle_call(&mut ctx, "createInstance", &[json!(3)], Callbacks::default());
        bridge.handle_call(&mut ctx, "cancel", &[json!(3)], Callbacks::default());
        bridge.handle_call(&mut ctx, "call", &[json!(3), json!(URI), json!("{}")], callbacks(30));
        bridge.handle_call(&mut ctx, "call", &[json!(99), json!(URI), json!("{}")], callbacks(40));
        bridge.handle_call(&mut ctx, "cancel", &[json!(99)], Callbacks::default());
        assert!(ctx.into_effects().is_empty());
        assert!(harness.bus.requests().is_empty());

        let mut ctx = harness.context(MAIN_WINDOW_ID);
        bridge.handle_call(&mut ctx, "releaseInstance", &[json!(3)], Callbacks::default());
        drop(ctx);
        assert_eq!(bridge.instance_count(), 0);
    }

    #[test]
    fn malformed_payload_fails_without_bus_round_trip() {
        let mut harness = Harness::privileged();
        let mut bridge = PalmServiceBridge::new();

        let mut ctx = harness.context(MAIN_WINDOW_ID);
        bridge.handle_sync_call(&mut ctx, "createInstance", &[json!(4)]);
        let reply = bridge.handle_sync_call(&mut ctx, "call", &[json!(4), json!(URI), json!("{oops")]);
        let bad_arity = bridge.handle_sync_call(&mut ctx, "call", &[json!(4), json!(URI)]);
        let unknown = bridge.handle_sync_call(&mut ctx, "subscribe", &[]);
        drop(ctx);

        let reply: Value = serde_json::from_str(&reply).expect("reply should be json");
        assert_eq!(reply["returnValue"], false);
        assert_eq!(bad_arity, "");
        assert_eq!(unknown, "{}");
        assert!(harness.bus.requests().is_empty());
    }
}

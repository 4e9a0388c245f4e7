//! Keeps a bounded list of login and alert events in the plugin's own store.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::PanelError;
use crate::plugins::context::{PluginContext, PluginStore, hook};
use crate::plugins::hooks::{ALERT_TRIGGERED, USER_LOGIN};
use crate::plugins::registry::Plugin;

const EVENTS_KEY: &str = "events";
const DEFAULT_MAX_EVENTS: u64 = 100;

pub(super) struct AuditTrail;

async fn append(
    store: &PluginStore,
    max_events: usize,
    kind: &str,
    payload: Value,
) -> Result<Value, PanelError> {
    let mut events = match store.get(EVENTS_KEY).await? {
        Some(Value::Array(events)) => events,
        _ => Vec::new(),
    };
    events.push(json!({
        "kind": kind,
        "at": Utc::now(),
        "payload": payload,
    }));
    if events.len() > max_events {
        let excess = events.len() - max_events;
        events.drain(..excess);
    }
    let count = events.len();
    store.put(EVENTS_KEY, &Value::Array(events)).await?;
    Ok(json!({ "recorded": kind, "events": count }))
}

#[async_trait]
impl Plugin for AuditTrail {
    async fn init(&self, ctx: PluginContext) -> Result<(), PanelError> {
        let max_events = ctx
            .config()
            .await
            .get("max_events")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_EVENTS)
            .max(1) as usize;

        for hook_name in [USER_LOGIN, ALERT_TRIGGERED] {
            let store = ctx.store();
            ctx.register_hook(
                hook_name,
                hook(move |payload| {
                    let store = store.clone();
                    async move { append(&store, max_events, hook_name, payload).await }
                }),
            )
            .await;
        }

        ctx.log("info", &format!("recording up to {max_events} events"))
            .await;
        Ok(())
    }
}

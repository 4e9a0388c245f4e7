//! Tracks the peak CPU usage seen in `metrics.snapshot` payloads.
//!
//! Config keys: `peak_cpu` / `peak_at` (maintained by the plugin), `warn_above` (optional
//! threshold in percent that produces a plugin log line).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::PanelError;
use crate::plugins::context::{PluginContext, hook};
use crate::plugins::hooks::METRICS_SNAPSHOT;
use crate::plugins::registry::Plugin;

pub(super) struct LoadWatch;

async fn observe(ctx: &PluginContext, payload: &Value) -> Result<Value, PanelError> {
    let Some(usage) = payload.pointer("/cpu/usage").and_then(Value::as_f64) else {
        return Ok(Value::Null);
    };

    let mut config = ctx.config().await;
    let peak = config.get("peak_cpu").and_then(Value::as_f64).unwrap_or(0.0);
    if usage > peak {
        if let Some(obj) = config.as_object_mut() {
            obj.insert("peak_cpu".to_string(), json!(usage));
            obj.insert("peak_at".to_string(), json!(Utc::now()));
        }
        ctx.set_config(config.clone()).await?;
    }

    if let Some(limit) = config.get("warn_above").and_then(Value::as_f64)
        && usage > limit
    {
        ctx.log("warn", &format!("cpu usage {usage:.1}% above {limit}%"))
            .await;
    }

    Ok(json!({ "peak_cpu": usage.max(peak) }))
}

#[async_trait]
impl Plugin for LoadWatch {
    async fn init(&self, ctx: PluginContext) -> Result<(), PanelError> {
        let hook_ctx = ctx.clone();
        ctx.register_hook(
            METRICS_SNAPSHOT,
            hook(move |payload| {
                let ctx = hook_ctx.clone();
                async move { observe(&ctx, &payload).await }
            }),
        )
        .await;
        Ok(())
    }

    async fn destroy(&self) {
        tracing::debug!("load-watch unloaded");
    }
}

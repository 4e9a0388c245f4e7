//! Host metrics: a ractor actor owning the `sysinfo` collector, fronted by TTL caches.

mod actor;
mod collector;

pub use actor::MetricsActorMessage;
pub use collector::Collector;

use crate::config::MonitorConfig;
use crate::error::PanelError;
use actor::MetricsActor;
use aquapanel_schema::{PerformanceSnapshot, SystemInfo};
use moka::sync::Cache;
use ractor::{Actor, ActorRef};
use std::{sync::Arc, time::Duration};

/// Cloneable front door to the metrics actor.
///
/// `system_info` changes rarely and is cached for minutes; performance snapshots are cached for
/// about a second so concurrent dashboards and the sampler share one collection pass.
#[derive(Clone)]
pub struct MetricsHandle {
    actor: ActorRef<MetricsActorMessage>,
    system_info: Cache<(), Arc<SystemInfo>>,
    performance: Cache<(), Arc<PerformanceSnapshot>>,
}

impl MetricsHandle {
    pub async fn spawn(cfg: &MonitorConfig) -> Result<Self, PanelError> {
        let (actor, _jh) = Actor::spawn(None, MetricsActor, cfg.process_list_limit)
            .await
            .map_err(|e| PanelError::RactorError(format!("failed to spawn MetricsActor: {e}")))?;

        let system_info = Cache::builder()
            .time_to_live(Duration::from_secs(cfg.system_info_ttl_secs.max(1)))
            .max_capacity(1)
            .build();
        let performance = Cache::builder()
            .time_to_live(Duration::from_millis(cfg.performance_ttl_ms.max(1)))
            .max_capacity(1)
            .build();

        Ok(Self {
            actor,
            system_info,
            performance,
        })
    }

    pub async fn system_info(&self) -> Result<Arc<SystemInfo>, PanelError> {
        if let Some(hit) = self.system_info.get(&()) {
            return Ok(hit);
        }
        let info = ractor::call!(self.actor, MetricsActorMessage::SystemInfo).map_err(|e| {
            PanelError::RactorError(format!("MetricsActor SystemInfo RPC failed: {e}"))
        })??;
        let info = Arc::new(info);
        self.system_info.insert((), Arc::clone(&info));
        Ok(info)
    }

    pub async fn performance(&self) -> Result<Arc<PerformanceSnapshot>, PanelError> {
        if let Some(hit) = self.performance.get(&()) {
            return Ok(hit);
        }
        let snapshot = ractor::call!(self.actor, MetricsActorMessage::Sample).map_err(|e| {
            PanelError::RactorError(format!("MetricsActor Sample RPC failed: {e}"))
        })??;
        let snapshot = Arc::new(snapshot);
        self.performance.insert((), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Evicts expired cache entries; called by the maintenance job.
    pub fn run_pending_tasks(&self) {
        self.system_info.run_pending_tasks();
        self.performance.run_pending_tasks();
    }
}

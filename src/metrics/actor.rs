use super::collector::Collector;
use crate::error::PanelError;
use aquapanel_schema::{PerformanceSnapshot, SystemInfo};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug)]
pub enum MetricsActorMessage {
    /// Static host description (hardware, OS, disks, interfaces).
    SystemInfo(RpcReplyPort<Result<SystemInfo, PanelError>>),

    /// Fresh performance sample; network rates are relative to the previous sample.
    Sample(RpcReplyPort<Result<PerformanceSnapshot, PanelError>>),
}

pub(super) struct MetricsActorState {
    collector: Arc<Mutex<Collector>>,
}

pub(super) struct MetricsActor;

#[ractor::async_trait]
impl Actor for MetricsActor {
    type Msg = MetricsActorMessage;
    type State = MetricsActorState;
    type Arguments = usize;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        process_limit: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let collector = tokio::task::spawn_blocking(move || Collector::new(process_limit))
            .await
            .map_err(|e| ActorProcessingErr::from(format!("collector init failed: {e}")))?;

        info!(process_limit, "MetricsActor initialized");
        Ok(MetricsActorState {
            collector: Arc::new(Mutex::new(collector)),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            MetricsActorMessage::SystemInfo(reply) => {
                let res = run_blocking(&state.collector, Collector::system_info).await;
                let _ = reply.send(res);
            }
            MetricsActorMessage::Sample(reply) => {
                let res = run_blocking(&state.collector, Collector::sample).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

async fn run_blocking<T, F>(collector: &Arc<Mutex<Collector>>, f: F) -> Result<T, PanelError>
where
    T: Send + 'static,
    F: FnOnce(&mut Collector) -> T + Send + 'static,
{
    let collector = Arc::clone(collector);
    tokio::task::spawn_blocking(move || {
        let mut guard = collector
            .lock()
            .map_err(|_| PanelError::MetricsError("collector mutex poisoned".to_string()))?;
        Ok(f(&mut *guard))
    })
    .await
    .map_err(|e| PanelError::MetricsError(format!("sampling task failed: {e}")))?
}

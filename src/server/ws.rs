use crate::auth::AuthUser;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use aquapanel_schema::{ClientMessage, ServerMessage};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, info, warn};

const MIN_PUSH_INTERVAL_MS: u64 = 100;
const ENCODE_FAILED: &str = r#"{"type":"error","message":"failed to encode frame"}"#;

pub(super) async fn ws_handler(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        let (sink, stream) = socket.split();
        handle_socket(sink, stream, state, user)
    })
}

/// JSON text for a frame; a frame that cannot be encoded becomes an `error` frame.
fn encode<T: Serialize>(frame: &T) -> String {
    match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to encode socket frame");
            let reply = ServerMessage::Error {
                message: format!("failed to encode frame: {e}"),
            };
            serde_json::to_string(&reply).unwrap_or_else(|_| ENCODE_FAILED.to_string())
        }
    }
}

async fn send<S>(sink: &mut S, frame: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    sink.send(Message::Text(encode(frame).into())).await
}

fn interpret(text: &str) -> Result<ClientMessage, ServerMessage> {
    serde_json::from_str(text).map_err(|e| ServerMessage::Error {
        message: format!("unrecognised message: {e}"),
    })
}

async fn handle_socket<S, R>(mut sink: S, mut stream: R, state: PanelState, user: AuthUser)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let period = Duration::from_millis(state.monitor.ws_push_interval_ms.max(MIN_PUSH_INTERVAL_MS));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut alerts = BroadcastStream::new(state.alerts.subscribe());
    let mut monitoring = false;

    info!(username = %user.username, "socket connected");

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(msg)) = incoming else { break };
                let reply = match msg {
                    Message::Text(text) => match interpret(text.as_str()) {
                        Ok(ClientMessage::StartMonitoring) => {
                            monitoring = true;
                            ticker.reset_immediately();
                            None
                        }
                        Ok(ClientMessage::StopMonitoring) => {
                            monitoring = false;
                            None
                        }
                        Ok(ClientMessage::Ping) => Some(ServerMessage::Pong),
                        Err(frame) => Some(frame),
                    },
                    Message::Close(_) => break,
                    _ => None,
                };
                if let Some(reply) = reply
                    && send(&mut sink, &reply).await.is_err()
                {
                    break;
                }
            }
            _ = ticker.tick(), if monitoring => {
                let frame = match state.metrics.performance().await {
                    Ok(snapshot) => ServerMessage::Performance {
                        data: Box::new(snapshot.as_ref().clone()),
                    },
                    Err(e) => {
                        warn!(error = %e, "socket push could not sample metrics");
                        ServerMessage::Error {
                            message: "metrics unavailable".to_string(),
                        }
                    }
                };
                if send(&mut sink, &frame).await.is_err() {
                    break;
                }
            }
            event = alerts.next() => match event {
                Some(Ok(event)) => {
                    if send(&mut sink, &ServerMessage::Alert { data: event }).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    debug!(skipped, "socket fell behind the alert feed");
                }
                None => break,
            },
        }
    }

    info!(username = %user.username, "socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::alerts::{NewRule, NotificationChannel};
    use crate::auth::Role;
    use aquapanel_schema::PerformanceSnapshot;
    use chrono::Utc;
    use futures::channel::mpsc;
    use serde::Serializer;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::task::JoinHandle;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refused"))
        }
    }

    /// Drives `handle_socket` over in-memory channels.
    struct Session {
        to_server: mpsc::UnboundedSender<Result<Message, axum::Error>>,
        from_server: mpsc::UnboundedReceiver<Message>,
        task: JoinHandle<()>,
    }

    impl Session {
        fn open(state: PanelState) -> Self {
            let (to_server, server_rx) = mpsc::unbounded();
            let (server_tx, from_server) = mpsc::unbounded::<Message>();
            let user = AuthUser {
                user_id: 1,
                username: "admin".to_string(),
                role: Role::Admin,
                session: String::new(),
            };
            let sink = server_tx.sink_map_err(axum::Error::new);
            let task = tokio::spawn(handle_socket(sink, server_rx, state, user));
            Self {
                to_server,
                from_server,
                task,
            }
        }

        fn say(&self, frame: Value) {
            self.to_server
                .unbounded_send(Ok(Message::Text(frame.to_string().into())))
                .expect("socket open");
        }

        async fn next(&mut self) -> ServerMessage {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.from_server.next())
                .await
                .expect("frame within timeout")
                .expect("socket open");
            match msg {
                Message::Text(text) => serde_json::from_str(text.as_str()).expect("server frame"),
                other => panic!("unexpected {other:?}"),
            }
        }

        async fn quiet_for(&mut self, window: Duration) -> bool {
            tokio::time::timeout(window, self.from_server.next())
                .await
                .is_err()
        }
    }

    async fn state(dir: &TempDir) -> PanelState {
        let mut cfg = Config::default();
        cfg.basic.database_url = format!("sqlite:{}", dir.path().join("panel.db").display());
        cfg.auth.jwt_secret = "socket-test-secret".to_string();
        cfg.auth.bcrypt_cost = 4;
        cfg.plugins.dir = dir.path().join("plugins");
        cfg.plugins.autoload = false;
        cfg.monitor.ws_push_interval_ms = MIN_PUSH_INTERVAL_MS;
        crate::assemble(&cfg).await.expect("assemble panel")
    }

    #[test]
    fn unknown_frames_become_error_replies() {
        assert_eq!(
            interpret(r#"{"type":"ping"}"#),
            Ok(ClientMessage::Ping)
        );
        match interpret(r#"{"type":"reboot"}"#) {
            Err(ServerMessage::Error { message }) => assert!(message.contains("unrecognised")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(interpret("not json").is_err());
    }

    #[test]
    fn encode_failure_is_reported_to_the_client() {
        let text = encode(&Unencodable);
        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(ServerMessage::Error { message }) => assert!(message.contains("refused")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&ServerMessage::Pong), r#"{"type":"pong"}"#);
    }

    #[tokio::test]
    async fn session_streams_metrics_and_alerts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state(&dir).await;
        let mut session = Session::open(state.clone());

        // The pong also proves the alert feed is subscribed.
        session.say(json!({ "type": "ping" }));
        assert_eq!(session.next().await, ServerMessage::Pong);

        session.say(json!({ "type": "start_monitoring" }));
        assert!(matches!(
            session.next().await,
            ServerMessage::Performance { .. }
        ));

        session.say(json!({ "type": "stop_monitoring" }));
        session.say(json!({ "type": "ping" }));
        while session.next().await != ServerMessage::Pong {}
        assert!(session.quiet_for(Duration::from_millis(400)).await);

        let rule = state
            .alerts
            .create_rule(
                NewRule {
                    name: "Hot CPU".to_string(),
                    description: None,
                    metric: "cpu_usage".to_string(),
                    operator: ">".to_string(),
                    threshold: 50.0,
                    severity: None,
                    enabled: None,
                    notification_channels: Some(vec![NotificationChannel::Console]),
                },
                None,
            )
            .await
            .expect("create rule");
        let mut hot = PerformanceSnapshot::empty(Utc::now());
        hot.cpu.usage = 91.0;
        assert_eq!(state.alerts.check(&hot).await.len(), 1);
        match session.next().await {
            ServerMessage::Alert { data } => assert_eq!(data.rule_id, rule.id),
            other => panic!("unexpected {other:?}"),
        }

        session.say(json!({ "type": "reboot" }));
        assert!(matches!(session.next().await, ServerMessage::Error { .. }));

        let Session {
            to_server, task, ..
        } = session;
        drop(to_server);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("socket task ends when the client goes away")
            .expect("socket task");
    }
}

//! Socket frames. Every frame is a JSON object tagged by `type`.

use crate::{AlertEvent, PerformanceSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartMonitoring,
    StopMonitoring,
    Ping,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Performance { data: Box<PerformanceSnapshot> },
    Alert { data: AlertEvent },
    Pong,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn client_messages_parse_from_type_tag() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "start_monitoring" })).expect("must parse");
        assert_eq!(msg, ClientMessage::StartMonitoring);

        let unknown = serde_json::from_value::<ClientMessage>(json!({ "type": "reboot" }));
        assert!(unknown.is_err());
    }

    #[test]
    fn performance_frame_nests_snapshot_under_data() {
        let frame = ServerMessage::Performance {
            data: Box::new(PerformanceSnapshot::empty(Utc::now())),
        };
        let value = serde_json::to_value(&frame).expect("must serialize");
        assert_eq!(value["type"], "performance");
        assert!(value["data"]["cpu"]["usage"].is_number());
    }
}

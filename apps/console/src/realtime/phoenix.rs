// Phoenix channel frames as spoken by the Supabase realtime server (vsn 1.0.0).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::realtime::{ChangeEvent, ChangeFilter};

pub const PHOENIX_TOPIC: &str = "phoenix";
pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";
pub const POSTGRES_CHANGES: &str = "postgres_changes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    pub fn topic_for(channel: &str) -> String {
        format!("realtime:{channel}")
    }

    pub fn join(filter: &ChangeFilter, access_token: &str, reference: String) -> Self {
        Self {
            topic: Self::topic_for(&filter.channel),
            event: PHX_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": filter.event,
                        "schema": filter.schema,
                        "table": filter.table,
                    }],
                    "private": false,
                },
                "access_token": access_token,
            }),
            reference: Some(reference),
        }
    }

    pub fn leave(topic: &str, reference: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: PHX_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference),
        }
    }

    pub fn heartbeat(reference: String) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference),
        }
    }

    /// `status` of a `phx_reply`, e.g. `"ok"` or `"error"`.
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != PHX_REPLY {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }

    pub fn is_reply_to(&self, reference: &str) -> bool {
        self.event == PHX_REPLY && self.reference.as_deref() == Some(reference)
    }

    /// The row change carried by a `postgres_changes` frame.
    pub fn change_event(&self) -> Option<ChangeEvent> {
        if self.event != POSTGRES_CHANGES {
            return None;
        }
        let data = self.payload.get("data")?.clone();
        serde_json::from_value(data).ok()
    }
}

/// Monotonic `ref` values for outgoing frames.
#[derive(Debug, Default)]
pub struct RefCounter(u64);

impl RefCounter {
    pub fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

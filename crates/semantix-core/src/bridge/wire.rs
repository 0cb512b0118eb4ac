//! Wire types for the page ↔ privileged-host storage protocol.
//!
//! The channel has no built-in request/response pairing, so every request
//! carries a fresh `requestId` and the host echoes it back on the matching
//! response. Messages are tagged two ways: a `source` field distinguishing
//! page traffic from host traffic, and a `type` field selecting the
//! operation (requests) or RESPONSE/UPDATE (host messages).
//!
//! Field names are camelCase on the wire so a page-side consumer sees the
//! same JSON shape regardless of which end produced it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{SOURCE_PAGE, SOURCE_RESPONSE};

/// A storage request posted by the page-side client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Always [`SOURCE_PAGE`]; the host drops anything else.
    pub source: String,
    #[serde(flatten)]
    pub op: RequestOp,
    pub request_id: String,
}

impl Request {
    pub fn new(request_id: String, op: RequestOp) -> Self {
        Self {
            source: SOURCE_PAGE.to_string(),
            op,
            request_id,
        }
    }
}

/// Operation + payload, tagged as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RequestOp {
    #[serde(rename = "GET")]
    Get { key: String },
    #[serde(rename = "SET")]
    Set { key: String, value: Value },
    #[serde(rename = "REMOVE")]
    Remove { key: String },
    #[serde(rename = "GET_MULTIPLE")]
    GetMultiple { keys: Vec<String> },
    #[serde(rename = "SET_MULTIPLE")]
    SetMultiple {
        items: serde_json::Map<String, Value>,
    },
}

impl RequestOp {
    /// The key this operation touches, when it touches exactly one.
    pub fn single_key(&self) -> Option<&str> {
        match self {
            RequestOp::Get { key } | RequestOp::Set { key, .. } | RequestOp::Remove { key } => {
                Some(key)
            }
            _ => None,
        }
    }
}

/// A message posted by the privileged host: either the response to one
/// request, or an unsolicited broadcast that a key changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "RESPONSE")]
    #[serde(rename_all = "camelCase")]
    Response {
        source: String,
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "UPDATE")]
    Update {
        source: String,
        key: String,
        data: Value,
    },
}

impl HostMessage {
    pub fn ok(request_id: String, data: Option<Value>) -> Self {
        HostMessage::Response {
            source: SOURCE_RESPONSE.to_string(),
            request_id,
            success: true,
            data,
            error: None,
        }
    }

    pub fn err(request_id: String, error: impl Into<String>) -> Self {
        HostMessage::Response {
            source: SOURCE_RESPONSE.to_string(),
            request_id,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn update(key: String, data: Value) -> Self {
        HostMessage::Update {
            source: SOURCE_RESPONSE.to_string(),
            key,
            data,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            HostMessage::Response { source, .. } | HostMessage::Update { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = Request::new(
            "1700000000000-abc123".to_string(),
            RequestOp::Set {
                key: "semantix_favorites".to_string(),
                value: json!([{"conversationId": "c1"}]),
            },
        );

        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["source"], "semantix-storage");
        assert_eq!(wire["type"], "SET");
        assert_eq!(wire["requestId"], "1700000000000-abc123");
        assert_eq!(wire["payload"]["key"], "semantix_favorites");
        assert_eq!(wire["payload"]["value"][0]["conversationId"], "c1");
    }

    #[test]
    fn test_request_round_trip() {
        let req = Request::new(
            "id-1".to_string(),
            RequestOp::GetMultiple {
                keys: vec!["a".to_string(), "b".to_string()],
            },
        );
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request_id, "id-1");
        match back.op {
            RequestOp::GetMultiple { keys } => assert_eq!(keys, vec!["a", "b"]),
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_response_wire_shape() {
        let msg = HostMessage::ok("id-2".to_string(), Some(json!(42)));
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["source"], "semantix-storage-response");
        assert_eq!(wire["type"], "RESPONSE");
        assert_eq!(wire["requestId"], "id-2");
        assert_eq!(wire["success"], true);
        assert_eq!(wire["data"], 42);
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn test_update_wire_shape() {
        let msg = HostMessage::update("semantix_projects".to_string(), json!([]));
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["type"], "UPDATE");
        assert_eq!(wire["key"], "semantix_projects");
        assert_eq!(wire["data"], json!([]));
    }
}

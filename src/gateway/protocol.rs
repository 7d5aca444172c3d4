//! OneBot v11 frame codec.
//!
//! Inbound text frames are either events (they carry `post_type`) or
//! responses to actions we sent (they carry our `echo`). Outbound frames are
//! always actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::types::{GatewayEvent, GroupInviteRequest};

/// Action name for answering friend/group requests.
pub const SET_GROUP_ADD_REQUEST: &str = "set_group_add_request";

/// Outbound action frame.
#[derive(Debug, Serialize)]
pub struct ActionRequest<'a> {
    pub action: &'a str,
    pub params: Value,
    pub echo: &'a str,
}

/// Response to an action, matched back through `echo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub wording: String,
    #[serde(default)]
    pub echo: Option<String>,
}

impl ActionResponse {
    /// Whether the gateway reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok" && self.retcode == 0
    }

    /// Human readable failure reason.
    pub fn reason(&self) -> &str {
        if !self.wording.is_empty() {
            &self.wording
        } else if !self.message.is_empty() {
            &self.message
        } else {
            &self.status
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug)]
pub enum Frame {
    Response(ActionResponse),
    Event(GatewayEvent),
    /// Heartbeats and lifecycle notices from the gateway itself.
    Meta { kind: String },
    /// An event this agent has no handler for.
    Ignored { post_type: String },
}

#[derive(Debug, Deserialize)]
struct EventHeader {
    post_type: String,
}

#[derive(Debug, Deserialize)]
struct RequestEvent {
    request_type: String,
    #[serde(default)]
    sub_type: String,
    flag: String,
    user_id: i64,
    #[serde(default)]
    group_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MetaEvent {
    meta_event_type: String,
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<Frame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("post_type").is_none() {
        return Ok(Frame::Response(serde_json::from_value(value)?));
    }

    let header = EventHeader::deserialize(&value)?;
    match header.post_type.as_str() {
        "request" => {
            let request = RequestEvent::deserialize(&value)?;
            match (request.request_type.as_str(), request.sub_type.as_str(), request.group_id) {
                ("group", "invite", Some(group_id)) => {
                    Ok(Frame::Event(GatewayEvent::GroupInvite(GroupInviteRequest {
                        flag: request.flag,
                        user_id: request.user_id,
                        group_id,
                    })))
                }
                _ => Ok(Frame::Ignored {
                    post_type: format!("request.{}.{}", request.request_type, request.sub_type),
                }),
            }
        }
        "meta_event" => {
            let meta = MetaEvent::deserialize(&value)?;
            Ok(Frame::Meta {
                kind: meta.meta_event_type,
            })
        }
        _ => Ok(Frame::Ignored {
            post_type: header.post_type,
        }),
    }
}

/// Encode an action frame.
pub fn encode_action(action: &str, params: Value, echo: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ActionRequest {
        action,
        params,
        echo,
    })
}

/// Parameters for [`SET_GROUP_ADD_REQUEST`] answering a group invite.
pub fn group_add_request_params(flag: &str, approve: bool) -> Value {
    serde_json::json!({
        "flag": flag,
        "sub_type": "invite",
        "approve": approve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_group_invite() {
        let frame = decode(
            r#"{"time":1700000000,"self_id":10001,"post_type":"request","request_type":"group",
                "sub_type":"invite","group_id":123456,"user_id":42,"comment":"","flag":"1700000000123"}"#,
        )
        .unwrap();

        match frame {
            Frame::Event(GatewayEvent::GroupInvite(invite)) => {
                assert_eq!(invite.flag, "1700000000123");
                assert_eq!(invite.user_id, 42);
                assert_eq!(invite.group_id, 123456);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_group_join_request_is_ignored() {
        let frame = decode(
            r#"{"post_type":"request","request_type":"group","sub_type":"add",
                "group_id":1,"user_id":2,"flag":"x"}"#,
        )
        .unwrap();
        assert!(matches!(frame, Frame::Ignored { ref post_type } if post_type == "request.group.add"));
    }

    #[test]
    fn test_friend_request_is_ignored() {
        let frame = decode(
            r#"{"post_type":"request","request_type":"friend","user_id":2,"flag":"x","comment":"hi"}"#,
        )
        .unwrap();
        assert!(matches!(frame, Frame::Ignored { .. }));
    }

    #[test]
    fn test_decode_heartbeat() {
        let frame = decode(
            r#"{"post_type":"meta_event","meta_event_type":"heartbeat","interval":30000,"status":{}}"#,
        )
        .unwrap();
        assert!(matches!(frame, Frame::Meta { ref kind } if kind == "heartbeat"));
    }

    #[test]
    fn test_message_event_is_ignored() {
        let frame = decode(r#"{"post_type":"message","message_type":"group","raw_message":"hi"}"#).unwrap();
        assert!(matches!(frame, Frame::Ignored { ref post_type } if post_type == "message"));
    }

    #[test]
    fn test_decode_response() {
        let frame = decode(
            r#"{"status":"failed","retcode":1400,"data":null,"message":"","wording":"flag expired","echo":"abc"}"#,
        )
        .unwrap();

        match frame {
            Frame::Response(response) => {
                assert!(!response.is_ok());
                assert_eq!(response.reason(), "flag expired");
                assert_eq!(response.echo.as_deref(), Some("abc"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_encode_approval() {
        let text = encode_action(
            SET_GROUP_ADD_REQUEST,
            group_add_request_params("flag-1", true),
            "echo-1",
        )
        .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["action"], "set_group_add_request");
        assert_eq!(value["params"]["flag"], "flag-1");
        assert_eq!(value["params"]["approve"], true);
        assert_eq!(value["echo"], "echo-1");
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode("not json").is_err());
    }
}

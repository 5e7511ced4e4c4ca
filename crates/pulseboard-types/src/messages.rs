//! Wire messages exchanged over the presence WebSocket.
//!
//! Both directions use JSON text frames with an adjacently tagged
//! envelope: `{"event": "MOVE", "data": {...}}`. Events whose payload
//! fields are all optional (`SET_NAME`, `DANCE`, `STOP_DANCE`) may send
//! `data` as `{}`, as `null`, or leave it out.
//!
//! Inbound events are untrusted. A frame that does not decode into a
//! [`ClientEvent`] is dropped by the gateway and never reaches the
//! presence loop.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Facing;
use crate::ids::ConnectionId;
use crate::structs::Participant;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Payload of a `MOVE` event: velocity integrated over `dt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoveInput {
    /// Horizontal velocity component, typically in `-1.0..=1.0`.
    pub vx: f64,
    /// Vertical velocity component, typically in `-1.0..=1.0`.
    pub vy: f64,
    /// New facing direction, if the client reports one.
    #[serde(default)]
    pub dir: Option<Facing>,
    /// Milliseconds elapsed on the client since its previous move.
    pub dt: f64,
    /// Client-side monotonic sequence number.
    #[ts(type = "number")]
    pub seq: u64,
}

impl MoveInput {
    /// Whether the velocity is non-zero.
    pub fn is_moving(&self) -> bool {
        self.vx != 0.0 || self.vy != 0.0
    }

    /// Whether every numeric field is a finite number.
    pub const fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.dt.is_finite()
    }
}

/// An event sent by one participant's client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE",
    from = "InboundFrame"
)]
#[ts(export, export_to = "bindings/")]
pub enum ClientEvent {
    /// Claim a display name.
    SetName {
        /// Requested name; trimmed and truncated server-side.
        #[serde(default)]
        name: Option<String>,
    },
    /// Dead-reckoning movement update.
    Move(MoveInput),
    /// Toggle dancing.
    Dance {
        /// Dance animation label. The server picks a default when absent.
        #[serde(default, rename = "type")]
        variant: Option<String>,
    },
    /// Stop dancing, whatever the current state.
    StopDance,
    /// Show an emote.
    Emote {
        /// Emote symbol: a name (`wave`) or the emoji literal.
        #[serde(rename = "type")]
        symbol: String,
    },
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetName { .. } => "SET_NAME",
            Self::Move(_) => "MOVE",
            Self::Dance { .. } => "DANCE",
            Self::StopDance => "STOP_DANCE",
            Self::Emote { .. } => "EMOTE",
        }
    }
}

/// Decoding shape of [`ClientEvent`].
///
/// Serde only tolerates a missing `data` key for newtype variants whose
/// payload is an `Option`, so every event with an all-optional payload is
/// decoded through one here and flattened by the `From` impl below.
#[derive(Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
enum InboundFrame {
    SetName(Option<NameData>),
    Move(MoveInput),
    Dance(Option<DanceData>),
    StopDance(Option<IgnoredAny>),
    Emote {
        #[serde(rename = "type")]
        symbol: String,
    },
}

#[derive(Deserialize)]
struct NameData {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct DanceData {
    #[serde(default, rename = "type")]
    variant: Option<String>,
}

impl From<InboundFrame> for ClientEvent {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::SetName(data) => Self::SetName {
                name: data.and_then(|d| d.name),
            },
            InboundFrame::Move(input) => Self::Move(input),
            InboundFrame::Dance(data) => Self::Dance {
                variant: data.and_then(|d| d.variant),
            },
            InboundFrame::StopDance(_) => Self::StopDance,
            InboundFrame::Emote { symbol } => Self::Emote { symbol },
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Periodic full-state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Every named participant, in registry order.
    pub users: Vec<Participant>,
    /// Server time the snapshot was taken (epoch milliseconds).
    #[ts(type = "number")]
    pub timestamp: u64,
}

/// An event broadcast to every connection.
///
/// Snapshots are authoritative. Join and leave notifications only let
/// clients react before the next snapshot arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// A participant claimed a name and became visible.
    UserJoined(Participant),
    /// A connection closed.
    UserLeft {
        /// The departed connection.
        id: ConnectionId,
    },
    /// Full state of every named participant.
    StateSnapshot(Snapshot),
}

impl ServerEvent {
    /// Wire name of the event, for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserJoined(_) => "USER_JOINED",
            Self::UserLeft { .. } => "USER_LEFT",
            Self::StateSnapshot(_) => "STATE_SNAPSHOT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Position;

    fn parse(json: &str) -> Option<ClientEvent> {
        serde_json::from_str(json).ok()
    }

    #[test]
    fn parses_move() {
        let event = parse(
            r#"{"event":"MOVE","data":{"vx":1,"vy":0,"dir":"right","dt":16.5,"seq":7}}"#,
        );
        let input = match event {
            Some(ClientEvent::Move(input)) => Some(input),
            _ => None,
        };
        assert_eq!(input.as_ref().and_then(|i| i.dir), Some(Facing::Right));
        assert_eq!(input.as_ref().map(|i| i.seq), Some(7));
        assert!(input.is_some_and(|i| i.is_moving()));
    }

    #[test]
    fn move_without_direction_is_accepted() {
        let event = parse(r#"{"event":"MOVE","data":{"vx":0,"vy":0,"dt":16,"seq":1}}"#);
        assert!(matches!(event, Some(ClientEvent::Move(MoveInput { dir: None, .. }))));
    }

    #[test]
    fn move_missing_numbers_is_malformed() {
        assert_eq!(parse(r#"{"event":"MOVE","data":{"vx":1,"dir":"up"}}"#), None);
        assert_eq!(parse(r#"{"event":"MOVE","data":{"vx":"fast","vy":0,"dt":1,"seq":1}}"#), None);
    }

    #[test]
    fn stop_dance_accepts_every_empty_payload() {
        for frame in [
            r#"{"event":"STOP_DANCE"}"#,
            r#"{"event":"STOP_DANCE","data":null}"#,
            r#"{"event":"STOP_DANCE","data":{}}"#,
            r#"{"data":{},"event":"STOP_DANCE"}"#,
        ] {
            assert_eq!(parse(frame), Some(ClientEvent::StopDance), "frame {frame}");
        }
    }

    #[test]
    fn dance_type_is_optional() {
        for frame in [
            r#"{"event":"DANCE"}"#,
            r#"{"event":"DANCE","data":null}"#,
            r#"{"event":"DANCE","data":{}}"#,
            r#"{"event":"DANCE","data":{"type":null}}"#,
        ] {
            assert_eq!(
                parse(frame),
                Some(ClientEvent::Dance { variant: None }),
                "frame {frame}"
            );
        }
        assert_eq!(
            parse(r#"{"event":"DANCE","data":{"type":"dance3"}}"#),
            Some(ClientEvent::Dance {
                variant: Some(String::from("dance3"))
            })
        );
    }

    #[test]
    fn set_name_without_name_decodes_to_none() {
        for frame in [r#"{"event":"SET_NAME","data":{}}"#, r#"{"event":"SET_NAME"}"#] {
            assert_eq!(parse(frame), Some(ClientEvent::SetName { name: None }), "frame {frame}");
        }
        assert_eq!(
            parse(r#"{"event":"SET_NAME","data":{"name":"Ann"}}"#),
            Some(ClientEvent::SetName {
                name: Some(String::from("Ann"))
            })
        );
    }

    #[test]
    fn move_and_emote_still_need_data() {
        assert_eq!(parse(r#"{"event":"MOVE"}"#), None);
        assert_eq!(parse(r#"{"event":"EMOTE"}"#), None);
        assert_eq!(parse(r#"{"event":"EMOTE","data":{}}"#), None);
    }

    #[test]
    fn serialized_events_decode_again() {
        for event in [
            ClientEvent::StopDance,
            ClientEvent::Dance { variant: None },
            ClientEvent::SetName { name: None },
        ] {
            let json = serde_json::to_string(&event).unwrap_or_default();
            assert_eq!(parse(&json), Some(event), "json {json}");
        }
    }

    #[test]
    fn unknown_event_is_malformed() {
        assert_eq!(parse(r#"{"event":"TELEPORT","data":{"x":0}}"#), None);
        assert_eq!(parse("not json"), None);
    }

    #[test]
    fn emote_keeps_raw_symbol() {
        assert_eq!(
            parse(r#"{"event":"EMOTE","data":{"type":"👋"}}"#),
            Some(ClientEvent::Emote {
                symbol: String::from("👋")
            })
        );
    }

    #[test]
    fn user_left_wire_shape() {
        let id = ConnectionId::new();
        let json = serde_json::to_value(ServerEvent::UserLeft { id }).unwrap_or_default();
        assert_eq!(json["event"], "USER_LEFT");
        assert_eq!(json["data"]["id"], id.to_string());
    }

    #[test]
    fn snapshot_wire_shape() {
        let p = Participant::new(ConnectionId::new(), 1, Position::new(0.0, 0.0), 0);
        let event = ServerEvent::StateSnapshot(Snapshot {
            users: vec![p],
            timestamp: 42,
        });
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event"], "STATE_SNAPSHOT");
        assert_eq!(json["data"]["timestamp"], 42);
        assert_eq!(json["data"]["users"].as_array().map(Vec::len), Some(1));
        assert_eq!(event.name(), "STATE_SNAPSHOT");
    }
}

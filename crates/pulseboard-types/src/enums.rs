//! Enumeration types for participant state.
//!
//! [`ActivityState`] is the explicit state machine for what a participant
//! is doing. Its transition table lives in the core crate's handlers; the
//! type here only carries the state and the dance variant that is
//! meaningful while dancing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// Direction a participant's avatar faces. Sticky: only a movement event
/// that names a direction changes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Facing {
    /// Facing up the screen.
    Up,
    /// Facing down the screen (the spawn default).
    #[default]
    Down,
    /// Facing left.
    Left,
    /// Facing right.
    Right,
}

// ---------------------------------------------------------------------------
// Activity state
// ---------------------------------------------------------------------------

/// What a participant is currently doing.
///
/// Encoded on the wire as `{"kind": "idle"}`, `{"kind": "walking"}`, or
/// `{"kind": "dancing", "variant": "dance1"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActivityState {
    /// Standing still.
    #[default]
    Idle,
    /// Moving with a non-zero velocity.
    Walking,
    /// Dancing until toggled off, explicitly stopped, or interrupted by
    /// movement.
    Dancing {
        /// Client-chosen dance animation label.
        variant: String,
    },
}

impl ActivityState {
    /// Whether the participant is dancing.
    pub const fn is_dancing(&self) -> bool {
        matches!(self, Self::Dancing { .. })
    }

    /// The dance variant, present only while dancing.
    pub fn dance_variant(&self) -> Option<&str> {
        match self {
            Self::Dancing { variant } => Some(variant.as_str()),
            Self::Idle | Self::Walking => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Motion liveness
// ---------------------------------------------------------------------------

/// Motion liveness, derived from how recently movement input arrived.
///
/// Independent of connection liveness: a connected participant who stops
/// sending movement becomes [`Liveness::Idle`] while staying registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Liveness {
    /// Movement input arrived recently.
    #[default]
    Active,
    /// No movement input within the staleness window.
    Idle,
}

// ---------------------------------------------------------------------------
// Emotes
// ---------------------------------------------------------------------------

/// The fixed allow-set of emotes a participant may display.
///
/// Clients may send either the symbolic name or the emoji literal the
/// browser client renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Emote {
    /// 👋
    #[serde(alias = "👋")]
    Wave,
    /// ❤️
    #[serde(alias = "❤️", alias = "❤")]
    Heart,
    /// 😄
    #[serde(alias = "😄")]
    Laugh,
    /// 😡
    #[serde(alias = "😡")]
    Angry,
}

impl Emote {
    /// Every emote in the allow-set.
    pub const ALL: [Self; 4] = [Self::Wave, Self::Heart, Self::Laugh, Self::Angry];

    /// Resolve a client-supplied symbol. Returns `None` for anything outside
    /// the allow-set.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "wave" | "👋" => Some(Self::Wave),
            "heart" | "❤️" | "❤" => Some(Self::Heart),
            "laugh" | "😄" => Some(Self::Laugh),
            "angry" | "😡" => Some(Self::Angry),
            _ => None,
        }
    }

    /// The emoji rendered for this emote.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Wave => "👋",
            Self::Heart => "❤️",
            Self::Laugh => "😄",
            Self::Angry => "😡",
        }
    }
}

impl core::fmt::Display for Emote {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.glyph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_state_wire_shape() {
        let dancing = ActivityState::Dancing {
            variant: String::from("dance2"),
        };
        let json = serde_json::to_value(&dancing).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({"kind": "dancing", "variant": "dance2"}))
        );

        let walking = serde_json::to_value(ActivityState::Walking).ok();
        assert_eq!(walking, Some(serde_json::json!({"kind": "walking"})));
    }

    #[test]
    fn dance_variant_only_while_dancing() {
        assert_eq!(ActivityState::Idle.dance_variant(), None);
        assert_eq!(ActivityState::Walking.dance_variant(), None);
        let dancing = ActivityState::Dancing {
            variant: String::from("dance1"),
        };
        assert!(dancing.is_dancing());
        assert_eq!(dancing.dance_variant(), Some("dance1"));
    }

    #[test]
    fn emote_accepts_names_and_glyphs() {
        for emote in Emote::ALL {
            assert_eq!(Emote::from_symbol(emote.glyph()), Some(emote));
        }
        assert_eq!(Emote::from_symbol("wave"), Some(Emote::Wave));
        assert_eq!(Emote::from_symbol("angry"), Some(Emote::Angry));
        assert_eq!(Emote::from_symbol("🔥"), None);
        assert_eq!(Emote::from_symbol(""), None);
    }

    #[test]
    fn facing_defaults_down() {
        assert_eq!(Facing::default(), Facing::Down);
        let parsed: Result<Facing, _> = serde_json::from_str("\"right\"");
        assert_eq!(parsed.ok(), Some(Facing::Right));
    }
}

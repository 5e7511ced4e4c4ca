//! The participant record.
//!
//! One [`Participant`] exists per active connection. It is created when
//! the connection is accepted and destroyed when it closes. The same
//! struct is what clients receive in join notifications and snapshots.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActivityState, Emote, Facing, Liveness};
use crate::ids::ConnectionId;

/// Largest valid tint (24-bit RGB).
pub const MAX_TINT: u32 = 0x00FF_FFFF;

/// A point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-connection presence state.
///
/// All timestamps are Unix epoch milliseconds on the server clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Connection that owns this record.
    pub id: ConnectionId,
    /// Claimed display name. `None` until a valid name is set; unnamed
    /// participants are left out of every broadcast.
    pub display_name: Option<String>,
    /// Avatar tint, `0..=0xFFFFFF`. Fixed at creation.
    pub tint: u32,
    /// Current position.
    pub position: Position,
    /// Last direction the participant faced.
    pub facing: Facing,
    /// What the participant is doing.
    pub activity_state: ActivityState,
    /// Motion liveness.
    pub liveness: Liveness,
    /// Time of the last movement event, or of creation.
    #[ts(type = "number")]
    pub last_movement_at: u64,
    /// Last client sequence number accepted with a movement event.
    #[ts(type = "number")]
    pub last_sequence: u64,
    /// Emote currently on display.
    pub current_emote: Option<Emote>,
    /// When the current emote stops being displayed.
    #[ts(type = "number")]
    pub emote_expires_at: u64,
    /// New emotes are rejected before this time.
    #[ts(type = "number")]
    pub emote_cooldown_until: u64,
}

impl Participant {
    /// Create a fresh, unnamed record at `position`.
    ///
    /// The tint is masked into the 24-bit range.
    pub const fn new(id: ConnectionId, tint: u32, position: Position, now: u64) -> Self {
        Self {
            id,
            display_name: None,
            tint: tint & MAX_TINT,
            position,
            facing: Facing::Down,
            activity_state: ActivityState::Idle,
            liveness: Liveness::Active,
            last_movement_at: now,
            last_sequence: 0,
            current_emote: None,
            emote_expires_at: 0,
            emote_cooldown_until: 0,
        }
    }

    /// Whether the participant has claimed a display name.
    pub const fn is_named(&self) -> bool {
        self.display_name.is_some()
    }

    /// Display name for log lines.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("<unnamed>")
    }
}

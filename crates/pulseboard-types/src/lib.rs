//! Shared type definitions for the PulseBoard presence service.
//!
//! This crate is the single source of truth for every type that crosses
//! the wire between the server and browser clients. Types defined here
//! flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Connection identifier newtype
//! - [`enums`] -- Facing, activity state, motion liveness, emotes
//! - [`structs`] -- The participant record and its position
//! - [`messages`] -- Inbound client events and outbound broadcasts

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

pub use enums::{ActivityState, Emote, Facing, Liveness};
pub use ids::ConnectionId;
pub use messages::{ClientEvent, MoveInput, ServerEvent, Snapshot};
pub use structs::{Participant, Position};

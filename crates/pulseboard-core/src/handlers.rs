//! Per-event mutation rules.
//!
//! Every handler looks up the sender's record first. A missing record
//! (an event that raced the disconnect) makes the handler a silent no-op,
//! and so does any validation failure. Handlers never return errors and
//! never block; the presence loop runs each one to completion.
//!
//! # Activity transitions
//!
//! | Current | Event | Next |
//! |---------|-------|------|
//! | any | `Move` with non-zero velocity | `Walking` |
//! | `Dancing` | `Move` with zero velocity | `Dancing` (unchanged) |
//! | `Idle`/`Walking` | `Move` with zero velocity | `Idle` |
//! | `Dancing` | `Dance` | `Idle` |
//! | `Idle`/`Walking` | `Dance` | `Dancing` |
//! | any | `StopDance` | `Idle` |
//!
//! Movement always wins over dancing. The cancelled dance gets no
//! notification of its own; the next snapshot shows `Walking`.

use pulseboard_types::{
    ActivityState, ClientEvent, ConnectionId, Emote, Liveness, MoveInput, ServerEvent,
};
use rand::Rng;
use tracing::{debug, info, trace};

use crate::config::PresenceConfig;
use crate::registry::SessionRegistry;

/// Register a newly accepted connection. The participant stays invisible
/// to everyone until it claims a name.
pub fn connect(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    now: u64,
    rules: &PresenceConfig,
    rng: &mut impl Rng,
) {
    let record = registry.create(id, now, rules, rng);
    info!(
        connection = %id,
        tint = record.tint,
        x = record.position.x,
        y = record.position.y,
        "Participant connected"
    );
}

/// Remove a closed connection's record and announce the departure.
///
/// The leave notification goes out even if the record was already gone
/// or never named, so observers tracking ids see a leave for every id.
pub fn disconnect(registry: &mut SessionRegistry, id: ConnectionId) -> ServerEvent {
    let removed = registry.remove(id);
    info!(
        connection = %id,
        name = removed.as_ref().map(|p| p.label()),
        "Participant left"
    );
    ServerEvent::UserLeft { id }
}

/// Dispatch one client event to its handler.
///
/// Returns the notification to broadcast, if the event produced one.
pub fn handle_event(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    event: &ClientEvent,
    now: u64,
    rules: &PresenceConfig,
) -> Option<ServerEvent> {
    match event {
        ClientEvent::SetName { name } => set_name(registry, id, name.as_deref(), rules),
        ClientEvent::Move(input) => {
            apply_move(registry, id, input, now, rules);
            None
        }
        ClientEvent::Dance { variant } => {
            toggle_dance(registry, id, variant.as_deref(), rules);
            None
        }
        ClientEvent::StopDance => {
            stop_dance(registry, id);
            None
        }
        ClientEvent::Emote { symbol } => {
            emote(registry, id, symbol, now, rules);
            None
        }
    }
}

/// Trim a requested name and cut it to `max_chars` characters. Returns
/// `None` when nothing usable is left.
pub fn clean_name(raw: Option<&str>, max_chars: usize) -> Option<String> {
    let cleaned: String = raw?.trim().chars().take(max_chars).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Claim a display name.
///
/// On success returns the join notification carrying the full record.
/// This is the only way a participant becomes visible to others.
pub fn set_name(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    name: Option<&str>,
    rules: &PresenceConfig,
) -> Option<ServerEvent> {
    let record = registry.get_mut(id)?;
    let Some(name) = clean_name(name, rules.max_name_chars) else {
        debug!(connection = %id, "Ignoring empty name");
        return None;
    };

    info!(connection = %id, name = %name, "Participant named");
    record.display_name = Some(name);
    Some(ServerEvent::UserJoined(record.clone()))
}

/// Apply a dead-reckoning movement update. Returns whether it was applied.
pub fn apply_move(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    input: &MoveInput,
    now: u64,
    rules: &PresenceConfig,
) -> bool {
    let Some(record) = registry.get_mut(id) else {
        return false;
    };
    if !input.is_finite() {
        debug!(connection = %id, "Ignoring non-finite movement");
        return false;
    }
    if rules.reject_stale_sequence
        && record.last_sequence > 0
        && input.seq <= record.last_sequence
    {
        debug!(
            connection = %id,
            seq = input.seq,
            last = record.last_sequence,
            "Ignoring stale movement"
        );
        return false;
    }

    let scale = rules.speed_units_per_second * (input.dt / 1000.0);
    record.position.x += input.vx * scale;
    record.position.y += input.vy * scale;

    if let Some(dir) = input.dir {
        record.facing = dir;
    }

    record.last_movement_at = now;
    record.liveness = Liveness::Active;
    record.last_sequence = input.seq;

    if input.is_moving() {
        record.activity_state = ActivityState::Walking;
    } else if !record.activity_state.is_dancing() {
        record.activity_state = ActivityState::Idle;
    }

    trace!(
        connection = %id,
        x = record.position.x,
        y = record.position.y,
        seq = input.seq,
        "Moved"
    );
    true
}

/// Toggle dancing. Returns whether the record exists.
pub fn toggle_dance(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    variant: Option<&str>,
    rules: &PresenceConfig,
) -> bool {
    let Some(record) = registry.get_mut(id) else {
        return false;
    };

    if record.activity_state.is_dancing() {
        record.activity_state = ActivityState::Idle;
        info!(connection = %id, name = record.label(), "Dance stopped");
    } else {
        let variant = variant
            .filter(|v| !v.is_empty())
            .unwrap_or(rules.default_dance.as_str())
            .to_owned();
        info!(connection = %id, name = record.label(), variant = %variant, "Dance started");
        record.activity_state = ActivityState::Dancing { variant };
    }
    true
}

/// Stop dancing, whatever the current state. Returns whether the record
/// exists.
pub fn stop_dance(registry: &mut SessionRegistry, id: ConnectionId) -> bool {
    let Some(record) = registry.get_mut(id) else {
        return false;
    };
    record.activity_state = ActivityState::Idle;
    debug!(connection = %id, name = record.label(), "Dance stop requested");
    true
}

/// Show an emote. Returns whether it was accepted.
///
/// Rejected while the previous emote's cooldown is running or when the
/// symbol is outside the allow-set.
pub fn emote(
    registry: &mut SessionRegistry,
    id: ConnectionId,
    symbol: &str,
    now: u64,
    rules: &PresenceConfig,
) -> bool {
    let Some(record) = registry.get_mut(id) else {
        return false;
    };
    if now < record.emote_cooldown_until {
        debug!(connection = %id, "Emote rejected: cooling down");
        return false;
    }
    let Some(emote) = Emote::from_symbol(symbol) else {
        debug!(connection = %id, symbol, "Emote rejected: not allowed");
        return false;
    };

    record.current_emote = Some(emote);
    record.emote_expires_at = now.saturating_add(rules.emote_display_ms);
    record.emote_cooldown_until = now.saturating_add(rules.emote_cooldown_ms);
    debug!(connection = %id, emote = %emote, "Emote shown");
    true
}

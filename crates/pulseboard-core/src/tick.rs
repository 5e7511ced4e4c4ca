//! The periodic tick: time-based transitions, then one snapshot.
//!
//! [`sweep`] applies the two transitions that depend only on the clock
//! (motion staleness and emote expiry). [`build_snapshot`] collects every
//! named record. [`run_tick`] runs both in order. None of this calls into
//! the event handlers, and the handlers never call into it.

use pulseboard_types::{Liveness, ServerEvent, Snapshot};

use crate::config::PresenceConfig;
use crate::registry::SessionRegistry;

/// Counts from one [`sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Records that went from motion-active to motion-idle.
    pub went_idle: u32,
    /// Emotes cleared because their display window ended.
    pub emotes_expired: u32,
}

/// Summary of one completed tick, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick number (starts at 1).
    pub tick: u64,
    /// Server time the tick ran at.
    pub now: u64,
    /// What the sweep changed.
    pub sweep: SweepOutcome,
    /// Connected participants, named or not.
    pub connected: usize,
    /// Participants included in the snapshot.
    pub visible: usize,
}

/// Apply time-based transitions to every record.
///
/// - No movement for more than `idle_after_ms` makes a record
///   motion-idle. Connection liveness is not affected.
/// - An emote whose display window has passed (`now > emote_expires_at`)
///   is cleared.
pub fn sweep(registry: &mut SessionRegistry, now: u64, rules: &PresenceConfig) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for record in registry.values_mut() {
        let quiet_for = now.saturating_sub(record.last_movement_at);
        if quiet_for > rules.idle_after_ms && record.liveness == Liveness::Active {
            record.liveness = Liveness::Idle;
            outcome.went_idle = outcome.went_idle.saturating_add(1);
        }

        if record.current_emote.is_some() && now > record.emote_expires_at {
            record.current_emote = None;
            outcome.emotes_expired = outcome.emotes_expired.saturating_add(1);
        }
    }

    outcome
}

/// Collect every named record, in registry order, into a snapshot.
pub fn build_snapshot(registry: &SessionRegistry, now: u64) -> Snapshot {
    Snapshot {
        users: registry
            .values()
            .filter(|p| p.is_named())
            .cloned()
            .collect(),
        timestamp: now,
    }
}

/// Run one tick: sweep, then snapshot.
///
/// Returns the summary and the snapshot event to broadcast.
pub fn run_tick(
    registry: &mut SessionRegistry,
    tick: u64,
    now: u64,
    rules: &PresenceConfig,
) -> (TickSummary, ServerEvent) {
    let sweep = sweep(registry, now, rules);
    let snapshot = build_snapshot(registry, now);
    let summary = TickSummary {
        tick,
        now,
        sweep,
        connected: registry.len(),
        visible: snapshot.users.len(),
    };
    (summary, ServerEvent::StateSnapshot(snapshot))
}

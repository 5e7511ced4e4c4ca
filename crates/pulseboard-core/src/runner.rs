//! The presence loop: one task that owns the registry.
//!
//! Every mutation goes through this loop. Connection tasks send
//! [`Command`]s over an `mpsc` channel; a fixed-period timer drives the
//! tick. The loop handles one command or one tick at a time, each to
//! completion, so the registry needs no lock and per-connection event
//! order is preserved.
//!
//! Broadcasts leave through a [`broadcast`] channel. Subscribers that
//! fall behind skip ahead; the next snapshot is always ground truth. The
//! loop holds the only strong sender, so every subscriber sees the
//! channel close once the loop exits.
//!
//! Ticks never overlap. If one overruns the period the next is delayed
//! rather than bunched up (`MissedTickBehavior::Delay`), so the schedule
//! drifts instead of bursting.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use pulseboard_types::{ClientEvent, ConnectionId, ServerEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::config::PresenceConfig;
use crate::handlers;
use crate::registry::SessionRegistry;
use crate::tick::{self, TickSummary};

/// What a connection task asks the loop to do.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// The connection was accepted.
    Connect,
    /// The connection delivered a decoded event.
    Event(ClientEvent),
    /// The connection closed.
    Disconnect,
}

/// A command tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Originating connection.
    pub connection: ConnectionId,
    /// What to do.
    pub kind: CommandKind,
}

impl Command {
    /// A new connection was accepted.
    pub const fn connect(connection: ConnectionId) -> Self {
        Self {
            connection,
            kind: CommandKind::Connect,
        }
    }

    /// A connection delivered an event.
    pub const fn event(connection: ConnectionId, event: ClientEvent) -> Self {
        Self {
            connection,
            kind: CommandKind::Event(event),
        }
    }

    /// A connection closed.
    pub const fn disconnect(connection: ConnectionId) -> Self {
        Self {
            connection,
            kind: CommandKind::Disconnect,
        }
    }
}

/// The presence loop is no longer accepting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("presence loop has stopped")]
pub struct LoopClosed;

/// Cloneable handle used by connection tasks to reach the loop.
#[derive(Clone)]
pub struct PresenceHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::WeakSender<ServerEvent>,
}

impl fmt::Debug for PresenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceHandle")
            .field("commands_closed", &self.commands.is_closed())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl PresenceHandle {
    /// Queue a command for the loop.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] if the loop has exited.
    pub async fn send(&self, command: Command) -> Result<(), LoopClosed> {
        self.commands.send(command).await.map_err(|_closed| LoopClosed)
    }

    /// Subscribe to outbound broadcasts.
    ///
    /// Once the loop has exited the returned receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.upgrade().map_or_else(
            // The sender drops at the end of this expression.
            || broadcast::channel(1).1,
            |events| events.subscribe(),
        )
    }

    /// Number of live broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events
            .upgrade()
            .map_or(0, |events| events.receiver_count())
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEndReason {
    /// The shutdown future resolved.
    Shutdown,
    /// Every command sender was dropped.
    CommandsClosed,
}

/// Result of a loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopResult {
    /// Why the loop stopped.
    pub end_reason: LoopEndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Commands handled.
    pub commands_handled: u64,
}

/// Owner of the session registry.
pub struct PresenceLoop<C> {
    registry: SessionRegistry,
    rules: PresenceConfig,
    clock: C,
    rng: StdRng,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<ServerEvent>,
    tick: u64,
    commands_handled: u64,
}

impl<C: Clock> PresenceLoop<C> {
    /// Create a loop and the handle connection tasks use to reach it.
    pub fn new(rules: PresenceConfig, clock: C) -> (Self, PresenceHandle) {
        let (command_tx, command_rx) = mpsc::channel(rules.command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(rules.broadcast_capacity.max(1));
        let rng = rules
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let handle = PresenceHandle {
            commands: command_tx,
            events: event_tx.downgrade(),
        };
        let presence = Self {
            registry: SessionRegistry::new(),
            rules,
            clock,
            rng,
            commands: command_rx,
            events: event_tx,
            tick: 0,
            commands_handled: 0,
        };
        (presence, handle)
    }

    /// Read-only view of the registry.
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handle one command to completion and broadcast its notification,
    /// if any.
    pub fn handle_command(&mut self, command: Command) {
        self.commands_handled = self.commands_handled.saturating_add(1);
        let now = self.clock.now_ms();
        let id = command.connection;

        let notification = match command.kind {
            CommandKind::Connect => {
                handlers::connect(&mut self.registry, id, now, &self.rules, &mut self.rng);
                None
            }
            CommandKind::Event(event) => {
                trace!(connection = %id, event = event.name(), "Client event");
                handlers::handle_event(&mut self.registry, id, &event, now, &self.rules)
            }
            CommandKind::Disconnect => Some(handlers::disconnect(&mut self.registry, id)),
        };

        if let Some(event) = notification {
            let receivers = self.publish(event);
            trace!(connection = %id, receivers, "Notification sent");
        }
    }

    /// Run one tick (sweep, then snapshot) and broadcast the snapshot.
    pub fn run_tick(&mut self) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let now = self.clock.now_ms();
        let (summary, snapshot) = tick::run_tick(&mut self.registry, self.tick, now, &self.rules);
        let receivers = self.publish(snapshot);

        if summary.sweep.went_idle > 0 || summary.sweep.emotes_expired > 0 {
            debug!(
                tick = summary.tick,
                went_idle = summary.sweep.went_idle,
                emotes_expired = summary.sweep.emotes_expired,
                "Sweep applied transitions"
            );
        }
        trace!(
            tick = summary.tick,
            connected = summary.connected,
            visible = summary.visible,
            receivers,
            "Snapshot broadcast"
        );
        summary
    }

    /// Drive the loop until `shutdown` resolves or every command sender is
    /// dropped.
    pub async fn run<F>(mut self, shutdown: F) -> LoopResult
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_millis(self.rules.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            tick_interval_ms = self.rules.tick_interval_ms,
            idle_after_ms = self.rules.idle_after_ms,
            "Presence loop starting"
        );

        let end_reason = loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break LoopEndReason::Shutdown,
                _ = interval.tick() => {
                    self.run_tick();
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break LoopEndReason::CommandsClosed,
                },
            }
        };

        let result = LoopResult {
            end_reason,
            total_ticks: self.tick,
            commands_handled: self.commands_handled,
        };
        info!(
            reason = ?result.end_reason,
            total_ticks = result.total_ticks,
            commands_handled = result.commands_handled,
            connected = self.registry.len(),
            "Presence loop stopped"
        );
        result
    }

    /// Broadcast to every subscriber. Zero subscribers is not an error.
    fn publish(&self, event: ServerEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }
}

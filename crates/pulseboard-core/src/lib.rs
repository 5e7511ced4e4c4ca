//! Presence state core for PulseBoard.
//!
//! This crate owns every participant record and every rule that mutates
//! one. Nothing here touches the network: the gateway feeds commands in
//! and relays broadcasts out.
//!
//! # Modules
//!
//! - [`clock`] -- Millisecond time source, real and manual.
//! - [`config`] -- Configuration loading from `pulseboard-config.yaml`.
//! - [`registry`] -- [`SessionRegistry`], the owner of record lifetimes.
//! - [`handlers`] -- Per-event mutation rules (name, move, dance, emote).
//! - [`tick`] -- Periodic sweep (motion staleness, emote expiry) and
//!   snapshot construction.
//! - [`runner`] -- [`PresenceLoop`], the single task that owns the
//!   registry and serializes commands and ticks.
//!
//! [`SessionRegistry`]: registry::SessionRegistry
//! [`PresenceLoop`]: runner::PresenceLoop

pub mod clock;
pub mod config;
pub mod handlers;
pub mod registry;
pub mod runner;
pub mod tick;

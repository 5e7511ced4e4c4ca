//! Configuration loading and typed config structures for PulseBoard.
//!
//! Configuration lives in an optional `pulseboard-config.yaml`. Every
//! field has a default, so an empty or missing file yields a working
//! server. The listening port can always be overridden with the `PORT`
//! environment variable.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Environment variable that overrides [`ListenConfig::port`].
pub const PORT_ENV: &str = "PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its valid range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `pulseboard-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Where the HTTP/WebSocket server listens.
    pub server: ListenConfig,

    /// Presence rules and timing.
    pub presence: PresenceConfig,
}

impl PulseConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        config.presence.validate()?;
        Ok(config)
    }
}

/// Listening address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Host address to bind (e.g. `0.0.0.0`).
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
        }
    }
}

impl ListenConfig {
    /// Apply the `PORT` environment override.
    pub fn apply_env_overrides(&mut self) {
        self.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());
    }

    /// Apply a raw port override. Unparseable values are logged and
    /// ignored so a bad environment never prevents startup.
    pub fn apply_port_override(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.port = port,
            Err(e) => warn!(value = raw, error = %e, "ignoring invalid {PORT_ENV}"),
        }
    }
}

/// Presence rules and timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Period of the tick loop (sweep + snapshot), in milliseconds.
    pub tick_interval_ms: u64,

    /// A participant with no movement for longer than this becomes
    /// motion-idle on the next tick.
    pub idle_after_ms: u64,

    /// Movement speed for a unit velocity, in position units per second.
    pub speed_units_per_second: f64,

    /// How long an accepted emote stays on display.
    pub emote_display_ms: u64,

    /// Minimum time between two accepted emotes from one participant.
    pub emote_cooldown_ms: u64,

    /// Display names are truncated to this many characters.
    pub max_name_chars: usize,

    /// Dance variant used when a client does not name one.
    pub default_dance: String,

    /// Lower bound of the spawn square on both axes.
    pub spawn_min: f64,

    /// Upper bound (exclusive) of the spawn square on both axes.
    pub spawn_max: f64,

    /// Seed for spawn positions and tints. Random when unset.
    pub seed: Option<u64>,

    /// Capacity of the command channel into the presence loop.
    pub command_buffer: usize,

    /// Capacity of the outbound broadcast channel. Subscribers that fall
    /// further behind skip ahead.
    pub broadcast_capacity: usize,

    /// Drop movement events whose sequence number is not greater than
    /// the last accepted one.
    pub reject_stale_sequence: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            idle_after_ms: 100,
            speed_units_per_second: 120.0,
            emote_display_ms: 2_000,
            emote_cooldown_ms: 1_000,
            max_name_chars: 16,
            default_dance: String::from("dance1"),
            spawn_min: 200.0,
            spawn_max: 500.0,
            seed: None,
            command_buffer: 1_024,
            broadcast_capacity: 256,
            reject_stale_sequence: false,
        }
    }
}

impl PresenceConfig {
    /// Check values that would break the loop or the channels.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be at least 1"));
        }
        if self.max_name_chars == 0 {
            return Err(invalid("max_name_chars must be at least 1"));
        }
        if self.command_buffer == 0 || self.broadcast_capacity == 0 {
            return Err(invalid("channel capacities must be at least 1"));
        }
        if !self.speed_units_per_second.is_finite() {
            return Err(invalid("speed_units_per_second must be finite"));
        }
        if !(self.spawn_min.is_finite() && self.spawn_max.is_finite())
            || self.spawn_min > self.spawn_max
        {
            return Err(invalid("spawn_min must be finite and not above spawn_max"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PulseConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.presence.tick_interval_ms, 50);
        assert_eq!(config.presence.idle_after_ms, 100);
        assert_eq!(config.presence.max_name_chars, 16);
        assert!(!config.presence.reject_stale_sequence);
        assert!(config.presence.validate().is_ok());
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
presence:
  tick_interval_ms: 100
  default_dance: shuffle
  seed: 7
";
        let config = PulseConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let presence = config.map(|c| c.presence).unwrap_or_default();
        assert_eq!(presence.tick_interval_ms, 100);
        assert_eq!(presence.default_dance, "shuffle");
        assert_eq!(presence.seed, Some(7));
        assert_eq!(presence.emote_cooldown_ms, 1_000);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(PulseConfig::parse("").is_ok());
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let result = PulseConfig::parse("presence:\n  tick_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn inverted_spawn_region_is_rejected() {
        let result = PulseConfig::parse("presence:\n  spawn_min: 10.0\n  spawn_max: 5.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = PulseConfig::parse("presence: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn port_override() {
        let mut listen = ListenConfig::default();
        listen.apply_port_override(Some("8080"));
        assert_eq!(listen.port, 8080);

        listen.apply_port_override(Some("not-a-port"));
        assert_eq!(listen.port, 8080);

        listen.apply_port_override(None);
        assert_eq!(listen.port, 8080);
    }
}

//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Static hazard placed when the world starts
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetConfig {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Damage per overlapping tick; zero makes it scenery
    pub damage: i32,
}

impl FromStr for PlanetConfig {
    type Err = ();

    /// `x,y,size,damage`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, size, damage] = parts.as_slice() else {
            return Err(());
        };

        let planet = Self {
            x: x.parse().map_err(|_| ())?,
            y: y.parse().map_err(|_| ())?,
            size: size.parse().map_err(|_| ())?,
            damage: damage.parse().map_err(|_| ())?,
        };
        if planet.size > 0.0 && planet.damage >= 0 {
            Ok(planet)
        } else {
            Err(())
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Nominal simulation rate in Hz
    pub tick_rate: f32,
    /// Rate used with no clients, and the floor when overloaded
    pub idle_tick_rate: f32,
    /// Rate change per tick while adapting
    pub tick_rate_step: f32,

    /// Side of the square wrap-around arena; unbounded when absent
    pub arena_size: Option<f32>,
    pub planet: Option<PlanetConfig>,

    /// Per-connection outbound queue depth
    pub outbox_capacity: usize,
    /// Inbound messages per second per connection
    pub input_rate_limit: u32,

    /// Allowed browser origins for CORS; empty allows any
    pub client_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 34002)),
            log_level: "info".to_string(),
            tick_rate: 30.0,
            idle_tick_rate: 2.0,
            tick_rate_step: 0.5,
            arena_size: None,
            planet: None,
            outbox_capacity: 64,
            input_rate_limit: 60,
            client_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port.trim())
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.trim().parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let tick_rate = parse_var(&lookup, "TICK_RATE", defaults.tick_rate)?;
        let idle_tick_rate = parse_var(&lookup, "IDLE_TICK_RATE", defaults.idle_tick_rate)?;
        let tick_rate_step = parse_var(&lookup, "TICK_RATE_STEP", defaults.tick_rate_step)?;
        require_positive("TICK_RATE", tick_rate)?;
        require_positive("IDLE_TICK_RATE", idle_tick_rate)?;
        require_positive("TICK_RATE_STEP", tick_rate_step)?;
        if idle_tick_rate > tick_rate {
            return Err(ConfigError::Invalid {
                var: "IDLE_TICK_RATE",
                value: idle_tick_rate.to_string(),
            });
        }

        let arena_size = parse_optional(&lookup, "ARENA_SIZE")?;
        if let Some(size) = arena_size {
            require_positive("ARENA_SIZE", size)?;
        }

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            tick_rate,
            idle_tick_rate,
            tick_rate_step,
            arena_size,
            planet: parse_optional(&lookup, "PLANET")?,
            outbox_capacity: parse_var(&lookup, "OUTBOX_CAPACITY", defaults.outbox_capacity)?.max(1),
            input_rate_limit: parse_var(&lookup, "INPUT_RATE_LIMIT", defaults.input_rate_limit)?,
            client_origins: lookup("CLIENT_ORIGIN")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty() && *s != "*")
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_optional(lookup, var)?.unwrap_or(default))
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(None),
    }
}

fn require_positive(var: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,
}

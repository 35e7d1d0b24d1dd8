//! Server configuration from environment variables.

use std::net::SocketAddr;

/// 6772 spells "CH" in ascii, for charades
const DEFAULT_PORT: u16 = 6772;
const DEFAULT_ROOM_TTL_MINUTES: i64 = 180;
const DEFAULT_FINISHED_ROOM_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Minutes of inactivity before an unfinished room is reaped.
    pub room_ttl_minutes: i64,
    /// Minutes a finished game stays readable.
    pub finished_room_ttl_minutes: i64,
}

impl ServerConfig {
    /// Load server config from environment variables. Unset or unparsable
    /// values fall back to defaults, with a warning for the latter.
    pub fn from_env() -> Self {
        let port = read_env("PORT").unwrap_or(DEFAULT_PORT);
        let room_ttl_minutes = read_env("ROOM_TTL_MINUTES").unwrap_or(DEFAULT_ROOM_TTL_MINUTES);
        let finished_room_ttl_minutes =
            read_env("FINISHED_ROOM_TTL_MINUTES").unwrap_or(DEFAULT_FINISHED_ROOM_TTL_MINUTES);

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            room_ttl_minutes,
            finished_room_ttl_minutes,
        }
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring unparsable {name}={raw}");
            None
        }
    }
}

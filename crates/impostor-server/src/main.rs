//! Impostor room server entry point.

use std::time::Duration;

use impostor::prelude::*;
use tracing_subscriber::EnvFilter;

/// A startup setting that could not be used.
#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Process settings read from the environment.
#[derive(Debug)]
struct Settings {
    bind_addr: String,
    rooms: RoomConfig,
}

impl Settings {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_var(&lookup, "PORT", "a port number")?.unwrap_or(3000);

        let mut rooms = RoomConfig::default();
        if let Some(min) = parse_var::<usize>(&lookup, "IMPOSTOR_MIN_PLAYERS", "at least 2")? {
            if min < 2 {
                return Err(ConfigError::Invalid {
                    name: "IMPOSTOR_MIN_PLAYERS",
                    value: min.to_string(),
                    expected: "at least 2",
                });
            }
            rooms.min_players = min;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "IMPOSTOR_ROOM_TTL_SECS", "whole seconds")? {
            rooms.idle_ttl = Duration::from_secs(secs);
        }

        Ok(Self {
            bind_addr: format!("{host}:{port}"),
            rooms,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected,
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(
        bind = %settings.bind_addr,
        min_players = settings.rooms.min_players,
        idle_ttl_secs = settings.rooms.idle_ttl.as_secs(),
        "starting impostor server"
    );

    let server = ImpostorServer::builder()
        .bind(&settings.bind_addr)
        .room_config(settings.rooms)
        .build(NoVerifier)
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_from_lookup_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:3000");
        assert_eq!(s.rooms.min_players, 3);
        assert_eq!(s.rooms.idle_ttl, Duration::from_secs(2 * 60 * 60));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let s = settings(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("IMPOSTOR_MIN_PLAYERS", "4"),
            ("IMPOSTOR_ROOM_TTL_SECS", " 600 "),
        ])
        .unwrap();
        assert_eq!(s.bind_addr, "127.0.0.1:8080");
        assert_eq!(s.rooms.min_players, 4);
        assert_eq!(s.rooms.idle_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        let err = settings(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn test_from_lookup_rejects_tiny_rooms() {
        assert!(settings(&[("IMPOSTOR_MIN_PLAYERS", "1")]).is_err());
        assert!(settings(&[("IMPOSTOR_MIN_PLAYERS", "-3")]).is_err());
    }

    #[test]
    fn test_from_lookup_rejects_bad_ttl() {
        let err = settings(&[("IMPOSTOR_ROOM_TTL_SECS", "2h")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "IMPOSTOR_ROOM_TTL_SECS", .. }));
    }
}

//! Room configuration and input clean-up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::code::DEFAULT_ALPHABET;

/// Settings shared by every room of a registry.
///
/// Override individual fields with struct update syntax:
///
/// ```rust
/// use impostor_room::RoomConfig;
///
/// let config = RoomConfig { min_players: 4, ..RoomConfig::default() };
/// assert_eq!(config.max_name_chars, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players (host excluded) required before the host may start.
    pub min_players: usize,

    /// A room with no intents for this long is closed by the reaper.
    pub idle_ttl: Duration,

    /// How often the reaper sweeps.
    pub sweep_interval: Duration,

    /// Display names are trimmed, then cut to this many characters.
    pub max_name_chars: usize,

    /// Secret words are trimmed, then cut to this many characters.
    pub max_word_chars: usize,

    /// Length of generated room codes.
    pub code_length: usize,

    /// Characters room codes and player tokens are drawn from.
    pub code_alphabet: String,

    /// Length of per-room player tokens.
    pub token_length: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            idle_ttl: Duration::from_secs(2 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
            max_name_chars: 20,
            max_word_chars: 30,
            code_length: 6,
            code_alphabet: DEFAULT_ALPHABET.to_string(),
            token_length: 4,
        }
    }
}

/// A [`RoomConfig`] no room could run under.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },

    #[error("code alphabet may only contain ASCII letters and digits, found {0:?}")]
    BadAlphabet(char),
}

impl RoomConfig {
    /// Checks the limits the state machine relies on: a round needs an
    /// impostor and someone to vote, and codes and tokens need at least one
    /// character.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minimums = [
            ("min_players", 2, self.min_players),
            ("code_length", 1, self.code_length),
            ("token_length", 1, self.token_length),
            ("max_name_chars", 1, self.max_name_chars),
            ("max_word_chars", 1, self.max_word_chars),
        ];
        for (field, min, value) in minimums {
            if value < min {
                return Err(ConfigError::TooSmall { field, min, value });
            }
        }
        if let Some(c) = self
            .code_alphabet
            .chars()
            .find(|c| !c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::BadAlphabet(c));
        }
        Ok(())
    }

    /// Trims and truncates a display name. May return an empty string.
    pub fn clean_name(&self, raw: &str) -> String {
        clean(raw, self.max_name_chars)
    }

    /// Trims and truncates a secret word. May return an empty string.
    pub fn clean_word(&self, raw: &str) -> String {
        clean(raw, self.max_word_chars)
    }
}

/// Truncates on characters, not bytes, so multi-byte names never split.
fn clean(raw: &str, max_chars: usize) -> String {
    raw.trim().chars().take(max_chars).collect::<String>().trim_end().to_string()
}

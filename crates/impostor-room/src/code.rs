//! Room code and player token generation.

use impostor_protocol::{PlayerToken, RoomCode};
use rand::Rng;

use crate::RoomConfig;

/// Uppercase letters and digits minus the look-alikes `I`, `O`, `0`, `1`.
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Draws attempted before a code space is treated as exhausted.
pub const MAX_DRAWS: usize = 256;

/// Draws `len` characters uniformly from `alphabet`.
///
/// An empty alphabet falls back to [`DEFAULT_ALPHABET`].
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, alphabet: &str, len: usize) -> String {
    let alphabet = if alphabet.is_empty() {
        DEFAULT_ALPHABET
    } else {
        alphabet
    };
    let chars: Vec<char> = alphabet.chars().collect();
    (0..len)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

/// Draws one room code from the configured alphabet.
///
/// Codes are uppercased so they match what [`RoomCode::parse`] produces
/// from user input.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, config: &RoomConfig) -> RoomCode {
    let raw = random_string(rng, &config.code_alphabet, config.code_length);
    RoomCode::from_canonical(raw.to_uppercase())
}

/// Generates a room code no live room is using.
///
/// Retries while `is_taken` says the candidate is in use, up to
/// [`MAX_DRAWS`] times. `None` means the code space is effectively full.
pub fn unique_room_code<R, F>(rng: &mut R, config: &RoomConfig, is_taken: F) -> Option<RoomCode>
where
    R: Rng + ?Sized,
    F: Fn(&RoomCode) -> bool,
{
    for _ in 0..MAX_DRAWS {
        let code = generate_code(rng, config);
        if !is_taken(&code) {
            return Some(code);
        }
        tracing::debug!(%code, "room code collision, retrying");
    }
    None
}

/// Generates a player token unused within one room, or `None` after
/// [`MAX_DRAWS`] collisions.
pub fn unique_token<R, F>(rng: &mut R, config: &RoomConfig, is_taken: F) -> Option<PlayerToken>
where
    R: Rng + ?Sized,
    F: Fn(&PlayerToken) -> bool,
{
    (0..MAX_DRAWS)
        .map(|_| PlayerToken::new(random_string(rng, &config.code_alphabet, config.token_length)))
        .find(|token| !is_taken(token))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_random_string_uses_only_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = random_string(&mut rng, DEFAULT_ALPHABET, 200);
        assert_eq!(s.chars().count(), 200);
        assert!(s.chars().all(|c| DEFAULT_ALPHABET.contains(c)));
        assert!(!s.contains(['I', 'O', '0', '1']));
    }

    #[test]
    fn test_random_string_empty_alphabet_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = random_string(&mut rng, "", 6);
        assert!(s.chars().all(|c| DEFAULT_ALPHABET.contains(c)));
    }

    #[test]
    fn test_unique_room_code_has_configured_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let code = unique_room_code(&mut rng, &RoomConfig::default(), |_| false).unwrap();
        assert_eq!(code.as_str().len(), 6);
        assert_eq!(code.as_str(), code.as_str().to_uppercase());
    }

    #[test]
    fn test_generate_code_matches_parsed_input() {
        let config = RoomConfig {
            code_alphabet: "abc".to_string(),
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let code = generate_code(&mut rng, &config);
        assert_eq!(RoomCode::parse(&code.as_str().to_lowercase()), Some(code));
    }

    #[test]
    fn test_unique_room_code_skips_taken_codes() {
        // Two possible codes, one of them taken.
        let config = RoomConfig {
            code_alphabet: "AB".to_string(),
            code_length: 1,
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let code = unique_room_code(&mut rng, &config, |c| c.as_str() == "A").unwrap();
        assert_eq!(code.as_str(), "B");
    }

    #[test]
    fn test_unique_room_code_gives_up_when_space_is_full() {
        let config = RoomConfig {
            code_alphabet: "AB".to_string(),
            code_length: 1,
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(unique_room_code(&mut rng, &config, |_| true), None);
    }

    #[test]
    fn test_unique_token_avoids_existing_tokens() {
        let config = RoomConfig {
            code_alphabet: "XYZ".to_string(),
            token_length: 1,
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let taken: HashSet<PlayerToken> =
            [PlayerToken::new("X"), PlayerToken::new("Y")].into();
        let token = unique_token(&mut rng, &config, |t| taken.contains(t));
        assert_eq!(token, Some(PlayerToken::new("Z")));

        let taken: HashSet<PlayerToken> = [
            PlayerToken::new("X"),
            PlayerToken::new("Y"),
            PlayerToken::new("Z"),
        ]
        .into();
        assert_eq!(unique_token(&mut rng, &config, |t| taken.contains(t)), None);
    }
}

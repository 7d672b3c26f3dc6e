//! Vote counting and ballot resolution.

use std::collections::BTreeMap;

use impostor_protocol::PlayerToken;

/// Vote counts, recomputed from the current ballot every time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<PlayerToken, usize>,
    total_votes: usize,
}

/// What a closed ballot decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The impostor is among the most-voted players.
    pub caught: bool,
    pub max_votes: usize,
    /// Every player tied at `max_votes`. Empty when nobody voted.
    pub top_tokens: Vec<PlayerToken>,
}

impl Tally {
    /// Counts `votes` against `players`.
    ///
    /// Every player gets an entry, zero included. Votes for tokens not
    /// in `players` are ignored.
    pub fn count<'a>(
        players: impl IntoIterator<Item = &'a PlayerToken>,
        votes: impl IntoIterator<Item = &'a PlayerToken>,
    ) -> Self {
        let mut counts: BTreeMap<PlayerToken, usize> =
            players.into_iter().map(|t| (t.clone(), 0)).collect();
        let mut total_votes = 0;
        for target in votes {
            if let Some(n) = counts.get_mut(target) {
                *n += 1;
                total_votes += 1;
            }
        }
        Self {
            counts,
            total_votes,
        }
    }

    pub fn counts(&self) -> &BTreeMap<PlayerToken, usize> {
        &self.counts
    }

    pub fn total_votes(&self) -> usize {
        self.total_votes
    }

    /// Highest count, 0 for an empty ballot.
    pub fn max_votes(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// All players at the highest count, or none if nobody voted.
    pub fn top_tokens(&self) -> Vec<PlayerToken> {
        let max = self.max_votes();
        if max == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .filter(|(_, n)| **n == max)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Decides the ballot. A tie that includes the impostor catches them.
    pub fn resolve(&self, impostor: &PlayerToken) -> Resolution {
        let top_tokens = self.top_tokens();
        Resolution {
            caught: top_tokens.contains(impostor),
            max_votes: self.max_votes(),
            top_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(names: &[&str]) -> Vec<PlayerToken> {
        names.iter().map(|n| PlayerToken::new(*n)).collect()
    }

    #[test]
    fn test_count_includes_zero_entries() {
        let players = tokens(&["A", "B", "C"]);
        let tally = Tally::count(&players, &tokens(&["B"]));
        assert_eq!(tally.counts()[&PlayerToken::new("A")], 0);
        assert_eq!(tally.counts()[&PlayerToken::new("B")], 1);
        assert_eq!(tally.counts().len(), 3);
        assert_eq!(tally.total_votes(), 1);
    }

    #[test]
    fn test_count_ignores_absent_targets() {
        let players = tokens(&["A", "B"]);
        let tally = Tally::count(&players, &tokens(&["GONE", "A"]));
        assert_eq!(tally.total_votes(), 1);
    }

    #[test]
    fn test_resolve_single_leader() {
        let players = tokens(&["A", "B", "C"]);
        let tally = Tally::count(&players, &tokens(&["B", "B", "A"]));
        let res = tally.resolve(&PlayerToken::new("B"));
        assert!(res.caught);
        assert_eq!(res.max_votes, 2);
        assert_eq!(res.top_tokens, tokens(&["B"]));
    }

    #[test]
    fn test_resolve_tie_including_impostor_catches() {
        let players = tokens(&["A", "B", "C", "D"]);
        let tally = Tally::count(&players, &tokens(&["A", "B", "A", "B"]));
        let res = tally.resolve(&PlayerToken::new("B"));
        assert!(res.caught);
        assert_eq!(res.top_tokens, tokens(&["A", "B"]));
    }

    #[test]
    fn test_resolve_empty_ballot_is_not_caught() {
        let players = tokens(&["A", "B", "C"]);
        let tally = Tally::count(&players, std::iter::empty());
        let res = tally.resolve(&PlayerToken::new("A"));
        assert!(!res.caught);
        assert_eq!(res.max_votes, 0);
        assert!(res.top_tokens.is_empty());
    }

    #[test]
    fn test_resolve_impostor_escapes() {
        let players = tokens(&["A", "B", "C"]);
        let tally = Tally::count(&players, &tokens(&["C", "C", "A"]));
        assert!(!tally.resolve(&PlayerToken::new("A")).caught);
    }
}

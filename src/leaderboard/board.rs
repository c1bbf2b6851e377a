use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{cmp::Reverse, ops::Deref};

use super::entry::ScoreEntry;

type Entries = Vec<ScoreEntry>;

/// Top scores, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard(Entries);

impl Leaderboard {
    pub fn new() -> Leaderboard {
        Leaderboard(Entries::new())
    }

    /// Insert `entry` and keep the best `max_entries`.
    ///
    /// The sort is stable: a new entry ranks below existing entries with the
    /// same score, and is dropped when it does not make the cut.
    pub fn merge(self, entry: ScoreEntry, max_entries: usize) -> Leaderboard {
        Leaderboard(
            self.0
                .into_iter()
                .chain(std::iter::once(entry))
                .sorted_by_key(|e| Reverse(e.score))
                .take(max_entries)
                .collect(),
        )
    }
}

impl From<Entries> for Leaderboard {
    fn from(entries: Entries) -> Self {
        Leaderboard(entries)
    }
}

impl Deref for Leaderboard {
    type Target = Entries;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted_desc(board: &Leaderboard) -> bool {
        board.iter().tuple_windows().all(|(a, b)| a.score >= b.score)
    }

    fn entry(name: &str, score: u64) -> ScoreEntry {
        ScoreEntry {
            name: name.to_string(),
            score,
        }
    }

    fn full_board() -> Leaderboard {
        (1..=10)
            .rev()
            .map(|i| entry(&format!("P{i}"), i * 100))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_merge_into_empty() {
        let board = Leaderboard::new().merge(entry("AAA", 100), 10);
        assert_eq!(*board, vec![entry("AAA", 100)]);
    }

    #[test]
    fn test_merge_keeps_descending_order() {
        let board = Leaderboard::new()
            .merge(entry("LOW", 5), 10)
            .merge(entry("HIGH", 50), 10)
            .merge(entry("MID", 20), 10);

        let names = board.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["HIGH", "MID", "LOW"]);
        assert!(is_sorted_desc(&board));
    }

    #[test]
    fn test_merge_ties_rank_new_entry_last() {
        let board = Leaderboard::new()
            .merge(entry("FIRST", 10), 10)
            .merge(entry("SECOND", 10), 10)
            .merge(entry("THIRD", 10), 10);

        let names = board.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn test_merge_truncates() {
        let board = full_board().merge(entry("NEW", 550), 10);

        assert_eq!(board.len(), 10);
        assert_eq!(board[5], entry("NEW", 550));
        assert!(board.iter().all(|e| e.name != "P1"));
    }

    #[test]
    fn test_low_score_does_not_make_the_cut() {
        let before = full_board();
        let after = before.clone().merge(entry("LOSER", 1), 10);
        assert_eq!(before, after);
    }

    #[test]
    fn test_tie_with_last_place_is_dropped() {
        let before = full_board();
        let after = before.clone().merge(entry("TIE", 100), 10);
        assert_eq!(before, after);
    }

    #[test]
    fn test_merge_trims_oversized_stored_board() {
        let oversized = (0..15).map(|i| entry("X", i)).collect::<Vec<_>>();
        let board = Leaderboard::from(oversized).merge(entry("Y", 7), 10);
        assert_eq!(board.len(), 10);
        assert!(is_sorted_desc(&board));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let board = Leaderboard::new().merge(entry("AAA", 100), 10);
        assert_eq!(
            serde_json::to_string(&board).unwrap(),
            r#"[{"name":"AAA","score":100}]"#
        );
        let parsed: Leaderboard = serde_json::from_str("[]").unwrap();
        assert!(parsed.is_empty());
    }
}

use std::cmp::Ordering;

use arena_types::{GameType, LeaderboardEntry, SortOrder};

/// Leaderboards are capped to the top ten entries.
pub const LEADERBOARD_LIMIT: usize = 10;

/// Order the entries for display and cut to the top ten. Direction
/// comes from the game type: timing scores rank smallest-error
/// first, fast-hand scores rank most-clicks first.
pub fn rank(game_type: GameType, mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| compare_scores(game_type, a.score, b.score));
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}

fn compare_scores(game_type: GameType, a: f64, b: f64) -> Ordering {
    let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    match game_type.sort_order() {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

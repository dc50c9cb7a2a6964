//! Turning a PGN collection into per-position tagging jobs.

use chess::{format_uci_move, replay_game, PgnGame};
use cozy_chess::{Board, Color, Move};
use serde::{Deserialize, Serialize};

/// Name used when a game has no usable player tag.
pub const UNKNOWN_PLAYER: &str = "unknown";

/// One move to tag.
#[derive(Debug, Clone)]
pub struct PositionJob {
    /// Zero-based index of the game in the input file.
    pub game: usize,
    pub ply: u32,
    /// The player who made `played`.
    pub player: String,
    pub board: Board,
    pub played: String,
    pub previous_move: Option<Move>,
}

/// A game that could not be replayed; none of its positions are tagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameFailure {
    pub game: usize,
    pub reason: String,
}

/// Which positions of each game to keep.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Skip every position whose full-move number is at most this.
    pub skip_opening: u16,
    /// Only keep moves made by this player (case-insensitive).
    pub player: Option<String>,
}

impl JobFilter {
    fn keeps(&self, board: &Board, player: &str) -> bool {
        if board.fullmove_number() <= self.skip_opening {
            return false;
        }
        match &self.player {
            Some(wanted) => wanted.eq_ignore_ascii_case(player),
            None => true,
        }
    }
}

fn player_name(game: &PgnGame, color: Color) -> String {
    let tag = match color {
        Color::White => "White",
        Color::Black => "Black",
    };
    match game.tag(tag).map(str::trim) {
        Some(name) if !name.is_empty() && name != "?" => name.to_string(),
        _ => UNKNOWN_PLAYER.to_string(),
    }
}

/// Replay every game and emit a job for each kept position. Games with an illegal
/// move are reported whole and contribute no jobs.
pub fn collect_jobs(games: &[PgnGame], filter: &JobFilter) -> (Vec<PositionJob>, Vec<GameFailure>) {
    let mut jobs = Vec::new();
    let mut failures = Vec::new();

    for (index, game) in games.iter().enumerate() {
        let plies = match replay_game(game) {
            Ok(plies) => plies,
            Err(e) => {
                tracing::warn!(game = index, "Skipping game: {}", e);
                failures.push(GameFailure {
                    game: index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for record in plies {
            let player = player_name(game, record.mover);
            if !filter.keeps(&record.board_before, &player) {
                continue;
            }
            jobs.push(PositionJob {
                game: index,
                ply: record.ply,
                player,
                played: format_uci_move(record.mv),
                board: record.board_before,
                previous_move: record.previous_move,
            });
        }
    }

    (jobs, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::parse_pgn_collection;

    const TWO_GAMES: &str = r#"[Event "Club"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0

[Event "Club"]
[White "Bob"]
[Black "?"]
[Result "*"]

1. d4 d5 2. Qxd5 *
"#;

    fn games() -> Vec<PgnGame> {
        parse_pgn_collection(TWO_GAMES).unwrap()
    }

    #[test]
    fn every_ply_becomes_a_job() {
        let (jobs, failures) = collect_jobs(&games()[..1], &JobFilter::default());
        assert!(failures.is_empty());
        assert_eq!(jobs.len(), 6);
        assert_eq!(jobs[0].played, "e2e4");
        assert_eq!(jobs[0].player, "Alice");
        assert!(jobs[0].previous_move.is_none());
        assert_eq!(jobs[1].player, "Bob");
        assert_eq!(jobs[1].previous_move.map(format_uci_move).as_deref(), Some("e2e4"));
    }

    #[test]
    fn skip_opening_drops_early_move_numbers() {
        let filter = JobFilter {
            skip_opening: 2,
            ..JobFilter::default()
        };
        let (jobs, _) = collect_jobs(&games()[..1], &filter);
        let plies: Vec<u32> = jobs.iter().map(|j| j.ply).collect();
        assert_eq!(plies, vec![5, 6]);
    }

    #[test]
    fn player_filter_is_case_insensitive() {
        let filter = JobFilter {
            player: Some("bob".into()),
            ..JobFilter::default()
        };
        let (jobs, _) = collect_jobs(&games()[..1], &filter);
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.player == "Bob"));
    }

    #[test]
    fn illegal_game_is_reported_and_skipped() {
        let (jobs, failures) = collect_jobs(&games(), &JobFilter::default());
        assert_eq!(jobs.len(), 6);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].game, 1);
    }

    #[test]
    fn missing_player_tag_is_unknown() {
        let mut game = games().remove(1);
        game.moves.truncate(2);
        let (jobs, _) = collect_jobs(&[game], &JobFilter::default());
        assert_eq!(jobs[1].player, UNKNOWN_PLAYER);
    }
}

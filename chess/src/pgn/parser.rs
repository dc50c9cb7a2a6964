use std::collections::HashMap;

/// A parsed PGN game: tag pairs plus the main-line SAN moves.
#[derive(Debug, Clone, Default)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    pub moves: Vec<String>,
    pub result: GameResult,
}

impl PgnGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Starting FEN from the `FEN` tag, if the game does not start from the initial position.
    pub fn start_fen(&self) -> Option<&str> {
        self.tag("FEN")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    #[default]
    Ongoing,
}

impl GameResult {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

/// Parse a PGN collection (any number of games) into games.
///
/// Only the main line is kept: comments, variations, NAGs and move numbers are dropped.
/// Legality of the SAN tokens is checked later, when the game is replayed.
pub fn parse_pgn_collection(input: &str) -> Result<Vec<PgnGame>, PgnError> {
    let mut games = Vec::new();
    let mut current = PgnGame::default();
    let mut movetext = String::new();

    for (line_no, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && !in_comment(&movetext) {
            if !movetext.trim().is_empty() {
                finish_game(&mut current, &movetext, &mut games)?;
                movetext.clear();
            }
            let (name, value) = parse_tag(trimmed).ok_or_else(|| PgnError::InvalidTag {
                line: line_no + 1,
                text: trimmed.to_string(),
            })?;
            current.tags.insert(name, value);
        } else if trimmed.starts_with('%') {
            // Escape line.
            continue;
        } else {
            movetext.push_str(line);
            movetext.push('\n');
        }
    }

    if !movetext.trim().is_empty() || !current.tags.is_empty() {
        finish_game(&mut current, &movetext, &mut games)?;
    }

    Ok(games)
}

fn finish_game(
    current: &mut PgnGame,
    movetext: &str,
    games: &mut Vec<PgnGame>,
) -> Result<(), PgnError> {
    let mut game = std::mem::take(current);
    let (moves, result) = parse_movetext(movetext)?;
    game.moves = moves;
    game.result = result
        .or_else(|| game.tag("Result").and_then(GameResult::from_token))
        .unwrap_or_default();
    games.push(game);
    Ok(())
}

fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), value.replace("\\\"", "\"")))
}

fn in_comment(movetext: &str) -> bool {
    movetext.matches('{').count() > movetext.matches('}').count()
}

fn parse_movetext(text: &str) -> Result<(Vec<String>, Option<GameResult>), PgnError> {
    let mut moves = Vec::new();
    let mut result = None;
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();
    let mut token = String::new();

    let flush = |token: &mut String, moves: &mut Vec<String>, result: &mut Option<GameResult>| {
        if token.is_empty() {
            return;
        }
        let tok = std::mem::take(token);
        if let Some(r) = GameResult::from_token(&tok) {
            *result = Some(r);
            return;
        }
        if tok.starts_with('$') {
            return;
        }
        // Strip move numbers such as "12." or "12..." glued to the move.
        let san = tok.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
        if !san.is_empty() {
            moves.push(san.to_string());
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if depth == 0 {
                    flush(&mut token, &mut moves, &mut result);
                }
                token.clear();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
            }
            ';' => {
                if depth == 0 {
                    flush(&mut token, &mut moves, &mut result);
                }
                token.clear();
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                if depth == 0 {
                    flush(&mut token, &mut moves, &mut result);
                }
                token.clear();
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(PgnError::UnbalancedVariation);
                }
                token.clear();
                depth -= 1;
            }
            c if c.is_whitespace() => {
                if depth == 0 {
                    flush(&mut token, &mut moves, &mut result);
                } else {
                    token.clear();
                }
            }
            c => token.push(c),
        }
    }
    if depth != 0 {
        return Err(PgnError::UnbalancedVariation);
    }
    flush(&mut token, &mut moves, &mut result);

    Ok((moves, result))
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid tag on line {line}: {text}")]
    InvalidTag { line: usize, text: String },
    #[error("Unbalanced variation parentheses")]
    UnbalancedVariation,
    #[error("SAN parse error: {0}")]
    SanError(#[from] super::san::SanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Casual"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 {developing} Nc6 (2... d6 3. d4) 3. Bb5 $1 a6 1-0

[Event "Second"]
[White "Carol"]
[Black "Dave"]

1.d4 d5 2.c4 *
"#;

    #[test]
    fn parses_multiple_games_with_tags() {
        let games = parse_pgn_collection(TWO_GAMES).unwrap();
        assert_eq!(games.len(), 2);

        assert_eq!(games[0].tag("White"), Some("Alice"));
        assert_eq!(games[0].moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(games[0].result, GameResult::WhiteWins);

        assert_eq!(games[1].moves, vec!["d4", "d5", "c4"]);
        assert_eq!(games[1].result, GameResult::Ongoing);
    }

    #[test]
    fn unbalanced_variation_is_an_error() {
        assert!(matches!(
            parse_pgn_collection("1. e4 (1. d4 e5"),
            Err(PgnError::UnbalancedVariation)
        ));
    }

    #[test]
    fn malformed_tag_reports_line() {
        let err = parse_pgn_collection("[Event Casual]\n1. e4").unwrap_err();
        assert!(matches!(err, PgnError::InvalidTag { line: 1, .. }));
    }

    #[test]
    fn empty_input_has_no_games() {
        assert!(parse_pgn_collection("").unwrap().is_empty());
    }
}

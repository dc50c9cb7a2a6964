use cozy_chess::Board;

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let trimmed = fen.trim();
    if trimmed.split_whitespace().next().is_none() {
        return Err(FenError::InvalidFormat);
    }

    // Accept both four-field and full six-field FEN.
    let fields = trimmed.split_whitespace().count();
    let padded;
    let input = match fields {
        4 => {
            padded = format!("{} 0 1", trimmed);
            padded.as_str()
        }
        6 => trimmed,
        _ => return Err(FenError::InvalidFormat),
    };

    input
        .parse()
        .map_err(|_| FenError::InvalidBoardLayout(trimmed.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout: {0}")]
    InvalidBoardLayout(String),
}

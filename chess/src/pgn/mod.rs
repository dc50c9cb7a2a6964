pub mod parser;
pub mod san;

pub use parser::{parse_pgn_collection, GameResult, PgnError, PgnGame};
pub use san::{format_san, parse_san, SanError};

//! Board plumbing shared by the engine bindings, the tagger and the batch CLI.
//!
//! cozy-chess does the move generation; this crate owns notation (FEN, UCI, SAN),
//! game-collection reading and the material scale used by the tagger.

pub mod fen;
pub mod game;
pub mod pgn;
pub mod types;
pub mod uci;

pub use fen::{format_fen, parse_fen, FenError};
pub use game::{replay_game, GameError, PlyRecord};
pub use pgn::{format_san, parse_pgn_collection, parse_san, PgnError, PgnGame, SanError};
pub use types::{legal_moves, material_value, piece_count, MoveNotationError};
pub use uci::{
    convert_uci_castling_to_cozy, format_uci_move, parse_move_notation, parse_uci_move,
    to_standard_uci,
};

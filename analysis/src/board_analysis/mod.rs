//! Board-level primitives the metrics and detectors are built from.

pub mod attack_map;
pub mod contact;
pub mod helpers;
pub mod king_safety;
pub mod pawns;
pub mod tension;

pub use attack_map::{AttackMap, Attacker};
pub use contact::{contact_profile, ContactProfile};
pub use king_safety::{king_exposure, KingExposure};
pub use pawns::{pawn_structure, PawnStructure};
pub use tension::{compute_tension, TensionProfile};

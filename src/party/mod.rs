//! Multiplayer turn engine (deterministic).
//!
//! Shared party state plus the sequential action processor. Enemy turns
//! interleave into the fixed turn order and resolve synchronously inside
//! the triggering engine call.

pub mod encounter;
pub mod engine;
pub mod state;

pub use encounter::RoomEncounter;
pub use engine::{
    abandon, process_action, set_ready, ActionOutcome, ChoiceId, PartyAction, PartyConfig,
};
pub use state::{
    ActionLogEntry, CharacterClass, CombatState, EnemyState, PartyGameState, PartyPlayer,
    PartyStatus, TurnPhase, TurnSlot,
};

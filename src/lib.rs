//! # Gloomspire Engine
//!
//! Deterministic dungeon-crawl simulation for Gloomspire: a solo
//! seeded-run resolver and a multiplayer turn engine behind a thin
//! session service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GLOOMSPIRE ENGINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded xorshift32 PRNG                    │
//! │  └── hash.rs     - State hashing for replay audits           │
//! │                                                              │
//! │  game/           - Solo engine (deterministic)               │
//! │  ├── encounter.rs- Encounter generator + template tables     │
//! │  ├── state.rs    - Run state                                 │
//! │  ├── resolver.rs - Combat/encounter state machine            │
//! │  └── score.rs    - Reward curve                              │
//! │                                                              │
//! │  party/          - Multiplayer engine (deterministic)        │
//! │  ├── state.rs    - Shared party state                        │
//! │  ├── encounter.rs- Room generation                           │
//! │  └── engine.rs   - Turn-ordered action processor             │
//! │                                                              │
//! │  service/        - Shell (non-deterministic)                 │
//! │  ├── session.rs  - Sessions, parties, per-row write locks    │
//! │  ├── store.rs    - Versioned row persistence                 │
//! │  ├── claims.rs   - Reward claim ledger                       │
//! │  └── auth.rs     - Session token issue/validate              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `party/` modules are **100% deterministic**:
//! - No system time (timestamps are injected by the service layer)
//! - No ambient randomness; all draws come from the seeded xorshift32 RNG
//! - RNG draw order per action is fixed and documented
//!
//! Given the same seed string and the same action sequence, the engines
//! produce identical state and log text on any platform; `compute_hash`
//! digests are the replay-audit witness.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod party;
pub mod service;

// Re-export commonly used types
pub use crate::core::rng::SeededRng;
pub use crate::game::resolver::{GameConfig, SoloAction};
pub use crate::game::state::GameState;
pub use crate::party::engine::{PartyAction, PartyConfig};
pub use crate::party::state::PartyGameState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum retained action-log entries per party (newest first).
pub const ACTION_LOG_CAP: usize = 20;

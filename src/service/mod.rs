//! Service layer (non-deterministic shell).
//!
//! Seed issuance, session tokens, persistence, per-party/per-session
//! write locks, and the reward claim ledger. Everything time- or
//! randomness-dependent lives here; the engines below stay deterministic.

pub mod auth;
pub mod claims;
pub mod session;
pub mod store;

pub use auth::{issue_session_token, validate_token, AuthConfig, AuthError, SessionClaims};
pub use claims::{Claim, ClaimError, ClaimLedger, ClaimStatus, RewardConfig};
pub use session::{
    issue_seed, PartyActionReply, PartyInfo, PartyService, SessionError, SessionInfo,
    SessionService, SessionStatus, SoloActionReply, SoloSessionRow,
};
pub use store::{MemoryStore, StateStore, StoreError, VersionedRow};

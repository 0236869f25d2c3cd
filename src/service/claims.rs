//! Reward Claim Ledger
//!
//! Tracks reward claims for completed sessions. Creating a claim and
//! marking its session claimed is a one-way transition; every other
//! session status rejects the claim with its own reason.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Reward settings provided by the surrounding deployment.
#[derive(Clone, Debug)]
pub struct RewardConfig {
    /// Base reward amount (token base units) before the score multiplier.
    pub base_reward_amount: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            base_reward_amount: 1_000,
        }
    }
}

/// Lifecycle status of a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Created, payout not yet executed.
    Pending,
    /// Payout confirmed on chain.
    Paid,
    /// Payout failed; the claim stays on record.
    Failed,
}

/// A reward owed to a player for a completed session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim identifier.
    pub id: String,
    /// Claiming player's wallet address.
    pub player: String,
    /// Session the reward is for.
    pub session_id: String,
    /// Reward amount in token base units.
    pub amount: u64,
    /// Claim status.
    pub status: ClaimStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Claim errors, one reason per rejected session state.
#[derive(Debug, Clone, Error)]
pub enum ClaimError {
    /// Session has not finished yet.
    #[error("session is still active")]
    SessionActive,
    /// Session reward was already claimed.
    #[error("session already claimed")]
    AlreadyClaimed,
    /// Session expired before completion.
    #[error("session expired")]
    SessionExpired,
    /// A claim already exists for this session.
    #[error("claim already exists for session")]
    DuplicateClaim,
}

/// In-memory claim ledger: one claim per session, append-only.
#[derive(Default)]
pub struct ClaimLedger {
    claims: RwLock<BTreeMap<String, Claim>>,
}

impl ClaimLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending claim for a session.
    ///
    /// Exactly one claim may exist per session; a second create is
    /// rejected regardless of the first claim's status.
    pub async fn create_claim(
        &self,
        player: &str,
        session_id: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Claim, ClaimError> {
        let mut claims = self.claims.write().await;
        if claims.contains_key(session_id) {
            return Err(ClaimError::DuplicateClaim);
        }

        let claim = Claim {
            id: uuid::Uuid::new_v4().to_string(),
            player: player.to_string(),
            session_id: session_id.to_string(),
            amount,
            status: ClaimStatus::Pending,
            created_at: now,
        };
        claims.insert(session_id.to_string(), claim.clone());
        Ok(claim)
    }

    /// Look up the claim for a session.
    pub async fn claim_for_session(&self, session_id: &str) -> Option<Claim> {
        self.claims.read().await.get(session_id).cloned()
    }

    /// Record the payout result for a session's claim.
    pub async fn set_status(&self, session_id: &str, status: ClaimStatus) -> bool {
        let mut claims = self.claims.write().await;
        match claims.get_mut(session_id) {
            Some(claim) => {
                claim.status = status;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

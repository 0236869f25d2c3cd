//! Solo Run State
//!
//! The complete state of a single-player run. Mutated exclusively by the
//! resolver, one action at a time; the caller persists snapshots.

use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::encounter::Encounter;

/// Complete state of a solo run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Progress stage, starting at 0.
    pub stage: u32,

    /// Current health, always within `[0, max_health]`.
    pub health: i32,

    /// Maximum health.
    pub max_health: i32,

    /// Gold looted so far.
    pub gold: i32,

    /// Accumulated score.
    pub score: i32,

    /// The encounter blocking the path, if any.
    pub current_encounter: Option<Encounter>,

    /// Narrative log, oldest first. One line per resolved action.
    pub log: Vec<String>,

    /// Run has reached a terminal state (death or victory).
    pub is_complete: bool,

    /// Terminal state was a victory.
    pub victory: bool,
}

impl GameState {
    /// Create a fresh run: stage 0, full health, empty log.
    pub fn new(max_health: i32) -> Self {
        Self {
            stage: 0,
            health: max_health,
            max_health,
            gold: 0,
            score: 0,
            current_encounter: None,
            log: Vec::new(),
            is_complete: false,
            victory: false,
        }
    }

    /// Append one narrative line.
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// Apply damage, clamping health at zero.
    ///
    /// Returns true if the player died from this hit.
    pub fn apply_damage(&mut self, damage: i32) -> bool {
        self.health = (self.health - damage).max(0);
        self.health == 0
    }

    /// Heal up to `max_health`.
    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Compute an audit hash over the full state, including log text.
    ///
    /// Two executions of the same seed + action sequence must produce
    /// identical hashes.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_solo_state();
        hasher.update_u32(self.stage);
        hasher.update_i32(self.health);
        hasher.update_i32(self.max_health);
        hasher.update_i32(self.gold);
        hasher.update_i32(self.score);
        hasher.update_bool(self.is_complete);
        hasher.update_bool(self.victory);

        match &self.current_encounter {
            None => hasher.update_u8(0),
            Some(Encounter::Combat { name, health, max_health, damage }) => {
                hasher.update_u8(1);
                hasher.update_str(name);
                hasher.update_i32(*health);
                hasher.update_i32(*max_health);
                hasher.update_i32(*damage);
            }
            Some(Encounter::Treasure { name, gold }) => {
                hasher.update_u8(2);
                hasher.update_str(name);
                hasher.update_i32(*gold);
            }
            Some(Encounter::Trap { name, damage }) => {
                hasher.update_u8(3);
                hasher.update_str(name);
                hasher.update_i32(*damage);
            }
            Some(Encounter::Rest { heal }) => {
                hasher.update_u8(4);
                hasher.update_i32(*heal);
            }
        }

        for line in &self.log {
            hasher.update_str(line);
        }

        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = GameState::new(100);
        assert_eq!(state.stage, 0);
        assert_eq!(state.health, 100);
        assert_eq!(state.gold, 0);
        assert_eq!(state.score, 0);
        assert!(state.current_encounter.is_none());
        assert!(state.log.is_empty());
        assert!(!state.is_complete);
        assert!(!state.victory);
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut state = GameState::new(10);
        assert!(!state.apply_damage(6));
        assert_eq!(state.health, 4);

        assert!(state.apply_damage(50));
        assert_eq!(state.health, 0);
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut state = GameState::new(30);
        state.health = 25;
        state.heal(20);
        assert_eq!(state.health, 30);
    }

    #[test]
    fn test_hash_covers_log_text() {
        let mut a = GameState::new(100);
        let mut b = GameState::new(100);
        assert_eq!(a.compute_hash(), b.compute_hash());

        a.push_log("You head left.");
        b.push_log("You head right.");
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_hash_covers_encounter_variant() {
        let mut a = GameState::new(100);
        let mut b = GameState::new(100);

        a.current_encounter = Some(Encounter::Trap { name: "Spike Pit".into(), damage: 8 });
        b.current_encounter = Some(Encounter::Rest { heal: 8 });
        assert_ne!(a.compute_hash(), b.compute_hash());
    }
}

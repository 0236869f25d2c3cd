//! Party Game State
//!
//! The shared, server-authoritative state of a multiplayer expedition.
//! One instance per party, persisted as a single row; every accepted
//! action mutates it under the party's write lock.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::core::rng::{RngError, SeededRng};
use crate::party::encounter::RoomEncounter;
use crate::ACTION_LOG_CAP;

/// Log actor used for engine-generated entries.
pub const SYSTEM_ACTOR: &str = "system";

/// Playable character class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    /// Heavy melee; highest health pool.
    Warrior,
    /// Hits hardest; lowest health pool.
    Mage,
    /// Balanced stats, light hits.
    Rogue,
}

impl CharacterClass {
    /// Base damage before the per-attack variance roll.
    #[inline]
    pub fn base_damage(self) -> i32 {
        match self {
            CharacterClass::Warrior => 15,
            CharacterClass::Mage => 20,
            CharacterClass::Rogue => 12,
        }
    }

    /// Starting (health, mana) for a fresh character.
    pub fn starting_stats(self) -> (i32, i32) {
        match self {
            CharacterClass::Warrior => (120, 30),
            CharacterClass::Mage => (80, 100),
            CharacterClass::Rogue => (100, 60),
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            CharacterClass::Warrior => "warrior",
            CharacterClass::Mage => "mage",
            CharacterClass::Rogue => "rogue",
        }
    }
}

/// Current phase of the party's turn loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Moving between rooms, choices open to any member.
    Exploration,
    /// Strict turn order; only the current holder may act.
    Combat,
    /// A dialogue event is on screen.
    Dialogue,
    /// Spoils are being handed out after a cleared combat.
    Loot,
    /// Party is gathering; members ready up before the descent.
    Waiting,
}

/// Terminal/active status of the expedition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyStatus {
    /// Expedition in progress.
    Active,
    /// All floors cleared.
    Victory,
    /// The whole party fell.
    Defeat,
    /// A member called the retreat.
    Abandoned,
}

/// State of one party member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyPlayer {
    /// Wallet address; unique key within the party.
    pub address: String,
    /// Display name.
    pub name: String,
    /// Character class.
    pub class: CharacterClass,
    /// Current health, within `[0, max_health]`.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Gold collected this expedition.
    pub gold: i32,
    /// Score collected this expedition.
    pub score: i32,
    /// Carried items.
    pub items: Vec<String>,
    /// Ready to start (only meaningful in the waiting phase).
    pub is_ready: bool,
    /// Alive flag; once false it never reverses within a run.
    pub is_alive: bool,
    /// Defending stance; consumed by the next incoming hit.
    pub is_defending: bool,
}

impl PartyPlayer {
    /// Create a fresh member with class starting stats.
    pub fn new(address: impl Into<String>, name: impl Into<String>, class: CharacterClass) -> Self {
        let (health, mana) = class.starting_stats();
        Self {
            address: address.into(),
            name: name.into(),
            class,
            health,
            max_health: health,
            mana,
            max_mana: mana,
            gold: 0,
            score: 0,
            items: Vec::new(),
            is_ready: false,
            is_alive: true,
            is_defending: false,
        }
    }
}

/// State of one enemy within a combat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    /// Synthetic id, unique within a combat (`enemy_0`, `enemy_1`, ...).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Damage per hit.
    pub damage: i32,
    /// Defense rating.
    pub defense: i32,
    /// Client icon key.
    pub icon: String,
}

/// One slot in the combat turn order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSlot {
    /// A party member, by address.
    Player(String),
    /// An enemy, by synthetic id.
    Enemy(String),
}

/// Active combat bookkeeping.
///
/// `turn_order` is built once at combat start (living players in list
/// order, then all enemies) and never shrinks; dead enemies are removed
/// from `enemies` only and their slots are skipped at dereference time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// Living enemies. Slain enemies are removed from this list.
    pub enemies: Vec<EnemyState>,
    /// Fixed participant order for the combat's duration.
    pub turn_order: Vec<TurnSlot>,
    /// Index of the slot currently holding the turn.
    pub current_turn_index: usize,
    /// Round counter; a round ends when the enemy phase completes.
    pub round_number: u32,
}

impl CombatState {
    /// Check whether a turn-order slot refers to a live participant.
    pub fn slot_is_live(&self, slot: &TurnSlot, players: &[PartyPlayer]) -> bool {
        match slot {
            TurnSlot::Player(addr) => players
                .iter()
                .any(|p| p.address == *addr && p.is_alive),
            TurnSlot::Enemy(id) => self.enemies.iter().any(|e| e.id == *id && e.health > 0),
        }
    }
}

/// One narrated entry in the party's bounded action log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Monotonic id within the party.
    pub id: u64,
    /// Acting player address, or `"system"`.
    pub player: String,
    /// Action kind label.
    pub action: String,
    /// Narrated result text.
    pub result: String,
    /// Wall-clock timestamp, injected by the service layer.
    pub timestamp: DateTime<Utc>,
}

/// Complete shared state of a party expedition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyGameState {
    /// Party identifier.
    pub party_id: String,
    /// Current floor, starting at 1.
    pub current_floor: u32,
    /// Current room on this floor, starting at 0 (not yet entered).
    pub current_room: u32,
    /// Seed string issued at party creation.
    pub dungeon_seed: String,
    /// Deterministic RNG; persisted so replays resume mid-run.
    pub rng: SeededRng,
    /// Address holding the combat turn, if any.
    pub current_turn_player: Option<String>,
    /// Count of accepted state-changing actions.
    pub turn_number: u32,
    /// Current phase.
    pub turn_phase: TurnPhase,
    /// Members in turn-priority order.
    pub players: Vec<PartyPlayer>,
    /// The room event currently on screen, if any.
    pub current_encounter: Option<RoomEncounter>,
    /// Active combat, if any.
    pub combat: Option<CombatState>,
    /// Bounded action log, newest first.
    pub action_log: Vec<ActionLogEntry>,
    /// Next log entry id.
    pub next_log_id: u64,
    /// Expedition status.
    pub status: PartyStatus,
}

impl PartyGameState {
    /// Create a new party expedition in the waiting phase.
    pub fn new(
        party_id: impl Into<String>,
        dungeon_seed: impl Into<String>,
        players: Vec<PartyPlayer>,
    ) -> Result<Self, RngError> {
        let dungeon_seed = dungeon_seed.into();
        let rng = SeededRng::from_seed(&dungeon_seed)?;

        Ok(Self {
            party_id: party_id.into(),
            current_floor: 1,
            current_room: 0,
            dungeon_seed,
            rng,
            current_turn_player: None,
            turn_number: 0,
            turn_phase: TurnPhase::Waiting,
            players,
            current_encounter: None,
            combat: None,
            action_log: Vec::new(),
            next_log_id: 0,
            status: PartyStatus::Active,
        })
    }

    /// Get a member by address.
    pub fn player(&self, address: &str) -> Option<&PartyPlayer> {
        self.players.iter().find(|p| p.address == address)
    }

    /// Get a member mutably by address.
    pub fn player_mut(&mut self, address: &str) -> Option<&mut PartyPlayer> {
        self.players.iter_mut().find(|p| p.address == address)
    }

    /// Addresses of living members, in list order.
    pub fn living_players(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| p.is_alive)
            .map(|p| p.address.clone())
            .collect()
    }

    /// Prepend an entry to the action log, truncating to the cap.
    pub fn push_log(
        &mut self,
        player: impl Into<String>,
        action: impl Into<String>,
        result: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let entry = ActionLogEntry {
            id: self.next_log_id,
            player: player.into(),
            action: action.into(),
            result: result.into(),
            timestamp: now,
        };
        self.next_log_id += 1;
        self.action_log.insert(0, entry);
        self.action_log.truncate(ACTION_LOG_CAP);
    }

    /// Compute an audit hash over the full state and log text.
    ///
    /// Timestamps are excluded: they are injected wall-clock metadata, not
    /// simulation output.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_party_state();
        hasher.update_str(&self.party_id);
        hasher.update_u32(self.current_floor);
        hasher.update_u32(self.current_room);
        hasher.update_str(&self.dungeon_seed);
        hasher.update_i32(self.rng.state());
        hasher.update_u32(self.turn_number);
        hasher.update_u8(self.turn_phase as u8);
        hasher.update_u8(self.status as u8);

        match &self.current_turn_player {
            Some(addr) => {
                hasher.update_u8(1);
                hasher.update_str(addr);
            }
            None => hasher.update_u8(0),
        }

        for player in &self.players {
            hasher.update_str(&player.address);
            hasher.update_str(&player.name);
            hasher.update_u8(player.class as u8);
            hasher.update_i32(player.health);
            hasher.update_i32(player.max_health);
            hasher.update_i32(player.mana);
            hasher.update_i32(player.gold);
            hasher.update_i32(player.score);
            hasher.update_bool(player.is_ready);
            hasher.update_bool(player.is_alive);
            hasher.update_bool(player.is_defending);
        }

        match &self.combat {
            Some(combat) => {
                hasher.update_u8(1);
                hasher.update_u32(combat.round_number);
                hasher.update_u64(combat.current_turn_index as u64);
                for enemy in &combat.enemies {
                    hasher.update_str(&enemy.id);
                    hasher.update_str(&enemy.name);
                    hasher.update_i32(enemy.health);
                    hasher.update_i32(enemy.damage);
                    hasher.update_i32(enemy.defense);
                }
                for slot in &combat.turn_order {
                    match slot {
                        TurnSlot::Player(addr) => {
                            hasher.update_u8(1);
                            hasher.update_str(addr);
                        }
                        TurnSlot::Enemy(id) => {
                            hasher.update_u8(2);
                            hasher.update_str(id);
                        }
                    }
                }
            }
            None => hasher.update_u8(0),
        }

        for entry in &self.action_log {
            hasher.update_u64(entry.id);
            hasher.update_str(&entry.player);
            hasher.update_str(&entry.action);
            hasher.update_str(&entry.result);
        }

        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================

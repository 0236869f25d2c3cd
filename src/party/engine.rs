//! Multiplayer Turn Engine
//!
//! Processes one party action at a time against the shared state. Combat
//! enforces strict turn order; whenever advancement lands on an enemy
//! slot, the whole enemy phase resolves synchronously in the same call
//! before control returns to a player.
//!
//! Rejections (wrong turn, unknown target, wrong phase) are normal
//! outcomes: the state is left untouched and the reason is returned.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::party::encounter::{generate_room_encounter, RoomEncounter};
use crate::party::state::{
    CombatState, PartyGameState, PartyStatus, TurnPhase, TurnSlot, SYSTEM_ACTOR,
};

/// Configuration for a party expedition.
#[derive(Clone, Debug)]
pub struct PartyConfig {
    /// Floors to clear (boss each) for victory.
    pub total_floors: u32,
    /// Health restored by the rest choice.
    pub rest_heal: i32,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            total_floors: 3,
            rest_heal: 20,
        }
    }
}

/// Choice submitted outside combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceId {
    /// Enter the next room.
    Enter,
    /// Continue to the next room (alias of enter).
    Continue,
    /// Engage the hostiles in the current room.
    Attack,
    /// Rest the party.
    Rest,
    /// Loot the treasure in the current room.
    Treasure,
}

/// One action submitted by a party member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PartyAction {
    /// Reposition (no mechanical effect).
    Move,
    /// Strike a combat target.
    Attack {
        /// Enemy id to hit.
        target: String,
    },
    /// Guard against the next incoming hit.
    Defend,
    /// Use a class skill (no mechanical effect).
    Skill,
    /// Use an item (no mechanical effect).
    Item,
    /// Attempt to escape the combat.
    Flee,
    /// Make a non-combat choice.
    Choice {
        /// Which choice.
        choice: ChoiceId,
    },
}

impl PartyAction {
    /// Kind label used in the action log.
    pub fn label(&self) -> &'static str {
        match self {
            PartyAction::Move => "move",
            PartyAction::Attack { .. } => "attack",
            PartyAction::Defend => "defend",
            PartyAction::Skill => "skill",
            PartyAction::Item => "item",
            PartyAction::Flee => "flee",
            PartyAction::Choice { .. } => "choice",
        }
    }
}

/// Result of submitting an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Whether the action was accepted and applied.
    pub accepted: bool,
    /// Narrated result, or the rejection reason.
    pub message: String,
}

impl ActionOutcome {
    fn accepted(message: impl Into<String>) -> Self {
        Self { accepted: true, message: message.into() }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self { accepted: false, message: message.into() }
    }
}

/// Process one action against the shared party state.
///
/// `now` is injected by the caller; the engine itself never reads the
/// clock, so replays with pinned timestamps are bit-identical.
pub fn process_action(
    state: &mut PartyGameState,
    actor: &str,
    action: PartyAction,
    now: DateTime<Utc>,
    config: &PartyConfig,
) -> ActionOutcome {
    if state.status != PartyStatus::Active {
        return ActionOutcome::rejected("The expedition is already over.");
    }
    if state.player(actor).is_none() {
        return ActionOutcome::rejected(format!("{} is not a member of this party.", actor));
    }
    if state.turn_phase == TurnPhase::Waiting {
        return ActionOutcome::rejected("The party is still gathering; ready up first.");
    }
    if state.turn_phase == TurnPhase::Combat
        && state.current_turn_player.as_deref() != Some(actor)
    {
        return ActionOutcome::rejected("It is not your turn.");
    }

    match action {
        PartyAction::Attack { ref target } => attack(state, actor, target, now, config),
        PartyAction::Defend => defend(state, actor, now),
        PartyAction::Flee => flee(state, actor, now),
        PartyAction::Choice { choice } => choose(state, actor, choice, now, config),
        PartyAction::Move | PartyAction::Skill | PartyAction::Item => {
            let name = display_name(state, actor);
            state.push_log(actor, action.label(), format!("{} performed an action.", name), now);
            ActionOutcome::accepted(format!("{} performed an action.", name))
        }
    }
}

/// Mark a member ready; when the whole roster is ready the waiting phase
/// ends and exploration begins.
pub fn set_ready(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    if state.status != PartyStatus::Active {
        return ActionOutcome::rejected("The expedition is already over.");
    }

    let name = match state.player_mut(actor) {
        Some(player) => {
            player.is_ready = true;
            player.name.clone()
        }
        None => {
            return ActionOutcome::rejected(format!("{} is not a member of this party.", actor))
        }
    };

    state.push_log(actor, "ready", format!("{} is ready.", name), now);

    if state.turn_phase == TurnPhase::Waiting && state.players.iter().all(|p| p.is_ready) {
        state.turn_phase = TurnPhase::Exploration;
        state.push_log(
            SYSTEM_ACTOR,
            "start",
            "All adventurers are ready. The descent begins.",
            now,
        );
    }

    ActionOutcome::accepted(format!("{} is ready.", name))
}

/// Abandon the expedition. One-way; any member may call it.
pub fn abandon(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    if state.status != PartyStatus::Active {
        return ActionOutcome::rejected("The expedition is already over.");
    }
    let Some(name) = state.player(actor).map(|p| p.name.clone()) else {
        return ActionOutcome::rejected(format!("{} is not a member of this party.", actor));
    };

    state.status = PartyStatus::Abandoned;
    state.current_turn_player = None;
    let message = format!("{} calls the retreat. The expedition is abandoned.", name);
    state.push_log(actor, "abandon", message.clone(), now);
    ActionOutcome::accepted(message)
}

fn display_name(state: &PartyGameState, actor: &str) -> String {
    state
        .player(actor)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| actor.to_string())
}

// =============================================================================
// COMBAT ACTIONS
// =============================================================================

fn attack(
    state: &mut PartyGameState,
    actor: &str,
    target: &str,
    now: DateTime<Utc>,
    config: &PartyConfig,
) -> ActionOutcome {
    let Some(combat) = state.combat.as_ref() else {
        return ActionOutcome::rejected("There is no combat in progress.");
    };
    if !combat.enemies.iter().any(|e| e.id == target && e.health > 0) {
        return ActionOutcome::rejected(format!("No living target '{}' in this combat.", target));
    }

    let (attacker_name, class) = match state.player(actor) {
        Some(p) => (p.name.clone(), p.class),
        None => return ActionOutcome::rejected(format!("{} is not a member of this party.", actor)),
    };

    let damage = class.base_damage() + state.rng.next_int(0, 10);

    let Some(combat) = state.combat.as_mut() else {
        return ActionOutcome::rejected("There is no combat in progress.");
    };
    let Some(enemy) = combat.enemies.iter_mut().find(|e| e.id == target) else {
        return ActionOutcome::rejected(format!("No living target '{}' in this combat.", target));
    };
    enemy.health = (enemy.health - damage).max(0);
    let enemy_name = enemy.name.clone();
    let slain = enemy.health == 0;
    if slain {
        combat.enemies.retain(|e| e.health > 0);
    }
    let cleared = combat.enemies.is_empty();

    state.turn_number += 1;

    let message = if slain {
        format!("{} hits {} for {} - it is slain!", attacker_name, enemy_name, damage)
    } else {
        format!("{} hits {} for {}.", attacker_name, enemy_name, damage)
    };
    state.push_log(actor, "attack", message.clone(), now);

    if slain {
        if let Some(player) = state.player_mut(actor) {
            player.score += 75;
        }
    }

    if cleared {
        finish_combat_victory(state, now, config);
    } else {
        advance_turn(state, now);
        check_party_wipe(state, now);
    }

    ActionOutcome::accepted(message)
}

fn defend(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    if state.combat.is_none() {
        return ActionOutcome::rejected("There is nothing to defend against.");
    }

    let name = display_name(state, actor);
    if let Some(player) = state.player_mut(actor) {
        player.is_defending = true;
    }

    state.turn_number += 1;
    let message = format!("{} raises their guard.", name);
    state.push_log(actor, "defend", message.clone(), now);

    advance_turn(state, now);
    check_party_wipe(state, now);
    ActionOutcome::accepted(message)
}

fn flee(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    if state.combat.is_none() {
        return ActionOutcome::rejected("There is nothing to flee from.");
    }

    let name = display_name(state, actor);
    let roll = state.rng.next_f64();
    state.turn_number += 1;

    if roll < 0.5 {
        state.combat = None;
        state.current_turn_player = None;
        state.turn_phase = TurnPhase::Exploration;
        state.current_encounter = Some(RoomEncounter::Escaped {
            description: "The party scatters back into the corridor.".to_string(),
        });

        let message = format!("{} finds a gap - the party escapes!", name);
        state.push_log(actor, "flee", message.clone(), now);
        ActionOutcome::accepted(message)
    } else {
        let message = format!("{} tries to flee, but the exit is cut off.", name);
        state.push_log(actor, "flee", message.clone(), now);

        advance_turn(state, now);
        check_party_wipe(state, now);
        ActionOutcome::accepted(message)
    }
}

// =============================================================================
// NON-COMBAT CHOICES
// =============================================================================

fn choose(
    state: &mut PartyGameState,
    actor: &str,
    choice: ChoiceId,
    now: DateTime<Utc>,
    config: &PartyConfig,
) -> ActionOutcome {
    if state.turn_phase == TurnPhase::Combat {
        return ActionOutcome::rejected("Locked in combat - attack, defend, or flee.");
    }

    match choice {
        ChoiceId::Enter | ChoiceId::Continue => enter_room(state, actor, now),
        ChoiceId::Attack => begin_combat_by_choice(state, actor, now),
        ChoiceId::Rest => rest_party(state, actor, now, config),
        ChoiceId::Treasure => loot_treasure(state, actor, now),
    }
}

fn enter_room(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    state.current_room += 1;
    let room = generate_room_encounter(&mut state.rng, state.current_floor, state.current_room);
    let message = format!(
        "The party advances to room {}: {}",
        state.current_room,
        room.description()
    );

    state.turn_number += 1;
    state.push_log(actor, "choice", message.clone(), now);

    let is_combat = matches!(room, RoomEncounter::Combat { .. });
    let is_dialogue = matches!(room, RoomEncounter::Dialogue { .. });
    let trap_damage = match &room {
        RoomEncounter::Trap { damage, .. } => Some(*damage),
        _ => None,
    };

    state.current_encounter = Some(room);

    if is_combat {
        init_combat(state);
    } else if let Some(damage) = trap_damage {
        state.turn_phase = TurnPhase::Exploration;
        spring_trap(state, damage, now);
    } else if is_dialogue {
        state.turn_phase = TurnPhase::Dialogue;
    } else {
        state.turn_phase = TurnPhase::Exploration;
    }

    ActionOutcome::accepted(message)
}

fn begin_combat_by_choice(
    state: &mut PartyGameState,
    actor: &str,
    now: DateTime<Utc>,
) -> ActionOutcome {
    if !matches!(state.current_encounter, Some(RoomEncounter::Combat { .. })) {
        return ActionOutcome::rejected("There is nothing to fight here.");
    }

    let name = display_name(state, actor);
    state.turn_number += 1;
    let message = format!("{} draws steel - the party engages!", name);
    state.push_log(actor, "choice", message.clone(), now);
    init_combat(state);

    ActionOutcome::accepted(message)
}

fn rest_party(
    state: &mut PartyGameState,
    actor: &str,
    now: DateTime<Utc>,
    config: &PartyConfig,
) -> ActionOutcome {
    for player in state.players.iter_mut() {
        player.health = (player.health + config.rest_heal).min(player.max_health);
    }

    let name = display_name(state, actor);
    state.turn_number += 1;
    let message = format!(
        "{} sets a watch. The party rests and recovers {} health.",
        name, config.rest_heal
    );
    state.push_log(actor, "choice", message.clone(), now);
    ActionOutcome::accepted(message)
}

fn loot_treasure(state: &mut PartyGameState, actor: &str, now: DateTime<Utc>) -> ActionOutcome {
    let amount = 50 + state.rng.next_int(0, 50);
    for player in state.players.iter_mut() {
        player.gold += amount;
        player.score += amount;
    }

    let name = display_name(state, actor);
    state.turn_number += 1;
    let message = format!(
        "{} pries the chest open: {} gold for every member.",
        name, amount
    );
    state.push_log(actor, "choice", message.clone(), now);
    ActionOutcome::accepted(message)
}

// =============================================================================
// COMBAT INTERNALS
// =============================================================================

/// Build combat bookkeeping from the current room's enemy set.
///
/// Turn order is all living players in list order, then all enemies, and
/// stays fixed for the combat's duration.
fn init_combat(state: &mut PartyGameState) {
    let Some(RoomEncounter::Combat { enemies, .. }) = state.current_encounter.clone() else {
        return;
    };

    let mut turn_order: Vec<TurnSlot> = state
        .players
        .iter()
        .filter(|p| p.is_alive)
        .map(|p| TurnSlot::Player(p.address.clone()))
        .collect();
    turn_order.extend(enemies.iter().map(|e| TurnSlot::Enemy(e.id.clone())));

    let first = state
        .players
        .iter()
        .find(|p| p.is_alive)
        .map(|p| p.address.clone());

    state.combat = Some(CombatState {
        enemies,
        turn_order,
        current_turn_index: 0,
        round_number: 1,
    });
    state.current_turn_player = first;
    state.turn_phase = TurnPhase::Combat;
}

/// Clear combat after the last enemy falls: loot phase, spoils for the
/// whole roster, and floor progression when the slain room was a boss.
fn finish_combat_victory(state: &mut PartyGameState, now: DateTime<Utc>, config: &PartyConfig) {
    let was_boss = matches!(
        state.current_encounter,
        Some(RoomEncounter::Combat { boss: true, .. })
    );

    state.combat = None;
    state.current_turn_player = None;
    state.turn_phase = TurnPhase::Loot;
    state.current_encounter = Some(RoomEncounter::Loot {
        description: "The party gathers the spoils.".to_string(),
    });

    for player in state.players.iter_mut() {
        player.gold += 50;
        player.score += 100;
    }
    state.push_log(
        SYSTEM_ACTOR,
        "loot",
        "The last enemy falls. Spoils for everyone: +50 gold, +100 score.",
        now,
    );

    if was_boss {
        state.current_floor += 1;
        if state.current_floor > config.total_floors {
            state.status = PartyStatus::Victory;
            state.push_log(
                SYSTEM_ACTOR,
                "victory",
                "The final guardian is destroyed. The party emerges victorious!",
                now,
            );
        } else {
            state.push_log(
                SYSTEM_ACTOR,
                "descend",
                format!("A stairway spirals down to floor {}.", state.current_floor),
                now,
            );
        }
    }
}

/// Advance the turn to the next live slot. Dead players and removed
/// enemies stay in `turn_order` and are skipped here, at dereference
/// time. Landing on an enemy slot triggers the full enemy phase.
fn advance_turn(state: &mut PartyGameState, now: DateTime<Utc>) {
    enum Next {
        Player(usize, String),
        EnemyPhase(usize),
        Nobody,
    }

    let next = {
        let Some(combat) = state.combat.as_ref() else { return };
        let len = combat.turn_order.len();
        let mut found = Next::Nobody;
        if len > 0 {
            let current = combat.current_turn_index;
            for step in 1..=len {
                let idx = (current + step) % len;
                let slot = &combat.turn_order[idx];
                if !combat.slot_is_live(slot, &state.players) {
                    continue;
                }
                found = match slot {
                    TurnSlot::Player(addr) => Next::Player(idx, addr.clone()),
                    TurnSlot::Enemy(_) => Next::EnemyPhase(idx),
                };
                break;
            }
        }
        found
    };

    match next {
        Next::Player(idx, addr) => {
            if let Some(combat) = state.combat.as_mut() {
                combat.current_turn_index = idx;
            }
            state.current_turn_player = Some(addr);
        }
        Next::EnemyPhase(idx) => {
            if let Some(combat) = state.combat.as_mut() {
                combat.current_turn_index = idx;
            }
            resolve_enemy_phase(state, now);
        }
        Next::Nobody => {
            state.current_turn_player = None;
        }
    }
}

/// Resolve the whole enemy phase in one call: each living enemy, in list
/// order, strikes one uniformly-random living player. Defending halves
/// the hit (floored) and consumes the stance.
fn resolve_enemy_phase(state: &mut PartyGameState, now: DateTime<Utc>) {
    let roster: Vec<(String, i32)> = match state.combat.as_ref() {
        Some(combat) => combat
            .enemies
            .iter()
            .filter(|e| e.health > 0)
            .map(|e| (e.name.clone(), e.damage))
            .collect(),
        None => return,
    };

    for (enemy_name, damage) in roster {
        let living = state.living_players();
        if living.is_empty() {
            break;
        }
        let target_addr = match state.rng.pick(&living) {
            Some(addr) => addr.clone(),
            None => break,
        };

        let Some(target) = state.player_mut(&target_addr) else { continue };
        let mut dealt = damage;
        let mut blocked = false;
        if target.is_defending {
            dealt /= 2;
            target.is_defending = false;
            blocked = true;
        }
        target.health = (target.health - dealt).max(0);
        let target_name = target.name.clone();
        let fell = target.health == 0;
        if fell {
            target.is_alive = false;
        }

        let result = if fell {
            format!("{} strikes {} for {} - they fall!", enemy_name, target_name, dealt)
        } else if blocked {
            format!("{} strikes {} for {} (half blocked).", enemy_name, target_name, dealt)
        } else {
            format!("{} strikes {} for {}.", enemy_name, target_name, dealt)
        };
        state.push_log(SYSTEM_ACTOR, "enemy_attack", result, now);
    }

    if let Some(combat) = state.combat.as_mut() {
        combat.round_number += 1;
    }

    // Hand the turn back: first living player in list order, falling back
    // to players[0] regardless of liveness so the turn pointer never
    // dangles. On a wipe this leaves a dead player nominally holding the
    // turn until the defeat check lands.
    let next = state
        .players
        .iter()
        .find(|p| p.is_alive)
        .map(|p| p.address.clone())
        .or_else(|| state.players.first().map(|p| p.address.clone()));
    state.current_turn_player = next.clone();

    if let (Some(addr), Some(combat)) = (next, state.combat.as_mut()) {
        if let Some(idx) = combat
            .turn_order
            .iter()
            .position(|slot| matches!(slot, TurnSlot::Player(a) if *a == addr))
        {
            combat.current_turn_index = idx;
        }
    }
}

/// Apply a trap room to every living member, then run the wipe check.
fn spring_trap(state: &mut PartyGameState, damage: i32, now: DateTime<Utc>) {
    let mut fallen: Vec<String> = Vec::new();
    for player in state.players.iter_mut().filter(|p| p.is_alive) {
        player.health = (player.health - damage).max(0);
        if player.health == 0 {
            player.is_alive = false;
            fallen.push(player.name.clone());
        }
    }

    let mut result = format!("The trap bites everyone for {}.", damage);
    for name in &fallen {
        result.push_str(&format!(" {} falls!", name));
    }
    state.push_log(SYSTEM_ACTOR, "trap", result, now);

    check_party_wipe(state, now);
}

fn check_party_wipe(state: &mut PartyGameState, now: DateTime<Utc>) {
    if state.status == PartyStatus::Active && !state.players.iter().any(|p| p.is_alive) {
        state.status = PartyStatus::Defeat;
        state.push_log(
            SYSTEM_ACTOR,
            "defeat",
            "The party has fallen. Darkness takes the halls.",
            now,
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================

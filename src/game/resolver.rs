//! Solo Combat/Encounter Resolver
//!
//! A state machine over the active encounter kind. Each call resolves
//! exactly one action, appends exactly one narrative line, and leaves the
//! state untouched (plus an explanatory message) when the action does not
//! apply. Invalid actions are normal outcomes here, never errors.
//!
//! # Draw order
//!
//! The RNG draw order per action is part of the replay contract:
//! - attack: player 2d6, player d20, then (enemy alive) enemy d20,
//!   or (enemy dead) gold reward
//! - defend: counter 1d4, then (enemy dead) gold reward
//! - escape: one d20
//! - path choice: one band roll, then one template pick for
//!   combat/treasure/trap

use serde::{Serialize, Deserialize};

use crate::core::rng::SeededRng;
use crate::game::encounter::{generate_encounter, Encounter, PathChoice};
use crate::game::state::GameState;

/// Configuration for a solo run.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Stages to clear for victory.
    pub total_stages: u32,
    /// Starting (and maximum) health.
    pub starting_health: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_stages: 5,
            starting_health: 100,
        }
    }
}

/// One player action against the current run state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SoloAction {
    /// Pick a direction and walk into the next encounter.
    ChoosePath {
        /// Which way to go.
        choice: PathChoice,
    },
    /// Strike the enemy (combat only).
    Attack,
    /// Brace and counter (combat only).
    Defend,
    /// Try to slip away (combat only).
    Escape,
    /// Spring the trap or take the rest (trap/rest only).
    Proceed,
    /// Pocket the treasure (treasure only).
    TakeTreasure,
    /// Walk past the treasure (treasure only).
    LeaveTreasure,
}

/// Resolve one action against the run state.
///
/// Mutates `state` in place and returns the narrative message for this
/// action; the same text is appended to `state.log`. A no-op (wrong
/// encounter kind, no active encounter, completed run) returns the
/// explanation without touching state or consuming RNG draws.
pub fn resolve(
    state: &mut GameState,
    action: SoloAction,
    rng: &mut SeededRng,
    config: &GameConfig,
) -> String {
    if state.is_complete {
        return "The run is already over.".to_string();
    }

    match action {
        SoloAction::ChoosePath { choice } => choose_path(state, choice, rng),
        SoloAction::Attack => attack(state, rng, config),
        SoloAction::Defend => defend(state, rng, config),
        SoloAction::Escape => escape(state, rng, config),
        SoloAction::Proceed => proceed(state, config),
        SoloAction::TakeTreasure => take_treasure(state, config),
        SoloAction::LeaveTreasure => leave_treasure(state, config),
    }
}

/// Final score for a finished run.
///
/// Victory adds a completion bonus on top of the accumulated score.
pub fn final_score(state: &GameState) -> i32 {
    if state.victory {
        state.score + 500 + state.health * 3 + state.gold
    } else {
        state.score
    }
}

fn choose_path(state: &mut GameState, choice: PathChoice, rng: &mut SeededRng) -> String {
    if state.current_encounter.is_some() {
        return "An encounter still blocks the way.".to_string();
    }

    let encounter = generate_encounter(rng, state.stage, choice);
    let message = match &encounter {
        Encounter::Combat { name, health, .. } => {
            format!("You head {}. A {} ({} HP) blocks the path!", choice.label(), name, health)
        }
        Encounter::Treasure { name, gold } => {
            format!("You head {}. You spot a {} worth {} gold.", choice.label(), name, gold)
        }
        Encounter::Trap { name, .. } => {
            format!("You head {}. Something clicks underfoot - a {}!", choice.label(), name)
        }
        Encounter::Rest { .. } => {
            format!("You head {}. A quiet alcove offers a moment's rest.", choice.label())
        }
    };

    state.current_encounter = Some(encounter);
    state.push_log(message.clone());
    message
}

fn attack(state: &mut GameState, rng: &mut SeededRng, config: &GameConfig) -> String {
    let Some(Encounter::Combat { name, health, damage, .. }) = state.current_encounter.clone()
    else {
        return "There is nothing to attack.".to_string();
    };

    // Player roll is drawn before the enemy roll; the order is observable
    // through the shared RNG stream.
    let player_damage = rng.roll_dice(2, 6) + rng.roll_d20() / 4;
    let remaining = health - player_damage;

    let message = if remaining > 0 {
        let enemy_roll = rng.roll_d20();
        let dealt = (damage - enemy_roll / 5).max(0);
        let died = state.apply_damage(dealt);

        if let Some(Encounter::Combat { health, .. }) = state.current_encounter.as_mut() {
            *health = remaining;
        }

        let mut message = format!(
            "You hit the {} for {} ({} HP left). It strikes back for {}.",
            name, player_damage, remaining, dealt
        );
        if died {
            state.is_complete = true;
            state.victory = false;
            message.push_str(" You collapse - the run is over.");
        }
        message
    } else {
        let stage = state.stage as i32;
        let gold_reward = rng.next_int(10, 30) + stage * 5;
        state.gold += gold_reward;
        state.score += 100 + stage * 25;
        state.current_encounter = None;

        let mut message = format!(
            "You strike the {} down for {} damage and loot {} gold!",
            name, player_damage, gold_reward
        );
        advance_stage(state, config, &mut message);
        message
    };

    state.push_log(message.clone());
    message
}

fn defend(state: &mut GameState, rng: &mut SeededRng, config: &GameConfig) -> String {
    let Some(Encounter::Combat { name, health, damage, .. }) = state.current_encounter.clone()
    else {
        return "There is nothing to defend against.".to_string();
    };

    let counter = rng.roll_dice(1, 4);
    let remaining = health - counter;

    let message = if remaining > 0 {
        let reduced = (damage as f64 * 0.3).floor() as i32;
        let died = state.apply_damage(reduced);

        if let Some(Encounter::Combat { health, .. }) = state.current_encounter.as_mut() {
            *health = remaining;
        }

        let mut message = format!(
            "You brace behind your shield, countering the {} for {}. Only {} damage gets through.",
            name, counter, reduced
        );
        if died {
            state.is_complete = true;
            state.victory = false;
            message.push_str(" You collapse - the run is over.");
        }
        message
    } else {
        let stage = state.stage as i32;
        let gold_reward = rng.next_int(10, 25) + stage * 5;
        state.gold += gold_reward;
        state.score += 75 + stage * 20;
        state.current_encounter = None;

        let mut message = format!(
            "Your counter fells the {}! You recover {} gold.",
            name, gold_reward
        );
        advance_stage(state, config, &mut message);
        message
    };

    state.push_log(message.clone());
    message
}

fn escape(state: &mut GameState, rng: &mut SeededRng, config: &GameConfig) -> String {
    let Some(Encounter::Combat { name, damage, .. }) = state.current_encounter.clone() else {
        return "There is nothing to escape from.".to_string();
    };

    let roll = rng.roll_d20();

    let message = if roll >= 12 {
        state.score += 25;
        state.current_encounter = None;

        let mut message = format!("You slip past the {} (rolled {}).", name, roll);
        advance_stage(state, config, &mut message);
        message
    } else {
        let dealt = (damage as f64 * 1.2).floor() as i32;
        let died = state.apply_damage(dealt);

        let mut message = format!(
            "The {} catches you mid-flight (rolled {}), tearing into you for {}.",
            name, roll, dealt
        );
        if died {
            state.is_complete = true;
            state.victory = false;
            message.push_str(" You collapse - the run is over.");
        }
        message
    };

    state.push_log(message.clone());
    message
}

fn proceed(state: &mut GameState, config: &GameConfig) -> String {
    let message = match state.current_encounter.clone() {
        Some(Encounter::Trap { name, damage }) => {
            let died = state.apply_damage(damage);
            state.current_encounter = None;

            let mut message = format!("The {} springs, dealing {} damage.", name, damage);
            if died {
                state.is_complete = true;
                state.victory = false;
                message.push_str(" You collapse - the run is over.");
            } else {
                advance_stage(state, config, &mut message);
            }
            message
        }
        Some(Encounter::Rest { heal }) => {
            state.heal(heal);
            state.score += 50;
            state.current_encounter = None;

            let mut message = format!(
                "You rest and recover {} health ({}/{}).",
                heal, state.health, state.max_health
            );
            advance_stage(state, config, &mut message);
            message
        }
        _ => return "There is nothing to proceed through.".to_string(),
    };

    state.push_log(message.clone());
    message
}

fn take_treasure(state: &mut GameState, config: &GameConfig) -> String {
    let Some(Encounter::Treasure { name, gold }) = state.current_encounter.clone() else {
        return "There is no treasure here.".to_string();
    };

    state.gold += gold;
    state.score += gold;
    state.current_encounter = None;

    let mut message = format!("You pocket the {}: +{} gold.", name, gold);
    advance_stage(state, config, &mut message);
    state.push_log(message.clone());
    message
}

fn leave_treasure(state: &mut GameState, config: &GameConfig) -> String {
    let Some(Encounter::Treasure { name, .. }) = state.current_encounter.clone() else {
        return "There is no treasure here.".to_string();
    };

    state.score += 25;
    state.current_encounter = None;

    let mut message = format!("You leave the {} untouched and move on.", name);
    advance_stage(state, config, &mut message);
    state.push_log(message.clone());
    message
}

/// Advance the stage after an encounter clears, then run the victory check.
///
/// On victory the completion bonus lands on `score` and a closing clause is
/// folded into the action's single narrative line.
fn advance_stage(state: &mut GameState, config: &GameConfig, message: &mut String) {
    state.stage += 1;

    if state.stage >= config.total_stages && state.current_encounter.is_none() {
        state.is_complete = true;
        state.victory = true;
        state.score += state.health * 2 + state.gold;
        message.push_str(" Daylight ahead - you emerge from the dungeon victorious!");
    }
}

// =============================================================================
// TESTS
// =============================================================================

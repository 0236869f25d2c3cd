//! Solo Encounter Generation
//!
//! Turns one biased RNG draw into a fully-populated encounter record,
//! scaled for the player's progress stage. Template tables are baked in;
//! their exact contents are part of the replay contract.

use serde::{Serialize, Deserialize};

use crate::core::rng::SeededRng;

/// Directional choice a player makes between stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathChoice {
    /// Bias +0.10 on the encounter roll, nudging toward the later bands.
    Left,
    /// Bias -0.10, nudging toward the combat band.
    Right,
}

impl PathChoice {
    /// Probability bias applied to the encounter roll.
    #[inline]
    pub fn bias(self) -> f64 {
        match self {
            PathChoice::Left => 0.10,
            PathChoice::Right => -0.10,
        }
    }

    /// Narrative direction word.
    pub fn label(self) -> &'static str {
        match self {
            PathChoice::Left => "left",
            PathChoice::Right => "right",
        }
    }
}

/// One discrete event the player faces.
///
/// Always exactly one fully-populated variant; a mix of fields from two
/// kinds cannot be represented.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encounter {
    /// A hostile creature blocking the path.
    Combat {
        name: String,
        health: i32,
        max_health: i32,
        damage: i32,
    },
    /// Loot free for the taking (or leaving).
    Treasure {
        name: String,
        gold: i32,
    },
    /// A hazard that damages the player when processed.
    Trap {
        name: String,
        damage: i32,
    },
    /// A safe spot that restores health.
    Rest {
        heal: i32,
    },
}

impl Encounter {
    /// Kind label used in narration and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Encounter::Combat { .. } => "combat",
            Encounter::Treasure { .. } => "treasure",
            Encounter::Trap { .. } => "trap",
            Encounter::Rest { .. } => "rest",
        }
    }
}

/// Enemy template row: base stats before stage scaling.
#[derive(Clone, Copy, Debug)]
pub struct EnemyTemplate {
    /// Display name.
    pub name: &'static str,
    /// Base health.
    pub health: i32,
    /// Base damage per hit.
    pub damage: i32,
}

/// Treasure template row.
#[derive(Clone, Copy, Debug)]
pub struct TreasureTemplate {
    /// Display name.
    pub name: &'static str,
    /// Base gold amount.
    pub gold: i32,
}

/// Trap template row.
#[derive(Clone, Copy, Debug)]
pub struct TrapTemplate {
    /// Display name.
    pub name: &'static str,
    /// Base damage.
    pub damage: i32,
}

/// Enemy table. Order and values are part of the replay contract.
pub const ENEMY_TEMPLATES: [EnemyTemplate; 8] = [
    EnemyTemplate { name: "Goblin Scout", health: 15, damage: 5 },
    EnemyTemplate { name: "Cave Bat", health: 10, damage: 4 },
    EnemyTemplate { name: "Dire Rat", health: 12, damage: 4 },
    EnemyTemplate { name: "Skeleton Guard", health: 20, damage: 6 },
    EnemyTemplate { name: "Shadow Cultist", health: 18, damage: 7 },
    EnemyTemplate { name: "Orc Raider", health: 25, damage: 8 },
    EnemyTemplate { name: "Wraith", health: 22, damage: 10 },
    EnemyTemplate { name: "Stone Golem", health: 35, damage: 9 },
];

/// Treasure table.
pub const TREASURE_TEMPLATES: [TreasureTemplate; 4] = [
    TreasureTemplate { name: "Dusty Coin Pouch", gold: 15 },
    TreasureTemplate { name: "Silver Cache", gold: 25 },
    TreasureTemplate { name: "Gilded Strongbox", gold: 40 },
    TreasureTemplate { name: "Royal Hoard", gold: 60 },
];

/// Trap table.
pub const TRAP_TEMPLATES: [TrapTemplate; 4] = [
    TrapTemplate { name: "Poison Dart", damage: 6 },
    TrapTemplate { name: "Spike Pit", damage: 8 },
    TrapTemplate { name: "Flame Rune", damage: 10 },
    TrapTemplate { name: "Collapsing Ceiling", damage: 12 },
];

/// Health restored by a rest encounter. No rest table exists; the amount
/// is flat and unscaled.
pub const REST_HEAL: i32 = 20;

/// Generate one encounter for `stage` given the player's directional choice.
///
/// Exactly one uniform draw decides the encounter band; combat, treasure
/// and trap consume one further draw for the template pick. The biased
/// value is compared against the band thresholds sequentially with `<`,
/// so a roll pushed past 1.0 by the left bias still lands in the final
/// rest band (catch-all, no clamping).
pub fn generate_encounter(rng: &mut SeededRng, stage: u32, choice: PathChoice) -> Encounter {
    let biased = rng.next_f64() + choice.bias();

    let danger_mult = 1.0 + stage as f64 * 0.15;
    let gold_mult = 1.0 + stage as f64 * 0.10;

    if biased < 0.5 {
        let template = rng.pick(&ENEMY_TEMPLATES).expect("enemy table is non-empty");
        let health = (template.health as f64 * danger_mult).floor() as i32;
        Encounter::Combat {
            name: template.name.to_string(),
            health,
            max_health: health,
            damage: (template.damage as f64 * danger_mult).floor() as i32,
        }
    } else if biased < 0.7 {
        let template = rng.pick(&TREASURE_TEMPLATES).expect("treasure table is non-empty");
        Encounter::Treasure {
            name: template.name.to_string(),
            gold: (template.gold as f64 * gold_mult).floor() as i32,
        }
    } else if biased < 0.85 {
        let template = rng.pick(&TRAP_TEMPLATES).expect("trap table is non-empty");
        Encounter::Trap {
            name: template.name.to_string(),
            damage: (template.damage as f64 * danger_mult).floor() as i32,
        }
    } else {
        Encounter::Rest { heal: REST_HEAL }
    }
}

// =============================================================================
// TESTS
// =============================================================================

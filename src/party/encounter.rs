//! Party Room Generation
//!
//! Each room entry consumes one weighted draw from the party RNG (plus
//! template picks), scaled by the current floor. Every fifth room forces
//! a boss combat regardless of the weighted table.

use serde::{Serialize, Deserialize};

use crate::core::rng::SeededRng;
use crate::party::state::EnemyState;

/// The room event currently on screen for the party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEncounter {
    /// Hostiles in the room; `enemies` is the spawned set used to
    /// (re)initialize combat.
    Combat {
        description: String,
        enemies: Vec<EnemyState>,
        boss: bool,
    },
    /// A chest or cache; looted via the `treasure` choice.
    Treasure { description: String },
    /// A hazard that fires on entry.
    Trap { description: String, damage: i32 },
    /// A safe room; restores the party via the `rest` choice.
    Rest { description: String },
    /// A narrative event.
    Dialogue { description: String },
    /// Synthesized after a cleared combat.
    Loot { description: String },
    /// Synthesized after a successful flee.
    Escaped { description: String },
}

impl RoomEncounter {
    /// Kind label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RoomEncounter::Combat { boss: true, .. } => "boss",
            RoomEncounter::Combat { .. } => "combat",
            RoomEncounter::Treasure { .. } => "treasure",
            RoomEncounter::Trap { .. } => "trap",
            RoomEncounter::Rest { .. } => "rest",
            RoomEncounter::Dialogue { .. } => "dialogue",
            RoomEncounter::Loot { .. } => "loot",
            RoomEncounter::Escaped { .. } => "escaped",
        }
    }

    /// Short narration for the room, used in the action log.
    pub fn description(&self) -> &str {
        match self {
            RoomEncounter::Combat { description, .. }
            | RoomEncounter::Treasure { description }
            | RoomEncounter::Trap { description, .. }
            | RoomEncounter::Rest { description }
            | RoomEncounter::Dialogue { description }
            | RoomEncounter::Loot { description }
            | RoomEncounter::Escaped { description } => description,
        }
    }
}

/// Enemy template row for party combats.
#[derive(Clone, Copy, Debug)]
pub struct PartyEnemyTemplate {
    /// Display name.
    pub name: &'static str,
    /// Base health before floor scaling.
    pub health: i32,
    /// Base damage before floor scaling.
    pub damage: i32,
    /// Defense rating.
    pub defense: i32,
    /// Client icon key.
    pub icon: &'static str,
}

/// Regular enemy table for party combats.
pub const PARTY_ENEMY_TEMPLATES: [PartyEnemyTemplate; 6] = [
    PartyEnemyTemplate { name: "Gnawing Ghoul", health: 30, damage: 8, defense: 2, icon: "ghoul" },
    PartyEnemyTemplate { name: "Crypt Spider", health: 24, damage: 10, defense: 1, icon: "spider" },
    PartyEnemyTemplate { name: "Bone Archer", health: 28, damage: 9, defense: 2, icon: "archer" },
    PartyEnemyTemplate { name: "Fell Hound", health: 26, damage: 11, defense: 1, icon: "hound" },
    PartyEnemyTemplate { name: "Rusted Sentinel", health: 40, damage: 7, defense: 4, icon: "sentinel" },
    PartyEnemyTemplate { name: "Grave Warden", health: 36, damage: 10, defense: 3, icon: "warden" },
];

/// Boss table; one boss guards every fifth room.
pub const BOSS_TEMPLATES: [PartyEnemyTemplate; 3] = [
    PartyEnemyTemplate { name: "The Pale King", health: 120, damage: 18, defense: 5, icon: "pale_king" },
    PartyEnemyTemplate { name: "Mother of Webs", health: 100, damage: 16, defense: 4, icon: "web_mother" },
    PartyEnemyTemplate { name: "Hollow Colossus", health: 150, damage: 14, defense: 6, icon: "colossus" },
];

/// Interval at which a boss room is forced.
pub const BOSS_ROOM_INTERVAL: u32 = 5;

/// Floor scaling applied to enemy health/damage and trap damage.
#[inline]
fn floor_multiplier(floor: u32) -> f64 {
    1.0 + floor.saturating_sub(1) as f64 * 0.15
}

fn spawn_enemy(template: &PartyEnemyTemplate, index: usize, mult: f64) -> EnemyState {
    let health = (template.health as f64 * mult).floor() as i32;
    EnemyState {
        id: format!("enemy_{}", index),
        name: template.name.to_string(),
        health,
        max_health: health,
        damage: (template.damage as f64 * mult).floor() as i32,
        defense: template.defense,
        icon: template.icon.to_string(),
    }
}

/// Generate the encounter for a freshly-entered room.
///
/// Draw order: boss rooms consume one template pick; weighted rooms
/// consume one band roll, then combat adds one count roll and one pick
/// per enemy, traps add one damage roll.
pub fn generate_room_encounter(rng: &mut SeededRng, floor: u32, room: u32) -> RoomEncounter {
    let mult = floor_multiplier(floor);

    if room % BOSS_ROOM_INTERVAL == 0 {
        let template = rng.pick(&BOSS_TEMPLATES).expect("boss table is non-empty");
        let enemy = spawn_enemy(template, 0, mult);
        return RoomEncounter::Combat {
            description: format!("{} bars the way. The air goes cold.", enemy.name),
            enemies: vec![enemy],
            boss: true,
        };
    }

    let roll = rng.next_f64();

    if roll < 0.4 {
        let count = rng.next_int(1, 4);
        let enemies: Vec<EnemyState> = (0..count)
            .map(|i| {
                let template = rng
                    .pick(&PARTY_ENEMY_TEMPLATES)
                    .expect("enemy table is non-empty");
                spawn_enemy(template, i as usize, mult)
            })
            .collect();

        let description = if enemies.len() == 1 {
            format!("A {} lurches out of the dark!", enemies[0].name)
        } else {
            format!("{} enemies pour out of the dark!", enemies.len())
        };

        RoomEncounter::Combat { description, enemies, boss: false }
    } else if roll < 0.6 {
        RoomEncounter::Treasure {
            description: "An unlocked chest glints in the torchlight.".to_string(),
        }
    } else if roll < 0.75 {
        let damage = ((5 + rng.next_int(0, 7)) as f64 * mult).floor() as i32;
        RoomEncounter::Trap {
            description: "The floor gives way - a trap!".to_string(),
            damage,
        }
    } else if roll < 0.85 {
        RoomEncounter::Rest {
            description: "A warded chamber, quiet enough to catch your breath.".to_string(),
        }
    } else {
        RoomEncounter::Dialogue {
            description: "A hooded figure beckons from an alcove.".to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_determinism() {
        let mut rng1 = SeededRng::from_seed("party_seed").unwrap();
        let mut rng2 = SeededRng::from_seed("party_seed").unwrap();

        for room in 1..30 {
            let a = generate_room_encounter(&mut rng1, 1, room);
            let b = generate_room_encounter(&mut rng2, 1, room);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_boss_every_fifth_room() {
        let mut rng = SeededRng::from_seed("boss_cadence").unwrap();

        for room in 1..=20 {
            let encounter = generate_room_encounter(&mut rng, 1, room);
            if room % BOSS_ROOM_INTERVAL == 0 {
                assert!(
                    matches!(encounter, RoomEncounter::Combat { boss: true, .. }),
                    "room {} must be a boss room",
                    room
                );
            } else {
                assert!(
                    !matches!(encounter, RoomEncounter::Combat { boss: true, .. }),
                    "room {} must not be a boss room",
                    room
                );
            }
        }
    }

    #[test]
    fn test_enemy_ids_unique_within_combat() {
        let mut rng = SeededRng::from_seed("ids").unwrap();
        for room in 1..50 {
            if let RoomEncounter::Combat { enemies, .. } =
                generate_room_encounter(&mut rng, 2, room)
            {
                let mut ids: Vec<&str> = enemies.iter().map(|e| e.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), enemies.len());
            }
        }
    }

    #[test]
    fn test_floor_scaling() {
        // Floor 3 multiplier is 1.3; a floor-1 spawn matches its template.
        let template = &PARTY_ENEMY_TEMPLATES[0];
        let base = spawn_enemy(template, 0, floor_multiplier(1));
        assert_eq!(base.health, template.health);
        assert_eq!(base.damage, template.damage);

        let scaled = spawn_enemy(template, 0, floor_multiplier(3));
        assert_eq!(scaled.health, (template.health as f64 * 1.3).floor() as i32);
        assert_eq!(scaled.damage, (template.damage as f64 * 1.3).floor() as i32);
    }

    #[test]
    fn test_all_room_kinds_reachable() {
        let mut rng = SeededRng::from_seed("coverage").unwrap();
        let mut seen = std::collections::BTreeSet::new();

        for room in 1..400 {
            let encounter = generate_room_encounter(&mut rng, 1, room);
            seen.insert(encounter.kind());
        }

        for kind in ["boss", "combat", "treasure", "trap", "rest", "dialogue"] {
            assert!(seen.contains(kind), "kind {} never generated", kind);
        }
    }
}

//! Gloomspire Demo
//!
//! Drives a scripted solo run and a party skirmish from fixed seeds,
//! then replays both and verifies the audit hashes match.

use chrono::{TimeZone, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gloomspire::{
    core::rng::SeededRng,
    game::{
        encounter::{Encounter, PathChoice},
        resolver::{final_score, resolve, GameConfig, SoloAction},
        state::GameState,
    },
    party::{
        engine::{process_action, set_ready, ChoiceId, PartyAction, PartyConfig},
        state::{CharacterClass, PartyGameState, PartyPlayer, PartyStatus, TurnPhase},
    },
    VERSION,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Gloomspire Engine v{}", VERSION);

    demo_solo_run()?;
    demo_party_skirmish()?;

    Ok(())
}

/// Play one solo run with a fixed seed and a simple policy, then replay
/// it and compare hashes.
fn demo_solo_run() -> anyhow::Result<()> {
    info!("=== Solo Run ===");

    let seed = "demo_seed_0451";
    let config = GameConfig::default();

    let run = |narrate: bool| -> anyhow::Result<GameState> {
        let mut state = GameState::new(config.starting_health);
        let mut rng = SeededRng::from_seed(seed)?;

        for _ in 0..200 {
            if state.is_complete {
                break;
            }
            let action = match &state.current_encounter {
                None => SoloAction::ChoosePath { choice: PathChoice::Left },
                Some(Encounter::Combat { .. }) => SoloAction::Attack,
                Some(Encounter::Treasure { .. }) => SoloAction::TakeTreasure,
                Some(Encounter::Trap { .. }) | Some(Encounter::Rest { .. }) => SoloAction::Proceed,
            };
            let message = resolve(&mut state, action, &mut rng, &config);
            if narrate {
                info!("  {}", message);
            }
        }
        Ok(state)
    };

    let state = run(true)?;
    info!(
        victory = state.victory,
        health = state.health,
        gold = state.gold,
        score = final_score(&state),
        "solo run finished"
    );

    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    let replay = run(false)?;
    let replay_hash = replay.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        anyhow::bail!("determinism failure: hashes differ");
    }

    Ok(())
}

/// Run a three-member party through the dungeon with a fixed seed, then
/// replay and compare hashes.
fn demo_party_skirmish() -> anyhow::Result<()> {
    info!("=== Party Skirmish ===");

    let seed = "demo_party_0451";
    let config = PartyConfig::default();
    // Pinned timestamp so the replayed log is bit-identical.
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single()
        .ok_or_else(|| anyhow::anyhow!("invalid demo timestamp"))?;

    let roster = || {
        vec![
            PartyPlayer::new("addr_ana", "Ana", CharacterClass::Warrior),
            PartyPlayer::new("addr_bo", "Bo", CharacterClass::Mage),
            PartyPlayer::new("addr_cyn", "Cyn", CharacterClass::Rogue),
        ]
    };

    let run = |narrate: bool| -> anyhow::Result<PartyGameState> {
        let mut state = PartyGameState::new("party-demo", seed, roster())?;
        for addr in ["addr_ana", "addr_bo", "addr_cyn"] {
            set_ready(&mut state, addr, now);
        }

        for _ in 0..120 {
            if state.status != PartyStatus::Active {
                break;
            }
            let outcome = match state.turn_phase {
                TurnPhase::Combat => {
                    let Some(actor) = state.current_turn_player.clone() else { break };
                    let Some(target) = state
                        .combat
                        .as_ref()
                        .and_then(|c| c.enemies.first())
                        .map(|e| e.id.clone())
                    else {
                        break;
                    };
                    process_action(&mut state, &actor, PartyAction::Attack { target }, now, &config)
                }
                _ => process_action(
                    &mut state,
                    "addr_ana",
                    PartyAction::Choice { choice: ChoiceId::Enter },
                    now,
                    &config,
                ),
            };
            if narrate {
                info!("  {}", outcome.message);
            }
        }
        Ok(state)
    };

    let state = run(true)?;
    info!(
        status = ?state.status,
        floor = state.current_floor,
        room = state.current_room,
        turns = state.turn_number,
        "party skirmish finished"
    );
    for player in &state.players {
        info!(
            "  {} ({}) - {} HP, {} gold, {} score, alive: {}",
            player.name,
            player.class.label(),
            player.health,
            player.gold,
            player.score,
            player.is_alive
        );
    }

    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    let replay = run(false)?;
    let replay_hash = replay.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        anyhow::bail!("determinism failure: hashes differ");
    }

    Ok(())
}

//! Scenario catalog: scripted worlds exercising the turn engine end to
//! end, plus the multi-turn campaign and determinism drivers.

use std::time::{Duration, Instant};

use colored::Colorize;
use log::debug;
use serde::{Deserialize, Serialize};

use farhold_game::movement::MAX_JUMP_RANGE_LY;
use farhold_game::numbers::{FUEL_STEP, fuel_centi};
use farhold_game::{
    Army, ArmyContainer, Command, Faction, Fleet, FleetState, GalaxyConfig, MovementError, Planet,
    PlanetKind, SaveGame, Ship, ShipType, StarSystem, TurnReport, Vec3, WorldState, advance_turn,
    apply_fog, check_integrity, run_conquest_phase, validate_and_debit_jump, worldgen,
};
use farhold_game::ids::{ArmyId, FactionId, FleetId, PlanetId, ShipId, SystemId};

use super::seeds::SeedInfo;

/// Knobs shared by every scenario run.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub turns: u32,
    pub verbose: bool,
}

/// One scenario run against one seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub seed: u64,
    pub seed_code: String,
    pub passed: bool,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    run: fn(&ScenarioConfig) -> Vec<String>,
}

impl Scenario {
    pub fn run(&self, info: &SeedInfo, turns: u32, verbose: bool) -> ScenarioOutcome {
        let config = ScenarioConfig {
            seed: info.seed,
            turns,
            verbose,
        };
        let start = Instant::now();
        let failures = (self.run)(&config);
        let duration = start.elapsed();
        let passed = failures.is_empty();

        if verbose {
            let status = if passed { "✅".green() } else { "❌".red() };
            println!(
                "  {status} {} (seed {}) in {duration:?}",
                self.key,
                info.share_code()
            );
            for failure in &failures {
                println!("     • {}", failure.red());
            }
        }

        ScenarioOutcome {
            scenario: self.key.to_string(),
            seed: info.seed,
            seed_code: info.share_code(),
            passed,
            failures,
            duration,
        }
    }
}

const CATALOG: [Scenario; 8] = [
    Scenario {
        key: "transport-jump",
        description: "A 40 ly jump drains a transport to exactly 20 fuel",
        run: run_transport_jump,
    },
    Scenario {
        key: "fuel-shortage",
        description: "A 60 ly jump fails atomically with a 20-unit shortfall",
        run: run_fuel_shortage,
    },
    Scenario {
        key: "ground-conquest",
        description: "100 vs 40 troops: the planet falls, nobody bleeds for free",
        run: run_ground_conquest,
    },
    Scenario {
        key: "tri-faction-tie",
        description: "Three factions, powers 50/50/0: deadlock changes nothing",
        run: run_tri_faction_tie,
    },
    Scenario {
        key: "fog-idempotence",
        description: "Filtering a world through fog twice equals filtering once",
        run: run_fog_idempotence,
    },
    Scenario {
        key: "save-roundtrip",
        description: "Encode/decode reproduces the world and its RNG position",
        run: run_save_roundtrip,
    },
    Scenario {
        key: "campaign",
        description: "Seeded multi-turn war with invariant checks every turn",
        run: run_campaign,
    },
    Scenario {
        key: "determinism",
        description: "Two runs of the same seed stay digest-identical per turn",
        run: run_determinism,
    },
];

#[must_use]
pub fn get_scenario(key: &str) -> Option<&'static Scenario> {
    CATALOG.iter().find(|scenario| scenario.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

fn expect(failures: &mut Vec<String>, ok: bool, message: impl Into<String>) {
    if !ok {
        failures.push(message.into());
    }
}

// --- hand-built worlds -------------------------------------------------

/// Two systems `distance_ly` apart; one crimson transport orbits the first.
fn route_world(seed: u64, distance_ly: f64) -> WorldState {
    let mut world = WorldState::new(seed);
    for id in ["crimson", "viridian"] {
        world.factions.push(Faction {
            id: FactionId::from(id),
            name: id.to_string(),
            is_player: id == "crimson",
        });
    }
    world.systems.push(StarSystem {
        id: SystemId::from("sys-a"),
        name: "Anser".to_string(),
        position: Vec3::ZERO,
        owner: Some(FactionId::from("crimson")),
        planets: vec![Planet {
            id: PlanetId::from("pa"),
            name: "Anser I".to_string(),
            kind: PlanetKind::Solid,
            owner: Some(FactionId::from("crimson")),
        }],
    });
    world.systems.push(StarSystem {
        id: SystemId::from("sys-b"),
        name: "Borel".to_string(),
        position: Vec3::new(distance_ly, 0.0, 0.0),
        owner: None,
        planets: vec![Planet {
            id: PlanetId::from("pb"),
            name: "Borel I".to_string(),
            kind: PlanetKind::Solid,
            owner: None,
        }],
    });
    let mut fleet = Fleet::new(FleetId::from("f1"), FactionId::from("crimson"), Vec3::ZERO);
    fleet.orbit_system = Some(SystemId::from("sys-a"));
    fleet
        .ships
        .push(Ship::new(ShipId::from("s1"), ShipType::Transport));
    world.fleets.push(fleet);
    world
}

/// One solid planet owned by `owner`, with whatever armies the caller adds.
fn battlefield(seed: u64, owner: Option<&str>, factions: &[&str]) -> WorldState {
    let mut world = WorldState::new(seed);
    for id in factions {
        world.factions.push(Faction {
            id: FactionId::from(*id),
            name: (*id).to_string(),
            is_player: false,
        });
    }
    world.systems.push(StarSystem {
        id: SystemId::from("sys-1"),
        name: "Veil".to_string(),
        position: Vec3::ZERO,
        owner: owner.map(FactionId::from),
        planets: vec![Planet {
            id: PlanetId::from("p1"),
            name: "Veil Prime".to_string(),
            kind: PlanetKind::Solid,
            owner: owner.map(FactionId::from),
        }],
    });
    world
}

fn deploy(world: &mut WorldState, id: &str, faction: &str, strength: u32) {
    world.armies.push(Army::new(
        ArmyId::from(id),
        FactionId::from(faction),
        strength,
        ArmyContainer::Planet {
            id: PlanetId::from("p1"),
        },
    ));
}

// --- catalog entries ---------------------------------------------------

fn run_transport_jump(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let mut world = route_world(config.seed, 40.0);

    match validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b")) {
        Ok(receipt) => {
            expect(
                &mut failures,
                !receipt.already_en_route,
                "a first jump order must not read as already en route",
            );
            expect(
                &mut failures,
                (receipt.fuel_debited - 80.0).abs() < 1e-9,
                format!("expected 80 fuel debited, got {}", receipt.fuel_debited),
            );
            let fuel = world.fleets[0].ships[0].fuel;
            expect(
                &mut failures,
                (fuel - 20.0).abs() < 1e-9,
                format!("expected 20 fuel remaining, got {fuel}"),
            );
            expect(
                &mut failures,
                world.fleets[0].state == FleetState::Moving,
                "fleet must be in flight after a paid jump",
            );
        }
        Err(err) => failures.push(format!("jump within reach was rejected: {err}")),
    }
    failures
}

fn run_fuel_shortage(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let mut world = route_world(config.seed, 60.0);
    let before = world.state_digest();

    match validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b")) {
        Err(MovementError::InsufficientFuel { shortages }) => {
            expect(
                &mut failures,
                shortages.len() == 1,
                format!("expected one shortage, got {}", shortages.len()),
            );
            if let Some(shortage) = shortages.first() {
                expect(
                    &mut failures,
                    (shortage.shortfall - 20.0).abs() < 1e-9,
                    format!("expected a 20-unit shortfall, got {}", shortage.shortfall),
                );
            }
        }
        Err(other) => failures.push(format!("wrong rejection: {other}")),
        Ok(_) => failures.push("a 120-fuel jump cleared a 100-unit tank".to_string()),
    }
    expect(
        &mut failures,
        world.state_digest() == before,
        "a rejected jump must leave the world untouched",
    );
    failures
}

fn run_ground_conquest(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let mut world = battlefield(config.seed, Some("cobalt"), &["amber", "cobalt"]);
    deploy(&mut world, "atk", "amber", 100);
    deploy(&mut world, "def", "cobalt", 40);

    let outcomes = run_conquest_phase(&mut world);
    let Some(outcome) = outcomes.first() else {
        return vec!["contested planet produced no conquest outcome".to_string()];
    };
    expect(
        &mut failures,
        outcome.winner == Some(FactionId::from("amber")),
        "the 100-power faction must win",
    );
    let loser_losses = outcome
        .losses
        .get(&FactionId::from("cobalt"))
        .copied()
        .unwrap_or(0);
    expect(&mut failures, loser_losses > 0, "loser attrition must be positive");

    let winner_survives = world
        .armies_on_planet(&PlanetId::from("p1"))
        .any(|army| army.faction == FactionId::from("amber") && army.strength > 0);
    let owner = world
        .system(&SystemId::from("sys-1"))
        .and_then(|system| system.planets[0].owner.clone());
    if outcome.captured {
        expect(
            &mut failures,
            winner_survives,
            "ownership flipped without a surviving winner army",
        );
        expect(
            &mut failures,
            owner == Some(FactionId::from("amber")),
            "captured planet must record its new owner",
        );
    } else {
        expect(
            &mut failures,
            owner == Some(FactionId::from("cobalt")),
            "uncaptured planet must keep its owner",
        );
    }
    failures
}

fn run_tri_faction_tie(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let mut world = battlefield(config.seed, Some("drab"), &["amber", "cobalt", "drab"]);
    deploy(&mut world, "a", "amber", 50);
    deploy(&mut world, "b", "cobalt", 50);
    // drab holds the planet but fields nothing.

    let outcomes = run_conquest_phase(&mut world);
    let Some(outcome) = outcomes.first() else {
        return vec!["tied contest produced no outcome record".to_string()];
    };
    expect(&mut failures, outcome.stalemate, "equal powers must deadlock");
    expect(
        &mut failures,
        !outcome.captured,
        "a tie must never change ownership",
    );
    let owner = world
        .system(&SystemId::from("sys-1"))
        .and_then(|system| system.planets[0].owner.clone());
    expect(
        &mut failures,
        owner == Some(FactionId::from("drab")),
        "the absent owner keeps the planet through a deadlock",
    );
    failures
}

fn run_fog_idempotence(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let galaxy = GalaxyConfig {
        faction_count: 3,
        ..GalaxyConfig::default()
    };
    let world = match worldgen::generate(&galaxy, config.seed) {
        Ok(world) => world,
        Err(err) => return vec![format!("worldgen failed: {err}")],
    };

    for faction in &world.factions {
        let first = apply_fog(&world, &faction.id).fleet_ids();
        let second = apply_fog(&world, &faction.id).fleet_ids();
        expect(
            &mut failures,
            first == second,
            format!("fog filter is not idempotent for {}", faction.id),
        );
        let own_hidden = world
            .fleets
            .iter()
            .filter(|fleet| fleet.faction == faction.id)
            .any(|fleet| !first.contains(&fleet.id));
        expect(
            &mut failures,
            !own_hidden,
            format!("{} cannot see its own fleets", faction.id),
        );
    }
    failures
}

fn run_save_roundtrip(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let mut world = match worldgen::generate(&GalaxyConfig::default(), config.seed) {
        Ok(world) => world,
        Err(err) => return vec![format!("worldgen failed: {err}")],
    };
    for _ in 0..3 {
        if let Err(err) = advance_turn(&mut world, &[]) {
            return vec![format!("turn advance failed before saving: {err}")];
        }
    }

    let digest = world.state_digest();
    let draws = world.rng.draws();
    let raw = match SaveGame::wrap(world, "tester").encode() {
        Ok(raw) => raw,
        Err(err) => return vec![format!("encode failed: {err}")],
    };
    match SaveGame::decode(&raw) {
        Ok(restored) => {
            expect(
                &mut failures,
                restored.state.state_digest() == digest,
                "decode must reproduce the serialized state bit for bit",
            );
            expect(
                &mut failures,
                restored.state.rng.draws() == draws,
                "decode must resume the RNG at its saved position",
            );
        }
        Err(err) => failures.push(format!("decode failed: {err}")),
    }
    failures
}

// --- campaign ----------------------------------------------------------

/// Scripted doctrine for every faction: garrisons embark, loaded fleets
/// strike the nearest foreign system. Purely a function of the state it
/// reads, so identical states always script identical orders.
fn plan_commands(world: &WorldState) -> Vec<Command> {
    let mut commands = Vec::new();
    for fleet in &world.fleets {
        if fleet.state != FleetState::Orbit || !fleet.has_living_ships() {
            continue;
        }
        let Some(here) = fleet.orbit_system.as_ref() else {
            continue;
        };
        let carrying = fleet
            .living_ships()
            .any(|ship| ship.cargo_army.is_some());

        if carrying {
            let target = world
                .systems
                .iter()
                .filter(|system| {
                    system
                        .effective_owner()
                        .is_some_and(|owner| *owner != fleet.faction)
                })
                .filter(|system| {
                    fleet.position.distance_to(system.position) <= MAX_JUMP_RANGE_LY
                })
                .min_by(|a, b| {
                    fleet
                        .position
                        .distance_to(a.position)
                        .total_cmp(&fleet.position.distance_to(b.position))
                });
            if let Some(target) = target {
                commands.push(Command::OrderInvade {
                    fleet: fleet.id.clone(),
                    system: target.id.clone(),
                    planet: None,
                });
                commands.push(Command::MoveFleet {
                    fleet: fleet.id.clone(),
                    system: target.id.clone(),
                });
            }
        } else if fleet.free_berths() > 0
            && world
                .system(here)
                .is_some_and(|system| system.effective_owner() == Some(&fleet.faction))
        {
            let friendly_troops_here = world.system(here).is_some_and(|system| {
                system.planets.iter().any(|planet| {
                    world
                        .armies_on_planet(&planet.id)
                        .any(|army| army.faction == fleet.faction)
                })
            });
            if friendly_troops_here {
                commands.push(Command::OrderLoad {
                    fleet: fleet.id.clone(),
                    system: here.clone(),
                });
            }
        }
    }
    commands
}

/// Invariants every turn must uphold, checked from outside the core.
fn turn_invariants(world: &WorldState, report: &TurnReport) -> Vec<String> {
    let mut failures = Vec::new();

    if let Err(err) = check_integrity(world) {
        failures.push(format!("day {}: integrity check failed: {err}", world.day));
    }

    for fleet in &world.fleets {
        for ship in &fleet.ships {
            let capacity = ship.kind.stats().fuel_capacity;
            if !(0.0..=capacity).contains(&ship.fuel) {
                failures.push(format!(
                    "day {}: ship {} fuel {} outside [0, {capacity}]",
                    world.day, ship.id, ship.fuel
                ));
            }
            let quantized = f64::from(i32::try_from(fuel_centi(ship.fuel)).unwrap_or(0)) * FUEL_STEP;
            if (quantized - ship.fuel).abs() > 1e-9 {
                failures.push(format!(
                    "day {}: ship {} fuel {} is not a multiple of {FUEL_STEP}",
                    world.day, ship.id, ship.fuel
                ));
            }
        }
    }

    for battle in &world.battles {
        let rogue = battle
            .survivors
            .iter()
            .any(|id| !battle.opening.iter().any(|snap| &snap.ship == id));
        if rogue {
            failures.push(format!(
                "day {}: battle {} lists a survivor missing from its opening roster",
                world.day, battle.id
            ));
        }
    }

    for change in &report.ownership_changes {
        let holds = world
            .armies_on_planet(&change.planet)
            .any(|army| army.faction == change.new_owner && army.strength > 0);
        if !holds {
            failures.push(format!(
                "day {}: {} took {} without a surviving army on it",
                world.day, change.new_owner, change.planet
            ));
        }
    }

    failures
}

fn run_campaign(config: &ScenarioConfig) -> Vec<String> {
    let mut failures = Vec::new();
    let galaxy = GalaxyConfig {
        faction_count: 3,
        ..GalaxyConfig::default()
    };
    let mut world = match worldgen::generate(&galaxy, config.seed) {
        Ok(world) => world,
        Err(err) => return vec![format!("worldgen failed: {err}")],
    };

    for _ in 0..config.turns {
        let commands = plan_commands(&world);
        debug!("day {}: scripting {} command(s)", world.day + 1, commands.len());
        let report = match advance_turn(&mut world, &commands) {
            Ok(report) => report,
            Err(err) => {
                failures.push(format!("day {}: turn aborted: {err}", world.day + 1));
                break;
            }
        };
        failures.extend(turn_invariants(&world, &report));
        if world.victory.winner.is_some() {
            break;
        }
    }

    if config.verbose {
        println!(
            "     campaign: day {}, {} fleets, {} battles fought, winner {:?}",
            world.day,
            world.fleets.len(),
            world.battles.len(),
            world.victory.winner
        );
    }
    failures
}

fn run_determinism(config: &ScenarioConfig) -> Vec<String> {
    let galaxy = GalaxyConfig {
        faction_count: 3,
        ..GalaxyConfig::default()
    };
    let mut first = match worldgen::generate(&galaxy, config.seed) {
        Ok(world) => world,
        Err(err) => return vec![format!("worldgen failed: {err}")],
    };
    let mut second = match worldgen::generate(&galaxy, config.seed) {
        Ok(world) => world,
        Err(err) => return vec![format!("worldgen failed: {err}")],
    };
    if first.state_digest() != second.state_digest() {
        return vec!["identical seeds generated divergent galaxies".to_string()];
    }

    for turn in 1..=config.turns {
        // Orders are scripted from each run's own state; identical states
        // must script identical orders.
        let commands_first = plan_commands(&first);
        let commands_second = plan_commands(&second);
        if commands_first != commands_second {
            return vec![format!("turn {turn}: the two runs scripted different orders")];
        }
        if let Err(err) = advance_turn(&mut first, &commands_first) {
            return vec![format!("turn {turn}: first run aborted: {err}")];
        }
        if let Err(err) = advance_turn(&mut second, &commands_second) {
            return vec![format!("turn {turn}: second run aborted: {err}")];
        }
        if first.state_digest() != second.state_digest() {
            return vec![format!(
                "turn {turn}: digests diverge ({:#x} vs {:#x})",
                first.state_digest(),
                second.state_digest()
            )];
        }
    }
    Vec::new()
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

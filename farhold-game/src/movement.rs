//! Hyperjump validation, fuel debiting, and per-turn fleet movement.
//!
//! Fuel is quantized to [`crate::numbers::FUEL_STEP`] at every mutation and
//! all comparisons run over centi-units, so repeated jumps never accumulate
//! float drift. Jump validation is atomic: either every ship in the fleet
//! can pay and all are debited, or nothing changes.
//!
//! Arrival operations draw from the RNG in fleet-table order, then ship
//! order within a fleet. Changing that order changes every replay.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::fleets::{ArmyContainer, FleetState};
use crate::ids::{ArmyId, FleetId, PlanetId, SystemId};
use crate::numbers::{ceil_f64_to_u32, fuel_centi, quantize_fuel, quantize_fuel_up};
use crate::rng::sample_ratio;
use crate::rules::LandingRiskPolicy;
use crate::ships::ShipType;
use crate::world::WorldState;

/// Hard ceiling on a single hyperjump, in light-years.
pub const MAX_JUMP_RANGE_LY: f64 = 80.0;

/// Contested landings cost each army between 10% and 30% of its strength.
const LANDING_LOSS_BASE: f64 = 0.1;
const LANDING_LOSS_SPREAD: f64 = 0.2;

/// One ship that cannot pay for a requested jump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelShortage {
    pub ship: crate::ids::ShipId,
    pub kind: ShipType,
    pub required: f64,
    pub available: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MovementError {
    #[error("fleet {fleet} is not orbiting a system")]
    NotOrbiting { fleet: FleetId },
    #[error("jump of {distance_ly:.2} ly exceeds the {max_ly:.0} ly drive limit")]
    OutOfRange { distance_ly: f64, max_ly: f64 },
    #[error("{} ship(s) cannot pay for the jump", .shortages.len())]
    InsufficientFuel {
        shortages: SmallVec<[FuelShortage; 4]>,
    },
    #[error("unknown system {0}")]
    UnknownSystem(SystemId),
    #[error("unknown fleet {0}")]
    UnknownFleet(FleetId),
}

/// What a successful jump order actually changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpReceipt {
    /// The fleet was already heading there (or already orbiting the target);
    /// nothing was debited.
    pub already_en_route: bool,
    pub distance_ly: f64,
    pub fuel_debited: f64,
}

/// A fleet that reached its target system this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub fleet: FleetId,
    pub system: SystemId,
}

/// Counters for everything the arrival phase did, for the turn report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrivalOps {
    pub armies_unloaded: u32,
    pub armies_loaded: u32,
    pub armies_landed: u32,
    pub landings_aborted: u32,
    pub landing_losses: u32,
}

/// Fuel to move one hull of `kind` across `distance_ly`, rounded up to the
/// quantization step so the spender always covers the true cost.
#[must_use]
pub fn compute_jump_cost(kind: ShipType, distance_ly: f64) -> f64 {
    quantize_fuel_up(distance_ly * kind.stats().fuel_per_ly)
}

fn jump_shortages(
    fleet: &crate::fleets::Fleet,
    distance_ly: f64,
) -> SmallVec<[FuelShortage; 4]> {
    let mut shortages = SmallVec::new();
    for ship in fleet.living_ships() {
        let required = compute_jump_cost(ship.kind, distance_ly);
        if fuel_centi(ship.fuel) < fuel_centi(required) {
            shortages.push(FuelShortage {
                ship: ship.id.clone(),
                kind: ship.kind,
                required,
                available: quantize_fuel(ship.fuel),
                shortfall: quantize_fuel(required - ship.fuel),
            });
        }
    }
    shortages
}

/// True only if every living ship can cover its own share of the jump.
#[must_use]
pub fn can_pay_jump(fleet: &crate::fleets::Fleet, distance_ly: f64, unlimited_fuel: bool) -> bool {
    unlimited_fuel || jump_shortages(fleet, distance_ly).is_empty()
}

/// Validate a jump order and, on success, debit every ship and put the
/// fleet in flight. Re-ordering a fleet to the target it is already moving
/// toward (or orbiting) is a free no-op.
pub fn validate_and_debit_jump(
    world: &mut WorldState,
    fleet_id: &FleetId,
    target: &SystemId,
) -> Result<JumpReceipt, MovementError> {
    let target_position = world
        .system(target)
        .ok_or_else(|| MovementError::UnknownSystem(target.clone()))?
        .position;
    let day = world.day;
    let unlimited_fuel = world.rules.unlimited_fuel;

    let fleet = world
        .fleet_mut(fleet_id)
        .ok_or_else(|| MovementError::UnknownFleet(fleet_id.clone()))?;

    let distance_ly = fleet.position.distance_to(target_position);

    if fleet.state == FleetState::Moving && fleet.target_system.as_ref() == Some(target) {
        return Ok(JumpReceipt {
            already_en_route: true,
            distance_ly,
            fuel_debited: 0.0,
        });
    }
    if fleet.state == FleetState::Orbit && fleet.orbit_system.as_ref() == Some(target) {
        return Ok(JumpReceipt {
            already_en_route: true,
            distance_ly: 0.0,
            fuel_debited: 0.0,
        });
    }
    if fleet.state != FleetState::Orbit {
        return Err(MovementError::NotOrbiting {
            fleet: fleet_id.clone(),
        });
    }
    if distance_ly > MAX_JUMP_RANGE_LY {
        return Err(MovementError::OutOfRange {
            distance_ly,
            max_ly: MAX_JUMP_RANGE_LY,
        });
    }

    let mut fuel_debited = 0.0;
    if !unlimited_fuel {
        let shortages = jump_shortages(fleet, distance_ly);
        if !shortages.is_empty() {
            return Err(MovementError::InsufficientFuel { shortages });
        }
        for ship in fleet.ships.iter_mut().filter(|ship| ship.is_alive()) {
            let cost = compute_jump_cost(ship.kind, distance_ly);
            ship.fuel = quantize_fuel(ship.fuel - cost);
            fuel_debited += cost;
        }
    }

    fleet.orbit_system = None;
    fleet.target_system = Some(target.clone());
    fleet.target_position = Some(target_position);
    // Jumping out ends any retreat posture.
    fleet.retreating = false;
    fleet.set_state(FleetState::Moving, day);

    Ok(JumpReceipt {
        already_en_route: false,
        distance_ly,
        fuel_debited: quantize_fuel(fuel_debited),
    })
}

/// Movement phase: every fleet in flight steps toward its target by the
/// pace of its slowest hull, snapping onto the target when within one
/// turn's travel.
pub fn advance_fleets(world: &mut WorldState) -> Vec<Arrival> {
    let day = world.day;
    let mut arrivals = Vec::new();
    for fleet in &mut world.fleets {
        if fleet.state != FleetState::Moving {
            continue;
        }
        let Some(target_position) = fleet.target_position else {
            // Corrupt flight plan. Park the fleet where it stands.
            fleet.set_state(FleetState::Orbit, day);
            fleet.clear_movement();
            continue;
        };
        let speed = fleet.speed_ly_per_turn();
        if speed <= 0.0 {
            continue;
        }
        fleet.position = fleet.position.step_toward(target_position, speed);
        if fleet.position == target_position {
            if let Some(system) = fleet.target_system.take() {
                fleet.orbit_system = Some(system.clone());
                arrivals.push(Arrival {
                    fleet: fleet.id.clone(),
                    system,
                });
            }
            fleet.set_state(FleetState::Orbit, day);
            fleet.clear_movement();
        }
    }
    arrivals
}

struct PendingOps {
    fleet_idx: usize,
    unload: bool,
    load: bool,
    invade: bool,
    invade_planet: Option<PlanetId>,
}

/// Arrival phase: run the stored auto-operations of every orbiting fleet
/// whose intent matches the system it now orbits. Order is fixed per
/// fleet: unload, then load, then invasion. Intents are consumed whether
/// the operation succeeds or not.
pub fn process_arrivals<R: RngCore>(world: &mut WorldState, rng: &mut R) -> ArrivalOps {
    let mut ops = ArrivalOps::default();

    let mut pending = Vec::new();
    for (fleet_idx, fleet) in world.fleets.iter_mut().enumerate() {
        if fleet.state != FleetState::Orbit || !fleet.has_living_ships() {
            continue;
        }
        let Some(here) = fleet.orbit_system.clone() else {
            continue;
        };
        let unload = fleet.unload_target.take_if(|target| *target == here).is_some();
        let load = fleet.load_target.take_if(|target| *target == here).is_some();
        let invade = fleet.invade_target.take_if(|target| *target == here).is_some();
        let invade_planet = if invade { fleet.invade_planet.take() } else { None };
        if unload || load || invade {
            pending.push(PendingOps {
                fleet_idx,
                unload,
                load,
                invade,
                invade_planet,
            });
        }
    }

    for op in pending {
        if op.unload {
            apply_unload(world, op.fleet_idx, &mut ops);
        }
        if op.load {
            apply_load(world, op.fleet_idx, &mut ops);
        }
        if op.invade {
            apply_invasion(world, rng, op.fleet_idx, op.invade_planet.as_ref(), &mut ops);
        }
    }
    ops
}

fn apply_unload(world: &mut WorldState, fleet_idx: usize, ops: &mut ArrivalOps) {
    let fleet = &world.fleets[fleet_idx];
    let fleet_id = fleet.id.clone();
    let faction = fleet.faction.clone();
    let Some(system_id) = fleet.orbit_system.clone() else {
        return;
    };
    let Some(system) = world.system(&system_id) else {
        return;
    };
    if system.effective_owner() != Some(&faction) {
        world.push_log(format!(
            "Fleet {fleet_id} holds its troops: {system_id} is not friendly ground."
        ));
        return;
    }
    let Some(planet_id) = system.first_solid_planet().map(|planet| planet.id.clone()) else {
        world.push_log(format!(
            "Fleet {fleet_id} cannot unload at {system_id}: no solid planet."
        ));
        return;
    };

    let cargo: Vec<(usize, ArmyId)> = world.fleets[fleet_idx]
        .ships
        .iter()
        .enumerate()
        .filter(|(_, ship)| ship.is_alive())
        .filter_map(|(idx, ship)| ship.cargo_army.clone().map(|army| (idx, army)))
        .collect();
    let mut unloaded = 0u32;
    for (ship_idx, army_id) in cargo {
        world.fleets[fleet_idx].ships[ship_idx].cargo_army = None;
        if let Some(army) = world.army_mut(&army_id) {
            army.container = ArmyContainer::Planet {
                id: planet_id.clone(),
            };
            unloaded += 1;
        }
    }
    ops.armies_unloaded += unloaded;
    if unloaded > 0 {
        world.push_log(format!(
            "Fleet {fleet_id} unloaded {unloaded} army(ies) onto {planet_id}."
        ));
    }
}

fn apply_load(world: &mut WorldState, fleet_idx: usize, ops: &mut ArrivalOps) {
    let fleet = &world.fleets[fleet_idx];
    let fleet_id = fleet.id.clone();
    let faction = fleet.faction.clone();
    let Some(system_id) = fleet.orbit_system.clone() else {
        return;
    };
    let planet_ids: Vec<PlanetId> = match world.system(&system_id) {
        Some(system) => system.planets.iter().map(|planet| planet.id.clone()).collect(),
        None => return,
    };

    let eligible: Vec<ArmyId> = world
        .armies
        .iter()
        .filter(|army| army.faction == faction && army.strength > 0)
        .filter(|army| {
            army.deployed_on()
                .is_some_and(|planet| planet_ids.contains(planet))
        })
        .map(|army| army.id.clone())
        .collect();

    let mut loaded = 0u32;
    for army_id in eligible {
        let Some(transport) = world.fleets[fleet_idx].free_transport_mut() else {
            break;
        };
        transport.cargo_army = Some(army_id.clone());
        if let Some(army) = world.army_mut(&army_id) {
            army.container = ArmyContainer::Fleet {
                id: fleet_id.clone(),
            };
        }
        loaded += 1;
    }
    ops.armies_loaded += loaded;
    if loaded > 0 {
        world.push_log(format!(
            "Fleet {fleet_id} embarked {loaded} army(ies) at {system_id}."
        ));
    }
}

fn apply_invasion<R: RngCore>(
    world: &mut WorldState,
    rng: &mut R,
    fleet_idx: usize,
    requested_planet: Option<&PlanetId>,
    ops: &mut ArrivalOps,
) {
    let fleet = &world.fleets[fleet_idx];
    let fleet_id = fleet.id.clone();
    let faction = fleet.faction.clone();
    let Some(system_id) = fleet.orbit_system.clone() else {
        return;
    };
    let Some(system) = world.system(&system_id) else {
        return;
    };

    let chosen = requested_planet
        .and_then(|id| system.planet(id))
        .filter(|planet| planet.is_solid())
        .or_else(|| system.first_solid_planet())
        .map(|planet| planet.id.clone());
    let Some(planet_id) = chosen else {
        world.push_log(format!(
            "Invasion by fleet {fleet_id} called off: {system_id} has no solid planet."
        ));
        ops.landings_aborted += 1;
        return;
    };

    let contested = world.orbit_contested(&system_id, &faction);
    if contested && world.rules.landing_risk == LandingRiskPolicy::AbortOnContest {
        world.push_log(format!(
            "Invasion by fleet {fleet_id} aborted: hostile ships hold the orbit of {system_id}."
        ));
        ops.landings_aborted += 1;
        return;
    }

    let cargo: Vec<(usize, ArmyId)> = world.fleets[fleet_idx]
        .ships
        .iter()
        .enumerate()
        .filter(|(_, ship)| ship.is_alive())
        .filter_map(|(idx, ship)| ship.cargo_army.clone().map(|army| (idx, army)))
        .collect();
    if cargo.is_empty() {
        world.push_log(format!(
            "Fleet {fleet_id} has no troops to land on {planet_id}."
        ));
        return;
    }

    let mut landed = 0u32;
    let mut losses = 0u32;
    for (ship_idx, army_id) in cargo {
        world.fleets[fleet_idx].ships[ship_idx].cargo_army = None;
        let Some(army) = world.army_mut(&army_id) else {
            continue;
        };
        if contested {
            // Dropping through a held orbit always costs troops.
            let fraction = LANDING_LOSS_BASE + LANDING_LOSS_SPREAD * sample_ratio(rng);
            let casualty = ceil_f64_to_u32(f64::from(army.strength) * fraction).max(1);
            army.strength = army.strength.saturating_sub(casualty);
            losses += casualty;
        }
        army.container = ArmyContainer::Planet {
            id: planet_id.clone(),
        };
        if army.strength > 0 {
            landed += 1;
        }
    }
    ops.armies_landed += landed;
    ops.landing_losses += losses;
    world.push_log(if contested {
        format!(
            "Fleet {fleet_id} forced a landing on {planet_id}: {landed} army(ies) down, {losses} troops lost."
        )
    } else {
        format!("Fleet {fleet_id} landed {landed} army(ies) on {planet_id} unopposed.")
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleets::{Army, Fleet, Ship};
    use crate::galaxy::{Planet, PlanetKind, StarSystem};
    use crate::geom::Vec3;
    use crate::ids::{FactionId, ShipId};
    use crate::world::Faction;

    fn world_with_route(distance_ly: f64) -> WorldState {
        let mut world = WorldState::new(7);
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

    #[test]
    fn transport_jump_within_reach_leaves_expected_fuel() {
        // 100 capacity, 2 fuel per ly, 40 ly out.
        let mut world = world_with_route(40.0);
        let receipt =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
                .unwrap();
        assert!(!receipt.already_en_route);
        assert!((receipt.distance_ly - 40.0).abs() < 1e-9);
        assert!((receipt.fuel_debited - 80.0).abs() < 1e-9);
        let ship = &world.fleets[0].ships[0];
        assert!((ship.fuel - 20.0).abs() < 1e-9, "fuel was {}", ship.fuel);
        assert_eq!(world.fleets[0].state, FleetState::Moving);
        assert!(world.fleets[0].orbit_system.is_none());
    }

    #[test]
    fn jump_beyond_tank_reports_each_shortage() {
        // 60 ly at 2 fuel per ly needs 120 against a 100 tank.
        let mut world = world_with_route(60.0);
        let err =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
                .unwrap_err();
        match err {
            MovementError::InsufficientFuel { shortages } => {
                assert_eq!(shortages.len(), 1);
                assert!((shortages[0].shortfall - 20.0).abs() < 1e-9);
                assert!((shortages[0].required - 120.0).abs() < 1e-9);
            }
            other => panic!("expected fuel error, got {other:?}"),
        }
        // Atomicity: nothing was debited and the fleet never left orbit.
        assert!((world.fleets[0].ships[0].fuel - 100.0).abs() < 1e-9);
        assert_eq!(world.fleets[0].state, FleetState::Orbit);
    }

    #[test]
    fn jump_past_drive_limit_is_out_of_range() {
        let mut world = world_with_route(MAX_JUMP_RANGE_LY + 5.0);
        let err =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
                .unwrap_err();
        assert!(matches!(err, MovementError::OutOfRange { .. }));
    }

    #[test]
    fn repeating_a_jump_order_is_free() {
        let mut world = world_with_route(40.0);
        validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
            .unwrap();
        let second =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
                .unwrap();
        assert!(second.already_en_route);
        assert!((second.fuel_debited - 0.0).abs() < f64::EPSILON);
        assert!((world.fleets[0].ships[0].fuel - 20.0).abs() < 1e-9);
    }

    #[test]
    fn mid_flight_retarget_is_rejected() {
        let mut world = world_with_route(40.0);
        validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
            .unwrap();
        let err =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-a"))
                .unwrap_err();
        assert!(matches!(err, MovementError::NotOrbiting { .. }));
    }

    #[test]
    fn unlimited_fuel_rule_waives_the_bill() {
        let mut world = world_with_route(60.0);
        world.rules.unlimited_fuel = true;
        let receipt =
            validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
                .unwrap();
        assert!((receipt.fuel_debited - 0.0).abs() < f64::EPSILON);
        assert!((world.fleets[0].ships[0].fuel - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fleets_snap_onto_target_and_resume_orbit() {
        let mut world = world_with_route(6.0);
        validate_and_debit_jump(&mut world, &FleetId::from("f1"), &SystemId::from("sys-b"))
            .unwrap();
        // Transport pace is 3.5 ly per turn: two legs, arrival on the second.
        assert!(advance_fleets(&mut world).is_empty());
        assert!((world.fleets[0].position.x - 3.5).abs() < 1e-9);
        let arrivals = advance_fleets(&mut world);
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].system, SystemId::from("sys-b"));
        let fleet = &world.fleets[0];
        assert_eq!(fleet.state, FleetState::Orbit);
        assert_eq!(fleet.orbit_system, Some(SystemId::from("sys-b")));
        assert!(fleet.target_system.is_none() && fleet.target_position.is_none());
        assert!((fleet.position.x - 6.0).abs() < f64::EPSILON, "snapped exactly");
    }

    #[test]
    fn arrival_unload_needs_friendly_ground() {
        let mut world = world_with_route(10.0);
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            80,
            ArmyContainer::Fleet {
                id: FleetId::from("f1"),
            },
        ));
        world.fleets[0].ships[0].cargo_army = Some(ArmyId::from("a1"));
        world.fleets[0].unload_target = Some(SystemId::from("sys-b"));
        world.fleets[0].orbit_system = Some(SystemId::from("sys-b"));

        let mut rng = crate::rng::SimRng::new(3);
        let ops = process_arrivals(&mut world, &mut rng);
        assert_eq!(ops.armies_unloaded, 0, "sys-b is nobody's ground");
        assert!(world.fleets[0].unload_target.is_none(), "intent consumed");
        assert!(world.armies[0].is_embarked());
    }

    #[test]
    fn arrival_load_fills_free_berths_only() {
        let mut world = world_with_route(10.0);
        for idx in 0..3 {
            world.armies.push(Army::new(
                ArmyId::new(format!("a{idx}")),
                FactionId::from("crimson"),
                60,
                ArmyContainer::Planet {
                    id: PlanetId::from("pa"),
                },
            ));
        }
        world.fleets[0].load_target = Some(SystemId::from("sys-a"));

        let mut rng = crate::rng::SimRng::new(3);
        let ops = process_arrivals(&mut world, &mut rng);
        assert_eq!(ops.armies_loaded, 1, "single transport, single berth");
        assert_eq!(
            world.fleets[0].ships[0].cargo_army,
            Some(ArmyId::from("a0")),
            "armies embark in table order"
        );
        assert!(world.armies[0].is_embarked());
        assert!(world.armies[1].is_deployed());
    }

    #[test]
    fn contested_invasion_lands_with_losses_under_always_land() {
        let mut world = world_with_route(10.0);
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            100,
            ArmyContainer::Fleet {
                id: FleetId::from("f1"),
            },
        ));
        world.fleets[0].ships[0].cargo_army = Some(ArmyId::from("a1"));
        world.fleets[0].orbit_system = Some(SystemId::from("sys-b"));
        world.fleets[0].invade_target = Some(SystemId::from("sys-b"));

        let mut defender = Fleet::new(
            FleetId::from("f2"),
            FactionId::from("viridian"),
            Vec3::new(10.0, 0.0, 0.0),
        );
        defender.orbit_system = Some(SystemId::from("sys-b"));
        defender
            .ships
            .push(Ship::new(ShipId::from("s2"), ShipType::Escort));
        world.fleets.push(defender);

        let mut rng = crate::rng::SimRng::new(3);
        let ops = process_arrivals(&mut world, &mut rng);
        assert_eq!(ops.armies_landed, 1);
        assert!(ops.landing_losses >= 1, "contested drops are never free");
        let army = &world.armies[0];
        assert!(army.is_deployed());
        assert!(army.strength < 100 && army.strength >= 70);
    }

    #[test]
    fn contested_invasion_aborts_under_abort_policy() {
        let mut world = world_with_route(10.0);
        world.rules.landing_risk = LandingRiskPolicy::AbortOnContest;
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            100,
            ArmyContainer::Fleet {
                id: FleetId::from("f1"),
            },
        ));
        world.fleets[0].ships[0].cargo_army = Some(ArmyId::from("a1"));
        world.fleets[0].orbit_system = Some(SystemId::from("sys-b"));
        world.fleets[0].invade_target = Some(SystemId::from("sys-b"));

        let mut defender = Fleet::new(
            FleetId::from("f2"),
            FactionId::from("viridian"),
            Vec3::new(10.0, 0.0, 0.0),
        );
        defender.orbit_system = Some(SystemId::from("sys-b"));
        defender
            .ships
            .push(Ship::new(ShipId::from("s2"), ShipType::Escort));
        world.fleets.push(defender);

        let mut rng = crate::rng::SimRng::new(3);
        let ops = process_arrivals(&mut world, &mut rng);
        assert_eq!(ops.landings_aborted, 1);
        assert_eq!(ops.armies_landed, 0);
        assert!(world.armies[0].is_embarked(), "troops stay aboard");
        assert_eq!(world.armies[0].strength, 100);
        assert!(world.fleets[0].invade_target.is_none(), "intent consumed");
    }
}

//! Player and AI commands: validation and atomic application.
//!
//! Every command is checked in full against the current state before the
//! first mutation, so a rejected command leaves the world untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fleets::{ArmyContainer, Fleet, FleetState};
use crate::ids::{ArmyId, FleetId, PlanetId, ShipId, SystemId};
use crate::movement::{self, MovementError};
use crate::world::WorldState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Order a hyperjump toward `system`.
    MoveFleet { fleet: FleetId, system: SystemId },
    /// Queue an embark of friendly armies on arrival at `system`.
    OrderLoad { fleet: FleetId, system: SystemId },
    /// Queue a troop drop on arrival at friendly `system`.
    OrderUnload { fleet: FleetId, system: SystemId },
    /// Queue an invasion landing on arrival at `system`.
    OrderInvade {
        fleet: FleetId,
        system: SystemId,
        #[serde(default)]
        planet: Option<PlanetId>,
    },
    /// Carve the named ships out into a new fleet.
    SplitFleet { fleet: FleetId, ships: Vec<ShipId> },
    /// Fold `source` into `target`; `source` ceases to exist.
    MergeFleets { source: FleetId, target: FleetId },
    /// Embark a deployed army onto a transport in `fleet`.
    LoadArmy { army: ArmyId, fleet: FleetId },
    /// Drop an embarked army onto `planet`.
    UnloadArmy { army: ArmyId, planet: PlanetId },
    /// Redeploy an army to another planet in the same system.
    TransferArmy { army: ArmyId, planet: PlanetId },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Movement(#[from] MovementError),
    #[error("unknown fleet {0}")]
    UnknownFleet(FleetId),
    #[error("unknown system {0}")]
    UnknownSystem(SystemId),
    #[error("unknown planet {0}")]
    UnknownPlanet(PlanetId),
    #[error("unknown army {0}")]
    UnknownArmy(ArmyId),
    #[error("ship {0} is not in that fleet")]
    UnknownShip(ShipId),
    #[error("fleet {0} must be orbiting for that order")]
    NotOrbiting(FleetId),
    #[error("fleets {0} and {1} are not sharing an orbit")]
    NotCoLocated(FleetId, FleetId),
    #[error("cannot merge a fleet into itself")]
    MergeWithSelf,
    #[error("fleets {0} and {1} serve different factions")]
    MixedAllegiance(FleetId, FleetId),
    #[error("army {0} does not serve the same faction as fleet {1}")]
    ForeignArmy(ArmyId, FleetId),
    #[error("a split must name at least one ship")]
    EmptySplit,
    #[error("a split must leave the source fleet at least one ship")]
    WouldEmptyFleet,
    #[error("no free transport berth in fleet {0}")]
    NoFreeBerth(FleetId),
    #[error("army {0} is not deployed on a planet")]
    ArmyNotDeployed(ArmyId),
    #[error("army {0} is not embarked in a fleet")]
    ArmyNotEmbarked(ArmyId),
    #[error("army {0} is out of reach of fleet {1}")]
    OutOfReach(ArmyId, FleetId),
    #[error("{0} is not solid ground")]
    NotSolid(PlanetId),
    #[error("{0} is hostile ground")]
    HostileGround(PlanetId),
    #[error("{0} and {1} are not in the same system")]
    DifferentSystem(PlanetId, PlanetId),
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReceipt {
    FleetMoving {
        fleet: FleetId,
        distance_ly: f64,
        fuel_debited: f64,
        already_en_route: bool,
    },
    OrderQueued {
        fleet: FleetId,
    },
    FleetSplit {
        source: FleetId,
        spawned: FleetId,
        ships: u32,
    },
    FleetsMerged {
        into: FleetId,
        absorbed: u32,
    },
    ArmyLoaded {
        army: ArmyId,
        fleet: FleetId,
    },
    ArmyUnloaded {
        army: ArmyId,
        planet: PlanetId,
    },
    ArmyTransferred {
        army: ArmyId,
        planet: PlanetId,
    },
}

/// Validate and apply one command. Fails atomically: on error the world
/// is exactly as it was.
pub fn dispatch_command(
    world: &mut WorldState,
    command: &Command,
) -> Result<CommandReceipt, CommandError> {
    match command {
        Command::MoveFleet { fleet, system } => move_fleet(world, fleet, system),
        Command::OrderLoad { fleet, system } => {
            queue_order(world, fleet, system, OrderKind::Load)
        }
        Command::OrderUnload { fleet, system } => {
            queue_order(world, fleet, system, OrderKind::Unload)
        }
        Command::OrderInvade {
            fleet,
            system,
            planet,
        } => queue_invasion(world, fleet, system, planet.as_ref()),
        Command::SplitFleet { fleet, ships } => split_fleet(world, fleet, ships),
        Command::MergeFleets { source, target } => merge_fleets(world, source, target),
        Command::LoadArmy { army, fleet } => load_army(world, army, fleet),
        Command::UnloadArmy { army, planet } => unload_army(world, army, planet),
        Command::TransferArmy { army, planet } => transfer_army(world, army, planet),
    }
}

fn move_fleet(
    world: &mut WorldState,
    fleet_id: &FleetId,
    system: &SystemId,
) -> Result<CommandReceipt, CommandError> {
    let receipt = movement::validate_and_debit_jump(world, fleet_id, system)?;
    if !receipt.already_en_route {
        world.push_log(format!(
            "Fleet {fleet_id} jumps for {system} ({:.2} ly, {:.2} fuel).",
            receipt.distance_ly, receipt.fuel_debited
        ));
    }
    Ok(CommandReceipt::FleetMoving {
        fleet: fleet_id.clone(),
        distance_ly: receipt.distance_ly,
        fuel_debited: receipt.fuel_debited,
        already_en_route: receipt.already_en_route,
    })
}

enum OrderKind {
    Load,
    Unload,
}

fn queue_order(
    world: &mut WorldState,
    fleet_id: &FleetId,
    system: &SystemId,
    kind: OrderKind,
) -> Result<CommandReceipt, CommandError> {
    if world.system(system).is_none() {
        return Err(CommandError::UnknownSystem(system.clone()));
    }
    let fleet = world
        .fleet_mut(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    match kind {
        OrderKind::Load => fleet.load_target = Some(system.clone()),
        OrderKind::Unload => fleet.unload_target = Some(system.clone()),
    }
    Ok(CommandReceipt::OrderQueued {
        fleet: fleet_id.clone(),
    })
}

fn queue_invasion(
    world: &mut WorldState,
    fleet_id: &FleetId,
    system: &SystemId,
    planet: Option<&PlanetId>,
) -> Result<CommandReceipt, CommandError> {
    let Some(target_system) = world.system(system) else {
        return Err(CommandError::UnknownSystem(system.clone()));
    };
    if let Some(planet_id) = planet {
        let Some(planet) = target_system.planet(planet_id) else {
            return Err(CommandError::UnknownPlanet(planet_id.clone()));
        };
        if !planet.is_solid() {
            return Err(CommandError::NotSolid(planet_id.clone()));
        }
    }
    let fleet = world
        .fleet_mut(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    fleet.invade_target = Some(system.clone());
    fleet.invade_planet = planet.cloned();
    Ok(CommandReceipt::OrderQueued {
        fleet: fleet_id.clone(),
    })
}

fn split_fleet(
    world: &mut WorldState,
    fleet_id: &FleetId,
    ships: &[ShipId],
) -> Result<CommandReceipt, CommandError> {
    if ships.is_empty() {
        return Err(CommandError::EmptySplit);
    }
    let source = world
        .fleet(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    if source.state != FleetState::Orbit {
        return Err(CommandError::NotOrbiting(fleet_id.clone()));
    }
    for ship in ships {
        if source.ship(ship).is_none() {
            return Err(CommandError::UnknownShip(ship.clone()));
        }
    }
    if ships.len() >= source.ships.len() {
        return Err(CommandError::WouldEmptyFleet);
    }

    let mut rng = std::mem::take(&mut world.rng);
    let spawned_id = FleetId::new(rng.derived_id("fleet"));
    world.rng = rng;

    let day = world.day;
    let source = world
        .fleet_mut(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    let mut spawned = Fleet::new(spawned_id.clone(), source.faction.clone(), source.position);
    spawned.orbit_system = source.orbit_system.clone();
    spawned.state_since_turn = day;

    // Move hulls across, preserving their relative order.
    let mut moved_cargo = Vec::new();
    let mut kept = Vec::with_capacity(source.ships.len() - ships.len());
    for ship in source.ships.drain(..) {
        if ships.contains(&ship.id) {
            if let Some(army) = ship.cargo_army.clone() {
                moved_cargo.push(army);
            }
            spawned.ships.push(ship);
        } else {
            kept.push(ship);
        }
    }
    source.ships = kept;
    let moved = u32::try_from(spawned.ships.len()).unwrap_or(u32::MAX);

    world.fleets.push(spawned);
    for army_id in moved_cargo {
        if let Some(army) = world.army_mut(&army_id) {
            army.container = ArmyContainer::Fleet {
                id: spawned_id.clone(),
            };
        }
    }
    world.push_log(format!(
        "Fleet {fleet_id} detaches {moved} ship(s) as {spawned_id}."
    ));
    Ok(CommandReceipt::FleetSplit {
        source: fleet_id.clone(),
        spawned: spawned_id,
        ships: moved,
    })
}

fn merge_fleets(
    world: &mut WorldState,
    source_id: &FleetId,
    target_id: &FleetId,
) -> Result<CommandReceipt, CommandError> {
    if source_id == target_id {
        return Err(CommandError::MergeWithSelf);
    }
    let source = world
        .fleet(source_id)
        .ok_or_else(|| CommandError::UnknownFleet(source_id.clone()))?;
    let target = world
        .fleet(target_id)
        .ok_or_else(|| CommandError::UnknownFleet(target_id.clone()))?;
    if source.faction != target.faction {
        return Err(CommandError::MixedAllegiance(
            source_id.clone(),
            target_id.clone(),
        ));
    }
    let co_located = source.state == FleetState::Orbit
        && target.state == FleetState::Orbit
        && source.orbit_system.is_some()
        && source.orbit_system == target.orbit_system;
    if !co_located {
        return Err(CommandError::NotCoLocated(
            source_id.clone(),
            target_id.clone(),
        ));
    }

    let source_idx = world
        .fleets
        .iter()
        .position(|fleet| &fleet.id == source_id)
        .ok_or_else(|| CommandError::UnknownFleet(source_id.clone()))?;
    let mut absorbed = world.fleets.remove(source_idx);
    let moved_cargo: Vec<ArmyId> = absorbed
        .ships
        .iter()
        .filter_map(|ship| ship.cargo_army.clone())
        .collect();
    let count = u32::try_from(absorbed.ships.len()).unwrap_or(u32::MAX);

    let target = world
        .fleet_mut(target_id)
        .ok_or_else(|| CommandError::UnknownFleet(target_id.clone()))?;
    target.ships.append(&mut absorbed.ships);

    for army_id in moved_cargo {
        if let Some(army) = world.army_mut(&army_id) {
            army.container = ArmyContainer::Fleet {
                id: target_id.clone(),
            };
        }
    }
    world.push_log(format!(
        "Fleet {source_id} folds {count} ship(s) into {target_id}."
    ));
    Ok(CommandReceipt::FleetsMerged {
        into: target_id.clone(),
        absorbed: count,
    })
}

fn load_army(
    world: &mut WorldState,
    army_id: &ArmyId,
    fleet_id: &FleetId,
) -> Result<CommandReceipt, CommandError> {
    let army = world
        .army(army_id)
        .ok_or_else(|| CommandError::UnknownArmy(army_id.clone()))?;
    let fleet = world
        .fleet(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    let Some(planet) = army.deployed_on() else {
        return Err(CommandError::ArmyNotDeployed(army_id.clone()));
    };
    if army.faction != fleet.faction {
        return Err(CommandError::ForeignArmy(army_id.clone(), fleet_id.clone()));
    }
    if fleet.state != FleetState::Orbit {
        return Err(CommandError::NotOrbiting(fleet_id.clone()));
    }
    let reachable = world
        .system_of_planet(planet)
        .is_some_and(|system| fleet.orbit_system.as_ref() == Some(&system.id));
    if !reachable {
        return Err(CommandError::OutOfReach(army_id.clone(), fleet_id.clone()));
    }
    if fleet.free_berths() == 0 {
        return Err(CommandError::NoFreeBerth(fleet_id.clone()));
    }

    let fleet = world
        .fleet_mut(fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    if let Some(transport) = fleet.free_transport_mut() {
        transport.cargo_army = Some(army_id.clone());
    }
    if let Some(army) = world.army_mut(army_id) {
        army.container = ArmyContainer::Fleet {
            id: fleet_id.clone(),
        };
    }
    world.push_log(format!("Army {army_id} embarks aboard fleet {fleet_id}."));
    Ok(CommandReceipt::ArmyLoaded {
        army: army_id.clone(),
        fleet: fleet_id.clone(),
    })
}

fn landing_site_checks(
    world: &WorldState,
    planet_id: &PlanetId,
    faction: &crate::ids::FactionId,
) -> Result<(), CommandError> {
    let system = world
        .system_of_planet(planet_id)
        .ok_or_else(|| CommandError::UnknownPlanet(planet_id.clone()))?;
    let planet = system
        .planet(planet_id)
        .ok_or_else(|| CommandError::UnknownPlanet(planet_id.clone()))?;
    if !planet.is_solid() {
        return Err(CommandError::NotSolid(planet_id.clone()));
    }
    // Deliberate hostile drops go through the invasion order instead.
    if planet.owner.as_ref().is_some_and(|owner| owner != faction) {
        return Err(CommandError::HostileGround(planet_id.clone()));
    }
    Ok(())
}

fn unload_army(
    world: &mut WorldState,
    army_id: &ArmyId,
    planet_id: &PlanetId,
) -> Result<CommandReceipt, CommandError> {
    let army = world
        .army(army_id)
        .ok_or_else(|| CommandError::UnknownArmy(army_id.clone()))?;
    let Some(fleet_id) = army.embarked_in().cloned() else {
        return Err(CommandError::ArmyNotEmbarked(army_id.clone()));
    };
    let faction = army.faction.clone();
    landing_site_checks(world, planet_id, &faction)?;

    let fleet = world
        .fleet(&fleet_id)
        .ok_or_else(|| CommandError::UnknownFleet(fleet_id.clone()))?;
    let overhead = world
        .system_of_planet(planet_id)
        .is_some_and(|system| fleet.orbit_system.as_ref() == Some(&system.id));
    if fleet.state != FleetState::Orbit || !overhead {
        return Err(CommandError::OutOfReach(army_id.clone(), fleet_id.clone()));
    }

    if let Some(fleet) = world.fleet_mut(&fleet_id) {
        for ship in &mut fleet.ships {
            if ship.cargo_army.as_ref() == Some(army_id) {
                ship.cargo_army = None;
            }
        }
    }
    if let Some(army) = world.army_mut(army_id) {
        army.container = ArmyContainer::Planet {
            id: planet_id.clone(),
        };
    }
    world.push_log(format!("Army {army_id} deploys to {planet_id}."));
    Ok(CommandReceipt::ArmyUnloaded {
        army: army_id.clone(),
        planet: planet_id.clone(),
    })
}

fn transfer_army(
    world: &mut WorldState,
    army_id: &ArmyId,
    planet_id: &PlanetId,
) -> Result<CommandReceipt, CommandError> {
    let army = world
        .army(army_id)
        .ok_or_else(|| CommandError::UnknownArmy(army_id.clone()))?;
    let Some(origin) = army.deployed_on().cloned() else {
        return Err(CommandError::ArmyNotDeployed(army_id.clone()));
    };
    let faction = army.faction.clone();
    landing_site_checks(world, planet_id, &faction)?;

    let same_system = match (world.system_of_planet(&origin), world.system_of_planet(planet_id)) {
        (Some(a), Some(b)) => a.id == b.id,
        _ => false,
    };
    if !same_system {
        return Err(CommandError::DifferentSystem(origin, planet_id.clone()));
    }

    if let Some(army) = world.army_mut(army_id) {
        army.container = ArmyContainer::Planet {
            id: planet_id.clone(),
        };
    }
    world.push_log(format!("Army {army_id} redeploys to {planet_id}."));
    Ok(CommandReceipt::ArmyTransferred {
        army: army_id.clone(),
        planet: planet_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleets::{Army, Ship};
    use crate::galaxy::{Planet, PlanetKind, StarSystem};
    use crate::geom::Vec3;
    use crate::ids::FactionId;
    use crate::ships::ShipType;
    use crate::world::Faction;

    fn staging_world() -> WorldState {
        let mut world = WorldState::new(13);
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
            planets: vec![
                Planet {
                    id: PlanetId::from("pa1"),
                    name: "Anser I".to_string(),
                    kind: PlanetKind::Solid,
                    owner: Some(FactionId::from("crimson")),
                },
                Planet {
                    id: PlanetId::from("pa2"),
                    name: "Anser II".to_string(),
                    kind: PlanetKind::Gas,
                    owner: None,
                },
            ],
        });
        world.systems.push(StarSystem {
            id: SystemId::from("sys-b"),
            name: "Borel".to_string(),
            position: Vec3::new(30.0, 0.0, 0.0),
            owner: Some(FactionId::from("viridian")),
            planets: vec![Planet {
                id: PlanetId::from("pb1"),
                name: "Borel I".to_string(),
                kind: PlanetKind::Solid,
                owner: Some(FactionId::from("viridian")),
            }],
        });
        let mut fleet = Fleet::new(FleetId::from("f1"), FactionId::from("crimson"), Vec3::ZERO);
        fleet.orbit_system = Some(SystemId::from("sys-a"));
        fleet
            .ships
            .push(Ship::new(ShipId::from("s1"), ShipType::Escort));
        fleet
            .ships
            .push(Ship::new(ShipId::from("s2"), ShipType::Transport));
        world.fleets.push(fleet);
        world
    }

    #[test]
    fn invasion_orders_validate_the_named_planet() {
        let mut world = staging_world();
        let err = dispatch_command(
            &mut world,
            &Command::OrderInvade {
                fleet: FleetId::from("f1"),
                system: SystemId::from("sys-a"),
                planet: Some(PlanetId::from("pa2")),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NotSolid(_)), "gas giants reject landings");

        // Naming a planet that sits in a different system is rejected.
        let err = dispatch_command(
            &mut world,
            &Command::OrderInvade {
                fleet: FleetId::from("f1"),
                system: SystemId::from("sys-a"),
                planet: Some(PlanetId::from("pb1")),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::UnknownPlanet(_)));
    }

    #[test]
    fn split_spawns_a_second_fleet_in_the_same_orbit() {
        let mut world = staging_world();
        let receipt = dispatch_command(
            &mut world,
            &Command::SplitFleet {
                fleet: FleetId::from("f1"),
                ships: vec![ShipId::from("s2")],
            },
        )
        .unwrap();
        let CommandReceipt::FleetSplit { spawned, ships, .. } = receipt else {
            panic!("expected a split receipt");
        };
        assert_eq!(ships, 1);
        assert!(spawned.as_str().starts_with("fleet-"));
        assert_eq!(world.fleets.len(), 2);
        let new_fleet = world.fleet(&spawned).unwrap();
        assert_eq!(new_fleet.orbit_system, Some(SystemId::from("sys-a")));
        assert_eq!(new_fleet.faction, FactionId::from("crimson"));
        assert_eq!(world.fleets[0].ships.len(), 1);
    }

    #[test]
    fn split_moves_embarked_armies_with_their_carrier() {
        let mut world = staging_world();
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            50,
            ArmyContainer::Fleet {
                id: FleetId::from("f1"),
            },
        ));
        world.fleets[0].ship_mut(&ShipId::from("s2")).unwrap().cargo_army =
            Some(ArmyId::from("a1"));

        let receipt = dispatch_command(
            &mut world,
            &Command::SplitFleet {
                fleet: FleetId::from("f1"),
                ships: vec![ShipId::from("s2")],
            },
        )
        .unwrap();
        let CommandReceipt::FleetSplit { spawned, .. } = receipt else {
            panic!("expected a split receipt");
        };
        assert_eq!(
            world.armies[0].embarked_in(),
            Some(&spawned),
            "army follows its transport"
        );
    }

    #[test]
    fn split_cannot_empty_the_source() {
        let mut world = staging_world();
        let err = dispatch_command(
            &mut world,
            &Command::SplitFleet {
                fleet: FleetId::from("f1"),
                ships: vec![ShipId::from("s1"), ShipId::from("s2")],
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::WouldEmptyFleet));
        assert_eq!(world.fleets.len(), 1, "nothing changed");
    }

    #[test]
    fn merge_requires_shared_orbit_and_faction() {
        let mut world = staging_world();
        let mut other = Fleet::new(
            FleetId::from("f2"),
            FactionId::from("crimson"),
            Vec3::new(30.0, 0.0, 0.0),
        );
        other.orbit_system = Some(SystemId::from("sys-b"));
        other
            .ships
            .push(Ship::new(ShipId::from("s3"), ShipType::Fighter));
        world.fleets.push(other);

        let err = dispatch_command(
            &mut world,
            &Command::MergeFleets {
                source: FleetId::from("f2"),
                target: FleetId::from("f1"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NotCoLocated(_, _)));

        world.fleet_mut(&FleetId::from("f2")).unwrap().orbit_system =
            Some(SystemId::from("sys-a"));
        let receipt = dispatch_command(
            &mut world,
            &Command::MergeFleets {
                source: FleetId::from("f2"),
                target: FleetId::from("f1"),
            },
        )
        .unwrap();
        assert_eq!(
            receipt,
            CommandReceipt::FleetsMerged {
                into: FleetId::from("f1"),
                absorbed: 1
            }
        );
        assert_eq!(world.fleets.len(), 1);
        assert_eq!(world.fleets[0].ships.len(), 3);
    }

    #[test]
    fn army_round_trip_between_ground_and_fleet() {
        let mut world = staging_world();
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            70,
            ArmyContainer::Planet {
                id: PlanetId::from("pa1"),
            },
        ));

        dispatch_command(
            &mut world,
            &Command::LoadArmy {
                army: ArmyId::from("a1"),
                fleet: FleetId::from("f1"),
            },
        )
        .unwrap();
        assert_eq!(world.armies[0].embarked_in(), Some(&FleetId::from("f1")));
        assert_eq!(
            world.fleets[0].ship(&ShipId::from("s2")).unwrap().cargo_army,
            Some(ArmyId::from("a1"))
        );

        // A second army cannot board: the only berth is taken.
        world.armies.push(Army::new(
            ArmyId::from("a2"),
            FactionId::from("crimson"),
            70,
            ArmyContainer::Planet {
                id: PlanetId::from("pa1"),
            },
        ));
        let err = dispatch_command(
            &mut world,
            &Command::LoadArmy {
                army: ArmyId::from("a2"),
                fleet: FleetId::from("f1"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NoFreeBerth(_)));

        dispatch_command(
            &mut world,
            &Command::UnloadArmy {
                army: ArmyId::from("a1"),
                planet: PlanetId::from("pa1"),
            },
        )
        .unwrap();
        assert_eq!(world.armies[0].deployed_on(), Some(&PlanetId::from("pa1")));
        assert_eq!(
            world.fleets[0].ship(&ShipId::from("s2")).unwrap().cargo_army,
            None
        );
    }

    #[test]
    fn manual_unload_refuses_hostile_ground() {
        let mut world = staging_world();
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            70,
            ArmyContainer::Fleet {
                id: FleetId::from("f1"),
            },
        ));
        world.fleets[0].ship_mut(&ShipId::from("s2")).unwrap().cargo_army =
            Some(ArmyId::from("a1"));
        world.fleets[0].orbit_system = Some(SystemId::from("sys-b"));

        let err = dispatch_command(
            &mut world,
            &Command::UnloadArmy {
                army: ArmyId::from("a1"),
                planet: PlanetId::from("pb1"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::HostileGround(_)));
        assert!(world.armies[0].is_embarked(), "rejected commands change nothing");
    }

    #[test]
    fn transfer_stays_within_one_system() {
        let mut world = staging_world();
        world.armies.push(Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            70,
            ArmyContainer::Planet {
                id: PlanetId::from("pa1"),
            },
        ));
        let err = dispatch_command(
            &mut world,
            &Command::TransferArmy {
                army: ArmyId::from("a1"),
                planet: PlanetId::from("pb1"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::HostileGround(_) | CommandError::DifferentSystem(_, _)));
        assert_eq!(world.armies[0].deployed_on(), Some(&PlanetId::from("pa1")));
    }

    #[test]
    fn move_command_surfaces_fuel_errors() {
        let mut world = staging_world();
        // Drain the escort so it cannot pay 30 ly at 1.6 per ly.
        world.fleets[0].ship_mut(&ShipId::from("s1")).unwrap().fuel = 10.0;
        let err = dispatch_command(
            &mut world,
            &Command::MoveFleet {
                fleet: FleetId::from("f1"),
                system: SystemId::from("sys-b"),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Movement(MovementError::InsufficientFuel { .. })
        ));
    }
}

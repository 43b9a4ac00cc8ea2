//! Fog of war: what a faction's sensors actually reveal.
//!
//! Visibility is a pure projection. Nothing here mutates the world; a view
//! borrows the fleets it exposes, so filtering twice always yields the
//! same set as filtering once.

use crate::fleets::Fleet;
use crate::galaxy::StarSystem;
use crate::geom::Vec3;
use crate::ids::{FactionId, FleetId, SystemId};
use crate::world::WorldState;

/// A fleet this close to a system counts as present for observation.
pub const SYSTEM_CAPTURE_RADIUS_LY: f64 = 5.0;
/// Hull-mounted sensor reach.
pub const FLEET_SENSOR_RANGE_LY: f64 = 12.0;
/// How far out from an owned system a faction's territory extends.
pub const TERRITORY_RADIUS_LY: f64 = 15.0;

/// What one faction is allowed to see this turn. Systems are never hidden
/// since ownership is public; only foreign fleets are filtered.
#[derive(Debug, Clone)]
pub struct WorldView<'a> {
    pub viewer: FactionId,
    pub day: u32,
    pub systems: &'a [StarSystem],
    pub fleets: Vec<&'a Fleet>,
}

impl WorldView<'_> {
    #[must_use]
    pub fn fleet_ids(&self) -> Vec<FleetId> {
        self.fleets.iter().map(|fleet| fleet.id.clone()).collect()
    }
}

/// Systems the viewer observes: every system it holds, plus any system
/// with a viewer fleet inside the capture radius.
#[must_use]
pub fn observed_systems(world: &WorldState, viewer: &FactionId) -> Vec<SystemId> {
    world
        .systems
        .iter()
        .filter(|system| {
            system.effective_owner() == Some(viewer)
                || world.fleets.iter().any(|fleet| {
                    fleet.faction == *viewer
                        && fleet.has_living_ships()
                        && fleet.position.distance_to(system.position) <= SYSTEM_CAPTURE_RADIUS_LY
                })
        })
        .map(|system| system.id.clone())
        .collect()
}

/// The faction whose territory covers `position`, if any. Territory is a
/// nearest-owned-system partition capped at [`TERRITORY_RADIUS_LY`]; exact
/// distance ties go to the lexically smallest system id so the partition
/// is total and order-independent.
#[must_use]
pub fn territory_owner<'a>(world: &'a WorldState, position: Vec3) -> Option<&'a FactionId> {
    let mut best: Option<(f64, &SystemId, &FactionId)> = None;
    for system in &world.systems {
        let Some(owner) = system.effective_owner() else {
            continue;
        };
        let distance = position.distance_to(system.position);
        if distance > TERRITORY_RADIUS_LY {
            continue;
        }
        let closer = match best {
            None => true,
            Some((best_distance, best_id, _)) => {
                distance < best_distance || (distance == best_distance && system.id < *best_id)
            }
        };
        if closer {
            best = Some((distance, &system.id, owner));
        }
    }
    best.map(|(_, _, owner)| owner)
}

fn ally_rule(viewer: &FactionId, target: &Fleet) -> bool {
    target.faction == *viewer
}

fn direct_sensor_rule(world: &WorldState, viewer: &FactionId, target: &Fleet) -> bool {
    world.fleets.iter().any(|fleet| {
        fleet.faction == *viewer
            && fleet.has_living_ships()
            && fleet.position.distance_to(target.position) <= FLEET_SENSOR_RANGE_LY
    })
}

fn system_surveillance_rule(world: &WorldState, observed: &[SystemId], target: &Fleet) -> bool {
    observed.iter().any(|id| {
        world
            .system(id)
            .is_some_and(|system| target.position.distance_to(system.position) <= SYSTEM_CAPTURE_RADIUS_LY)
    })
}

fn territory_rule(world: &WorldState, viewer: &FactionId, target: &Fleet) -> bool {
    territory_owner(world, target.position) == Some(viewer)
}

/// Whether `target` shows up on the viewer's plot. The sensor rules are
/// independent and OR-composed, checked cheapest first.
#[must_use]
pub fn fleet_visible(
    world: &WorldState,
    viewer: &FactionId,
    observed: &[SystemId],
    target: &Fleet,
) -> bool {
    ally_rule(viewer, target)
        || direct_sensor_rule(world, viewer, target)
        || system_surveillance_rule(world, observed, target)
        || territory_rule(world, viewer, target)
}

/// Project the world through the viewer's fog of war. With the fog rule
/// disabled every fleet is exposed.
#[must_use]
pub fn apply_fog<'a>(world: &'a WorldState, viewer: &FactionId) -> WorldView<'a> {
    let fleets = if world.rules.fog_of_war {
        let observed = observed_systems(world, viewer);
        world
            .fleets
            .iter()
            .filter(|fleet| fleet_visible(world, viewer, &observed, fleet))
            .collect()
    } else {
        world.fleets.iter().collect()
    };
    WorldView {
        viewer: viewer.clone(),
        day: world.day,
        systems: &world.systems,
        fleets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleets::Ship;
    use crate::galaxy::{Planet, PlanetKind};
    use crate::ids::{PlanetId, ShipId};
    use crate::ships::ShipType;
    use crate::world::Faction;

    fn scout(id: &str, faction: &str, position: Vec3) -> Fleet {
        let mut fleet = Fleet::new(FleetId::from(id), FactionId::from(faction), position);
        fleet
            .ships
            .push(Ship::new(ShipId::new(format!("{id}-s")), ShipType::Fighter));
        fleet
    }

    fn two_faction_world() -> WorldState {
        let mut world = WorldState::new(5);
        for id in ["crimson", "viridian"] {
            world.factions.push(Faction {
                id: FactionId::from(id),
                name: id.to_string(),
                is_player: id == "crimson",
            });
        }
        world.systems.push(StarSystem {
            id: SystemId::from("sys-home"),
            name: "Home".to_string(),
            position: Vec3::ZERO,
            owner: Some(FactionId::from("crimson")),
            planets: vec![Planet {
                id: PlanetId::from("ph"),
                name: "Home I".to_string(),
                kind: PlanetKind::Solid,
                owner: Some(FactionId::from("crimson")),
            }],
        });
        world
    }

    #[test]
    fn own_fleets_are_always_visible() {
        let mut world = two_faction_world();
        world
            .fleets
            .push(scout("f1", "crimson", Vec3::new(500.0, 0.0, 0.0)));
        let view = apply_fog(&world, &FactionId::from("crimson"));
        assert_eq!(view.fleet_ids(), vec![FleetId::from("f1")]);
    }

    #[test]
    fn direct_sensors_cut_off_at_range() {
        let mut world = two_faction_world();
        world
            .fleets
            .push(scout("eye", "crimson", Vec3::new(100.0, 0.0, 0.0)));
        world.fleets.push(scout(
            "near",
            "viridian",
            Vec3::new(100.0 + FLEET_SENSOR_RANGE_LY, 0.0, 0.0),
        ));
        world.fleets.push(scout(
            "far",
            "viridian",
            Vec3::new(100.0 + FLEET_SENSOR_RANGE_LY + 0.1, 0.0, 0.0),
        ));
        let view = apply_fog(&world, &FactionId::from("crimson"));
        let ids = view.fleet_ids();
        assert!(ids.contains(&FleetId::from("near")), "on the boundary counts");
        assert!(!ids.contains(&FleetId::from("far")));
    }

    #[test]
    fn observed_system_reveals_nearby_intruders() {
        let mut world = two_faction_world();
        // No crimson fleets anywhere; ownership alone observes sys-home.
        world
            .fleets
            .push(scout("lurker", "viridian", Vec3::new(4.0, 0.0, 0.0)));
        let view = apply_fog(&world, &FactionId::from("crimson"));
        assert_eq!(view.fleet_ids(), vec![FleetId::from("lurker")]);
    }

    #[test]
    fn territory_exposes_deep_intruders_beyond_sensors() {
        let mut world = two_faction_world();
        // 14 ly out: outside capture radius, inside territory, and no
        // crimson hull within sensor range.
        world
            .fleets
            .push(scout("intruder", "viridian", Vec3::new(14.0, 0.0, 0.0)));
        let view = apply_fog(&world, &FactionId::from("crimson"));
        assert_eq!(view.fleet_ids(), vec![FleetId::from("intruder")]);

        world.fleets[0].position = Vec3::new(TERRITORY_RADIUS_LY + 1.0, 0.0, 0.0);
        let view = apply_fog(&world, &FactionId::from("crimson"));
        assert!(view.fleet_ids().is_empty());
    }

    #[test]
    fn territory_ties_go_to_the_lexically_first_system() {
        let mut world = two_faction_world();
        world.systems.push(StarSystem {
            id: SystemId::from("sys-rival"),
            name: "Rival".to_string(),
            position: Vec3::new(10.0, 0.0, 0.0),
            owner: Some(FactionId::from("viridian")),
            planets: Vec::new(),
        });
        // Exactly halfway between the two owned systems.
        let midpoint = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(
            territory_owner(&world, midpoint),
            Some(&FactionId::from("crimson")),
            "sys-home sorts before sys-rival"
        );
    }

    #[test]
    fn disabling_fog_exposes_everything() {
        let mut world = two_faction_world();
        world.rules.fog_of_war = false;
        world
            .fleets
            .push(scout("ghost", "viridian", Vec3::new(900.0, 0.0, 0.0)));
        let view = apply_fog(&world, &FactionId::from("crimson"));
        assert_eq!(view.fleet_ids(), vec![FleetId::from("ghost")]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut world = two_faction_world();
        world.fleets.push(scout("eye", "crimson", Vec3::ZERO));
        world
            .fleets
            .push(scout("near", "viridian", Vec3::new(8.0, 0.0, 0.0)));
        world
            .fleets
            .push(scout("far", "viridian", Vec3::new(300.0, 0.0, 0.0)));

        let viewer = FactionId::from("crimson");
        let first = apply_fog(&world, &viewer).fleet_ids();
        let observed = observed_systems(&world, &viewer);
        // Every fleet that passed the filter still passes it.
        for id in &first {
            let fleet = world.fleet(id).unwrap();
            assert!(fleet_visible(&world, &viewer, &observed, fleet));
        }
        let second = apply_fog(&world, &viewer).fleet_ids();
        assert_eq!(first, second);
    }
}

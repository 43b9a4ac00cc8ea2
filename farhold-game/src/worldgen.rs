//! Seeded galaxy generation.
//!
//! Generation draws from the same stream the simulation will keep using,
//! in a fixed order: per system, three position draws per placement
//! attempt, then one planet-count draw, then one kind draw per planet.
//! Home seating, starting fleets, and garrisons draw nothing. Identical
//! config and seed always produce an identical galaxy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fleets::{Army, ArmyContainer, Fleet, Ship};
use crate::galaxy::{Planet, PlanetKind, StarSystem};
use crate::geom::Vec3;
use crate::ids::{ArmyId, FactionId, FleetId, PlanetId, ShipId, SystemId};
use crate::rng::{SimRng, pick_index};
use crate::rules::{GameRules, RulesError};
use crate::ships::ShipType;
use crate::world::{Faction, WorldState};

pub const MIN_SYSTEMS: u32 = 2;
pub const MAX_SYSTEMS: u32 = 64;
pub const MAX_FACTIONS: u32 = 8;
pub const MIN_SYSTEM_SEPARATION_LY: f64 = 8.0;

/// Rejection-sampling budget per system before a crowded placement is
/// accepted anyway. Dense configs must still terminate.
const PLACEMENT_ATTEMPTS: u32 = 64;

const MAX_PLANETS_PER_SYSTEM: usize = 4;
const SOLID_PLANET_CHANCE: f64 = 0.7;

const SYSTEM_NAMES: [&str; 24] = [
    "Keld", "Vossari", "Brenmark", "Ostreva", "Halvane", "Cinder Reach", "Tyr", "Aldwyn",
    "Perro", "Skellig", "Mavrun", "Dareth", "Iolo", "Crasse", "Novn", "Ebonwick", "Fayle",
    "Gildrun", "Harrow", "Ilyov", "Jastra", "Kovenn", "Lurest", "Merrow",
];

const FACTION_NAMES: [&str; 8] = [
    "Crimson Accord",
    "Viridian Compact",
    "Amber Syndicate",
    "Cobalt Ascendancy",
    "Umbral League",
    "Gilded Pact",
    "Thorn Dominion",
    "Pale Concord",
];

const ROMAN: [&str; MAX_PLANETS_PER_SYSTEM] = ["I", "II", "III", "IV"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldGenError {
    #[error("{field} must lie in [{min}, {max}], got {value}")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("cannot seat {factions} factions across {systems} systems")]
    NotEnoughSystems { factions: u32, systems: u32 },
    #[error(transparent)]
    Rules(#[from] RulesError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyConfig {
    pub system_count: u32,
    pub faction_count: u32,
    pub galaxy_radius_ly: f64,
    /// Hull roster every faction starts with, spawned in home orbit.
    pub starting_fleet: Vec<ShipType>,
    /// Troops garrisoning each home world.
    pub starting_garrison: u32,
    pub rules: GameRules,
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            system_count: 12,
            faction_count: 2,
            galaxy_radius_ly: 60.0,
            starting_fleet: vec![
                ShipType::Escort,
                ShipType::Fighter,
                ShipType::Fighter,
                ShipType::Transport,
                ShipType::Tanker,
            ],
            starting_garrison: 100,
            rules: GameRules::default(),
        }
    }
}

impl GalaxyConfig {
    /// # Errors
    ///
    /// Returns the first out-of-range field, or `NotEnoughSystems` when
    /// every faction cannot get its own home system.
    pub fn validate(&self) -> Result<(), WorldGenError> {
        if !(MIN_SYSTEMS..=MAX_SYSTEMS).contains(&self.system_count) {
            return Err(WorldGenError::RangeViolation {
                field: "system_count",
                min: f64::from(MIN_SYSTEMS),
                max: f64::from(MAX_SYSTEMS),
                value: f64::from(self.system_count),
            });
        }
        if !(1..=MAX_FACTIONS).contains(&self.faction_count) {
            return Err(WorldGenError::RangeViolation {
                field: "faction_count",
                min: 1.0,
                max: f64::from(MAX_FACTIONS),
                value: f64::from(self.faction_count),
            });
        }
        if self.faction_count > self.system_count {
            return Err(WorldGenError::NotEnoughSystems {
                factions: self.faction_count,
                systems: self.system_count,
            });
        }
        if !self.galaxy_radius_ly.is_finite()
            || !(10.0..=500.0).contains(&self.galaxy_radius_ly)
        {
            return Err(WorldGenError::RangeViolation {
                field: "galaxy_radius_ly",
                min: 10.0,
                max: 500.0,
                value: self.galaxy_radius_ly,
            });
        }
        if self.starting_garrison == 0 {
            return Err(WorldGenError::RangeViolation {
                field: "starting_garrison",
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
            });
        }
        self.rules.validate()?;
        Ok(())
    }
}

/// Build a fresh world from `config` and `seed`.
///
/// # Errors
///
/// Returns [`WorldGenError`] when the config fails validation; generation
/// itself cannot fail.
pub fn generate(config: &GalaxyConfig, seed: u64) -> Result<WorldState, WorldGenError> {
    config.validate()?;

    let mut world = WorldState::new(seed);
    world.rules = config.rules;

    for idx in 0..config.faction_count {
        let name = FACTION_NAMES[usize::try_from(idx).unwrap_or(0) % FACTION_NAMES.len()];
        world.factions.push(Faction {
            id: FactionId::new(format!("faction-{}", idx + 1)),
            name: name.to_string(),
            is_player: idx == 0,
        });
    }

    let mut rng = std::mem::take(&mut world.rng);
    roll_systems(&mut world, config, &mut rng);
    world.rng = rng;

    seat_factions(&mut world, config);

    world.push_log(format!(
        "Galaxy seeded: {} systems, {} factions.",
        world.systems.len(),
        world.factions.len()
    ));
    Ok(world)
}

fn roll_systems(world: &mut WorldState, config: &GalaxyConfig, rng: &mut SimRng) {
    let radius = config.galaxy_radius_ly;
    let mut positions: Vec<Vec3> = Vec::new();

    for idx in 0..config.system_count {
        let position = place_system(&positions, radius, rng);
        positions.push(position);

        let system_id = SystemId::new(format!("sys-{}", idx + 1));
        let name = system_name(usize::try_from(idx).unwrap_or(0));
        let planets = roll_planets(&system_id, &name, rng);
        world.systems.push(StarSystem {
            id: system_id,
            name,
            position,
            owner: None,
            planets,
        });
    }
}

fn place_system(placed: &[Vec3], radius: f64, rng: &mut SimRng) -> Vec3 {
    let mut candidate = Vec3::ZERO;
    for _ in 0..PLACEMENT_ATTEMPTS {
        // The disc is flattened on z, like the galaxies it sketches.
        let x = (rng.draw() * 2.0 - 1.0) * radius;
        let y = (rng.draw() * 2.0 - 1.0) * radius;
        let z = (rng.draw() * 2.0 - 1.0) * radius / 4.0;
        candidate = Vec3::new(x, y, z);
        let clear = placed
            .iter()
            .all(|other| other.distance_to(candidate) >= MIN_SYSTEM_SEPARATION_LY);
        if clear {
            return candidate;
        }
    }
    candidate
}

fn roll_planets(system: &SystemId, system_name: &str, rng: &mut SimRng) -> Vec<Planet> {
    let count = 1 + pick_index(rng, MAX_PLANETS_PER_SYSTEM);
    let mut planets: Vec<Planet> = (0..count)
        .map(|n| {
            let kind = if rng.draw() < SOLID_PLANET_CHANCE {
                PlanetKind::Solid
            } else {
                PlanetKind::Gas
            };
            Planet {
                id: PlanetId::new(format!("{system}-p{}", n + 1)),
                name: format!("{system_name} {}", ROMAN[n]),
                kind,
                owner: None,
            }
        })
        .collect();

    // Every system must offer somewhere to land.
    if !planets.iter().any(|planet| planet.is_solid()) {
        planets[0].kind = PlanetKind::Solid;
    }
    planets
}

fn system_name(idx: usize) -> String {
    let base = SYSTEM_NAMES[idx % SYSTEM_NAMES.len()];
    let generation = idx / SYSTEM_NAMES.len();
    if generation == 0 {
        base.to_string()
    } else {
        format!("{base}-{}", generation + 1)
    }
}

/// Assign home systems by greedy max-min spread: the first faction takes
/// the first system, each later faction the system farthest from every
/// seated home. Ties go to the lower table index. No draws.
fn seat_factions(world: &mut WorldState, config: &GalaxyConfig) {
    let mut homes: Vec<usize> = Vec::new();
    for _ in 0..world.factions.len() {
        let next = if homes.is_empty() {
            0
        } else {
            let mut best = None;
            let mut best_spread = f64::NEG_INFINITY;
            for (idx, system) in world.systems.iter().enumerate() {
                if homes.contains(&idx) {
                    continue;
                }
                let spread = homes
                    .iter()
                    .map(|&home| world.systems[home].position.distance_to(system.position))
                    .fold(f64::INFINITY, f64::min);
                if spread > best_spread {
                    best_spread = spread;
                    best = Some(idx);
                }
            }
            best.unwrap_or(0)
        };
        homes.push(next);
    }

    for (faction_idx, &system_idx) in homes.iter().enumerate() {
        let faction_id = world.factions[faction_idx].id.clone();
        let ordinal = faction_idx + 1;

        let (home_id, home_position, garrison_planet) = {
            let system = &mut world.systems[system_idx];
            for planet in &mut system.planets {
                planet.owner = Some(faction_id.clone());
            }
            system.refresh_ownership();
            let planet = system
                .first_solid_planet()
                .map(|planet| planet.id.clone());
            (system.id.clone(), system.position, planet)
        };

        let fleet_id = FleetId::new(format!("fleet-{ordinal}"));
        let mut fleet = Fleet::new(fleet_id.clone(), faction_id.clone(), home_position);
        fleet.name = format!("{} Home Flotilla", world.factions[faction_idx].name);
        fleet.orbit_system = Some(home_id);
        for (n, kind) in config.starting_fleet.iter().enumerate() {
            fleet
                .ships
                .push(Ship::new(ShipId::new(format!("{fleet_id}-s{}", n + 1)), *kind));
        }
        world.fleets.push(fleet);

        // Generation guarantees a solid planet per system.
        if let Some(planet_id) = garrison_planet {
            world.armies.push(Army::new(
                ArmyId::new(format!("army-{ordinal}")),
                faction_id,
                config.starting_garrison,
                ArmyContainer::Planet { id: planet_id },
            ));
        }
    }
}

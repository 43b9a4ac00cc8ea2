//! Ground conquest: army combat on a planet and the ownership transfer
//! that may follow.
//!
//! Resolution is faction-agnostic over any number of contenders. Powers
//! are aggregated per faction into an ordered map, the strictly highest
//! total wins, and exact ties change nothing. Ownership moves only when
//! the winner still has a living army on the ground after attrition; a
//! winner wiped out taking the planet takes nothing.

use std::collections::BTreeMap;

use crate::fleets::MORALE_MAX;
use crate::ids::{FactionId, PlanetId, SystemId};
use crate::numbers::ceil_f64_to_u32;
use crate::world::WorldState;

/// Fraction of a losing side's power converted into casualties, scaled
/// by the winner's share of the total force.
pub const ATTRITION_BASE_RATE: f64 = 0.4;
/// Fraction of the combined losing power the winner pays in casualties.
pub const WINNER_LOSS_RATE: f64 = 0.25;
/// Winner casualty multiplier when hostile ships hold the orbit.
pub const CONTESTED_ORBIT_LOSS_MULTIPLIER: f64 = 1.5;

pub const MORALE_VICTORY_BONUS: f32 = 0.1;
pub const MORALE_DEFEAT_PENALTY: f32 = 0.2;

/// How one contested planet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConquestOutcome {
    pub system: SystemId,
    pub planet: PlanetId,
    pub winner: Option<FactionId>,
    pub previous_owner: Option<FactionId>,
    /// Ownership actually changed hands.
    pub captured: bool,
    pub stalemate: bool,
    /// Troop losses per faction, winners included.
    pub losses: BTreeMap<FactionId, u32>,
}

/// Pure resolution over aggregated powers, no world access.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundResolution {
    /// Fewer than two factions fielded troops.
    NoContest,
    /// Two or more factions tied for the highest power.
    Stalemate,
    Victory {
        winner: FactionId,
        winner_losses: u32,
        loser_losses: BTreeMap<FactionId, u32>,
    },
}

/// Decide a ground engagement from per-faction power totals. Losses are
/// strictly positive for every losing side that fielded anything, so no
/// victory is ever free.
#[must_use]
pub fn resolve_ground_combat(
    powers: &BTreeMap<FactionId, f64>,
    contested_orbit: bool,
) -> GroundResolution {
    if powers.len() < 2 {
        return GroundResolution::NoContest;
    }
    let total: f64 = powers.values().sum();
    let top = powers
        .values()
        .fold(0.0_f64, |best, power| best.max(*power));
    let mut at_top = powers
        .iter()
        .filter(|(_, power)| power.total_cmp(&top).is_eq());
    let Some((winner, winner_power)) = at_top.next() else {
        return GroundResolution::NoContest;
    };
    if at_top.next().is_some() {
        return GroundResolution::Stalemate;
    }

    let winner_share = winner_power / total;
    let mut loser_losses = BTreeMap::new();
    let mut loser_power_total = 0.0;
    for (faction, power) in powers {
        if faction == winner {
            continue;
        }
        loser_power_total += power;
        let raw = power * ATTRITION_BASE_RATE * winner_share;
        loser_losses.insert(faction.clone(), ceil_f64_to_u32(raw).max(1));
    }
    let multiplier = if contested_orbit {
        CONTESTED_ORBIT_LOSS_MULTIPLIER
    } else {
        1.0
    };
    let winner_losses = ceil_f64_to_u32(loser_power_total * WINNER_LOSS_RATE * multiplier);

    GroundResolution::Victory {
        winner: winner.clone(),
        winner_losses,
        loser_losses,
    }
}

fn deployed_powers(world: &WorldState, planet: &PlanetId) -> BTreeMap<FactionId, f64> {
    let mut powers = BTreeMap::new();
    for army in world.armies_on_planet(planet) {
        if army.strength == 0 {
            continue;
        }
        *powers.entry(army.faction.clone()).or_insert(0.0) += army.power();
    }
    powers
}

/// Subtract `casualties` troops from a faction's armies on the planet,
/// front of the army table first.
fn apply_casualties(
    world: &mut WorldState,
    planet: &PlanetId,
    faction: &FactionId,
    mut casualties: u32,
) {
    for army in &mut world.armies {
        if casualties == 0 {
            break;
        }
        if army.faction != *faction || army.deployed_on() != Some(planet) {
            continue;
        }
        let taken = army.strength.min(casualties);
        army.strength -= taken;
        casualties -= taken;
    }
}

fn shift_morale(world: &mut WorldState, planet: &PlanetId, winner: &FactionId) {
    for army in &mut world.armies {
        if army.deployed_on() != Some(planet) || army.strength == 0 {
            continue;
        }
        if army.faction == *winner {
            army.morale = (army.morale + MORALE_VICTORY_BONUS).min(MORALE_MAX);
        } else {
            army.morale -= MORALE_DEFEAT_PENALTY;
        }
        army.clamp_vitals();
    }
}

fn winner_holds_ground(world: &WorldState, planet: &PlanetId, winner: &FactionId) -> bool {
    world
        .armies_on_planet(planet)
        .any(|army| army.faction == *winner && army.strength > 0)
}

fn transfer_ownership(world: &mut WorldState, system: &SystemId, planet: &PlanetId, winner: &FactionId) {
    if let Some(system) = world.system_mut(system) {
        if let Some(planet) = system.planet_mut(planet) {
            planet.owner = Some(winner.clone());
        }
        system.refresh_ownership();
    }
}

fn resolve_planet(world: &mut WorldState, system_id: &SystemId, planet_id: &PlanetId) -> Option<ConquestOutcome> {
    let powers = deployed_powers(world, planet_id);
    if powers.is_empty() {
        return None;
    }
    let previous_owner = world
        .system(system_id)
        .and_then(|system| system.planet(planet_id))
        .and_then(|planet| planet.owner.clone());

    if powers.len() == 1 {
        let (faction, _) = powers.iter().next()?;
        if previous_owner.as_ref() == Some(faction) {
            return None;
        }
        let faction = faction.clone();
        transfer_ownership(world, system_id, planet_id, &faction);
        world.push_log(format!("{faction} secures {planet_id} unopposed."));
        return Some(ConquestOutcome {
            system: system_id.clone(),
            planet: planet_id.clone(),
            winner: Some(faction),
            previous_owner,
            captured: true,
            stalemate: false,
            losses: BTreeMap::new(),
        });
    }

    // Orbital contestation is judged against the leading faction before
    // losses are applied.
    let leader = powers
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(faction, _)| faction.clone())?;
    let contested_orbit = world.orbit_contested(system_id, &leader);

    match resolve_ground_combat(&powers, contested_orbit) {
        GroundResolution::NoContest => None,
        GroundResolution::Stalemate => {
            world.push_log(format!(
                "Ground forces on {planet_id} are deadlocked; no side prevails."
            ));
            Some(ConquestOutcome {
                system: system_id.clone(),
                planet: planet_id.clone(),
                winner: None,
                previous_owner,
                captured: false,
                stalemate: true,
                losses: BTreeMap::new(),
            })
        }
        GroundResolution::Victory {
            winner,
            winner_losses,
            loser_losses,
        } => {
            let mut losses = loser_losses.clone();
            losses.insert(winner.clone(), winner_losses);
            for (faction, casualties) in &loser_losses {
                apply_casualties(world, planet_id, faction, *casualties);
            }
            apply_casualties(world, planet_id, &winner, winner_losses);
            shift_morale(world, planet_id, &winner);

            let captured = winner_holds_ground(world, planet_id, &winner)
                && previous_owner.as_ref() != Some(&winner);
            if captured {
                transfer_ownership(world, system_id, planet_id, &winner);
                world.push_log(format!(
                    "{winner} takes {planet_id}{}.",
                    previous_owner
                        .as_ref()
                        .map(|owner| format!(" from {owner}"))
                        .unwrap_or_default()
                ));
            } else if winner_holds_ground(world, planet_id, &winner) {
                world.push_log(format!("{winner} prevails on {planet_id}."));
            } else {
                world.push_log(format!(
                    "{winner} wins the ground battle on {planet_id} but is wiped out taking it; ownership stands."
                ));
            }
            Some(ConquestOutcome {
                system: system_id.clone(),
                planet: planet_id.clone(),
                winner: Some(winner),
                previous_owner,
                captured,
                stalemate: false,
                losses,
            })
        }
    }
}

/// Conquest phase: resolve every planet where deployed troops dispute
/// the ground. Planets are visited in system-table order.
pub fn run_conquest_phase(world: &mut WorldState) -> Vec<ConquestOutcome> {
    let mut targets = Vec::new();
    for system in &world.systems {
        for planet in &system.planets {
            if !planet.is_solid() {
                continue;
            }
            let powers = deployed_powers(world, &planet.id);
            if powers.is_empty() {
                continue;
            }
            let foreign_presence = powers
                .keys()
                .any(|faction| planet.owner.as_ref() != Some(faction));
            if powers.len() >= 2 || foreign_presence {
                targets.push((system.id.clone(), planet.id.clone()));
            }
        }
    }

    let mut outcomes = Vec::new();
    for (system_id, planet_id) in targets {
        if let Some(outcome) = resolve_planet(world, &system_id, &planet_id) {
            outcomes.push(outcome);
        }
    }
    outcomes
}

//! Turn orchestration: command application, phase sequencing, and the
//! atomic world swap.
//!
//! A turn runs on a working copy of the world. Commands apply first in
//! submission order, then the automatic phases run in a fixed sequence:
//! movement, arrivals, combat, conquest, bookkeeping. Only when the copy
//! passes the closing integrity check does it replace the live state, so
//! a fatal error leaves the caller's world untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat;
use crate::commands::{self, Command};
use crate::conquest;
use crate::fleets::ArmyContainer;
use crate::ids::{ArmyId, BattleId, FactionId, PlanetId, ShipId, SystemId};
use crate::movement;
use crate::world::WorldState;

/// Marker prefixing the one structured report line each turn emits.
pub const TURN_REPORT_MARKER: &str = "@turn-report:";
pub const TURN_REPORT_VERSION: u32 = 1;

/// Experience granted to every hull that survives a battle.
pub const EXPERIENCE_AWARD: u32 = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TurnError {
    #[error("non-finite numeric state: {0}")]
    NonFinite(String),
    #[error("army {0} references a missing container")]
    DanglingArmy(ArmyId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipChange {
    pub system: SystemId,
    pub planet: PlanetId,
    pub new_owner: FactionId,
    #[serde(default)]
    pub previous_owner: Option<FactionId>,
}

/// Per-turn summary pushed into the log as JSON behind
/// [`TURN_REPORT_MARKER`]. External reporting reads this instead of
/// re-deriving deltas from raw state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnReport {
    pub version: u32,
    pub day: u32,
    pub commands_applied: u32,
    pub commands_rejected: u32,
    pub battles: Vec<BattleId>,
    pub ownership_changes: Vec<OwnershipChange>,
    pub ships_lost: u32,
    pub fleets_lost: Vec<crate::ids::FleetId>,
    pub armies_lost: u32,
    pub armies_landed: u32,
    pub experience_awards: u32,
}

/// Reject state no phase can safely compute over. Positions and fuel
/// must be finite and every army's container must resolve.
pub fn check_integrity(world: &WorldState) -> Result<(), TurnError> {
    for system in &world.systems {
        if !system.position.is_finite() {
            return Err(TurnError::NonFinite(format!("system {} position", system.id)));
        }
    }
    for fleet in &world.fleets {
        if !fleet.position.is_finite() {
            return Err(TurnError::NonFinite(format!("fleet {} position", fleet.id)));
        }
        for ship in &fleet.ships {
            if !ship.fuel.is_finite() {
                return Err(TurnError::NonFinite(format!("ship {} fuel", ship.id)));
            }
        }
    }
    for army in &world.armies {
        let resolves = match &army.container {
            ArmyContainer::Planet { id } => world.system_of_planet(id).is_some(),
            ArmyContainer::Fleet { id } => world.fleet(id).is_some(),
        };
        if !resolves {
            return Err(TurnError::DanglingArmy(army.id.clone()));
        }
    }
    Ok(())
}

/// Advance exactly one turn. Commands are validated one at a time in
/// submission order; a rejected command is logged and skipped, never
/// fatal. On success the world is replaced wholesale; on error it is
/// untouched.
pub fn advance_turn(
    world: &mut WorldState,
    queued: &[Command],
) -> Result<TurnReport, TurnError> {
    check_integrity(world)?;

    let mut next = world.clone();
    let report = run_turn(&mut next, queued);
    check_integrity(&next)?;

    *world = next;
    Ok(report)
}

fn run_turn(world: &mut WorldState, queued: &[Command]) -> TurnReport {
    world.day += 1;
    let mut report = TurnReport {
        version: TURN_REPORT_VERSION,
        day: world.day,
        ..TurnReport::default()
    };

    for command in queued {
        match commands::dispatch_command(world, command) {
            Ok(_) => report.commands_applied += 1,
            Err(err) => {
                report.commands_rejected += 1;
                world.push_log(format!("Command rejected: {err}"));
            }
        }
    }

    let mut rng = std::mem::take(&mut world.rng);

    movement::advance_fleets(world);
    let arrival_ops = movement::process_arrivals(world, &mut rng);
    report.armies_landed = arrival_ops.armies_landed;

    report.battles = combat::run_combat_phase(world, &mut rng);

    for outcome in conquest::run_conquest_phase(world) {
        if let (true, Some(winner)) = (outcome.captured, outcome.winner) {
            report.ownership_changes.push(OwnershipChange {
                system: outcome.system,
                planet: outcome.planet,
                new_owner: winner,
                previous_owner: outcome.previous_owner,
            });
        }
    }

    world.rng = rng;

    report.experience_awards = award_experience(world, &report.battles);
    let purge = world.purge_destroyed();
    report.ships_lost = purge.ships_lost;
    report.fleets_lost = purge.fleets_lost;
    report.armies_lost = purge.armies_lost;

    evaluate_victory(world);

    if let Ok(json) = serde_json::to_string(&report) {
        world.push_log(format!("{TURN_REPORT_MARKER}{json}"));
    }
    report
}

fn award_experience(world: &mut WorldState, fought: &[BattleId]) -> u32 {
    let mut survivors: Vec<ShipId> = Vec::new();
    for battle_id in fought {
        if let Some(battle) = world.battles.iter().find(|battle| &battle.id == battle_id) {
            survivors.extend(battle.survivors.iter().cloned());
        }
    }
    let mut awards = 0;
    for ship_id in survivors {
        for fleet in &mut world.fleets {
            if let Some(ship) = fleet.ship_mut(&ship_id) {
                ship.experience = ship.experience.saturating_add(EXPERIENCE_AWARD);
                awards += 1;
                break;
            }
        }
    }
    awards
}

fn faction_standing(world: &WorldState, faction: &FactionId) -> bool {
    world
        .systems
        .iter()
        .any(|system| system.effective_owner() == Some(faction))
        || world
            .fleets
            .iter()
            .any(|fleet| fleet.faction == *faction && fleet.has_living_ships())
        || world
            .armies
            .iter()
            .any(|army| army.faction == *faction && army.strength > 0)
}

/// The war ends when exactly one faction still holds anything.
fn evaluate_victory(world: &mut WorldState) {
    if world.victory.winner.is_some() || world.factions.len() < 2 {
        return;
    }
    let standing: Vec<FactionId> = world
        .factions
        .iter()
        .map(|faction| faction.id.clone())
        .filter(|id| faction_standing(world, id))
        .collect();
    if standing.len() == 1 {
        let winner = standing.into_iter().next().unwrap_or_else(|| FactionId::new(""));
        world.victory.winner = Some(winner.clone());
        world.victory.concluded_on_turn = Some(world.day);
        world.push_message(format!("{winner} stands alone; the war is over."));
        world.push_log(format!("Victory: {winner} on day {}.", world.day));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleets::{Fleet, Ship};
    use crate::galaxy::{Planet, PlanetKind, StarSystem};
    use crate::geom::Vec3;
    use crate::ids::FleetId;
    use crate::ships::ShipType;
    use crate::world::Faction;

    fn skirmish_world() -> WorldState {
        let mut world = WorldState::new(99);
        world.rules.max_combat_rounds = 200;
        for id in ["crimson", "viridian"] {
            world.factions.push(Faction {
                id: FactionId::from(id),
                name: id.to_string(),
                is_player: id == "crimson",
            });
        }
        world.systems.push(StarSystem {
            id: SystemId::from("sys-1"),
            name: "Keld".to_string(),
            position: Vec3::ZERO,
            owner: Some(FactionId::from("crimson")),
            planets: vec![Planet {
                id: PlanetId::from("p1"),
                name: "Keld Prime".to_string(),
                kind: PlanetKind::Solid,
                owner: Some(FactionId::from("crimson")),
            }],
        });
        let mut hunter = Fleet::new(FleetId::from("f1"), FactionId::from("crimson"), Vec3::ZERO);
        hunter.orbit_system = Some(SystemId::from("sys-1"));
        hunter
            .ships
            .push(Ship::new(ShipId::from("cap"), ShipType::Capital));
        world.fleets.push(hunter);
        let mut prey = Fleet::new(FleetId::from("f2"), FactionId::from("viridian"), Vec3::ZERO);
        prey.orbit_system = Some(SystemId::from("sys-1"));
        prey.ships
            .push(Ship::new(ShipId::from("box"), ShipType::Transport));
        world.fleets.push(prey);
        world
    }

    #[test]
    fn advance_increments_day_and_files_a_report() {
        let mut world = skirmish_world();
        let report = advance_turn(&mut world, &[]).unwrap();
        assert_eq!(world.day, 1);
        assert_eq!(report.day, 1);
        assert_eq!(report.version, TURN_REPORT_VERSION);

        let line = world
            .logs
            .iter()
            .find(|line| line.starts_with(TURN_REPORT_MARKER))
            .expect("report line present");
        let parsed: TurnReport =
            serde_json::from_str(&line[TURN_REPORT_MARKER.len()..]).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn turn_is_atomic_on_integrity_failure() {
        let mut world = skirmish_world();
        world.fleets[0].position = Vec3::new(f64::NAN, 0.0, 0.0);
        let before = serde_json::to_string(&world).unwrap();
        let err = advance_turn(&mut world, &[]).unwrap_err();
        assert!(matches!(err, TurnError::NonFinite(_)));
        assert_eq!(serde_json::to_string(&world).unwrap(), before, "unchanged");
    }

    #[test]
    fn survivors_gain_experience_and_losses_are_purged() {
        let mut world = skirmish_world();
        let report = advance_turn(&mut world, &[]).unwrap();

        assert_eq!(report.battles.len(), 1);
        assert_eq!(report.ships_lost, 1, "the transport dies");
        assert_eq!(report.fleets_lost, vec![FleetId::from("f2")]);
        assert_eq!(report.experience_awards, 1);
        assert_eq!(world.fleets.len(), 1);
        assert_eq!(world.fleets[0].ships[0].experience, EXPERIENCE_AWARD);
    }

    #[test]
    fn victory_goes_to_the_last_faction_standing() {
        let mut world = skirmish_world();
        advance_turn(&mut world, &[]).unwrap();
        // The transport fleet was viridian's only asset.
        assert_eq!(world.victory.winner, Some(FactionId::from("crimson")));
        assert_eq!(world.victory.concluded_on_turn, Some(1));
    }

    #[test]
    fn rejected_commands_do_not_abort_the_turn() {
        let mut world = skirmish_world();
        let bogus = Command::MoveFleet {
            fleet: FleetId::from("no-such"),
            system: SystemId::from("sys-1"),
        };
        let report = advance_turn(&mut world, &[bogus]).unwrap();
        assert_eq!(report.commands_rejected, 1);
        assert_eq!(report.commands_applied, 0);
        assert!(world.logs.iter().any(|line| line.contains("Command rejected")));
        assert_eq!(world.day, 1);
    }

    #[test]
    fn identical_worlds_advance_identically() {
        let world_a = skirmish_world();
        let mut run_a = world_a.clone();
        let mut run_b = world_a;
        advance_turn(&mut run_a, &[]).unwrap();
        advance_turn(&mut run_b, &[]).unwrap();
        assert_eq!(run_a.state_digest(), run_b.state_digest());
        assert_eq!(run_a.rng.draws(), run_b.rng.draws());
    }
}

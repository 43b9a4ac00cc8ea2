//! Fleet combat: round-based target acquisition and simultaneous fire.
//!
//! Draw order is fixed and documented because replays depend on it. Each
//! round first runs the targeting pass in roster order (one stickiness
//! draw per shooter holding a live mark, one pick draw per class with two
//! or more candidates), then the fire pass in roster order (one accuracy
//! draw per shot, plus one interception draw for missile volleys that
//! hit a hull with working point defense). A class or fallback pool with
//! a single candidate costs no draw.
//!
//! All fire resolves against the state at the start of the round, so a
//! ship destroyed mid-round still gets its last salvo off.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::fleets::{Fleet, FleetState, Ship};
use crate::ids::{BattleId, FactionId, FleetId, ShipId, SystemId};
use crate::rng::{SimRng, pick_index, sample_ratio};
use crate::rules::GameRules;
use crate::ships::{ShipType, VolleyKind};
use crate::world::WorldState;

/// Probability an attacker keeps its current target while it lives.
pub const TARGET_STICKINESS: f64 = 0.8;
/// Missile interception odds are `pd / (pd + MISSILE_PENETRATION)`.
pub const MISSILE_PENETRATION: f64 = 30.0;

/// Broad hull classes the priority tables rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetClass {
    Capital,
    Escort,
    StrikeCraft,
    Auxiliary,
}

impl TargetClass {
    const fn of(kind: ShipType) -> Self {
        match kind {
            ShipType::Capital => Self::Capital,
            ShipType::Escort => Self::Escort,
            ShipType::Fighter | ShipType::Bomber => Self::StrikeCraft,
            ShipType::Transport | ShipType::Tanker | ShipType::Extractor => Self::Auxiliary,
        }
    }
}

/// Full class ordering per shooter role. Escorts screen against strike
/// craft, bombers hunt the heaviest hulls, capitals trade with the line.
const fn priority_table(kind: ShipType) -> [TargetClass; 4] {
    match kind {
        ShipType::Capital => [
            TargetClass::Capital,
            TargetClass::Escort,
            TargetClass::Auxiliary,
            TargetClass::StrikeCraft,
        ],
        ShipType::Bomber => [
            TargetClass::Capital,
            TargetClass::Escort,
            TargetClass::Auxiliary,
            TargetClass::StrikeCraft,
        ],
        _ => [
            TargetClass::StrikeCraft,
            TargetClass::Escort,
            TargetClass::Capital,
            TargetClass::Auxiliary,
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Scheduled,
    InProgress,
    Resolved,
}

/// Frozen copy of one hull as the battle opened, kept for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    pub ship: ShipId,
    pub fleet: FleetId,
    pub faction: FactionId,
    pub kind: ShipType,
    pub hp: i32,
    pub max_hp: i32,
}

/// Record of one engagement, kept in the world for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub system: SystemId,
    pub day: u32,
    pub factions: Vec<FactionId>,
    pub fleets: Vec<FleetId>,
    pub opening: Vec<ShipSnapshot>,
    pub survivors: Vec<ShipId>,
    pub rounds: u32,
    #[serde(default)]
    pub retreated: Vec<FactionId>,
    #[serde(default)]
    pub log: Vec<String>,
    pub status: BattleStatus,
}

/// One hull in the fight. Working copy of the ship; the phase driver
/// writes the final hp back after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub ship: ShipId,
    pub fleet: FleetId,
    pub faction: FactionId,
    pub kind: ShipType,
    pub hp: i32,
    pub max_hp: i32,
    pub accuracy: f64,
    target: Option<usize>,
}

impl Combatant {
    #[must_use]
    pub fn muster(ship: &Ship, fleet: &Fleet) -> Self {
        Self {
            ship: ship.id.clone(),
            fleet: fleet.id.clone(),
            faction: fleet.faction.clone(),
            kind: ship.kind,
            hp: ship.hp,
            max_hp: ship.max_hp(),
            accuracy: ship.accuracy(),
            target: None,
        }
    }
}

/// Fleets that will fight each other this turn, grouped by orbit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    pub system: SystemId,
    pub fleets: Vec<FleetId>,
}

#[derive(Debug, Clone)]
pub struct CombatContext<'a> {
    pub battle_id: BattleId,
    pub system: SystemId,
    pub day: u32,
    pub rules: &'a GameRules,
}

/// Orbits holding living, non-retreating fleets of at least two factions.
/// Grouping follows fleet-table order, so the result is reproducible.
#[must_use]
pub fn find_engagements(world: &WorldState) -> Vec<Engagement> {
    let mut engagements: Vec<Engagement> = Vec::new();
    for fleet in &world.fleets {
        if fleet.state != FleetState::Orbit || fleet.retreating || !fleet.has_living_ships() {
            continue;
        }
        let Some(system) = fleet.orbit_system.clone() else {
            continue;
        };
        match engagements.iter_mut().find(|e| e.system == system) {
            Some(engagement) => engagement.fleets.push(fleet.id.clone()),
            None => engagements.push(Engagement {
                system,
                fleets: vec![fleet.id.clone()],
            }),
        }
    }
    engagements.retain(|engagement| {
        let mut factions: Vec<&FactionId> = Vec::new();
        for fleet_id in &engagement.fleets {
            if let Some(fleet) = world.fleet(fleet_id)
                && !factions.contains(&&fleet.faction)
            {
                factions.push(&fleet.faction);
            }
        }
        factions.len() >= 2
    });
    engagements
}

fn living_factions(roster: &[Combatant]) -> Vec<FactionId> {
    let mut factions = Vec::new();
    for combatant in roster.iter().filter(|c| c.hp > 0) {
        if !factions.contains(&combatant.faction) {
            factions.push(combatant.faction.clone());
        }
    }
    factions
}

fn side_has_living(roster: &[Combatant], faction: &FactionId) -> bool {
    roster.iter().any(|c| c.faction == *faction && c.hp > 0)
}

fn side_hull_fraction(roster: &[Combatant], faction: &FactionId) -> f64 {
    let mut hp = 0i64;
    let mut max_hp = 0i64;
    for combatant in roster.iter().filter(|c| c.faction == *faction) {
        hp += i64::from(combatant.hp.max(0));
        max_hp += i64::from(combatant.max_hp);
    }
    if max_hp == 0 {
        return 0.0;
    }
    crate::numbers::i64_to_f64(hp) / crate::numbers::i64_to_f64(max_hp)
}

fn select_target<R: RngCore>(
    roster: &[Combatant],
    alive: &[bool],
    shooter_idx: usize,
    rng: &mut R,
) -> Option<usize> {
    let shooter = &roster[shooter_idx];
    let enemies: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(idx, c)| alive[*idx] && c.faction != shooter.faction)
        .map(|(idx, _)| idx)
        .collect();
    if enemies.is_empty() {
        return None;
    }

    // Keep the current mark with high probability while it lives.
    if let Some(current) = shooter.target
        && alive.get(current).copied().unwrap_or(false)
        && roster[current].faction != shooter.faction
        && sample_ratio(rng) < TARGET_STICKINESS
    {
        return Some(current);
    }

    for class in priority_table(shooter.kind) {
        let candidates: Vec<usize> = enemies
            .iter()
            .copied()
            .filter(|&idx| TargetClass::of(roster[idx].kind) == class)
            .collect();
        if !candidates.is_empty() {
            return Some(candidates[pick_index(rng, candidates.len())]);
        }
    }
    // The class tables partition every hull, so a non-empty enemy list
    // always matched above.
    None
}

fn run_round<R: RngCore>(roster: &mut [Combatant], rng: &mut R, log: &mut Vec<String>) {
    let alive_at_start: Vec<bool> = roster.iter().map(|c| c.hp > 0).collect();

    for idx in 0..roster.len() {
        if !alive_at_start[idx] || !roster[idx].kind.is_combatant() {
            roster[idx].target = None;
            continue;
        }
        roster[idx].target = select_target(roster, &alive_at_start, idx, rng);
    }

    let mut pending = vec![0i32; roster.len()];
    for idx in 0..roster.len() {
        if !alive_at_start[idx] {
            continue;
        }
        let Some(target_idx) = roster[idx].target else {
            continue;
        };
        let shooter_name = roster[idx].ship.clone();
        let stats = roster[idx].kind.stats();
        if sample_ratio(rng) >= roster[idx].accuracy {
            log.push(format!("{shooter_name} misses."));
            continue;
        }
        if stats.volley == VolleyKind::Missile {
            let pd = roster[target_idx].kind.stats().point_defense;
            if pd > 0.0 {
                let intercept_chance = pd / (pd + MISSILE_PENETRATION);
                if sample_ratio(rng) < intercept_chance {
                    log.push(format!(
                        "{} splashes the salvo from {shooter_name}.",
                        roster[target_idx].ship
                    ));
                    continue;
                }
            }
        }
        pending[target_idx] = pending[target_idx].saturating_add(stats.damage);
        log.push(format!(
            "{shooter_name} hits {} for {}.",
            roster[target_idx].ship, stats.damage
        ));
    }

    for (idx, damage) in pending.into_iter().enumerate() {
        if damage > 0 {
            roster[idx].hp = (roster[idx].hp - damage).max(0);
            if roster[idx].hp == 0 {
                log.push(format!("{} is destroyed.", roster[idx].ship));
            }
        }
    }
}

/// Run a full engagement over `roster` until one side is eliminated,
/// a side retreats, or the round cap is hit. Mutates roster hp in place
/// and returns the battle record.
#[must_use]
pub fn resolve_combat<R: RngCore>(
    ctx: &CombatContext<'_>,
    roster: &mut [Combatant],
    rng: &mut R,
) -> Battle {
    let mut factions = Vec::new();
    let mut fleets = Vec::new();
    for combatant in roster.iter() {
        if !factions.contains(&combatant.faction) {
            factions.push(combatant.faction.clone());
        }
        if !fleets.contains(&combatant.fleet) {
            fleets.push(combatant.fleet.clone());
        }
    }
    let mut battle = Battle {
        id: ctx.battle_id.clone(),
        system: ctx.system.clone(),
        day: ctx.day,
        factions,
        fleets,
        opening: roster
            .iter()
            .map(|c| ShipSnapshot {
                ship: c.ship.clone(),
                fleet: c.fleet.clone(),
                faction: c.faction.clone(),
                kind: c.kind,
                hp: c.hp,
                max_hp: c.max_hp,
            })
            .collect(),
        survivors: Vec::new(),
        rounds: 0,
        retreated: Vec::new(),
        log: Vec::new(),
        status: BattleStatus::InProgress,
    };

    if !roster.iter().any(|c| c.hp > 0 && c.kind.is_combatant()) {
        battle.log.push("No armed hulls present; the standoff disperses.".to_string());
        finish(&mut battle, roster);
        return battle;
    }

    let max_rounds = ctx.rules.max_combat_rounds.max(1);
    while battle.rounds < max_rounds {
        if living_factions(roster).len() < 2 {
            break;
        }
        battle.rounds += 1;
        battle.log.push(format!("Round {}.", battle.rounds));
        run_round(roster, rng, &mut battle.log);

        let mut any_retreat = false;
        for faction in battle.factions.clone() {
            if battle.retreated.contains(&faction) || !side_has_living(roster, &faction) {
                continue;
            }
            if side_hull_fraction(roster, &faction) < f64::from(ctx.rules.retreat_hull_fraction) {
                battle.log.push(format!("{faction} breaks off and retreats."));
                battle.retreated.push(faction);
                any_retreat = true;
            }
        }
        if any_retreat {
            break;
        }
    }

    let alive = living_factions(roster);
    let holders: Vec<&FactionId> = alive
        .iter()
        .filter(|faction| !battle.retreated.contains(faction))
        .collect();
    match (alive.len(), holders.len()) {
        (0, _) => battle.log.push("Mutual annihilation.".to_string()),
        (_, 1) if alive.len() == 1 || !battle.retreated.is_empty() => battle
            .log
            .push(format!("{} holds the field.", holders[0])),
        _ => battle
            .log
            .push(format!("Stalemate after {} round(s).", battle.rounds)),
    }

    finish(&mut battle, roster);
    battle
}

fn finish(battle: &mut Battle, roster: &[Combatant]) {
    battle.survivors = roster
        .iter()
        .filter(|c| c.hp > 0)
        .map(|c| c.ship.clone())
        .collect();
    battle.status = BattleStatus::Resolved;
}

/// Retreat posture only lasts while hostiles hold the same orbit.
fn clear_stale_retreats(world: &mut WorldState) {
    let stale: Vec<usize> = world
        .fleets
        .iter()
        .enumerate()
        .filter(|(_, fleet)| fleet.retreating && fleet.state == FleetState::Orbit)
        .filter(|(_, fleet)| {
            fleet
                .orbit_system
                .as_ref()
                .is_none_or(|system| !world.orbit_contested(system, &fleet.faction))
        })
        .map(|(idx, _)| idx)
        .collect();
    for idx in stale {
        world.fleets[idx].retreating = false;
    }
}

/// Combat phase driver: find engagements, resolve each, write results
/// back to the fleets, and file the battle records.
pub fn run_combat_phase(world: &mut WorldState, rng: &mut SimRng) -> Vec<BattleId> {
    clear_stale_retreats(world);
    let engagements = find_engagements(world);
    let day = world.day;
    let rules = world.rules;
    let mut fought = Vec::new();

    for engagement in engagements {
        let mut roster = Vec::new();
        for fleet_id in &engagement.fleets {
            if let Some(fleet) = world.fleet(fleet_id) {
                for ship in fleet.living_ships() {
                    roster.push(Combatant::muster(ship, fleet));
                }
            }
        }
        if roster.is_empty() {
            continue;
        }
        for fleet_id in &engagement.fleets {
            if let Some(fleet) = world.fleet_mut(fleet_id) {
                fleet.set_state(FleetState::Combat, day);
            }
        }

        let ctx = CombatContext {
            battle_id: BattleId::new(rng.derived_id("battle")),
            system: engagement.system.clone(),
            day,
            rules: &rules,
        };
        let battle = resolve_combat(&ctx, &mut roster, rng);
        apply_battle_results(world, &battle, &roster);
        world.push_log(format!(
            "Battle {} at {}: {} round(s), {} of {} hulls survive.",
            battle.id,
            battle.system,
            battle.rounds,
            battle.survivors.len(),
            battle.opening.len()
        ));
        fought.push(battle.id.clone());
        world.battles.push(battle);
    }
    fought
}

fn apply_battle_results(world: &mut WorldState, battle: &Battle, roster: &[Combatant]) {
    for combatant in roster {
        if let Some(fleet) = world.fleet_mut(&combatant.fleet)
            && let Some(ship) = fleet.ship_mut(&combatant.ship)
        {
            ship.hp = combatant.hp.max(0);
        }
    }
    let day = battle.day;
    for fleet_id in &battle.fleets {
        if let Some(fleet) = world.fleet_mut(fleet_id) {
            fleet.set_state(FleetState::Orbit, day);
            if battle.retreated.contains(&fleet.faction) && fleet.has_living_ships() {
                fleet.retreating = true;
            }
        }
    }
}

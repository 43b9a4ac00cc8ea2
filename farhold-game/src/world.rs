//! The root world aggregate owned by the turn orchestrator.

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::combat::Battle;
use crate::fleets::{Army, Fleet};
use crate::galaxy::StarSystem;
use crate::ids::{ArmyId, FactionId, FleetId, PlanetId, SystemId};
use crate::rng::SimRng;
use crate::rules::GameRules;

/// Oldest entries are dropped once the log grows past this.
pub const MAX_LOG_ENTRIES: usize = 500;
pub const MAX_MESSAGES: usize = 200;

const DIGEST_SEED: u64 = 0x4641_5248;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_player: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryState {
    pub winner: Option<FactionId>,
    pub concluded_on_turn: Option<u32>,
}

/// Everything removed by a bookkeeping sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub ships_lost: u32,
    pub fleets_lost: Vec<FleetId>,
    pub armies_lost: u32,
}

/// The complete simulation state. Mutated only through command dispatch and
/// `advance_turn`; every subsystem receives it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub day: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub rng: SimRng,
    #[serde(default)]
    pub factions: Vec<Faction>,
    #[serde(default)]
    pub systems: Vec<StarSystem>,
    #[serde(default)]
    pub fleets: Vec<Fleet>,
    #[serde(default)]
    pub armies: Vec<Army>,
    #[serde(default)]
    pub battles: Vec<Battle>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub victory: VictoryState,
    #[serde(default)]
    pub rules: GameRules,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl WorldState {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            day: 0,
            seed,
            rng: SimRng::new(seed),
            factions: Vec::new(),
            systems: Vec::new(),
            fleets: Vec::new(),
            armies: Vec::new(),
            battles: Vec::new(),
            logs: Vec::new(),
            messages: Vec::new(),
            victory: VictoryState::default(),
            rules: GameRules::default(),
        }
    }

    #[must_use]
    pub fn faction(&self, id: &FactionId) -> Option<&Faction> {
        self.factions.iter().find(|faction| &faction.id == id)
    }

    #[must_use]
    pub fn system(&self, id: &SystemId) -> Option<&StarSystem> {
        self.systems.iter().find(|system| &system.id == id)
    }

    pub fn system_mut(&mut self, id: &SystemId) -> Option<&mut StarSystem> {
        self.systems.iter_mut().find(|system| &system.id == id)
    }

    #[must_use]
    pub fn system_of_planet(&self, planet: &PlanetId) -> Option<&StarSystem> {
        self.systems
            .iter()
            .find(|system| system.planet(planet).is_some())
    }

    #[must_use]
    pub fn fleet(&self, id: &FleetId) -> Option<&Fleet> {
        self.fleets.iter().find(|fleet| &fleet.id == id)
    }

    pub fn fleet_mut(&mut self, id: &FleetId) -> Option<&mut Fleet> {
        self.fleets.iter_mut().find(|fleet| &fleet.id == id)
    }

    #[must_use]
    pub fn army(&self, id: &ArmyId) -> Option<&Army> {
        self.armies.iter().find(|army| &army.id == id)
    }

    pub fn army_mut(&mut self, id: &ArmyId) -> Option<&mut Army> {
        self.armies.iter_mut().find(|army| &army.id == id)
    }

    pub fn armies_on_planet<'a>(
        &'a self,
        planet: &'a PlanetId,
    ) -> impl Iterator<Item = &'a Army> {
        self.armies
            .iter()
            .filter(move |army| army.deployed_on() == Some(planet))
    }

    pub fn armies_in_fleet<'a>(&'a self, fleet: &'a FleetId) -> impl Iterator<Item = &'a Army> {
        self.armies
            .iter()
            .filter(move |army| army.embarked_in() == Some(fleet))
    }

    /// True when another faction keeps armed ships in the system's orbit.
    /// Contested orbits raise landing and conquest attrition.
    #[must_use]
    pub fn orbit_contested(&self, system: &SystemId, faction: &FactionId) -> bool {
        self.fleets.iter().any(|fleet| {
            fleet.faction != *faction
                && fleet.orbit_system.as_ref() == Some(system)
                && fleet.living_ships().any(|ship| ship.kind.is_combatant())
        })
    }

    pub fn push_log(&mut self, entry: String) {
        self.logs.push(entry);
        truncate_front(&mut self.logs, MAX_LOG_ENTRIES);
    }

    pub fn push_message(&mut self, message: String) {
        self.messages.push(message);
        truncate_front(&mut self.messages, MAX_MESSAGES);
    }

    /// Sweep out dead ships, emptied fleets, and armies whose home is gone.
    /// Runs at the end of every turn so the invariants hold between turns.
    pub fn purge_destroyed(&mut self) -> PurgeSummary {
        let mut summary = PurgeSummary::default();

        for fleet in &mut self.fleets {
            let before = fleet.ships.len();
            fleet.ships.retain(|ship| ship.is_alive());
            summary.ships_lost += u32::try_from(before - fleet.ships.len()).unwrap_or(u32::MAX);
        }

        let mut lost_fleets = Vec::new();
        self.fleets.retain(|fleet| {
            if fleet.is_destroyed() {
                lost_fleets.push(fleet.id.clone());
                false
            } else {
                true
            }
        });
        summary.fleets_lost = lost_fleets;

        // An embarked army only survives while a living transport actually
        // carries it; a deployed army needs its planet to still exist.
        let carried: Vec<ArmyId> = self
            .fleets
            .iter()
            .flat_map(|fleet| fleet.living_ships())
            .filter_map(|ship| ship.cargo_army.clone())
            .collect();
        let planet_ids: Vec<PlanetId> = self
            .systems
            .iter()
            .flat_map(|system| system.planets.iter().map(|planet| planet.id.clone()))
            .collect();

        let before = self.armies.len();
        self.armies.retain(|army| {
            if army.strength == 0 {
                return false;
            }
            match (army.deployed_on(), army.embarked_in()) {
                (Some(planet), _) => planet_ids.contains(planet),
                (_, Some(_)) => carried.contains(&army.id),
                _ => false,
            }
        });
        summary.armies_lost += u32::try_from(before - self.armies.len()).unwrap_or(u32::MAX);

        // Cargo manifests may now point at armies that no longer exist.
        let army_ids: Vec<ArmyId> = self.armies.iter().map(|army| army.id.clone()).collect();
        for fleet in &mut self.fleets {
            for ship in &mut fleet.ships {
                if let Some(cargo) = ship.cargo_army.as_ref()
                    && !army_ids.contains(cargo)
                {
                    ship.cargo_army = None;
                }
            }
        }

        summary
    }

    /// 64-bit digest of the canonical serialized state, for cheap
    /// determinism comparisons. Identical states always digest identically.
    #[must_use]
    pub fn state_digest(&self) -> u64 {
        serde_json::to_vec(self)
            .map(|bytes| XxHash64::oneshot(DIGEST_SEED, &bytes))
            .unwrap_or(0)
    }
}

pub(crate) fn truncate_front(entries: &mut Vec<String>, cap: usize) {
    if entries.len() > cap {
        let excess = entries.len() - cap;
        entries.drain(..excess);
    }
}

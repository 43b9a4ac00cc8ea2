//! Fleets, the ships inside them, and the armies they carry.

use serde::{Deserialize, Serialize};

use crate::geom::Vec3;
use crate::ids::{ArmyId, FactionId, FleetId, PlanetId, ShipId, SystemId};
use crate::numbers::quantize_fuel;
use crate::ships::{EXPERIENCE_ACCURACY_CAP, EXPERIENCE_ACCURACY_STEP, ShipType};

pub const MORALE_MIN: f32 = 0.1;
pub const MORALE_MAX: f32 = 2.0;
pub const DEFAULT_MORALE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub kind: ShipType,
    pub hp: i32,
    #[serde(default)]
    pub fuel: f64,
    #[serde(default)]
    pub experience: u32,
    /// Army riding in this hull. Transports only.
    #[serde(default)]
    pub cargo_army: Option<ArmyId>,
}

impl Ship {
    /// A factory-fresh hull: full hit points, full tanks.
    #[must_use]
    pub fn new(id: ShipId, kind: ShipType) -> Self {
        let stats = kind.stats();
        Self {
            id,
            kind,
            hp: stats.max_hp,
            fuel: stats.fuel_capacity,
            experience: 0,
            cargo_army: None,
        }
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.kind.stats().max_hp
    }

    /// Combat accuracy including the bounded experience bonus.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let bonus =
            (f64::from(self.experience) * EXPERIENCE_ACCURACY_STEP).min(EXPERIENCE_ACCURACY_CAP);
        (self.kind.stats().accuracy + bonus).min(1.0)
    }

    /// Force hp and fuel back inside their legal ranges.
    pub fn clamp_vitals(&mut self) {
        let stats = self.kind.stats();
        self.hp = self.hp.clamp(0, stats.max_hp);
        if !self.fuel.is_finite() {
            self.fuel = 0.0;
        }
        self.fuel = quantize_fuel(self.fuel.clamp(0.0, stats.fuel_capacity));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetState {
    #[default]
    Orbit,
    Moving,
    Combat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub id: FleetId,
    pub faction: FactionId,
    #[serde(default)]
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub ships: Vec<Ship>,
    #[serde(default)]
    pub state: FleetState,
    /// System currently orbited. Set exactly when `state` is `Orbit`.
    #[serde(default)]
    pub orbit_system: Option<SystemId>,
    #[serde(default)]
    pub target_system: Option<SystemId>,
    #[serde(default)]
    pub target_position: Option<Vec3>,
    #[serde(default)]
    pub unload_target: Option<SystemId>,
    #[serde(default)]
    pub load_target: Option<SystemId>,
    #[serde(default)]
    pub invade_target: Option<SystemId>,
    #[serde(default)]
    pub invade_planet: Option<PlanetId>,
    /// Turn on which the current state began.
    #[serde(default)]
    pub state_since_turn: u32,
    #[serde(default)]
    pub retreating: bool,
}

impl Fleet {
    #[must_use]
    pub fn new(id: FleetId, faction: FactionId, position: Vec3) -> Self {
        Self {
            id,
            faction,
            name: String::new(),
            position,
            ships: Vec::new(),
            state: FleetState::Orbit,
            orbit_system: None,
            target_system: None,
            target_position: None,
            unload_target: None,
            load_target: None,
            invade_target: None,
            invade_planet: None,
            state_since_turn: 0,
            retreating: false,
        }
    }

    pub fn living_ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter().filter(|ship| ship.is_alive())
    }

    #[must_use]
    pub fn has_living_ships(&self) -> bool {
        self.ships.iter().any(Ship::is_alive)
    }

    /// Fleets are destroyed the moment their ship list empties.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.ships.is_empty()
    }

    /// A fleet crawls at the pace of its slowest living hull. A fleet with
    /// no living ships cannot move at all.
    #[must_use]
    pub fn speed_ly_per_turn(&self) -> f64 {
        let slowest = self
            .living_ships()
            .map(|ship| ship.kind.stats().speed_ly_per_turn)
            .fold(f64::INFINITY, f64::min);
        if slowest.is_finite() { slowest } else { 0.0 }
    }

    #[must_use]
    pub fn ship(&self, id: &ShipId) -> Option<&Ship> {
        self.ships.iter().find(|ship| &ship.id == id)
    }

    pub fn ship_mut(&mut self, id: &ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|ship| &ship.id == id)
    }

    /// First living transport with an empty berth.
    pub fn free_transport_mut(&mut self) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|ship| {
            ship.is_alive() && ship.kind.stats().army_berths > 0 && ship.cargo_army.is_none()
        })
    }

    #[must_use]
    pub fn free_berths(&self) -> u32 {
        self.living_ships()
            .filter(|ship| ship.kind.stats().army_berths > 0 && ship.cargo_army.is_none())
            .map(|ship| ship.kind.stats().army_berths)
            .sum()
    }

    /// Transition to `state`, stamping the turn only on an actual change.
    pub fn set_state(&mut self, state: FleetState, turn: u32) {
        if self.state != state {
            self.state = state;
            self.state_since_turn = turn;
        }
    }

    /// Drop movement bookkeeping after an arrival or an abort.
    pub fn clear_movement(&mut self) {
        self.target_system = None;
        self.target_position = None;
    }
}

/// Where an army currently sits. The variant is the army's state: on a
/// planet it is deployed, inside a fleet it is embarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArmyContainer {
    Planet { id: PlanetId },
    Fleet { id: FleetId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub faction: FactionId,
    pub strength: u32,
    pub max_strength: u32,
    #[serde(default = "default_morale")]
    pub morale: f32,
    pub container: ArmyContainer,
}

const fn default_morale() -> f32 {
    DEFAULT_MORALE
}

impl Army {
    #[must_use]
    pub fn new(id: ArmyId, faction: FactionId, strength: u32, container: ArmyContainer) -> Self {
        Self {
            id,
            faction,
            strength,
            max_strength: strength,
            morale: DEFAULT_MORALE,
            container,
        }
    }

    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        matches!(self.container, ArmyContainer::Planet { .. })
    }

    #[must_use]
    pub const fn is_embarked(&self) -> bool {
        matches!(self.container, ArmyContainer::Fleet { .. })
    }

    #[must_use]
    pub const fn deployed_on(&self) -> Option<&PlanetId> {
        match &self.container {
            ArmyContainer::Planet { id } => Some(id),
            ArmyContainer::Fleet { .. } => None,
        }
    }

    #[must_use]
    pub const fn embarked_in(&self) -> Option<&FleetId> {
        match &self.container {
            ArmyContainer::Fleet { id } => Some(id),
            ArmyContainer::Planet { .. } => None,
        }
    }

    /// Ground combat weight: troops scaled by morale.
    #[must_use]
    pub fn power(&self) -> f64 {
        f64::from(self.strength) * f64::from(self.morale)
    }

    pub fn clamp_vitals(&mut self) {
        if self.max_strength == 0 {
            self.max_strength = self.strength.max(1);
        }
        self.strength = self.strength.min(self.max_strength);
        if !self.morale.is_finite() {
            self.morale = DEFAULT_MORALE;
        }
        self.morale = self.morale.clamp(MORALE_MIN, MORALE_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet_with(kinds: &[ShipType]) -> Fleet {
        let mut fleet = Fleet::new(FleetId::from("f1"), FactionId::from("crimson"), Vec3::ZERO);
        for (idx, kind) in kinds.iter().enumerate() {
            fleet
                .ships
                .push(Ship::new(ShipId::new(format!("s{idx}")), *kind));
        }
        fleet
    }

    #[test]
    fn new_ships_start_full() {
        let ship = Ship::new(ShipId::from("s1"), ShipType::Escort);
        assert_eq!(ship.hp, ShipType::Escort.stats().max_hp);
        assert!((ship.fuel - ShipType::Escort.stats().fuel_capacity).abs() < f64::EPSILON);
    }

    #[test]
    fn fleet_speed_follows_slowest_hull() {
        let fleet = fleet_with(&[ShipType::Fighter, ShipType::Transport, ShipType::Escort]);
        assert!((fleet.speed_ly_per_turn() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn dead_ships_do_not_slow_the_fleet() {
        let mut fleet = fleet_with(&[ShipType::Fighter, ShipType::Extractor]);
        fleet.ships[1].hp = 0;
        assert!((fleet.speed_ly_per_turn() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn set_state_stamps_only_on_change() {
        let mut fleet = fleet_with(&[ShipType::Escort]);
        fleet.set_state(FleetState::Moving, 4);
        assert_eq!(fleet.state_since_turn, 4);
        fleet.set_state(FleetState::Moving, 9);
        assert_eq!(fleet.state_since_turn, 4, "re-entering the same state is a no-op");
        fleet.set_state(FleetState::Orbit, 9);
        assert_eq!(fleet.state_since_turn, 9);
    }

    #[test]
    fn experience_bonus_is_capped() {
        let mut ship = Ship::new(ShipId::from("s1"), ShipType::Fighter);
        ship.experience = 10_000;
        assert!((ship.accuracy() - (0.80 + EXPERIENCE_ACCURACY_CAP)).abs() < 1e-12);
    }

    #[test]
    fn clamp_vitals_repairs_hostile_numbers() {
        let mut ship = Ship::new(ShipId::from("s1"), ShipType::Transport);
        ship.hp = 9_999;
        ship.fuel = f64::NAN;
        ship.clamp_vitals();
        assert_eq!(ship.hp, ShipType::Transport.stats().max_hp);
        assert!((ship.fuel - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn army_container_tags_its_kind_in_json() {
        let army = Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            100,
            ArmyContainer::Planet {
                id: PlanetId::from("p1"),
            },
        );
        let json = serde_json::to_string(&army.container).unwrap();
        assert!(json.contains("\"kind\":\"planet\""));
        assert!(army.is_deployed());
        assert!(!army.is_embarked());
    }

    #[test]
    fn army_power_scales_with_morale() {
        let mut army = Army::new(
            ArmyId::from("a1"),
            FactionId::from("crimson"),
            100,
            ArmyContainer::Planet {
                id: PlanetId::from("p1"),
            },
        );
        assert!((army.power() - 100.0).abs() < f64::EPSILON);
        army.morale = 0.5;
        assert!((army.power() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn free_berths_counts_only_empty_living_transports() {
        let mut fleet = fleet_with(&[ShipType::Transport, ShipType::Transport, ShipType::Escort]);
        assert_eq!(fleet.free_berths(), 2);
        fleet.ships[0].cargo_army = Some(ArmyId::from("a1"));
        assert_eq!(fleet.free_berths(), 1);
        fleet.ships[1].hp = 0;
        assert_eq!(fleet.free_berths(), 0);
    }
}

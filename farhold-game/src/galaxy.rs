//! Star systems and the planets inside them.

use serde::{Deserialize, Serialize};

use crate::geom::Vec3;
use crate::ids::{FactionId, PlanetId, SystemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetKind {
    Solid,
    Gas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    #[serde(default)]
    pub name: String,
    pub kind: PlanetKind,
    #[serde(default)]
    pub owner: Option<FactionId>,
}

impl Planet {
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        matches!(self.kind, PlanetKind::Solid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: SystemId,
    #[serde(default)]
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub owner: Option<FactionId>,
    #[serde(default)]
    pub planets: Vec<Planet>,
}

impl StarSystem {
    /// The faction holding this system. The explicit field wins; otherwise
    /// sole ownership of every owned planet counts. Mixed planet ownership
    /// means nobody holds the system.
    #[must_use]
    pub fn effective_owner(&self) -> Option<&FactionId> {
        if let Some(owner) = self.owner.as_ref() {
            return Some(owner);
        }
        let mut sole: Option<&FactionId> = None;
        for planet in &self.planets {
            let Some(owner) = planet.owner.as_ref() else {
                continue;
            };
            match sole {
                None => sole = Some(owner),
                Some(existing) if existing == owner => {}
                Some(_) => return None,
            }
        }
        sole
    }

    #[must_use]
    pub fn planet(&self, id: &PlanetId) -> Option<&Planet> {
        self.planets.iter().find(|planet| &planet.id == id)
    }

    pub fn planet_mut(&mut self, id: &PlanetId) -> Option<&mut Planet> {
        self.planets.iter_mut().find(|planet| &planet.id == id)
    }

    /// Default landing site for invasions that name no planet.
    #[must_use]
    pub fn first_solid_planet(&self) -> Option<&Planet> {
        self.planets.iter().find(|planet| planet.is_solid())
    }

    pub fn solid_planets(&self) -> impl Iterator<Item = &Planet> {
        self.planets.iter().filter(|planet| planet.is_solid())
    }

    /// Re-derive the explicit owner after a conquest has flipped a planet.
    /// The system flips only when a single faction owns every owned planet.
    pub fn refresh_ownership(&mut self) {
        let mut sole: Option<FactionId> = None;
        let mut mixed = false;
        for planet in &self.planets {
            let Some(owner) = planet.owner.as_ref() else {
                continue;
            };
            match sole.as_ref() {
                None => sole = Some(owner.clone()),
                Some(existing) if existing == owner => {}
                Some(_) => {
                    mixed = true;
                    break;
                }
            }
        }
        if !mixed {
            self.owner = sole;
        }
    }
}

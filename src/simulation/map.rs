//! Arena of placed map modules
//!
//! All modules live in one owned `Vec`; facilities refer back to their
//! parent road by `ModuleId` index, so no reference can dangle when the
//! collection grows.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;

use super::config::SimConfig;
use super::module::{FacilityClass, Module, Spot, SpotState};
use super::types::{ModuleId, Vec2};

/// The finished map: an indexable collection of placed modules
#[derive(Debug, Default)]
pub struct ModuleMap {
    modules: Vec<Module>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a module at a world position and return its arena index
    pub fn add(&mut self, mut module: Module, world_position: Vec2) -> ModuleId {
        module.world_position = world_position;
        let id = ModuleId(self.modules.len());
        self.modules.push(module);
        id
    }

    /// Place a facility edge-to-edge against one of `road`'s connectors.
    ///
    /// The facility's road-facing connector is aligned with the road
    /// connector whose outward normal is `road_normal`, and the parent
    /// back-reference is recorded.
    pub fn attach_facility(
        &mut self,
        road: ModuleId,
        facility: Module,
        road_normal: Vec2,
    ) -> Result<ModuleId> {
        let road_module = self.get(road).context("Parent road not found")?;
        let road_ap = road_module
            .attachment_by_normal(road_normal)
            .context("Road has no connector with the requested normal")?;
        let junction = road_module.world_position.add(&road_ap.position);

        let facility_ap = facility
            .attachment_by_normal(road_normal.scale(-1.0))
            .context("Facility has no connector facing the road")?;
        let origin = junction.sub(&facility_ap.position);

        let id = self.add(facility, origin);
        self.modules[id.0].parent = Some(road);
        Ok(id)
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId(i), m))
    }

    /// The entrance road a facility hangs off, if any
    pub fn parent_road(&self, id: ModuleId) -> Option<&Module> {
        let parent = self.get(id)?.parent?;
        self.get(parent)
    }

    /// All facilities of a class, in arena order
    pub fn facilities_of_class(&self, class: FacilityClass) -> Vec<ModuleId> {
        self.iter()
            .filter(|(_, m)| m.facility_class() == Some(class))
            .map(|(id, _)| id)
            .collect()
    }

    /// Leftmost and rightmost road modules by world x extent
    pub fn boundary_roads(&self) -> Option<(ModuleId, ModuleId)> {
        let mut leftmost: Option<(ModuleId, f32)> = None;
        let mut rightmost: Option<(ModuleId, f32)> = None;

        for (id, module) in self.iter() {
            if !module.is_road() {
                continue;
            }
            let x = module.world_position.x;
            let right = x + module.width;
            if leftmost.map_or(true, |(_, best)| x < best) {
                leftmost = Some((id, x));
            }
            if rightmost.map_or(true, |(_, best)| right > best) {
                rightmost = Some((id, right));
            }
        }

        Some((leftmost?.0, rightmost?.0))
    }

    /// World-x extent `[min, max]` covered by road modules
    pub fn road_bounds(&self) -> Option<(f32, f32)> {
        let (left, right) = self.boundary_roads()?;
        let left_x = self.get(left)?.world_position.x;
        let right_module = self.get(right)?;
        Some((left_x, right_module.world_position.x + right_module.width))
    }

    /// Assign prices to every facility spot from the configured ranges
    pub fn assign_spot_prices(&mut self, config: &SimConfig, rng: &mut StdRng) {
        for module in &mut self.modules {
            let range = match module.facility_class() {
                Some(FacilityClass::Parking) => config.parking_price_range,
                Some(FacilityClass::Charging) => config.charging_price_range,
                None => continue,
            };
            for spot in &mut module.spots {
                spot.price = rng.random_range(range.0..range.1);
            }
        }
    }

    /// Snapshot of a spot, used to build a car's parking context
    pub fn spot(&self, facility: ModuleId, index: usize) -> Option<Spot> {
        self.get(facility)?.spots.get(index).cloned()
    }

    /// True when no facility of any class has a free spot
    pub fn all_facilities_full(&self) -> bool {
        !self
            .iter()
            .any(|(_, m)| m.facility_class().is_some() && m.has_free_spot())
    }

    /// Total spot counts across every facility, for observability
    pub fn total_spot_counts(&self) -> super::module::SpotCounts {
        let mut totals = super::module::SpotCounts::default();
        for (_, module) in self.iter() {
            let counts = module.spot_counts();
            totals.free += counts.free;
            totals.reserved += counts.reserved;
            totals.occupied += counts.occupied;
        }
        totals
    }

    /// Mark every spot in the map with the given state (test scaffolding)
    pub fn fill_all_spots(&mut self, state: SpotState) {
        for module in &mut self.modules {
            for spot in &mut module.spots {
                spot.state = state;
            }
        }
    }
}

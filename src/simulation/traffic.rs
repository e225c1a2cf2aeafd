//! Traffic orchestrator policies
//!
//! Answers spawn requests, runs facility/spot selection, drives the
//! reservation lifecycle and decides when parked cars leave. All methods
//! run synchronously inside a single handler invocation, which is what
//! makes the check-and-reserve step race-free.

use log::{error, info, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::Rng;

use super::car::SimCar;
use super::config::SimConfig;
use super::map::ModuleMap;
use super::module::{FacilityClass, Spot, SpotState};
use super::types::{CarState, ModuleId, Priority, Vec2, VehicleType};

/// Everything needed to create a car in answer to a spawn request
#[derive(Debug, Clone)]
pub struct SpawnData {
    pub position: Vec2,
    pub velocity: Vec2,
    pub vehicle_type: VehicleType,
    pub battery: Option<f32>,
    pub priority: Priority,
    pub entered_from_left: bool,
}

/// Outcome of destination selection for a freshly spawned car
#[derive(Debug, Clone)]
pub enum Destination {
    /// A spot was reserved; plan an entry path to it
    Park {
        facility: ModuleId,
        spot_index: usize,
        spot: Spot,
    },
    /// Every facility is full; drive through the map and off the far edge
    PassThrough,
}

/// Stateless policy layer of the simulation; all registries are owned
/// by `SimWorld` and passed in mutably.
#[derive(Debug, Default)]
pub struct TrafficSystem {
    pub config: SimConfig,
}

impl TrafficSystem {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Answer a spawn request: pick a boundary road and side, derive the
    /// spawn pose from the lane convention, and roll vehicle attributes.
    ///
    /// Returns None (and logs) when the map has no roads at all.
    pub fn handle_spawn_request(&self, map: &ModuleMap, rng: &mut StdRng) -> Option<SpawnData> {
        let Some((left_id, right_id)) = map.boundary_roads() else {
            error!("traffic: no roads in map, spawn request skipped");
            return None;
        };

        let spawn_left = rng.random_bool(0.5);

        let vehicle_type = if rng.random_bool(0.5) {
            VehicleType::Electric
        } else {
            VehicleType::Combustion
        };
        let battery = match vehicle_type {
            VehicleType::Electric => Some(rng.random_range(10.0..90.0)),
            VehicleType::Combustion => None,
        };
        let priority = if rng.random_bool(0.5) {
            Priority::Distance
        } else {
            Priority::Price
        };

        let speed = self.config.spawn_speed;
        let (position, velocity) = if spawn_left {
            // Spawn left, drive right in the down lane
            let road = map.get(left_id)?;
            let position = road
                .world_position
                .add(&Vec2::new(0.0, self.config.lane_offset_down));
            (position, Vec2::new(speed, 0.0))
        } else {
            // Spawn right, drive left in the up lane
            let road = map.get(right_id)?;
            let position = road
                .world_position
                .add(&Vec2::new(road.width, self.config.lane_offset_up));
            (position, Vec2::new(-speed, 0.0))
        };

        info!(
            "traffic: spawning {:?} car at ({:.1}, {:.1})",
            vehicle_type, position.x, position.y
        );

        Some(SpawnData {
            position,
            velocity,
            vehicle_type,
            battery,
            priority,
            entered_from_left: spawn_left,
        })
    }

    /// Select a facility and spot for a spawned car and reserve the spot.
    ///
    /// Selection and the FREE->RESERVED transition happen in this single
    /// call, so no two cars can claim the same spot.
    pub fn choose_destination(
        &self,
        car: &SimCar,
        map: &mut ModuleMap,
        rng: &mut StdRng,
    ) -> Destination {
        let wanted = self.choose_facility_class(car, rng);

        let mut candidates = self.open_facilities(map, wanted);
        if candidates.is_empty() && wanted == FacilityClass::Charging {
            // Thwarted charging-seeker falls back to plain parking
            warn!("traffic: no charging spot free, falling back to parking");
            candidates = self.open_facilities(map, FacilityClass::Parking);
        }
        if candidates.is_empty() {
            if map.facilities_of_class(FacilityClass::Parking).is_empty()
                && map.facilities_of_class(FacilityClass::Charging).is_empty()
            {
                error!("traffic: no facilities in map");
            } else {
                info!("traffic: all facilities full, car passes through");
            }
            return Destination::PassThrough;
        }

        // Sample one free spot per candidate facility up front; PRICE
        // priority compares the sampled spots, DISTANCE ignores them.
        let sampled: Vec<(ModuleId, usize)> = candidates
            .iter()
            .filter_map(|&id| {
                let spot = map.get(id)?.random_free_spot(rng)?;
                Some((id, spot))
            })
            .collect();

        let chosen = match car.priority {
            Priority::Distance => sampled.iter().min_by_key(|(id, _)| {
                let dist = map
                    .get(*id)
                    .map(|m| {
                        let center = m
                            .world_position
                            .add(&Vec2::new(m.width / 2.0, m.height / 2.0));
                        car.position.distance(&center)
                    })
                    .unwrap_or(f32::INFINITY);
                OrderedFloat(dist)
            }),
            Priority::Price => sampled.iter().min_by_key(|(id, spot_index)| {
                let price = map
                    .get(*id)
                    .and_then(|m| m.spots.get(*spot_index))
                    .map(|s| s.price)
                    .unwrap_or(f32::INFINITY);
                OrderedFloat(price)
            }),
        };

        let Some(&(facility, spot_index)) = chosen else {
            return Destination::PassThrough;
        };

        let Some(spot) = map.spot(facility, spot_index) else {
            return Destination::PassThrough;
        };
        if let Some(module) = map.get_mut(facility) {
            module.set_spot_state(spot_index, SpotState::Reserved);
        }

        Destination::Park {
            facility,
            spot_index,
            spot,
        }
    }

    /// Parking for combustion cars; battery-weighted random choice for
    /// electric ones, biased toward charging at low battery.
    fn choose_facility_class(&self, car: &SimCar, rng: &mut StdRng) -> FacilityClass {
        match (car.vehicle_type, car.battery) {
            (VehicleType::Electric, Some(battery)) => {
                let p = self.config.charging_probability(battery);
                if rng.random::<f32>() < p {
                    FacilityClass::Charging
                } else {
                    FacilityClass::Parking
                }
            }
            _ => FacilityClass::Parking,
        }
    }

    fn open_facilities(&self, map: &ModuleMap, class: FacilityClass) -> Vec<ModuleId> {
        map.facilities_of_class(class)
            .into_iter()
            .filter(|&id| map.get(id).is_some_and(|m| m.has_free_spot()))
            .collect()
    }

    /// Per-tick evaluation of one car's reservation and dwell state.
    ///
    /// Promotes RESERVED to OCCUPIED once the car is physically at the
    /// spot (idempotent), then runs the dwell/charge exit logic. Returns
    /// true when the car has decided to leave; the caller releases the
    /// spot and assigns the exit path.
    pub fn evaluate_parked(
        &self,
        car: &mut SimCar,
        map: &mut ModuleMap,
        dt: f32,
        rng: &mut StdRng,
    ) -> bool {
        let Some(context) = car.parking.clone() else {
            return false;
        };

        // Lazy promotion: only fires while the spot is still reserved
        if matches!(car.state, CarState::Aligning | CarState::Parked) {
            if let Some(module) = map.get_mut(context.facility) {
                if module.spot_state(context.spot_index) == Some(SpotState::Reserved) {
                    module.set_spot_state(context.spot_index, SpotState::Occupied);
                }
            }
        }

        if car.state != CarState::Parked {
            return false;
        }

        let at_charger = map
            .get(context.facility)
            .and_then(|m| m.facility_class())
            == Some(FacilityClass::Charging);

        // Battery logic applies exclusively at charging spots for
        // electric cars; everything else runs the dwell timer.
        if at_charger && car.vehicle_type == VehicleType::Electric {
            let battery = car.battery.get_or_insert(0.0);
            *battery = (*battery + self.config.charge_rate * dt).min(100.0);

            // random::<f32>() samples [0, 1), so probability 1.0 is an
            // unconditional exit
            let exit_p = self.config.charged_exit_probability(*battery);
            rng.random::<f32>() < exit_p
        } else {
            let remaining = car
                .dwell_remaining
                .get_or_insert_with(|| rng.random_range(self.config.dwell_min..self.config.dwell_max));
            *remaining -= dt;
            *remaining <= 0.0
        }
    }

    /// DISTANCE-priority cars leave the way they came in; everyone else
    /// picks a side at random.
    pub fn choose_exit_side(&self, car: &SimCar, rng: &mut StdRng) -> bool {
        match car.priority {
            Priority::Distance => car.entered_from_left,
            Priority::Price => rng.random_bool(0.5),
        }
    }
}

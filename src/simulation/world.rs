//! Main simulation world that ties everything together
//!
//! Owns every registry (modules, cars) and the RNG, dispatches the two
//! external notifications (spawn request, tick) to the traffic
//! orchestrator, and collects events for outside observers.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::car::{ParkingContext, SimCar};
use super::config::SimConfig;
use super::events::SimEvent;
use super::map::ModuleMap;
use super::module::{FacilityClass, FacilitySize, Module, SpotState};
use super::planner;
use super::traffic::{Destination, TrafficSystem};
use super::types::{CarId, CarState, SimId, Vec2};

/// The main simulation world
pub struct SimWorld {
    /// The finished map of placed modules
    pub map: ModuleMap,

    /// All live cars
    pub cars: HashMap<CarId, SimCar>,

    /// Policy layer answering spawn requests and tick evaluations
    pub traffic: TrafficSystem,

    /// Simulation time in seconds
    pub time: f32,

    /// World extent used to clamp wander waypoints
    pub world_size: (f32, f32),

    next_id: usize,
    rng: StdRng,
    events: Vec<SimEvent>,
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: StdRng) -> Self {
        Self {
            map: ModuleMap::new(),
            cars: HashMap::new(),
            traffic: TrafficSystem::new(config),
            time: 0.0,
            world_size: (430.0, 430.0),
            next_id: 0,
            rng,
            events: Vec::new(),
        }
    }

    pub fn new(config: SimConfig) -> Self {
        Self::new_internal(config, StdRng::from_os_rng())
    }

    /// Create a world with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: SimConfig, seed: u64) -> Self {
        Self::new_internal(config, StdRng::seed_from_u64(seed))
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    /// Events emitted since the last call, in emission order
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Handle a spawn request: create a car at a boundary road, then run
    /// destination selection and path assignment for it.
    ///
    /// Returns None when the map has no roads (the request is skipped).
    pub fn spawn_request(&mut self) -> Option<CarId> {
        let data = self.traffic.handle_spawn_request(&self.map, &mut self.rng)?;

        let id = self.next_car_id();
        let car = SimCar::new(
            id,
            data.position,
            data.velocity,
            data.vehicle_type,
            data.battery,
            data.priority,
            data.entered_from_left,
        );
        self.events.push(SimEvent::VehicleCreated {
            id,
            position: car.position,
            velocity: car.velocity,
            vehicle_type: car.vehicle_type,
            priority: car.priority,
        });
        self.cars.insert(id, car);

        self.assign_destination(id);
        Some(id)
    }

    /// Destination selection, reservation and path synthesis for one car
    ///
    /// Runs atomically within this call: the spot cannot be observed FREE
    /// by another decision while it is being claimed.
    fn assign_destination(&mut self, id: CarId) {
        let Some(car) = self.cars.get(&id) else {
            return;
        };
        let decision = self
            .traffic
            .choose_destination(car, &mut self.map, &mut self.rng);

        let config = &self.traffic.config;
        match decision {
            Destination::Park {
                facility,
                spot_index,
                spot,
            } => {
                let path =
                    planner::generate_path(car.velocity.x, &self.map, facility, &spot, config);
                let waypoints = path.len();
                if let Some(car) = self.cars.get_mut(&id) {
                    car.assign_path(
                        path,
                        Some(ParkingContext {
                            facility,
                            spot_index,
                            spot,
                        }),
                    );
                }
                self.events.push(SimEvent::PathAssigned { id, waypoints });
            }
            Destination::PassThrough => {
                let path = planner::generate_through_path(
                    car.position,
                    car.velocity.x,
                    &self.map,
                    config,
                );
                let waypoints = path.len();
                if let Some(car) = self.cars.get_mut(&id) {
                    // A through path is an exit path: the car leaves the
                    // map once it is consumed.
                    car.assign_exit_path(path);
                }
                self.events.push(SimEvent::PathAssigned { id, waypoints });
            }
        }
    }

    /// Main simulation tick: orchestrator evaluation, car physics, and
    /// despawn collection, in that order, run to completion.
    pub fn tick(&mut self, dt: f32) {
        self.time += dt;

        let car_ids: Vec<CarId> = self.cars.keys().copied().collect();

        // Orchestrator phase: reservation promotion, dwell/charge logic
        // and exit decisions for every parked car.
        for id in &car_ids {
            let Some(car) = self.cars.get_mut(id) else {
                continue;
            };
            let wants_exit = self
                .traffic
                .evaluate_parked(car, &mut self.map, dt, &mut self.rng);
            if !wants_exit {
                continue;
            }
            let Some(context) = car.parking.clone() else {
                continue;
            };

            // Release exactly once, before the exit path is computed
            if let Some(module) = self.map.get_mut(context.facility) {
                module.set_spot_state(context.spot_index, SpotState::Free);
            }

            let exit_left = self.traffic.choose_exit_side(car, &mut self.rng);
            let path = planner::generate_exit_path(
                &self.map,
                context.facility,
                &context.spot,
                exit_left,
                &self.traffic.config,
            );
            let waypoints = path.len();
            car.assign_exit_path(path);
            self.events.push(SimEvent::PathAssigned { id: *id, waypoints });
        }

        // Physics phase: each car advances against a snapshot of the
        // other cars' positions. Parked cars are off the roadway and
        // must not repel traffic approaching an adjacent spot.
        let positions: Vec<(CarId, Vec2)> = self
            .cars
            .iter()
            .filter(|(_, c)| c.state != CarState::Parked)
            .map(|(id, c)| (*id, c.position))
            .collect();
        for id in &car_ids {
            let neighbors: Vec<Vec2> = positions
                .iter()
                .filter(|(other, _)| other != id)
                .map(|(_, p)| *p)
                .collect();
            if let Some(car) = self.cars.get_mut(id) {
                car.update(dt, self.world_size, &neighbors, &mut self.rng);
            }
        }

        // Despawn collection: cars that completed their exit path
        let finished: Vec<CarId> = self
            .cars
            .iter()
            .filter(|(_, c)| c.state == CarState::Exiting && c.has_arrived())
            .map(|(id, _)| *id)
            .collect();
        for id in finished {
            self.cars.remove(&id);
            self.events.push(SimEvent::VehicleDespawned { id });
        }
    }

    /// Build a small demo map: boundary roads left and right, three
    /// entrance roads with facilities hanging off them.
    pub fn create_demo_world(config: SimConfig, seed: Option<u64>) -> Self {
        let mut world = match seed {
            Some(seed) => Self::new_with_seed(config, seed),
            None => Self::new(config),
        };

        let spine_y = 120.0;
        let mut cursor_x = 40.0;

        let mut place_road = |world: &mut SimWorld, road: Module| {
            let width = road.width;
            // Align the road's left connector onto the spine cursor
            let offset_y = road
                .attachment_by_normal(Vec2::new(-1.0, 0.0))
                .map(|ap| ap.position.y)
                .unwrap_or(0.0);
            let id = world
                .map
                .add(road, Vec2::new(cursor_x, spine_y - offset_y));
            cursor_x += width;
            id
        };

        place_road(&mut world, Module::normal_road());

        let up = place_road(&mut world, Module::up_entrance_road());
        let double = place_road(&mut world, Module::double_entrance_road());
        let down = place_road(&mut world, Module::down_entrance_road());

        place_road(&mut world, Module::normal_road());

        let attachments = [
            (
                up,
                Module::facility(FacilityClass::Parking, FacilitySize::Small, true),
                Vec2::new(0.0, -1.0),
            ),
            (
                double,
                Module::facility(FacilityClass::Charging, FacilitySize::Large, true),
                Vec2::new(0.0, -1.0),
            ),
            (
                double,
                Module::facility(FacilityClass::Charging, FacilitySize::Small, false),
                Vec2::new(0.0, 1.0),
            ),
            (
                down,
                Module::facility(FacilityClass::Parking, FacilitySize::Large, false),
                Vec2::new(0.0, 1.0),
            ),
        ];
        for (road, facility, normal) in attachments {
            world
                .map
                .attach_facility(road, facility, normal)
                .expect("Failed to attach demo facility");
        }

        let config = world.traffic.config.clone();
        world.map.assign_spot_prices(&config, &mut world.rng);
        world.world_size = (cursor_x + 80.0, spine_y * 2.0);
        world
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Parking Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!("Modules: {}, Cars: {}", self.map.len(), self.cars.len());

        let totals = self.map.total_spot_counts();
        println!(
            "Spots: {} free, {} reserved, {} occupied",
            totals.free, totals.reserved, totals.occupied
        );

        for (id, module) in self.map.iter() {
            let Some(class) = module.facility_class() else {
                continue;
            };
            let counts = module.spot_counts();
            println!(
                "  Facility {:?} ({:?}): free={} reserved={} occupied={}",
                id, class, counts.free, counts.reserved, counts.occupied
            );
        }

        if !self.cars.is_empty() {
            println!("--- Active Cars ---");
            for car in self.cars.values() {
                println!(
                    "  Car {:?}: {:?} at ({:.1}, {:.1}), speed={:.1}, waypoints={}",
                    car.id.0,
                    car.state,
                    car.position.x,
                    car.position.y,
                    car.velocity.length(),
                    car.waypoints.len()
                );
            }
        }
    }
}

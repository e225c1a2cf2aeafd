//! Car steering, physics and behavioral state
//!
//! A car owns its waypoint queue exclusively and advances it each tick;
//! the orchestrator only ever replaces the queue wholesale when it
//! assigns an entry, exit or through path.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;

use super::module::{Spot, Waypoint};
use super::types::{
    CarId, CarState, ModuleId, Priority, Vec2, VehicleType, ARRIVE_SLOWING_RADIUS, BRAKING_FORCE,
    BRAKING_SPEED_FLOOR, CAR_MAX_FORCE, CAR_MAX_SPEED, IDLE_DRAG, NEIGHBOR_RADIUS,
    SEPARATION_FORCE, WANDER_DISTANCE_MAX, WANDER_DISTANCE_MIN, WANDER_MARGIN, WANDER_TOLERANCE,
};

/// The (facility, spot) a car holds exclusively while reserved/occupied
#[derive(Debug, Clone)]
pub struct ParkingContext {
    pub facility: ModuleId,
    pub spot_index: usize,
    /// Snapshot taken at reservation time; geometry never changes
    pub spot: Spot,
}

/// An autonomous vehicle in the simulation
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub max_speed: f32,
    pub max_force: f32,
    pub vehicle_type: VehicleType,
    /// Charge level 0..100; None for combustion cars
    pub battery: Option<f32>,
    pub priority: Priority,
    /// Which boundary the car spawned from, for exit-direction policy
    pub entered_from_left: bool,
    pub state: CarState,
    /// Front of the queue is the current goal
    pub waypoints: VecDeque<Waypoint>,
    pub parking: Option<ParkingContext>,
    /// Remaining dwell seconds once parked on a non-charging spot
    pub dwell_remaining: Option<f32>,
    arrived: bool,
}

impl SimCar {
    pub fn new(
        id: CarId,
        position: Vec2,
        velocity: Vec2,
        vehicle_type: VehicleType,
        battery: Option<f32>,
        priority: Priority,
        entered_from_left: bool,
    ) -> Self {
        Self {
            id,
            position,
            velocity,
            acceleration: Vec2::ZERO,
            max_speed: CAR_MAX_SPEED,
            max_force: CAR_MAX_FORCE,
            vehicle_type,
            battery,
            priority,
            entered_from_left,
            state: CarState::Driving,
            waypoints: VecDeque::new(),
            parking: None,
            dwell_remaining: None,
            arrived: false,
        }
    }

    /// Whether the queue ran out on a stop-at-end waypoint
    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Replace the queue with an entry path toward a reserved spot
    pub fn assign_path(&mut self, path: Vec<Waypoint>, parking: Option<ParkingContext>) {
        self.waypoints = path.into();
        self.parking = parking;
        self.dwell_remaining = None;
        self.state = CarState::Driving;
        self.arrived = false;
    }

    /// Replace the queue with an exit path; the spot must already be
    /// released by the orchestrator.
    pub fn assign_exit_path(&mut self, path: Vec<Waypoint>) {
        self.waypoints = path.into();
        self.parking = None;
        self.dwell_remaining = None;
        self.state = CarState::Exiting;
        self.arrived = false;
    }

    /// Accumulate a steering force into the acceleration
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration = self.acceleration.add(&force);
    }

    /// Seek steering: desired velocity toward the target at `speed_cap`,
    /// steering force limited to `max_force`.
    pub fn seek(&mut self, target: Vec2, speed_cap: f32) {
        let desired = target.sub(&self.position).normalize().scale(speed_cap);
        let steer = desired.sub(&self.velocity).limit(self.max_force);
        self.apply_force(steer);
    }

    /// Arrival steering: like seek, but the desired speed ramps down
    /// inside the slowing radius so the car can come to rest on a
    /// tight-tolerance waypoint instead of orbiting it.
    pub fn arrive(&mut self, target: Vec2, speed_cap: f32) {
        let offset = target.sub(&self.position);
        let dist = offset.length();
        let ramped = if dist < ARRIVE_SLOWING_RADIUS {
            speed_cap * dist / ARRIVE_SLOWING_RADIUS
        } else {
            speed_cap
        };
        let desired = offset.normalize().scale(ramped);
        let steer = desired.sub(&self.velocity).limit(self.max_force);
        self.apply_force(steer);
    }

    /// Per-tick behavior and physics update.
    ///
    /// `neighbors` holds the positions of every other live car;
    /// `world_bounds` is the (width, height) used to clamp wander points.
    /// Integration is explicit Euler, which is stable at the simulation's
    /// bounded tick rate but not unconditionally.
    pub fn update(
        &mut self,
        dt: f32,
        world_bounds: (f32, f32),
        neighbors: &[Vec2],
        rng: &mut StdRng,
    ) {
        // Parked cars hold their pose; neighbor repulsion must not
        // shove them off the spot.
        if self.state == CarState::Parked {
            self.velocity = Vec2::ZERO;
            self.acceleration = Vec2::ZERO;
            return;
        }

        // Ambient wandering before any destination exists
        if self.waypoints.is_empty()
            && self.parking.is_none()
            && self.state == CarState::Driving
            && !self.arrived
        {
            self.waypoints.push_back(self.random_wander_point(world_bounds, rng));
        }

        if let Some(front) = self.waypoints.front().cloned() {
            let speed_cap = self.max_speed * front.speed_limit_factor;
            if front.stop_at_end {
                self.arrive(front.position, speed_cap);
            } else {
                self.seek(front.position, speed_cap);
            }

            if self.position.distance(&front.position) < front.tolerance {
                self.waypoints.pop_front();
                if self.waypoints.is_empty() && front.stop_at_end {
                    self.on_final_waypoint_reached();
                    return;
                }
                if self.waypoints.len() == 1
                    && self.state == CarState::Driving
                    && self.parking.is_some()
                {
                    self.state = CarState::Aligning;
                }
            }
        } else {
            // Drag when idle with no target
            self.velocity = self.velocity.scale(IDLE_DRAG);
        }

        self.avoid_neighbors(neighbors);

        // Explicit Euler integration
        self.velocity = self
            .velocity
            .add(&self.acceleration.scale(dt))
            .limit(self.max_speed);
        self.position = self.position.add(&self.velocity.scale(dt));
        self.acceleration = Vec2::ZERO;
    }

    /// Braking plus distance-weighted repulsion against nearby cars
    fn avoid_neighbors(&mut self, neighbors: &[Vec2]) {
        for other in neighbors {
            let dist = self.position.distance(other);
            if dist >= NEIGHBOR_RADIUS || dist <= f32::EPSILON {
                continue;
            }

            if self.velocity.length() > BRAKING_SPEED_FLOOR {
                let heading = self.velocity.normalize();
                self.apply_force(heading.scale(-BRAKING_FORCE));
            }

            let push = self.position.sub(other).normalize();
            let strength = SEPARATION_FORCE * (1.0 - dist / NEIGHBOR_RADIUS);
            self.apply_force(push.scale(strength));
        }
    }

    fn on_final_waypoint_reached(&mut self) {
        self.arrived = true;
        self.velocity = Vec2::ZERO;
        self.acceleration = Vec2::ZERO;
        if self.state != CarState::Exiting && self.parking.is_some() {
            self.state = CarState::Parked;
        }
    }

    /// A random filler waypoint within world bounds, used only while the
    /// car has no assigned destination.
    fn random_wander_point(&self, world_bounds: (f32, f32), rng: &mut StdRng) -> Waypoint {
        let dist = rng.random_range(WANDER_DISTANCE_MIN..WANDER_DISTANCE_MAX);
        let angle = rng.random_range(0.0..TAU);
        let mut point = self.position.add(&Vec2::from_angle(angle).scale(dist));

        point.x = point.x.clamp(WANDER_MARGIN, world_bounds.0 - WANDER_MARGIN);
        point.y = point.y.clamp(WANDER_MARGIN, world_bounds.1 - WANDER_MARGIN);

        Waypoint::new(point, WANDER_TOLERANCE)
    }
}

//! Core types for the parking simulation
//!
//! Standalone math and identity types that don't depend on any
//! rendering or windowing layer.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for module IDs (indices into the `ModuleMap` arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CarId(pub SimId);

/// Powertrain of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    /// Combustion car, only ever parks
    Combustion,
    /// Electric car with a battery level, may seek a charging spot
    Electric,
}

/// Facility selection policy carried by each vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Pick the facility closest to the vehicle
    Distance,
    /// Pick the facility whose sampled free spot is cheapest
    Price,
}

/// Behavioral state of a car
///
/// Transitions run Driving -> Aligning -> Parked -> Exiting, after which
/// the orchestrator removes the car once its exit path is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarState {
    /// Following an entry path (or wandering with no destination)
    Driving,
    /// Only the spot waypoint remains; straightening into the slot
    Aligning,
    /// Stopped on its reserved spot
    Parked,
    /// Following an exit path out of the map
    Exiting,
}

/// A 2D position or vector in the simulation plane
///
/// Y grows downward (screen convention); angle 0 points along +x and
/// `FRAC_PI_2` along +y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector for an angle in radians
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: &Vec2) -> f32 {
        self.sub(other).length()
    }

    /// Returns the zero vector unchanged rather than dividing by zero
    pub fn normalize(&self) -> Vec2 {
        let len = self.length();
        if len > f32::EPSILON {
            self.scale(1.0 / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Clamp the vector's length to `max`
    pub fn limit(&self, max: f32) -> Vec2 {
        if self.length() > max {
            self.normalize().scale(max)
        } else {
            *self
        }
    }
}

/// The map geometry was authored in art pixels at 7 pixels per meter;
/// baked constants below are converted with this helper.
pub const ART_PIXELS_PER_METER: f32 = 7.0;

/// Convert art pixels to meters
pub const fn px(art_pixels: f32) -> f32 {
    art_pixels / ART_PIXELS_PER_METER
}

/// Radius within which cars brake and push away from each other
pub const NEIGHBOR_RADIUS: f32 = px(70.0);

/// Braking force applied against the heading when a neighbor is close
pub const BRAKING_FORCE: f32 = px(600.0);

/// Peak repulsion force between touching cars; falls off linearly with distance
pub const SEPARATION_FORCE: f32 = px(500.0);

/// Speed below which braking is not applied
pub const BRAKING_SPEED_FLOOR: f32 = px(10.0);

/// Default top speed of a car in m/s
pub const CAR_MAX_SPEED: f32 = 15.0;

/// Default maximum steering force of a car in m/s^2
pub const CAR_MAX_FORCE: f32 = 40.0;

/// Distance range for self-generated wander waypoints
pub const WANDER_DISTANCE_MIN: f32 = px(300.0);
pub const WANDER_DISTANCE_MAX: f32 = px(500.0);

/// Margin kept from the world edge when wandering
pub const WANDER_MARGIN: f32 = px(50.0);

/// Arrival radius used for wander waypoints
pub const WANDER_TOLERANCE: f32 = px(50.0);

/// Velocity retained per update when a car has no target
pub const IDLE_DRAG: f32 = 0.95;

/// Radius within which a stopping car ramps its desired speed down,
/// so tight spot tolerances can be captured without overshooting
pub const ARRIVE_SLOWING_RADIUS: f32 = 10.0;

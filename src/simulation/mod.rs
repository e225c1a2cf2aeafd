//! Standalone parking/charging traffic simulation
//!
//! This module contains the full simulation core: map modules with
//! reservable spots, the path planner, car physics and the traffic
//! orchestrator. It runs headless; rendering and input live elsewhere
//! and only observe the events the world emits.

mod car;
mod config;
mod events;
mod map;
mod module;
pub mod planner;
mod traffic;
mod types;
mod world;

// Re-export public types for external use
pub use car::{ParkingContext, SimCar};
pub use config::SimConfig;
pub use events::SimEvent;
pub use map::ModuleMap;
pub use module::{
    AttachmentPoint, FacilityClass, FacilitySize, Module, ModuleKind, Spot, SpotCounts, SpotState,
    Waypoint, T_JUNCTION_CENTER_X,
};
pub use traffic::{Destination, SpawnData, TrafficSystem};
pub use types::{
    px, CarId, CarState, ModuleId, Priority, SimId, Vec2, VehicleType, CAR_MAX_FORCE,
    CAR_MAX_SPEED, NEIGHBOR_RADIUS,
};
pub use world::SimWorld;

//! Notifications produced by the simulation for outside observers
//!
//! The core never renders or draws; UI layers consume these events from
//! `SimWorld::drain_events` instead.

use super::types::{CarId, Priority, Vec2, VehicleType};

/// An event emitted by the traffic orchestrator during a handler run
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A spawn request was answered and a car entered the map
    VehicleCreated {
        id: CarId,
        position: Vec2,
        velocity: Vec2,
        vehicle_type: VehicleType,
        priority: Priority,
    },
    /// A car received a new waypoint path (entry, exit or through path)
    PathAssigned { id: CarId, waypoints: usize },
    /// A car finished its exit path and left the simulation
    VehicleDespawned { id: CarId },
}

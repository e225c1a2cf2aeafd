//! Parking Simulation Library
//!
//! Autonomous traffic flowing through a procedurally laid-out road
//! network with parking and charging facilities. Runs headless; UI
//! layers consume the events emitted by [`simulation::SimWorld`].

pub mod simulation;

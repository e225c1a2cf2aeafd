//! Path synthesis for facility entry, exit and through traffic
//!
//! Pure functions: static module geometry plus a chosen spot in, an
//! ordered waypoint sequence out. Facility and spot selection are the
//! orchestrator's job; nothing here mutates the map.

use std::f32::consts::PI;

use super::config::SimConfig;
use super::map::ModuleMap;
use super::module::{Module, Spot, Waypoint, T_JUNCTION_CENTER_X};
use super::types::{px, ModuleId, Vec2};

/// Arrival radius of the road-entry waypoint
pub const ROAD_ENTRY_TOLERANCE: f32 = 2.5;
/// Arrival radius of the facility-entrance waypoint
pub const FACILITY_ENTRY_TOLERANCE: f32 = 1.5;
/// Arrival radius of the pre-turn alignment waypoint
pub const ALIGNMENT_TOLERANCE: f32 = 1.0;
/// Tight arrival radius of the spot itself
pub const SPOT_TOLERANCE: f32 = 0.2;

/// Distance of the alignment point behind the spot, along the reverse
/// of the spot's orientation
pub const ALIGNMENT_STANDOFF: f32 = 8.0;

/// Speed cap factor inside a facility; at full road speed the steering
/// turn radius exceeds the entrance tolerance and the car orbits it
pub const FACILITY_SPEED_FACTOR: f32 = 0.5;
/// Tighter cap for the alignment and spot legs
pub const ALIGNMENT_SPEED_FACTOR: f32 = 0.4;

/// Longitudinal offset from the T-junction center for the side-of-road
/// convention (right side for top facilities, left for bottom ones)
pub const SIDE_OFFSET: f32 = px(18.0);

/// How far past the map's road edge exit and through paths terminate
pub const EXIT_OVERSHOOT: f32 = 20.0;

/// One of the two travel lanes on a road module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Upper lane, used by leftward-moving traffic
    Up,
    /// Lower lane, used by rightward-moving traffic
    Down,
}

impl Lane {
    /// Lane selection is a pure function of the heading sign: rightward
    /// movers take the down lane, leftward movers the up lane.
    pub fn for_heading(heading_x: f32) -> Lane {
        if heading_x > 0.0 {
            Lane::Down
        } else {
            Lane::Up
        }
    }

    /// Lateral offset of this lane from a road module's top edge
    pub fn y_offset(&self, config: &SimConfig) -> f32 {
        match self {
            Lane::Up => config.lane_offset_up,
            Lane::Down => config.lane_offset_down,
        }
    }
}

/// Synthesize the four-waypoint entry path to a reserved spot.
///
/// Side-of-road selection is derived, never looked up: top facilities
/// are entered from the right-hand offset of the T-junction, bottom
/// facilities from the left-hand one. Combined with the heading-derived
/// lane this keeps opposite-direction traffic out of each other's lane.
pub fn generate_path(
    heading_x: f32,
    map: &ModuleMap,
    facility_id: ModuleId,
    spot: &Spot,
    config: &SimConfig,
) -> Vec<Waypoint> {
    let Some(facility) = map.get(facility_id) else {
        return Vec::new();
    };

    let lane = Lane::for_heading(heading_x);
    let use_right_side = facility.is_top();
    let side_sign = if use_right_side { 1.0 } else { -1.0 };

    let entry = facility_entry(facility, side_sign);

    let mut path = Vec::with_capacity(4);
    match map.parent_road(facility_id) {
        Some(road) => {
            let position = road.world_position.add(&Vec2::new(
                T_JUNCTION_CENTER_X + side_sign * SIDE_OFFSET,
                lane.y_offset(config),
            ));
            path.push(Waypoint::new(position, ROAD_ENTRY_TOLERANCE));
        }
        // No parent road: head straight for the facility entrance instead
        None => path.push(Waypoint::new(entry, ROAD_ENTRY_TOLERANCE)),
    }

    path.push(
        Waypoint::new(entry, FACILITY_ENTRY_TOLERANCE).with_speed_factor(FACILITY_SPEED_FACTOR),
    );
    path.push(
        Waypoint::new(alignment_point(facility, spot), ALIGNMENT_TOLERANCE)
            .with_speed_factor(ALIGNMENT_SPEED_FACTOR),
    );
    path.push(
        Waypoint::stopping(
            facility.spot_world_position(spot),
            SPOT_TOLERANCE,
            Some(spot.id),
            spot.orientation,
        )
        .with_speed_factor(ALIGNMENT_SPEED_FACTOR),
    );

    path
}

/// Synthesize the exit path from a parked spot back onto the road and
/// off the map edge chosen by `exit_left`.
///
/// The road re-entry lane follows the exit direction, not the lane the
/// car originally entered from, and the facility is traversed on the
/// side opposite the entry convention.
pub fn generate_exit_path(
    map: &ModuleMap,
    facility_id: ModuleId,
    spot: &Spot,
    exit_left: bool,
    config: &SimConfig,
) -> Vec<Waypoint> {
    let Some(facility) = map.get(facility_id) else {
        return Vec::new();
    };

    let lane = if exit_left { Lane::Up } else { Lane::Down };
    let entry_side_sign = if facility.is_top() { 1.0 } else { -1.0 };
    let exit_side_sign = -entry_side_sign;
    let merge_sign = if exit_left { -1.0 } else { 1.0 };

    let mut path = Vec::with_capacity(4);
    path.push(
        Waypoint::new(alignment_point(facility, spot), ALIGNMENT_TOLERANCE)
            .with_speed_factor(ALIGNMENT_SPEED_FACTOR),
    );
    path.push(
        Waypoint::new(facility_entry(facility, exit_side_sign), FACILITY_ENTRY_TOLERANCE)
            .with_speed_factor(FACILITY_SPEED_FACTOR),
    );

    let road_y = match map.parent_road(facility_id) {
        Some(road) => {
            let position = road.world_position.add(&Vec2::new(
                T_JUNCTION_CENTER_X + merge_sign * SIDE_OFFSET,
                lane.y_offset(config),
            ));
            path.push(Waypoint::new(position, ROAD_ENTRY_TOLERANCE));
            road.world_position.y + lane.y_offset(config)
        }
        None => {
            // Degenerate map: leave along the facility's own entrance height
            let entry = facility_entry(facility, exit_side_sign);
            path.push(Waypoint::new(entry, ROAD_ENTRY_TOLERANCE));
            entry.y
        }
    };

    let terminal_x = match map.road_bounds() {
        Some((min_x, max_x)) => {
            if exit_left {
                min_x - EXIT_OVERSHOOT
            } else {
                max_x + EXIT_OVERSHOOT
            }
        }
        None => {
            let x = facility.world_position.x;
            if exit_left {
                x - EXIT_OVERSHOOT
            } else {
                x + facility.width + EXIT_OVERSHOOT
            }
        }
    };

    path.push(Waypoint::stopping(
        Vec2::new(terminal_x, road_y),
        ROAD_ENTRY_TOLERANCE,
        None,
        if exit_left { PI } else { 0.0 },
    ));

    path
}

/// Fallback when every facility is full: drive straight through the map
/// in the current direction of travel and off the far edge.
pub fn generate_through_path(
    position: Vec2,
    heading_x: f32,
    map: &ModuleMap,
    config: &SimConfig,
) -> Vec<Waypoint> {
    let lane = Lane::for_heading(heading_x);

    let (min_x, max_x) = match map.road_bounds() {
        Some(bounds) => bounds,
        None => (position.x - EXIT_OVERSHOOT, position.x + EXIT_OVERSHOOT),
    };

    // Stay on the lane of the leftmost road's spine
    let lane_y = map
        .boundary_roads()
        .and_then(|(left, _)| map.get(left))
        .map(|road| road.world_position.y + lane.y_offset(config))
        .unwrap_or(position.y);

    let mut path = Vec::with_capacity(2);

    let center_x = (min_x + max_x) / 2.0;
    let center_is_ahead = (heading_x > 0.0 && center_x > position.x)
        || (heading_x <= 0.0 && center_x < position.x);
    if center_is_ahead {
        path.push(Waypoint::new(
            Vec2::new(center_x, lane_y),
            ROAD_ENTRY_TOLERANCE,
        ));
    }

    let terminal_x = if heading_x > 0.0 {
        max_x + EXIT_OVERSHOOT
    } else {
        min_x - EXIT_OVERSHOOT
    };
    path.push(Waypoint::stopping(
        Vec2::new(terminal_x, lane_y),
        ROAD_ENTRY_TOLERANCE,
        None,
        if heading_x > 0.0 { 0.0 } else { PI },
    ));

    path
}

/// Facility entrance waypoint offset laterally by the side convention
fn facility_entry(facility: &Module, side_sign: f32) -> Vec2 {
    let base = facility
        .global_waypoints()
        .first()
        .map(|wp| wp.position)
        .unwrap_or_else(|| {
            facility
                .world_position
                .add(&Vec2::new(facility.width / 2.0, facility.height / 2.0))
        });
    base.add(&Vec2::new(side_sign * SIDE_OFFSET, 0.0))
}

/// Pre-turn point set back from the spot along the reverse of its
/// orientation, so the car straightens out before entering the slot
fn alignment_point(facility: &Module, spot: &Spot) -> Vec2 {
    let spot_global = facility.spot_world_position(spot);
    let back = Vec2::from_angle(spot.orientation + PI).scale(ALIGNMENT_STANDOFF);
    spot_global.add(&back)
}

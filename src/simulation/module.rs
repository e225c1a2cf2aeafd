//! Static map modules: roads, parking lots and charging stations
//!
//! A module is immutable after map generation except for its spots'
//! state field, which only the traffic orchestrator mutates through the
//! reservation protocol.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use super::types::{px, ModuleId, Vec2};

/// A world-space drive-through reference point
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub position: Vec2,
    /// Radius within which the waypoint counts as reached
    pub tolerance: f32,
    pub id: Option<usize>,
    /// Required heading when arriving, in radians
    pub entry_angle: f32,
    /// Whether the car should come to rest at this waypoint
    pub stop_at_end: bool,
    /// Scales the car's max speed for the segment ending here (0..=1)
    pub speed_limit_factor: f32,
}

impl Waypoint {
    pub fn new(position: Vec2, tolerance: f32) -> Self {
        Self {
            position,
            tolerance,
            id: None,
            entry_angle: 0.0,
            stop_at_end: false,
            speed_limit_factor: 1.0,
        }
    }

    pub fn stopping(position: Vec2, tolerance: f32, id: Option<usize>, entry_angle: f32) -> Self {
        Self {
            position,
            tolerance,
            id,
            entry_angle,
            stop_at_end: true,
            speed_limit_factor: 1.0,
        }
    }

    /// Same waypoint with a reduced speed cap for the segment ending here
    pub fn with_speed_factor(mut self, factor: f32) -> Self {
        self.speed_limit_factor = factor;
        self
    }
}

/// A local connector (position + outward normal) joining two modules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentPoint {
    /// Relative to the module's top-left origin
    pub position: Vec2,
    /// Outward unit normal of the connecting edge
    pub normal: Vec2,
}

/// State of an individually reservable facility spot
///
/// The only legal cycle is Free -> Reserved -> Occupied -> Free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotState {
    Free,
    Reserved,
    Occupied,
}

/// A parkable or chargeable position inside a facility
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// Relative to the owning facility's top-left origin
    pub local_position: Vec2,
    /// Nose-in direction of a parked car, pointing away from the road
    pub orientation: f32,
    pub id: usize,
    pub state: SpotState,
    pub price: f32,
}

/// Free/reserved/occupied totals for one facility, for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpotCounts {
    pub free: usize,
    pub reserved: usize,
    pub occupied: usize,
}

/// Which service a facility offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityClass {
    Parking,
    Charging,
}

/// Footprint variant of a facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilitySize {
    Small,
    Large,
}

/// The closed set of module kinds in the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Plain road segment with left/right connectors
    NormalRoad,
    /// Road with a T-junction branch to a facility above it
    UpEntranceRoad,
    /// Road with a T-junction branch to a facility below it
    DownEntranceRoad,
    /// Road with branches both above and below
    DoubleEntranceRoad,
    Facility {
        class: FacilityClass,
        size: FacilitySize,
        /// True when the facility sits above its parent road
        is_top: bool,
    },
}

/// Vertical center of the road surface within a road module
const ROAD_CENTER_Y: f32 = px(78.0);

/// Longitudinal position of the T-junction within an entrance road
pub const T_JUNCTION_CENTER_X: f32 = px(142.0);

/// Depth of the spot row measured from the facility's far edge
const SPOT_ROW_DEPTH: f32 = px(80.0);

/// Spacing between the two spot rows of a large parking lot
const SPOT_ROW_GAP: f32 = px(90.0);

/// An immovable world object: road segment or facility
///
/// `parent` is an arena index into the owning `ModuleMap`, pointing a
/// facility back at the entrance road it hangs off. It is a lookup
/// relation only and never implies ownership.
#[derive(Debug, Clone)]
pub struct Module {
    pub kind: ModuleKind,
    pub width: f32,
    pub height: f32,
    /// Top-left corner in world space, set during map generation
    pub world_position: Vec2,
    pub attachment_points: Vec<AttachmentPoint>,
    /// Stored relative to the module's top-left origin
    pub local_waypoints: Vec<Waypoint>,
    pub spots: Vec<Spot>,
    pub parent: Option<ModuleId>,
}

impl Module {
    fn new(kind: ModuleKind, width: f32, height: f32) -> Self {
        Self {
            kind,
            width,
            height,
            world_position: Vec2::ZERO,
            attachment_points: Vec::new(),
            local_waypoints: Vec::new(),
            spots: Vec::new(),
            parent: None,
        }
    }

    pub fn normal_road() -> Self {
        let mut road = Self::new(ModuleKind::NormalRoad, px(283.0), px(155.0));
        road.push_road_ends();
        road.add_waypoint(Vec2::new(road.width / 2.0, ROAD_CENTER_Y), 1.0);
        road
    }

    pub fn up_entrance_road() -> Self {
        let mut road = Self::new(ModuleKind::UpEntranceRoad, px(284.0), px(155.0));
        road.push_road_ends();
        road.attachment_points.push(AttachmentPoint {
            position: Vec2::new(T_JUNCTION_CENTER_X, 0.0),
            normal: Vec2::new(0.0, -1.0),
        });
        road.add_waypoint(Vec2::new(T_JUNCTION_CENTER_X, ROAD_CENTER_Y), 1.0);
        road
    }

    pub fn down_entrance_road() -> Self {
        let mut road = Self::new(ModuleKind::DownEntranceRoad, px(284.0), px(155.0));
        road.push_road_ends();
        let height = road.height;
        road.attachment_points.push(AttachmentPoint {
            position: Vec2::new(T_JUNCTION_CENTER_X, height),
            normal: Vec2::new(0.0, 1.0),
        });
        road.add_waypoint(Vec2::new(T_JUNCTION_CENTER_X, ROAD_CENTER_Y), 1.0);
        road
    }

    pub fn double_entrance_road() -> Self {
        let mut road = Self::new(ModuleKind::DoubleEntranceRoad, px(284.0), px(155.0));
        road.push_road_ends();
        let height = road.height;
        road.attachment_points.push(AttachmentPoint {
            position: Vec2::new(T_JUNCTION_CENTER_X, 0.0),
            normal: Vec2::new(0.0, -1.0),
        });
        road.attachment_points.push(AttachmentPoint {
            position: Vec2::new(T_JUNCTION_CENTER_X, height),
            normal: Vec2::new(0.0, 1.0),
        });
        road.add_waypoint(Vec2::new(T_JUNCTION_CENTER_X, ROAD_CENTER_Y), 1.0);
        road
    }

    /// Build a facility module with its entrance connector, entrance
    /// waypoint and an empty-priced grid of free spots.
    pub fn facility(class: FacilityClass, size: FacilitySize, is_top: bool) -> Self {
        let (width, height, entrance_x, spot_count) = match (class, size) {
            (FacilityClass::Parking, FacilitySize::Small) => (px(274.0), px(330.0), px(218.0), 4),
            (FacilityClass::Parking, FacilitySize::Large) => (px(436.0), px(363.0), px(218.0), 8),
            (FacilityClass::Charging, FacilitySize::Small) => (px(219.0), px(168.0), px(163.0), 2),
            (FacilityClass::Charging, FacilitySize::Large) => (px(274.0), px(330.0), px(218.0), 4),
        };

        let mut facility = Self::new(ModuleKind::Facility { class, size, is_top }, width, height);

        // The connector sits on the road-facing edge: bottom edge for top
        // facilities, top edge for bottom ones.
        let (edge_y, normal_y) = if is_top { (height, 1.0) } else { (0.0, -1.0) };
        facility.attachment_points.push(AttachmentPoint {
            position: Vec2::new(entrance_x, edge_y),
            normal: Vec2::new(0.0, normal_y),
        });
        facility.add_waypoint(Vec2::new(entrance_x, height / 2.0), 1.0);

        facility.spots = Self::layout_spots(width, height, is_top, spot_count);
        facility
    }

    /// Spots sit in rows at a fixed depth from the far edge, nose pointing
    /// away from the road, evenly spaced across the module's width.
    fn layout_spots(width: f32, height: f32, is_top: bool, count: usize) -> Vec<Spot> {
        let orientation = if is_top {
            -std::f32::consts::FRAC_PI_2
        } else {
            std::f32::consts::FRAC_PI_2
        };
        let per_row = count.min(4).max(1);

        let mut spots = Vec::with_capacity(count);
        for id in 0..count {
            let row = id / per_row;
            let col = id % per_row;
            let x = width * (col as f32 + 1.0) / (per_row as f32 + 1.0);
            let depth = SPOT_ROW_DEPTH + row as f32 * SPOT_ROW_GAP;
            let y = if is_top { depth } else { height - depth };
            spots.push(Spot {
                local_position: Vec2::new(x, y),
                orientation,
                id,
                state: SpotState::Free,
                price: 0.0,
            });
        }
        spots
    }

    fn push_road_ends(&mut self) {
        self.attachment_points.push(AttachmentPoint {
            position: Vec2::new(0.0, ROAD_CENTER_Y),
            normal: Vec2::new(-1.0, 0.0),
        });
        self.attachment_points.push(AttachmentPoint {
            position: Vec2::new(self.width, ROAD_CENTER_Y),
            normal: Vec2::new(1.0, 0.0),
        });
    }

    fn add_waypoint(&mut self, local_position: Vec2, tolerance: f32) {
        self.local_waypoints
            .push(Waypoint::new(local_position, tolerance));
    }

    pub fn is_road(&self) -> bool {
        !matches!(self.kind, ModuleKind::Facility { .. })
    }

    /// The facility's class, or None for road modules
    pub fn facility_class(&self) -> Option<FacilityClass> {
        match self.kind {
            ModuleKind::Facility { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Whether a facility sits above its parent road
    pub fn is_top(&self) -> bool {
        matches!(self.kind, ModuleKind::Facility { is_top: true, .. })
    }

    /// Find a connector by its outward normal (approximate comparison)
    pub fn attachment_by_normal(&self, normal: Vec2) -> Option<&AttachmentPoint> {
        self.attachment_points
            .iter()
            .find(|ap| ap.normal.distance(&normal) < 0.1)
    }

    /// Local waypoints translated into world space
    pub fn global_waypoints(&self) -> Vec<Waypoint> {
        self.local_waypoints
            .iter()
            .map(|wp| {
                let mut global = wp.clone();
                global.position = self.world_position.add(&wp.position);
                global
            })
            .collect()
    }

    /// World-space position of one of this facility's spots
    pub fn spot_world_position(&self, spot: &Spot) -> Vec2 {
        self.world_position.add(&spot.local_position)
    }

    // --- Spot reservation protocol ---

    /// Uniformly pick a FREE spot, or None when the facility is full
    pub fn random_free_spot(&self, rng: &mut StdRng) -> Option<usize> {
        let free: Vec<usize> = self
            .spots
            .iter()
            .filter(|s| s.state == SpotState::Free)
            .map(|s| s.id)
            .collect();
        free.choose(rng).copied()
    }

    /// Unconditional state transition; callers respect the
    /// Free -> Reserved -> Occupied -> Free ordering.
    pub fn set_spot_state(&mut self, index: usize, state: SpotState) {
        if let Some(spot) = self.spots.get_mut(index) {
            spot.state = state;
        }
    }

    pub fn spot_state(&self, index: usize) -> Option<SpotState> {
        self.spots.get(index).map(|s| s.state)
    }

    pub fn has_free_spot(&self) -> bool {
        self.spots.iter().any(|s| s.state == SpotState::Free)
    }

    pub fn spot_counts(&self) -> SpotCounts {
        let mut counts = SpotCounts::default();
        for spot in &self.spots {
            match spot.state {
                SpotState::Free => counts.free += 1,
                SpotState::Reserved => counts.reserved += 1,
                SpotState::Occupied => counts.occupied += 1,
            }
        }
        counts
    }
}

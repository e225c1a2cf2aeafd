//! Traffic orchestrator validation test
//!
//! Validates the spot reservation lifecycle, facility selection
//! priorities, the dwell/charge exit policies and end-to-end spawn,
//! pass-through and despawn behavior of the world.

use parking_sim::simulation::{
    planner, CarId, CarState, Destination, FacilityClass, FacilitySize, Module, ModuleMap,
    ParkingContext, Priority, SimCar, SimConfig, SimEvent, SimId, SimWorld, SpotState,
    TrafficSystem, Vec2, VehicleType, Waypoint, NEIGHBOR_RADIUS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn car_at(
    x: f32,
    vehicle_type: VehicleType,
    battery: Option<f32>,
    priority: Priority,
) -> SimCar {
    SimCar::new(
        CarId(SimId(0)),
        Vec2::new(x, 100.0),
        Vec2::new(15.0, 0.0),
        vehicle_type,
        battery,
        priority,
        true,
    )
}

#[test]
fn test_reservation_is_exclusive_until_the_facility_is_full() {
    let traffic = TrafficSystem::new(SimConfig::default());
    let mut rng = rng(11);
    let mut map = ModuleMap::new();
    // Two charging spots total
    let station = map.add(
        Module::facility(FacilityClass::Charging, FacilitySize::Small, false),
        Vec2::new(50.0, 120.0),
    );

    let car = car_at(0.0, VehicleType::Electric, Some(10.0), Priority::Distance);

    let first = traffic.choose_destination(&car, &mut map, &mut rng);
    let second = traffic.choose_destination(&car, &mut map, &mut rng);
    let (Destination::Park { spot_index: a, .. }, Destination::Park { spot_index: b, .. }) =
        (&first, &second)
    else {
        panic!("both cars should have reserved a spot");
    };
    assert_ne!(a, b, "two cars claimed the same spot");

    let counts = map.get(station).unwrap().spot_counts();
    assert_eq!(counts.reserved, 2);
    assert_eq!(counts.free, 0);

    // The station is full now and there is no parking to fall back to
    let third = traffic.choose_destination(&car, &mut map, &mut rng);
    assert!(matches!(third, Destination::PassThrough));
}

#[test]
fn test_reserved_spot_promotes_to_occupied_once() {
    let traffic = TrafficSystem::new(SimConfig::default());
    let mut rng = rng(3);
    let mut map = ModuleMap::new();
    let lot = map.add(
        Module::facility(FacilityClass::Parking, FacilitySize::Small, true),
        Vec2::new(0.0, 0.0),
    );

    let mut car = car_at(0.0, VehicleType::Combustion, None, Priority::Distance);
    let Destination::Park {
        facility,
        spot_index,
        spot,
    } = traffic.choose_destination(&car, &mut map, &mut rng)
    else {
        panic!("expected a reservation");
    };
    assert_eq!(map.get(lot).unwrap().spot_state(spot_index), Some(SpotState::Reserved));

    car.parking = Some(ParkingContext {
        facility,
        spot_index,
        spot,
    });
    car.state = CarState::Aligning;

    // Promotion fires while aligning and is idempotent afterwards
    assert!(!traffic.evaluate_parked(&mut car, &mut map, 0.1, &mut rng));
    assert_eq!(map.get(lot).unwrap().spot_state(spot_index), Some(SpotState::Occupied));
    assert!(!traffic.evaluate_parked(&mut car, &mut map, 0.1, &mut rng));
    assert_eq!(map.get(lot).unwrap().spot_state(spot_index), Some(SpotState::Occupied));
}

#[test]
fn test_dwell_timer_keeps_cars_parked_within_bounds() {
    let config = SimConfig::default();
    let traffic = TrafficSystem::new(config.clone());
    let mut rng = rng(21);
    let mut map = ModuleMap::new();
    let lot = map.add(
        Module::facility(FacilityClass::Parking, FacilitySize::Small, true),
        Vec2::new(0.0, 0.0),
    );
    let spot = map.spot(lot, 0).unwrap();
    map.get_mut(lot).unwrap().set_spot_state(0, SpotState::Reserved);

    let mut car = car_at(0.0, VehicleType::Combustion, None, Priority::Distance);
    car.parking = Some(ParkingContext {
        facility: lot,
        spot_index: 0,
        spot,
    });
    car.state = CarState::Parked;

    let mut seconds = 0;
    let left = loop {
        seconds += 1;
        if traffic.evaluate_parked(&mut car, &mut map, 1.0, &mut rng) {
            break true;
        }
        if seconds > 60 {
            break false;
        }
    };
    assert!(left, "car never finished its dwell");
    assert!(seconds as f32 >= config.dwell_min);
    assert!((seconds as f32) <= config.dwell_max + 1.0);
}

#[test]
fn test_charging_car_charges_and_leaves_when_full() {
    let config = SimConfig::default();
    let traffic = TrafficSystem::new(config.clone());
    let mut rng = rng(5);
    let mut map = ModuleMap::new();
    let station = map.add(
        Module::facility(FacilityClass::Charging, FacilitySize::Small, false),
        Vec2::new(0.0, 0.0),
    );
    let spot = map.spot(station, 0).unwrap();
    map.get_mut(station).unwrap().set_spot_state(0, SpotState::Reserved);

    let mut car = car_at(0.0, VehicleType::Electric, Some(90.0), Priority::Distance);
    car.parking = Some(ParkingContext {
        facility: station,
        spot_index: 0,
        spot,
    });
    car.state = CarState::Parked;

    // One second at the default rate pushes the battery to the force
    // threshold, which makes the exit unconditional
    assert!(traffic.evaluate_parked(&mut car, &mut map, 1.0, &mut rng));
    assert_eq!(car.battery, Some(90.0 + config.charge_rate));
    // Charging cars never start a dwell timer
    assert_eq!(car.dwell_remaining, None);

    // The battery caps at 100
    car.battery = Some(99.0);
    traffic.evaluate_parked(&mut car, &mut map, 2.0, &mut rng);
    assert_eq!(car.battery, Some(100.0));
}

#[test]
fn test_low_battery_electric_always_seeks_a_charger() {
    let traffic = TrafficSystem::new(SimConfig::default());
    let mut rng = rng(17);
    let mut map = ModuleMap::new();
    map.add(
        Module::facility(FacilityClass::Parking, FacilitySize::Large, true),
        Vec2::new(0.0, 0.0),
    );
    map.add(
        Module::facility(FacilityClass::Charging, FacilitySize::Small, false),
        Vec2::new(100.0, 0.0),
    );

    // Battery below the low threshold: charging with probability 1.0
    let car = car_at(0.0, VehicleType::Electric, Some(25.0), Priority::Distance);
    for _ in 0..20 {
        let Destination::Park { facility, .. } =
            traffic.choose_destination(&car, &mut map, &mut rng)
        else {
            panic!("a charging spot was free");
        };
        assert_eq!(
            map.get(facility).unwrap().facility_class(),
            Some(FacilityClass::Charging)
        );
        map.fill_all_spots(SpotState::Free);
    }
}

#[test]
fn test_distance_priority_beats_price_and_vice_versa() {
    let traffic = TrafficSystem::new(SimConfig::default());
    let mut rng = rng(29);
    let mut map = ModuleMap::new();
    // Near but expensive vs far but cheap
    let near = map.add(
        Module::facility(FacilityClass::Parking, FacilitySize::Small, true),
        Vec2::new(10.0, 80.0),
    );
    let far = map.add(
        Module::facility(FacilityClass::Parking, FacilitySize::Small, true),
        Vec2::new(400.0, 80.0),
    );
    for spot in &mut map.get_mut(near).unwrap().spots {
        spot.price = 5.0;
    }
    for spot in &mut map.get_mut(far).unwrap().spots {
        spot.price = 2.0;
    }

    let distance_car = car_at(0.0, VehicleType::Combustion, None, Priority::Distance);
    let Destination::Park { facility, .. } =
        traffic.choose_destination(&distance_car, &mut map, &mut rng)
    else {
        panic!("spots are free");
    };
    assert_eq!(facility, near);

    map.fill_all_spots(SpotState::Free);

    let price_car = car_at(0.0, VehicleType::Combustion, None, Priority::Price);
    let Destination::Park { facility, .. } =
        traffic.choose_destination(&price_car, &mut map, &mut rng)
    else {
        panic!("spots are free");
    };
    assert_eq!(facility, far);
}

#[test]
fn test_spawn_request_creates_a_car_on_a_boundary_road() {
    let mut world = SimWorld::create_demo_world(SimConfig::default(), Some(42));
    let id = world.spawn_request().expect("demo world has roads");

    let events = world.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::VehicleCreated { id: created, .. } if *created == id)));
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::PathAssigned { id: assigned, waypoints } if *assigned == id && *waypoints > 0)));

    let car = world.cars.get(&id).unwrap();
    let (min_x, max_x) = world.map.road_bounds().unwrap();
    let at_left = (car.position.x - min_x).abs() < 1e-4;
    let at_right = (car.position.x - max_x).abs() < 1e-4;
    assert!(at_left || at_right, "car spawned away from the map edges");
    assert_eq!(
        car.velocity.x.abs(),
        world.traffic.config.spawn_speed,
        "spawn speed not applied"
    );
}

#[test]
fn test_full_map_sends_cars_straight_through() {
    let mut world = SimWorld::create_demo_world(SimConfig::default(), Some(7));
    world.map.fill_all_spots(SpotState::Occupied);
    assert!(world.map.all_facilities_full());

    let id = world.spawn_request().expect("demo world has roads");
    let car = world.cars.get(&id).unwrap();

    // A through path is an exit path: the car leaves once it is consumed
    assert_eq!(car.state, CarState::Exiting);
    assert!(car.parking.is_none());

    let (min_x, max_x) = world.map.road_bounds().unwrap();
    let terminal = car.waypoints.back().expect("through path is not empty");
    assert!(terminal.stop_at_end);
    assert!(terminal.position.x < min_x || terminal.position.x > max_x);
}

#[test]
fn test_exiting_car_despawns_after_consuming_its_path() {
    let mut world = SimWorld::create_demo_world(SimConfig::default(), Some(13));
    world.map.fill_all_spots(SpotState::Occupied);
    let id = world.spawn_request().expect("demo world has roads");
    world.drain_events();

    // Walk the car along its path one waypoint per tick
    for _ in 0..8 {
        if let Some(car) = world.cars.get_mut(&id) {
            if let Some(front) = car.waypoints.front() {
                car.position = front.position;
            }
        }
        world.tick(1.0 / 60.0);
        if !world.cars.contains_key(&id) {
            break;
        }
    }

    assert!(!world.cars.contains_key(&id), "exiting car was never removed");
    assert!(world
        .drain_events()
        .iter()
        .any(|e| matches!(e, SimEvent::VehicleDespawned { id: gone } if *gone == id)));
}

#[test]
fn test_leaving_a_spot_releases_it_before_the_exit_path() {
    let mut world = SimWorld::create_demo_world(SimConfig::default(), Some(9));
    let facility = world.map.facilities_of_class(FacilityClass::Parking)[0];
    world
        .map
        .get_mut(facility)
        .unwrap()
        .set_spot_state(0, SpotState::Reserved);
    let spot = world.map.spot(facility, 0).unwrap();
    let position = world.map.get(facility).unwrap().spot_world_position(&spot);

    let mut car = SimCar::new(
        CarId(SimId(99)),
        position,
        Vec2::ZERO,
        VehicleType::Combustion,
        None,
        Priority::Distance,
        true,
    );
    car.state = CarState::Parked;
    car.parking = Some(ParkingContext {
        facility,
        spot_index: 0,
        spot,
    });
    car.dwell_remaining = Some(0.5);
    let id = car.id;
    world.cars.insert(id, car);

    // One long tick runs the dwell out and triggers the exit
    world.tick(1.0);

    assert_eq!(
        world.map.get(facility).unwrap().spot_state(0),
        Some(SpotState::Free),
        "spot was not released"
    );
    let car = world.cars.get(&id).unwrap();
    assert_eq!(car.state, CarState::Exiting);
    assert!(car.parking.is_none());
    assert_eq!(car.waypoints.len(), 4);
    assert!(world
        .drain_events()
        .iter()
        .any(|e| matches!(e, SimEvent::PathAssigned { id: assigned, .. } if *assigned == id)));
}

#[test]
fn test_car_parks_beside_an_occupied_spot() {
    let mut world = SimWorld::create_demo_world(SimConfig::default(), Some(31));
    let facility = world.map.facilities_of_class(FacilityClass::Parking)[0];

    // A long-stay neighbor already occupies spot 0
    world
        .map
        .get_mut(facility)
        .unwrap()
        .set_spot_state(0, SpotState::Occupied);
    let spot0 = world.map.spot(facility, 0).unwrap();
    let neighbor_pos = world.map.get(facility).unwrap().spot_world_position(&spot0);
    let mut neighbor = SimCar::new(
        CarId(SimId(50)),
        neighbor_pos,
        Vec2::ZERO,
        VehicleType::Combustion,
        None,
        Priority::Distance,
        true,
    );
    neighbor.state = CarState::Parked;
    neighbor.parking = Some(ParkingContext {
        facility,
        spot_index: 0,
        spot: spot0,
    });
    neighbor.dwell_remaining = Some(600.0);
    world.cars.insert(neighbor.id, neighbor);

    // The adjacent spot sits well inside the separation radius, so the
    // parked neighbor must not repel the approaching car
    world
        .map
        .get_mut(facility)
        .unwrap()
        .set_spot_state(1, SpotState::Reserved);
    let spot1 = world.map.spot(facility, 1).unwrap();
    let target = world.map.get(facility).unwrap().spot_world_position(&spot1);
    assert!(target.distance(&neighbor_pos) < NEIGHBOR_RADIUS);

    let path = planner::generate_path(1.0, &world.map, facility, &spot1, &world.traffic.config);
    let mut car = SimCar::new(
        CarId(SimId(51)),
        path[0].position,
        Vec2::new(world.traffic.config.spawn_speed, 0.0),
        VehicleType::Combustion,
        None,
        Priority::Distance,
        true,
    );
    car.assign_path(
        path,
        Some(ParkingContext {
            facility,
            spot_index: 1,
            spot: spot1,
        }),
    );
    let id = car.id;
    world.cars.insert(id, car);

    let mut parked = false;
    for _ in 0..7200 {
        world.tick(1.0 / 60.0);
        if world.cars.get(&id).map(|c| c.state) == Some(CarState::Parked) {
            parked = true;
            break;
        }
    }
    assert!(parked, "car never captured the spot next to the parked one");
    assert_eq!(
        world.map.get(facility).unwrap().spot_state(1),
        Some(SpotState::Occupied)
    );
}

#[test]
fn test_car_converges_on_a_stop_waypoint() {
    let mut rng = rng(2);
    let mut car = SimCar::new(
        CarId(SimId(0)),
        Vec2::new(0.0, 100.0),
        Vec2::ZERO,
        VehicleType::Combustion,
        None,
        Priority::Distance,
        true,
    );
    let target = Vec2::new(100.0, 100.0);
    car.assign_exit_path(vec![Waypoint::stopping(target, 2.5, None, 0.0)]);

    let mut last = car.position.distance(&target);
    for _ in 0..2000 {
        car.update(1.0 / 60.0, (1000.0, 1000.0), &[], &mut rng);
        if car.has_arrived() {
            break;
        }
        let dist = car.position.distance(&target);
        assert!(dist < last + 1e-3, "car moved away from its waypoint");
        last = dist;
    }
    assert!(car.has_arrived(), "car never reached its waypoint");
    assert_eq!(car.velocity, Vec2::ZERO);
}

mod simulation;

use clap::Parser;

use simulation::{SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "parking_sim")]
#[command(about = "Headless parking/charging traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.016666")]
    delta: f32,

    /// Issue a spawn request every N ticks
    #[arg(long, default_value = "120")]
    spawn_every: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("Running parking simulation in headless mode...");
    println!(
        "Ticks: {}, Delta: {}s, spawn every {} ticks",
        cli.ticks, cli.delta, cli.spawn_every
    );
    println!();

    let mut world = SimWorld::create_demo_world(SimConfig::default(), cli.seed);

    println!("Initial state:");
    world.print_summary();
    println!();

    let report_every = (1.0 / cli.delta).ceil() as u32 * 10;
    let mut spawned = 0usize;
    let mut despawned = 0usize;

    for tick in 1..=cli.ticks {
        if tick % cli.spawn_every == 0 {
            world.spawn_request();
        }
        world.tick(cli.delta);

        for event in world.drain_events() {
            match event {
                simulation::SimEvent::VehicleCreated { .. } => spawned += 1,
                simulation::SimEvent::VehicleDespawned { .. } => despawned += 1,
                simulation::SimEvent::PathAssigned { .. } => {}
            }
        }

        if tick % report_every == 0 {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            world.print_summary();
            println!();
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    println!("Total cars spawned: {}", spawned);
    println!("Total cars despawned: {}", despawned);
    println!("Active cars: {}", world.cars.len());
}

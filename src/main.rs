use lane_sim::{Simulation, SimulationParams, VehicleId};

/// The length of each simulated step in s.
const TIME_STEP: f64 = 0.05;

/// How long to simulate for in s.
const DURATION: f64 = 60.0;

/// When to remove the boundary and let the queued traffic go, in s.
const BOUNDARY_LIFETIME: f64 = 30.0;

/// Where the boundary obstacle stands, in m.
const BOUNDARY_POS: f64 = 200.0;

fn main() {
    env_logger::init();

    let params = SimulationParams::default();
    let mut sim = match std::env::args().nth(1).map(|seed| seed.parse::<u64>()) {
        Some(Ok(seed)) => Simulation::seeded(params, seed),
        Some(Err(err)) => {
            eprintln!("Invalid seed: {}", err);
            std::process::exit(2);
        }
        None => Simulation::new(params),
    };
    sim.add_boundary(BOUNDARY_POS);

    let frames_per_sec = (1.0 / TIME_STEP).round() as usize;
    let num_frames = (DURATION / TIME_STEP).round() as usize;
    let boundary_frame = (BOUNDARY_LIFETIME / TIME_STEP).round() as usize;

    for frame in 1..=num_frames {
        sim.tick(TIME_STEP);
        if frame == boundary_frame {
            sim.remove_vehicle(VehicleId::BOUNDARY);
        }
        if frame % frames_per_sec == 0 {
            print_lane(&sim);
        }
    }

    let crashed = sim.iter_vehicles().filter(|v| v.has_crashed()).count();
    println!(
        "Simulated {:.0} s: {} vehicles on the lane, {} crashed",
        sim.time(),
        sim.iter_vehicles().count(),
        crashed
    );
}

/// Prints one line listing every vehicle's ID, position and speed.
fn print_lane(sim: &Simulation) {
    let line = sim
        .snapshot()
        .iter()
        .map(|v| {
            let mark = if v.crashed { "!" } else { "" };
            let label = v.decision.map(|d| d.label()).unwrap_or("");
            format!("{}{} {:.1} {:.1} {}", v.id, mark, v.pos, v.speed, label)
        })
        .collect::<Vec<_>>()
        .join(" | ");
    println!("[{:5.1}] {}", sim.time(), line);
}

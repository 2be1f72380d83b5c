// demos/jump.rs
// Run with:
//   RUST_LOG=schelling_balance=info cargo run --example jump

use schelling_balance::{SimConfig, Simulation, UtilitySpec, settle};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = SimConfig::jump(25, 25).with_seed(2024);
    let utility = UtilitySpec::SinglePeaked { peak: 0.5 };

    let mut sim = match Simulation::from_spec(cfg, &utility) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("bad configuration: {err}");
            std::process::exit(1);
        }
    };

    let pop = sim.counts();
    println!("== Jump Schelling ==");
    println!("red {} / blue {} / empty {}", pop.red, pop.blue, pop.empty);
    println!("LS at start -> {:.4}", sim.segregation_metric());

    for round in 1..=20 {
        let out = settle(&mut sim, 200);
        println!(
            "round {round:>2}: {:>3} moves, LS -> {:.4}{}",
            out.moves,
            sim.segregation_metric(),
            if out.equilibrium { "  (equilibrium)" } else { "" }
        );
        if out.equilibrium {
            break;
        }
    }
}

// demos/swap.rs
// Run with:
//   RUST_LOG=schelling_balance=debug cargo run --example swap

use schelling_balance::{AgentKind, Position, SimConfig, Simulation, UtilitySpec, settle};
use tracing_subscriber::EnvFilter;

fn render(sim: &Simulation) {
    let cfg = sim.config();
    for y in 0..cfg.height {
        let row: String = (0..cfg.width)
            .map(|x| match sim.agent_type_at(Position::new(x, y)) {
                Some(AgentKind::Red) => 'x',
                Some(AgentKind::Blue) => 'o',
                None => '.',
            })
            .collect();
        println!("  {row}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = SimConfig::swap(15, 15).with_seed(7).with_topology(true, false);
    let utility = UtilitySpec::Threshold { tau: 1.0 };

    let mut sim = match Simulation::from_spec(cfg, &utility) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("bad configuration: {err}");
            std::process::exit(1);
        }
    };

    println!("== Swap Schelling ==");
    render(&sim);
    println!("LS at start -> {:.4}", sim.segregation_metric());

    let out = settle(&mut sim, 100_000);
    println!("{} moves in {} steps, equilibrium: {}", out.moves, out.steps, out.equilibrium);
    render(&sim);
    println!("LS at end   -> {:.4}", sim.segregation_metric());
}

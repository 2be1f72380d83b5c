// tests/core.rs
use schelling_balance::mechanics::{Topology, UtilityFunction, is_greater, stoch};
use schelling_balance::systems::agent;
use schelling_balance::systems::grid::Grid;
use schelling_balance::{
    AgentKind, ConfigError, Mode, Phase, Position, Relocation, SimConfig, Simulation, TopologyConfig, World,
    settle,
};

fn p(x: u32, y: u32) -> Position {
    Position::new(x, y)
}

/// Exhaustive check on a copy of the grid: really jump, then recount.
fn has_improving_jump(world: &World) -> bool {
    let (grid, topo, u) = (world.grid(), world.topology(), world.utility());
    grid.ids().any(|id| {
        let now = agent::utility(grid, topo, u, id);
        grid.empty().iter().any(|&to| {
            let mut moved = grid.clone();
            moved.jump(id, to);
            is_greater(agent::utility(&moved, topo, u, id), now)
        })
    })
}

/// Exhaustive check on a copy of the grid: really swap, then recount.
fn has_improving_swap(world: &World) -> bool {
    let (grid, topo, u) = (world.grid(), world.topology(), world.utility());
    let blues: Vec<_> = grid.ids().filter(|&id| grid.agent(id).kind == AgentKind::Blue).collect();
    let reds: Vec<_> = grid.ids().filter(|&id| grid.agent(id).kind == AgentKind::Red).collect();
    blues.iter().any(|&b| {
        reds.iter().any(|&r| {
            let (ub, ur) = (agent::utility(grid, topo, u, b), agent::utility(grid, topo, u, r));
            let mut swapped = grid.clone();
            swapped.swap(b, r);
            is_greater(agent::utility(&swapped, topo, u, b), ub) && is_greater(agent::utility(&swapped, topo, u, r), ur)
        })
    })
}

/* ──────────────────────────────────────────────────────────────────────────
1) 2×2 swap torus, diagonal layout, single-peaked at 0.5
────────────────────────────────────────────────────────────────────────── */

fn checkerboard_2x2(self_inclusive: bool) -> World {
    let layout = [
        (p(0, 0), AgentKind::Red),
        (p(1, 1), AgentKind::Red),
        (p(1, 0), AgentKind::Blue),
        (p(0, 1), AgentKind::Blue),
    ];
    World::new(
        Topology::new(2, 2, true, self_inclusive),
        Grid::from_layout(2, 2, &layout),
        UtilityFunction::SinglePeaked { peak: 0.5 },
    )
}

#[test]
fn two_by_two_checkerboard_has_no_improving_swap() {
    // Self-inclusive 8-torus on 2×2: own cell once, diagonal cell four times,
    // the two orthogonal cells twice each. Every agent sees 5 same of 9.
    let world = checkerboard_2x2(true);
    for id in world.grid().ids() {
        let c = world.composition_of(id);
        assert_eq!((c.same, c.other), (5, 4));
        assert!((world.utility_of(id) - 8.0 / 9.0).abs() < 1e-12);
    }
    // Any swap drops both movers to 3/9, utility 2/3.
    assert!(!has_improving_swap(&world));

    let mut sim = Simulation::with_world(world, Mode::Swap, stoch::seeded(0)).unwrap();
    assert_eq!(sim.step(), None);
    assert!(sim.is_equilibrium());
}

#[test]
fn two_by_two_without_self_is_already_satisfied() {
    let world = checkerboard_2x2(false);
    for id in world.grid().ids() {
        assert_eq!(world.utility_of(id), 1.0);
    }
    let mut sim = Simulation::with_world(world, Mode::Swap, stoch::seeded(0)).unwrap();
    assert_eq!(sim.step(), None);
    assert!(sim.is_equilibrium());
}

/* ──────────────────────────────────────────────────────────────────────────
2) Jump: a lone red inside a blue ring leaves for a red pocket
────────────────────────────────────────────────────────────────────────── */

fn lonely_red_world() -> World {
    let blues = [p(1, 1), p(2, 1), p(3, 1), p(1, 2), p(3, 2), p(1, 3), p(3, 3)];
    let reds = [p(2, 2), p(4, 4), p(4, 0), p(0, 4)];
    let layout: Vec<_> = blues
        .iter()
        .map(|&q| (q, AgentKind::Blue))
        .chain(reds.iter().map(|&q| (q, AgentKind::Red)))
        .collect();
    World::new(
        Topology::new(5, 5, true, false),
        Grid::from_layout(5, 5, &layout),
        UtilityFunction::Threshold { tau: 0.5 },
    )
}

#[test]
fn lonely_red_jumps_to_a_better_pocket() {
    let world = lonely_red_world();
    let (grid, topo, u) = (world.grid(), world.topology(), world.utility());
    let red = grid.occupant(p(2, 2)).unwrap();
    assert_eq!(agent::utility(grid, topo, u, red), 0.0);

    // The adjacent hole only borders blues once the red has left its cell.
    assert_eq!(agent::utility_after_jump(grid, topo, u, red, p(2, 3)), 0.0);
    // The corner pocket borders three reds and one blue.
    assert_eq!(agent::utility_after_jump(grid, topo, u, red, p(0, 0)), 0.5);

    let targets: Vec<_> = grid.empty().iter().copied().collect();
    let (to, gain) = agent::find_improving_jump(grid, topo, u, red, &targets).unwrap();
    assert_ne!(to, p(2, 3));
    assert!(is_greater(gain, 0.0));
    assert_eq!(agent::utility_after_jump(grid, topo, u, red, to), gain);
}

#[test]
fn lonely_red_scenario_settles_into_a_checked_equilibrium() {
    let mut sim = Simulation::with_world(lonely_red_world(), Mode::Jump, stoch::seeded(5)).unwrap();
    let out = settle(&mut sim, 50_000);
    assert!(out.equilibrium);
    assert!(out.moves > 0);
    assert!(!has_improving_jump(sim.world()));
}

/* ──────────────────────────────────────────────────────────────────────────
3) Two-phase tick: propose, then commit
────────────────────────────────────────────────────────────────────────── */

#[test]
fn proposal_is_visible_before_it_lands() {
    let mut sim = Simulation::configure(SimConfig::jump(10, 10).with_seed(1), UtilityFunction::default()).unwrap();
    assert_eq!(sim.phase(), Phase::Propose);

    let proposed = sim.step().expect("a random 10×10 layout has an improving jump");
    let Relocation::Jump { agent, from, to, utility } = proposed else {
        panic!("jump mode proposed {proposed:?}");
    };
    assert_eq!(sim.pending(), Some(&proposed));
    assert_eq!(sim.phase(), Phase::Commit);
    assert_eq!(sim.world().grid().agent(agent).pos, from);
    assert!(is_greater(utility, sim.current_utility(agent)));

    assert_eq!(sim.step(), None);
    assert_eq!(sim.pending(), None);
    assert_eq!(sim.world().grid().agent(agent).pos, to);
    assert_eq!(sim.current_utility(agent), utility);
    assert!(sim.world().grid().empty().contains(&from));
}

/* ──────────────────────────────────────────────────────────────────────────
4) Determinism under a fixed seed
────────────────────────────────────────────────────────────────────────── */

fn trajectory(cfg: SimConfig, steps: usize) -> Vec<Option<Relocation>> {
    let mut sim = Simulation::configure(cfg, UtilityFunction::SinglePeaked { peak: 0.4 }).unwrap();
    (0..steps).map(|_| sim.step()).collect()
}

#[test]
fn same_seed_replays_the_same_proposals() {
    let cfg = SimConfig::jump(12, 12).with_seed(99);
    let a = trajectory(cfg.clone(), 300);
    let b = trajectory(cfg, 300);
    assert_eq!(a, b);
    assert!(a.iter().any(Option::is_some));

    let swap = SimConfig::swap(8, 8).with_seed(3);
    assert_eq!(trajectory(swap.clone(), 120), trajectory(swap, 120));
}

/* ──────────────────────────────────────────────────────────────────────────
5) Incremental metric matches a full recount
────────────────────────────────────────────────────────────────────────── */

fn assert_metric_tracks(mut sim: Simulation, steps: usize) -> usize {
    let mut moves = 0;
    for _ in 0..steps {
        if sim.step().is_some() {
            moves += 1;
        }
        let world = sim.world();
        assert!(world.grid().is_consistent());
        assert_eq!(*world.metric(), world.recount());
    }
    moves
}

#[test]
fn metric_stays_exact_over_jump_steps() {
    let sim = Simulation::configure(
        SimConfig::jump(8, 8).with_seed(17).with_density(0.7),
        UtilityFunction::SinglePeaked { peak: 0.5 },
    )
    .unwrap();
    assert!(assert_metric_tracks(sim, 240) > 0);
}

#[test]
fn metric_stays_exact_over_swap_steps() {
    let sim = Simulation::configure(
        SimConfig::swap(6, 6).with_seed(4).with_topology(false, false),
        UtilityFunction::Threshold { tau: 1.0 },
    )
    .unwrap();
    assert_metric_tracks(sim, 200);
}

#[test]
fn metric_matches_its_definition() {
    // Row of R R B on a 3×1 ring, 4-torus, no self. Vertical offsets wrap
    // back onto the agent, so each sees itself twice plus its row neighbors.
    let layout = [(p(0, 0), AgentKind::Red), (p(1, 0), AgentKind::Red), (p(2, 0), AgentKind::Blue)];
    let world = World::new(
        Topology::new(3, 1, false, false),
        Grid::from_layout(3, 1, &layout),
        UtilityFunction::default(),
    );
    // same counts: red0 = 2 + 1, red1 = 2 + 1, blue = 2 + 0.
    assert_eq!(world.metric().same_sum(), 8);
    assert_eq!(world.metric().value(), 8.0 / (4.0 * 3.0));
}

/* ──────────────────────────────────────────────────────────────────────────
6) Declared equilibria survive an exhaustive search
────────────────────────────────────────────────────────────────────────── */

#[test]
fn jump_equilibrium_admits_no_improving_jump() {
    for (density, seed) in [(0.25, 0), (0.25, 1), (0.5, 2), (0.5, 3)] {
        let cfg = SimConfig::jump(4, 4)
            .with_seed(seed)
            .with_density(density)
            .with_topology(true, false);
        let mut sim = Simulation::configure(cfg, UtilityFunction::Threshold { tau: 0.5 }).unwrap();
        let out = settle(&mut sim, 100_000);
        assert!(out.equilibrium, "seed {seed} did not settle");
        assert!(!has_improving_jump(sim.world()), "seed {seed}: equilibrium with an improving jump");
    }
}

#[test]
fn swap_equilibrium_admits_no_improving_swap() {
    for seed in 0..3 {
        let cfg = SimConfig::swap(4, 4).with_seed(seed).with_topology(true, false);
        let mut sim = Simulation::configure(cfg, UtilityFunction::Threshold { tau: 1.0 }).unwrap();
        let out = settle(&mut sim, 100_000);
        assert!(out.equilibrium, "seed {seed} did not settle");
        assert!(!has_improving_swap(sim.world()), "seed {seed}: equilibrium with an improving swap");
        assert!(sim.world().grid().empty().is_empty());
    }
}

/* ──────────────────────────────────────────────────────────────────────────
7) Equilibrium invalidation
────────────────────────────────────────────────────────────────────────── */

fn settled_sim() -> Simulation {
    let cfg = SimConfig::jump(4, 4).with_seed(8).with_density(0.25).with_topology(true, false);
    let mut sim = Simulation::configure(cfg, UtilityFunction::Threshold { tau: 0.5 }).unwrap();
    assert!(settle(&mut sim, 100_000).equilibrium);
    sim
}

#[test]
fn unchanged_settings_keep_the_equilibrium() {
    let mut sim = settled_sim();
    sim.set_tau(0.5).unwrap();
    sim.set_peak(0.3).unwrap(); // not a single-peaked utility
    sim.set_grid_size(4, 4).unwrap();
    sim.set_density(0.25).unwrap();
    sim.set_topology(TopologyConfig {
        diagonal: true,
        self_inclusive: false,
    });
    assert!(sim.is_equilibrium());
}

#[test]
fn relevant_changes_clear_the_equilibrium() {
    let mut sim = settled_sim();
    sim.set_tau(0.6).unwrap();
    assert!(!sim.is_equilibrium());

    let mut sim = settled_sim();
    let before = *sim.world().metric();
    sim.set_topology(TopologyConfig {
        diagonal: false,
        self_inclusive: false,
    });
    assert!(!sim.is_equilibrium());
    assert_eq!(sim.world().metric().degree(), 4);
    assert_eq!(*sim.world().metric(), sim.world().recount());
    assert_ne!(before.degree(), sim.world().metric().degree());

    let mut sim = settled_sim();
    sim.set_utility(UtilityFunction::Rectangular { left: 0.3, right: 0.6 }).unwrap();
    assert!(!sim.is_equilibrium());

    let mut sim = settled_sim();
    sim.set_blue_ratio(0.25).unwrap();
    assert!(!sim.is_equilibrium());
    assert_eq!(sim.counts().blue, 1);

    let mut sim = settled_sim();
    sim.set_grid_size(6, 5).unwrap();
    assert!(!sim.is_equilibrium());
    assert_eq!(sim.counts().empty + sim.counts().red + sim.counts().blue, 30);
}

/* ──────────────────────────────────────────────────────────────────────────
8) Configuration errors fail fast
────────────────────────────────────────────────────────────────────────── */

#[test]
fn invalid_configurations_are_rejected() {
    let u = UtilityFunction::default;
    assert_eq!(
        Simulation::configure(SimConfig::jump(4, 4).with_density(1.0), u()).unwrap_err(),
        ConfigError::TooManyAgents { agents: 16, cells: 16 }
    );
    assert_eq!(
        Simulation::configure(SimConfig::swap(4, 4).with_density(0.5), u()).unwrap_err(),
        ConfigError::IncompleteCover { agents: 8, cells: 16 }
    );
    assert!(matches!(
        Simulation::configure(SimConfig::jump(0, 4), u()),
        Err(ConfigError::ZeroDimension { .. })
    ));
    assert!(matches!(
        Simulation::configure(SimConfig::jump(4, 4).with_density(1.5), u()),
        Err(ConfigError::DensityOutOfRange(_))
    ));
    assert!(matches!(
        Simulation::configure(SimConfig::jump(4, 4), UtilityFunction::SinglePeaked { peak: 1.0 }),
        Err(ConfigError::InvalidUtility(_))
    ));
}

#[test]
fn failed_reconfiguration_leaves_state_alone() {
    let mut sim = settled_sim();
    let cfg = sim.config().clone();
    assert!(sim.set_density(1.0).is_err());
    assert!(sim.set_peak(1.2).is_err());
    assert_eq!(sim.config(), &cfg);
    assert!(sim.is_equilibrium());
}

#[test]
fn hand_built_worlds_must_fit_the_mode() {
    let full = checkerboard_2x2(true);
    assert!(matches!(
        Simulation::with_world(full, Mode::Jump, stoch::seeded(0)),
        Err(ConfigError::TooManyAgents { .. })
    ));
    assert!(matches!(
        Simulation::with_world(lonely_red_world(), Mode::Swap, stoch::seeded(0)),
        Err(ConfigError::IncompleteCover { .. })
    ));
}

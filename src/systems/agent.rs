//! Agent-side evaluation as free functions over `(AgentId, &Grid,
//! &Topology, &UtilityFunction)`.
//!
//! Hypothetical relocations are scored against a read-only overlay: at most
//! two cells are read as if rewritten, the grid itself is never touched.

use crate::mechanics::{Fraction, Topology, UtilityFunction, is_greater};
use crate::systems::grid::Grid;
use crate::{AgentId, AgentKind, Position};

/// Same-kind and other-kind occupied neighbor slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    pub same: u32,
    pub other: u32,
}

impl Composition {
    #[inline]
    pub fn fraction(self) -> Fraction {
        Fraction::similarity(self.same, self.other)
    }
}

type Patch = (Position, Option<AgentKind>);

#[inline]
fn read(grid: &Grid, patches: &[Patch], pos: Position) -> Option<AgentKind> {
    match patches.iter().find(|(p, _)| *p == pos) {
        Some(&(_, kind)) => kind,
        None => grid.kind_at(pos),
    }
}

fn composition_with(grid: &Grid, topo: &Topology, kind: AgentKind, at: Position, patches: &[Patch]) -> Composition {
    let mut c = Composition::default();
    for n in topo.neighbors(at) {
        match read(grid, patches, n) {
            None => {}
            Some(k) if k == kind => c.same += 1,
            Some(_) => c.other += 1,
        }
    }
    c
}

/// Neighborhood tally of `id` where it stands.
pub fn composition(grid: &Grid, topo: &Topology, id: AgentId) -> Composition {
    let a = grid.agent(id);
    composition_with(grid, topo, a.kind, a.pos, &[])
}

pub fn utility(grid: &Grid, topo: &Topology, u: &UtilityFunction, id: AgentId) -> f64 {
    u.evaluate(composition(grid, topo, id).fraction())
}

/// Utility `id` would have after jumping into the empty cell `to`.
pub fn utility_after_jump(grid: &Grid, topo: &Topology, u: &UtilityFunction, id: AgentId, to: Position) -> f64 {
    let a = grid.agent(id);
    let patches = [(a.pos, None), (to, Some(a.kind))];
    u.evaluate(composition_with(grid, topo, a.kind, to, &patches).fraction())
}

/// Utilities of `(a, b)` after they trade cells.
pub fn utilities_after_swap(
    grid: &Grid,
    topo: &Topology,
    u: &UtilityFunction,
    a: AgentId,
    b: AgentId,
) -> (f64, f64) {
    let (aa, bb) = (grid.agent(a), grid.agent(b));
    let patches = [(aa.pos, Some(bb.kind)), (bb.pos, Some(aa.kind))];
    let ua = u.evaluate(composition_with(grid, topo, aa.kind, bb.pos, &patches).fraction());
    let ub = u.evaluate(composition_with(grid, topo, bb.kind, aa.pos, &patches).fraction());
    (ua, ub)
}

/// First target in `targets` (in the given order) that strictly improves
/// `id`, with the utility it would reach there.
pub fn find_improving_jump(
    grid: &Grid,
    topo: &Topology,
    u: &UtilityFunction,
    id: AgentId,
    targets: &[Position],
) -> Option<(Position, f64)> {
    let current = utility(grid, topo, u, id);
    targets.iter().find_map(|&to| {
        let next = utility_after_jump(grid, topo, u, id, to);
        is_greater(next, current).then_some((to, next))
    })
}

/// Maximal utility: no swap can raise it.
#[inline]
#[allow(clippy::float_cmp)]
pub fn is_satisfied(utility: f64) -> bool {
    utility == 1.0
}

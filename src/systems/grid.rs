//! Cell occupancy plus the agent arena.
//!
//! Every cell either holds exactly one agent whose `pos` is that cell, or is
//! empty and listed in the empty set. Breaking that is a programmer error and
//! panics.

use std::collections::BTreeSet;

use bevy_prng::WyRand;

use crate::mechanics::stoch;
use crate::{AgentId, AgentKind, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Agent {
    pub kind: AgentKind,
    pub pos: Position,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Option<AgentId>>,
    agents: Vec<Agent>,
    empty: BTreeSet<Position>,
}

impl Grid {
    /// Scatter `red` then `blue` agents over shuffled cells.
    ///
    /// The arena is ordered by position, `x`-major, not by placement order.
    pub fn populate(width: u32, height: u32, red: usize, blue: usize, rng: &mut WyRand) -> Self {
        let cells = (width as usize) * (height as usize);
        assert!(red + blue <= cells, "{} agents do not fit on {cells} cells", red + blue);
        let mut free: Vec<Position> = (0..width)
            .flat_map(|x| (0..height).map(move |y| Position::new(x, y)))
            .collect();
        stoch::shuffle(rng, &mut free);
        let mut layout = Vec::with_capacity(red + blue);
        for (kind, count) in [(AgentKind::Red, red), (AgentKind::Blue, blue)] {
            for _ in 0..count {
                if let Some(pos) = free.pop() {
                    layout.push((pos, kind));
                }
            }
        }
        Self::from_layout(width, height, &layout)
    }

    /// Build from an explicit layout. Unlisted cells are empty.
    pub fn from_layout(width: u32, height: u32, layout: &[(Position, AgentKind)]) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        let mut by_cell: Vec<Option<AgentKind>> = vec![None; (width as usize) * (height as usize)];
        for &(pos, kind) in layout {
            assert!(pos.x < width && pos.y < height, "position {pos:?} outside {width}x{height}");
            let slot = &mut by_cell[(pos.y as usize) * (width as usize) + pos.x as usize];
            assert!(slot.is_none(), "two agents placed on {pos:?}");
            *slot = Some(kind);
        }

        let mut grid = Self {
            width,
            height,
            cells: vec![None; by_cell.len()],
            agents: Vec::with_capacity(layout.len()),
            empty: BTreeSet::new(),
        };
        for x in 0..width {
            for y in 0..height {
                let pos = Position::new(x, y);
                let offset = grid.offset(pos);
                match by_cell[offset] {
                    Some(kind) => {
                        let id = AgentId(grid.agents.len() as u32);
                        grid.agents.push(Agent { kind, pos });
                        grid.cells[offset] = Some(id);
                    }
                    None => {
                        grid.empty.insert(pos);
                    }
                }
            }
        }
        grid
    }

    #[inline]
    fn offset(&self, pos: Position) -> usize {
        assert!(
            pos.x < self.width && pos.y < self.height,
            "position {pos:?} outside {}x{}",
            self.width,
            self.height
        );
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[inline]
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + use<> {
        (0..self.agents.len() as u32).map(AgentId)
    }

    #[inline]
    pub fn occupant(&self, pos: Position) -> Option<AgentId> {
        self.cells[self.offset(pos)]
    }

    #[inline]
    pub fn kind_at(&self, pos: Position) -> Option<AgentKind> {
        self.occupant(pos).map(|id| self.agent(id).kind)
    }

    #[must_use]
    pub fn empty(&self) -> &BTreeSet<Position> {
        &self.empty
    }

    pub fn count(&self, kind: AgentKind) -> usize {
        self.agents.iter().filter(|a| a.kind == kind).count()
    }

    /// Move `id` into the empty cell `to`.
    pub fn jump(&mut self, id: AgentId, to: Position) {
        let from = self.agent(id).pos;
        if from == to {
            return;
        }
        let (src, dst) = (self.offset(from), self.offset(to));
        assert_eq!(self.cells[src], Some(id), "agent {id:?} is not at {from:?}");
        assert!(self.cells[dst].is_none(), "jump target {to:?} is occupied");
        assert!(self.empty.remove(&to), "empty set lost track of {to:?}");
        self.cells[src] = None;
        self.cells[dst] = Some(id);
        self.empty.insert(from);
        self.agents[id.index()].pos = to;
    }

    /// Exchange the cells of two agents.
    pub fn swap(&mut self, a: AgentId, b: AgentId) {
        let (pa, pb) = (self.agent(a).pos, self.agent(b).pos);
        let (oa, ob) = (self.offset(pa), self.offset(pb));
        assert_eq!(self.cells[oa], Some(a), "agent {a:?} is not at {pa:?}");
        assert_eq!(self.cells[ob], Some(b), "agent {b:?} is not at {pb:?}");
        self.cells.swap(oa, ob);
        self.agents[a.index()].pos = pb;
        self.agents[b.index()].pos = pa;
    }

    /// Occupancy, agent positions and the empty set agree everywhere.
    pub fn is_consistent(&self) -> bool {
        let agents_ok = self
            .agents
            .iter()
            .enumerate()
            .all(|(i, a)| self.cells[self.offset(a.pos)] == Some(AgentId(i as u32)));
        let cells_ok = (0..self.width).all(|x| {
            (0..self.height).all(|y| {
                let pos = Position::new(x, y);
                self.occupant(pos).is_some() != self.empty.contains(&pos)
            })
        });
        agents_ok && cells_ok && self.agents.len() + self.empty.len() == self.cells.len()
    }
}

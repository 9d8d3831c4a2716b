//! The cell list.
//!
//! # Storage
//!
//! ```text
//!   heads[cell]    first resident of the cell, or EMPTY
//!   next[id]       next resident of the same cell, or EMPTY
//!   prev[id]       previous resident, or EMPTY when id is the head
//!   cell_of[id]    cell holding id, or EMPTY when id is not placed
//! ```
//!
//! Particle ids index every per-particle array directly.

use edmd_core::{CellId, ParticleId};

use crate::{Boundary, CellError, CellGeometry, CellResult, RowMajorOrdering};

/// Null link.
pub(crate) const EMPTY: usize = usize::MAX;

/// Outcome of a cell transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub from: CellId,
    pub to:   CellId,
    /// Particles that may have entered the moved particle's neighbourhood.
    /// Never contains the moved particle itself.
    pub new_neighbours: Vec<ParticleId>,
    /// `new_neighbours` is the whole new neighbourhood rather than just the
    /// cells that entered it.
    pub full: bool,
}

#[derive(Clone, Debug)]
pub struct CellList<const D: usize> {
    pub(crate) geometry: CellGeometry<D>,
    pub(crate) ordering: RowMajorOrdering<D>,
    pub(crate) shearing: bool,
    heads:   Vec<usize>,
    next:    Vec<usize>,
    prev:    Vec<usize>,
    cell_of: Vec<usize>,
}

impl<const D: usize> CellList<D> {
    /// An empty list over `geometry` with room for ids `0..entities`.
    pub fn new(geometry: CellGeometry<D>, shearing: bool, entities: usize) -> Self {
        let ordering = RowMajorOrdering::new(geometry.counts);
        let cells = ordering.len();
        Self {
            geometry,
            ordering,
            shearing,
            heads: vec![EMPTY; cells],
            next: vec![EMPTY; entities],
            prev: vec![EMPTY; entities],
            cell_of: vec![EMPTY; entities],
        }
    }

    pub fn geometry(&self) -> &CellGeometry<D> {
        &self.geometry
    }

    pub fn ordering(&self) -> &RowMajorOrdering<D> {
        &self.ordering
    }

    pub fn is_shearing(&self) -> bool {
        self.shearing
    }

    pub fn cell_count(&self) -> usize {
        self.heads.len()
    }

    /// Number of particle slots.
    pub fn capacity(&self) -> usize {
        self.cell_of.len()
    }

    /// Remove every particle, keeping the grid.
    pub fn clear(&mut self) {
        self.heads.fill(EMPTY);
        self.next.fill(EMPTY);
        self.prev.fill(EMPTY);
        self.cell_of.fill(EMPTY);
    }

    fn check(&self, id: ParticleId) -> CellResult<usize> {
        let i = id.index();
        if i >= self.cell_of.len() {
            return Err(CellError::UnknownParticle { id, size: self.cell_of.len() });
        }
        Ok(i)
    }

    #[inline]
    fn cell_id(index: usize) -> CellId {
        CellId(index as u32)
    }

    /// Cell containing `pos` after folding it into the primary image.
    pub fn locate(&self, pos: [f64; D], boundary: &impl Boundary<D>) -> CellId {
        let coord = self.geometry.coords_of(&boundary.wrap(pos));
        Self::cell_id(self.ordering.to_index(coord))
    }

    pub fn cell_of(&self, id: ParticleId) -> Option<CellId> {
        match self.cell_of.get(id.index()) {
            Some(&c) if c != EMPTY => Some(Self::cell_id(c)),
            _ => None,
        }
    }

    pub fn coord_of_cell(&self, cell: CellId) -> [usize; D] {
        self.ordering.to_coord(cell.index())
    }

    // ── Membership ────────────────────────────────────────────────────────

    /// Place `id` in the cell containing `pos`.  A particle that is already
    /// placed is moved.
    pub fn insert(
        &mut self,
        id: ParticleId,
        pos: [f64; D],
        boundary: &impl Boundary<D>,
    ) -> CellResult<CellId> {
        let i = self.check(id)?;
        let cell = self.locate(pos, boundary);
        if self.cell_of[i] != EMPTY {
            self.unlink(i);
        }
        self.link(i, cell.index());
        Ok(cell)
    }

    /// Take `id` out of its cell.
    pub fn remove(&mut self, id: ParticleId) -> CellResult<CellId> {
        let i = self.check(id)?;
        let cell = self.cell_of[i];
        if cell == EMPTY {
            debug_assert!(false, "{id} removed while not in any cell");
            return Err(CellError::NotMember { id, cell: CellId::INVALID });
        }
        self.unlink(i);
        Ok(Self::cell_id(cell))
    }

    /// Move `id` from `from` to `to`.  Fails without changing anything if
    /// `id` is not in `from`.
    pub fn move_between(&mut self, id: ParticleId, from: CellId, to: CellId) -> CellResult<()> {
        let i = self.check(id)?;
        if self.cell_of[i] != from.index() {
            debug_assert!(false, "{id} is not in {from}");
            return Err(CellError::NotMember { id, cell: from });
        }
        self.unlink(i);
        self.link(i, to.index());
        Ok(())
    }

    fn link(&mut self, i: usize, cell: usize) {
        let head = self.heads[cell];
        self.next[i] = head;
        self.prev[i] = EMPTY;
        if head != EMPTY {
            self.prev[head] = i;
        }
        self.heads[cell] = i;
        self.cell_of[i] = cell;
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.prev[i], self.next[i]);
        if prev != EMPTY {
            self.next[prev] = next;
        } else {
            self.heads[self.cell_of[i]] = next;
        }
        if next != EMPTY {
            self.prev[next] = prev;
        }
        self.next[i] = EMPTY;
        self.prev[i] = EMPTY;
        self.cell_of[i] = EMPTY;
    }

    /// Residents of one cell, most recently added first.
    pub fn members(&self, cell: CellId) -> impl Iterator<Item = ParticleId> + '_ {
        let mut e = self.heads.get(cell.index()).copied().unwrap_or(EMPTY);
        std::iter::from_fn(move || {
            if e == EMPTY {
                return None;
            }
            let id = ParticleId(e as u32);
            e = self.next[e];
            Some(id)
        })
    }

    // ── Neighbourhoods ────────────────────────────────────────────────────

    /// Every cell in the neighbourhood of `cell`, each once, in ascending
    /// index order.
    pub fn neighbour_cells(&self, cell: CellId) -> Vec<usize> {
        let coord = self.ordering.to_coord(cell.index());
        let steps = [self.geometry.overlink; D];
        let mut cells = self.ordering.surrounding_indices(coord, steps);
        if self.shearing {
            self.shear_strip(coord, &mut cells);
        }
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Call `visit` once for every other particle in the neighbourhood of
    /// `id`'s cell.  Does nothing if `id` is not placed.
    pub fn for_each_neighbour(&self, id: ParticleId, mut visit: impl FnMut(ParticleId)) {
        let Some(cell) = self.cell_of(id) else {
            return;
        };
        for c in self.neighbour_cells(cell) {
            for other in self.members(Self::cell_id(c)) {
                if other != id {
                    visit(other);
                }
            }
        }
    }

    pub fn neighbours(&self, id: ParticleId) -> Vec<ParticleId> {
        let mut out = Vec::new();
        self.for_each_neighbour(id, |p| out.push(p));
        out
    }

    fn residents_of(&self, cells: &[usize], skip: ParticleId) -> Vec<ParticleId> {
        cells
            .iter()
            .flat_map(|&c| self.members(Self::cell_id(c)))
            .filter(|&p| p != skip)
            .collect()
    }

    // ── Geometry queries ──────────────────────────────────────────────────

    /// Lower and upper corners of `id`'s cell, in the periodic image
    /// nearest to `pos`.
    pub fn cell_bounds(
        &self,
        id: ParticleId,
        pos: [f64; D],
        boundary: &impl Boundary<D>,
    ) -> CellResult<([f64; D], [f64; D])> {
        let i = self.check(id)?;
        let cell = self.cell_of[i];
        if cell == EMPTY {
            return Err(CellError::NotMember { id, cell: CellId::INVALID });
        }
        let coord = self.ordering.to_coord(cell);
        let size = self.geometry.size;
        let mut centre = self.geometry.centre(&coord);
        if self.shearing {
            self.shear_image(&mut centre, &pos, boundary);
        }
        for d in 0..D {
            if self.shearing && d == 1 {
                continue;
            }
            centre[d] += size[d] * ((pos[d] - centre[d]) / size[d]).round();
        }
        let half = self.geometry.width.map(|w| 0.5 * w);
        Ok((
            std::array::from_fn(|d| centre[d] - half[d]),
            std::array::from_fn(|d| centre[d] + half[d]),
        ))
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Move `id` across the face of its cell normal to `dim`, on the
    /// `positive` side.  `pos` is the particle's position at the crossing.
    ///
    /// The returned neighbours are the residents of the cells that entered
    /// the neighbourhood: a slab `overlink` cells ahead of the new cell.
    /// Near a sheared face the whole new neighbourhood is reported.
    pub fn transition(
        &mut self,
        id: ParticleId,
        dim: usize,
        positive: bool,
        pos: [f64; D],
        boundary: &impl Boundary<D>,
    ) -> CellResult<Transition> {
        let i = self.check(id)?;
        let from = self.cell_of[i];
        if from == EMPTY {
            debug_assert!(false, "{id} crossed a cell face while not in any cell");
            return Err(CellError::NotMember { id, cell: CellId::INVALID });
        }
        if dim >= D {
            return Err(CellError::Geometry(format!(
                "no dimension {dim} in a {D}-dimensional grid"
            )));
        }

        let old = self.ordering.to_coord(from);
        let dir: isize = if positive { 1 } else { -1 };
        let mut new = self.ordering.offset(old, dim, dir);

        let mut full = false;
        if self.shearing {
            if dim == 1 && self.wraps_gradient_face(&old, positive) {
                new[0] = self.shear_entry_column(pos, positive, boundary);
                full = true;
            } else {
                full = self.near_shear_face(&old) || self.near_shear_face(&new);
            }
        }

        let to = self.ordering.to_index(new);
        self.unlink(i);
        self.link(i, to);

        let new_neighbours = if full {
            self.neighbours(id)
        } else {
            let s = self.geometry.overlink;
            let centre = self.ordering.offset(new, dim, dir * s as isize);
            let mut steps = [s; D];
            steps[dim] = 0;
            let slab = self.ordering.surrounding_indices(centre, steps);
            self.residents_of(&slab, id)
        };

        Ok(Transition {
            from: Self::cell_id(from),
            to: Self::cell_id(to),
            new_neighbours,
            full,
        })
    }
}

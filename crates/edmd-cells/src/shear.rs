//! Lees-Edwards neighbour rules.
//!
//! Across the faces normal to y the image is displaced along x by an
//! offset that changes every instant, so the x columns facing a cell on
//! the other side are not fixed.  A cell within `overlink` rows of a y face
//! therefore takes every x column of the rows it reaches across the face.

use crate::list::CellList;
use crate::Boundary;

impl<const D: usize> CellList<D> {
    #[inline]
    pub(crate) fn near_shear_face(&self, coord: &[usize; D]) -> bool {
        let (y, ny) = (coord[1], self.geometry.counts[1]);
        let s = self.geometry.overlink;
        y < s || y + s >= ny
    }

    #[inline]
    pub(crate) fn wraps_gradient_face(&self, coord: &[usize; D], positive: bool) -> bool {
        let ny = self.geometry.counts[1];
        if positive { coord[1] + 1 == ny } else { coord[1] == 0 }
    }

    /// Append the cells reached across a y face by the neighbourhood of
    /// `coord`: whole rows in x, `overlink` cells either side in the
    /// remaining dimensions.
    pub(crate) fn shear_strip(&self, coord: [usize; D], out: &mut Vec<usize>) {
        let counts = self.geometry.counts;
        let (y, ny) = (coord[1], counts[1]);
        let s = self.geometry.overlink;

        let mut rows = Vec::new();
        if y < s {
            rows.extend((ny + y).saturating_sub(s)..ny);
        }
        if y + s >= ny {
            rows.extend(0..(y + s + 1 - ny).min(ny));
        }
        if rows.is_empty() {
            return;
        }

        let mut steps = [s; D];
        steps[0] = counts[0];
        steps[1] = 0;
        for row in rows {
            let mut centre = coord;
            centre[1] = row;
            out.extend(self.ordering.surrounding_indices(centre, steps));
        }
    }

    /// Shift a cell centre to the periodic image nearest `pos` in y,
    /// carrying the Lees-Edwards displacement along x.
    pub(crate) fn shear_image(
        &self,
        centre: &mut [f64; D],
        pos: &[f64; D],
        boundary: &impl Boundary<D>,
    ) {
        let ly = self.geometry.size[1];
        let images = ((pos[1] - centre[1]) / ly).round();
        if images == 0.0 {
            return;
        }
        let mut image = *centre;
        image[1] += images * ly;
        let folded = boundary.wrap(image);
        centre[0] += centre[0] - folded[0];
        centre[1] = image[1];
    }

    /// x column of the cell a particle enters when it leaves through a y
    /// face at `pos`.  The position is pushed half a cell past the face so
    /// that folding lands in the image on the far side.
    pub(crate) fn shear_entry_column(
        &self,
        mut pos: [f64; D],
        positive: bool,
        boundary: &impl Boundary<D>,
    ) -> usize {
        let half = 0.5 * self.geometry.width[1];
        pos[1] += if positive { half } else { -half };
        self.geometry.coords_of(&boundary.wrap(pos))[0]
    }
}

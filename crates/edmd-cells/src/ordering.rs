//! Linear cell indexing.

/// Row-major mapping between `D`-dimensional cell coordinates and linear
/// cell indices: the last dimension varies fastest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowMajorOrdering<const D: usize> {
    dims: [usize; D],
}

impl<const D: usize> RowMajorOrdering<D> {
    /// Every entry of `dims` must be at least 1.
    pub fn new(dims: [usize; D]) -> Self {
        debug_assert!(dims.iter().all(|&n| n > 0), "empty cell dimension in {dims:?}");
        Self { dims }
    }

    pub fn dims(&self) -> [usize; D] {
        self.dims
    }

    /// Total cell count.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn to_index(&self, coord: [usize; D]) -> usize {
        coord
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&c, &n)| acc * n + c % n)
    }

    #[inline]
    pub fn to_coord(&self, mut index: usize) -> [usize; D] {
        let mut coord = [0; D];
        for d in (0..D).rev() {
            coord[d] = index % self.dims[d];
            index /= self.dims[d];
        }
        coord
    }

    /// `coord` moved by `delta` cells along `dim`, wrapped periodically.
    #[inline]
    pub fn offset(&self, mut coord: [usize; D], dim: usize, delta: isize) -> [usize; D] {
        let n = self.dims[dim] as isize;
        coord[dim] = (coord[dim] as isize + delta).rem_euclid(n) as usize;
        coord
    }

    /// Indices of every cell within `steps[d]` cells of `centre` along each
    /// dimension `d`, wrapped periodically.  Each cell appears once, even
    /// when the window is wider than the grid.
    pub fn surrounding_indices(&self, centre: [usize; D], steps: [usize; D]) -> Vec<usize> {
        let mut start = [0usize; D];
        let mut width = [0usize; D];
        for d in 0..D {
            let n = self.dims[d];
            width[d] = (2 * steps[d] + 1).min(n);
            start[d] = if width[d] == n { 0 } else { (centre[d] + n - steps[d] % n) % n };
        }

        let mut out = Vec::with_capacity(width.iter().product());
        let mut step = [0usize; D];
        loop {
            let mut coord = [0usize; D];
            for d in 0..D {
                coord[d] = (start[d] + step[d]) % self.dims[d];
            }
            out.push(self.to_index(coord));

            // Odometer increment, last dimension fastest.
            let mut d = D;
            loop {
                if d == 0 {
                    return out;
                }
                d -= 1;
                step[d] += 1;
                if step[d] < width[d] {
                    break;
                }
                step[d] = 0;
            }
        }
    }
}

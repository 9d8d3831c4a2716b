//! Boundary conditions of the primary box.
//!
//! Positions in the primary image lie in `[-L/2, L/2)` in every dimension.

/// Maps any position to its primary image.
pub trait Boundary<const D: usize> {
    /// Edge lengths of the primary box.
    fn size(&self) -> [f64; D];

    fn wrap(&self, pos: [f64; D]) -> [f64; D];
}

/// Fold `x` into `[-l/2, l/2)`.
#[inline]
pub fn wrap_periodic(x: f64, l: f64) -> f64 {
    x - l * ((x + 0.5 * l) / l).floor()
}

// ── PeriodicBox ───────────────────────────────────────────────────────────────

/// Fully periodic box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeriodicBox<const D: usize> {
    pub size: [f64; D],
}

impl<const D: usize> Boundary<D> for PeriodicBox<D> {
    fn size(&self) -> [f64; D] {
        self.size
    }

    fn wrap(&self, mut pos: [f64; D]) -> [f64; D] {
        for (x, &l) in pos.iter_mut().zip(&self.size) {
            *x = wrap_periodic(*x, l);
        }
        pos
    }
}

// ── LeesEdwards ───────────────────────────────────────────────────────────────

/// Sliding-brick boundary: the periodic image above the primary box (in
/// dimension 1) is displaced by `offset` along dimension 0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LeesEdwards<const D: usize> {
    pub size:   [f64; D],
    pub offset: f64,
}

impl<const D: usize> LeesEdwards<D> {
    /// Advance the image offset for a shear rate `rate` over `dt`.
    pub fn stream(&mut self, rate: f64, dt: f64) {
        if D >= 2 {
            self.offset = wrap_periodic(self.offset + rate * self.size[1] * dt, self.size[0]);
        }
    }
}

impl<const D: usize> Boundary<D> for LeesEdwards<D> {
    fn size(&self) -> [f64; D] {
        self.size
    }

    fn wrap(&self, mut pos: [f64; D]) -> [f64; D] {
        if D >= 2 {
            let images = ((pos[1] + 0.5 * self.size[1]) / self.size[1]).floor();
            pos[1] -= images * self.size[1];
            pos[0] -= images * self.offset;
        }
        for (x, &l) in pos.iter_mut().zip(&self.size) {
            *x = wrap_periodic(*x, l);
        }
        pos
    }
}

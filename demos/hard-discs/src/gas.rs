//! Ballistic discs in a periodic box, optionally under Lees-Edwards shear.
//!
//! Particles are advanced lazily: `pos[i]` is the position at `last[i]`,
//! and everything else is extrapolated along `vel[i]`.  Positions are only
//! folded back into the primary image when a disc changes cell, so pair
//! separations always go through [`Gas::separation`].

use anyhow::{Result, ensure};
use edmd_cells::{Boundary, LeesEdwards, wrap_periodic};
use edmd_core::{ParticleId, SimRng};
use edmd_sched::{BoxExit, World};

#[derive(Clone, Debug)]
pub struct Gas {
    boundary:   LeesEdwards<2>,
    shear_rate: f64,
    time:       f64,
    pos:        Vec<[f64; 2]>,
    vel:        Vec<[f64; 2]>,
    last:       Vec<f64>,
}

impl Gas {
    /// `n` discs of diameter `diameter` on a square lattice at number
    /// density `density`, with unit temperature and no net momentum.
    pub fn lattice(
        n:          usize,
        density:    f64,
        diameter:   f64,
        shear_rate: f64,
        seed:       u64,
    ) -> Result<Self> {
        ensure!(n > 0, "need at least one disc");
        ensure!(density > 0.0, "density must be positive, got {density}");
        let l = (n as f64 / density).sqrt();
        let side = (n as f64).sqrt().ceil() as usize;
        let spacing = l / side as f64;
        ensure!(
            spacing > diameter,
            "density {density} is too high for a square lattice of discs (spacing {spacing})"
        );

        let pos = (0..n)
            .map(|i| {
                [
                    ((i % side) as f64 + 0.5) * spacing - 0.5 * l,
                    ((i / side) as f64 + 0.5) * spacing - 0.5 * l,
                ]
            })
            .collect();

        let mut rng = SimRng::new(seed);
        let mut vel: Vec<[f64; 2]> = (0..n).map(|_| [rng.normal(), rng.normal()]).collect();
        let mean = vel.iter().fold([0.0; 2], |m, v| [m[0] + v[0], m[1] + v[1]]);
        let mean = mean.map(|m| m / n as f64);
        for v in &mut vel {
            v[0] -= mean[0];
            v[1] -= mean[1];
        }
        let kt = vel.iter().map(|v| v[0] * v[0] + v[1] * v[1]).sum::<f64>() / (2 * n) as f64;
        if kt > 0.0 {
            let scale = kt.sqrt().recip();
            for v in &mut vel {
                v[0] *= scale;
                v[1] *= scale;
            }
        }

        Ok(Self {
            boundary: LeesEdwards { size: [l, l], offset: 0.0 },
            shear_rate,
            time: 0.0,
            pos,
            vel,
            last: vec![0.0; n],
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Bring `id`'s stored position up to the current time.
    pub fn sync(&mut self, id: ParticleId) {
        let i = id.index();
        let dt = self.time - self.last[i];
        self.pos[i][0] += self.vel[i][0] * dt;
        self.pos[i][1] += self.vel[i][1] * dt;
        self.last[i] = self.time;
    }

    pub fn velocity(&self, id: ParticleId) -> [f64; 2] {
        self.vel[id.index()]
    }

    pub fn kick(&mut self, id: ParticleId, dv: [f64; 2]) {
        let v = &mut self.vel[id.index()];
        v[0] += dv[0];
        v[1] += dv[1];
    }

    /// Nearest-image separation `a - b` and the matching relative velocity.
    /// Crossing the sheared faces shifts both by the image offset.
    pub fn separation(&self, a: ParticleId, b: ParticleId) -> ([f64; 2], [f64; 2]) {
        let (pa, pb) = (self.position(a), self.position(b));
        let (va, vb) = (self.vel[a.index()], self.vel[b.index()]);
        let [lx, ly] = self.boundary.size;
        let mut r = [pa[0] - pb[0], pa[1] - pb[1]];
        let mut v = [va[0] - vb[0], va[1] - vb[1]];
        let images = (r[1] / ly).round();
        r[1] -= images * ly;
        r[0] -= images * self.boundary.offset;
        v[0] -= images * self.shear_rate * ly;
        r[0] = wrap_periodic(r[0], lx);
        (r, v)
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.vel.iter().map(|v| 0.5 * (v[0] * v[0] + v[1] * v[1])).sum()
    }
}

impl Boundary<2> for Gas {
    fn size(&self) -> [f64; 2] {
        self.boundary.size
    }

    fn wrap(&self, pos: [f64; 2]) -> [f64; 2] {
        self.boundary.wrap(pos)
    }
}

impl World<2> for Gas {
    fn entity_count(&self) -> usize {
        self.pos.len()
    }

    fn position(&self, id: ParticleId) -> [f64; 2] {
        let i = id.index();
        let dt = self.time - self.last[i];
        [self.pos[i][0] + self.vel[i][0] * dt, self.pos[i][1] + self.vel[i][1] * dt]
    }

    fn stream(&mut self, dt: f64) {
        self.time += dt;
        self.boundary.stream(self.shear_rate, dt);
    }

    fn box_exit(&self, id: ParticleId, lower: &[f64; 2], upper: &[f64; 2]) -> Option<BoxExit> {
        let p = self.position(id);
        let v = self.vel[id.index()];
        let mut best: Option<BoxExit> = None;
        for dim in 0..2 {
            let (dt, positive) = if v[dim] > 0.0 {
                ((upper[dim] - p[dim]) / v[dim], true)
            } else if v[dim] < 0.0 {
                ((lower[dim] - p[dim]) / v[dim], false)
            } else {
                continue;
            };
            if best.is_none_or(|b| dt < b.dt) {
                best = Some(BoxExit { dt, dim, positive });
            }
        }
        best
    }

    fn cell_changed(&mut self, id: ParticleId) {
        self.sync(id);
        let i = id.index();
        let ly = self.boundary.size[1];
        let images = ((self.pos[i][1] + 0.5 * ly) / ly).floor();
        self.pos[i] = self.boundary.wrap(self.pos[i]);
        self.vel[i][0] -= images * self.shear_rate * ly;
    }

    fn rescale_times(&mut self, factor: f64) {
        for i in 0..self.pos.len() {
            self.sync(ParticleId(i as u32));
            self.vel[i] = self.vel[i].map(|v| v / factor);
        }
        self.shear_rate /= factor;
    }
}

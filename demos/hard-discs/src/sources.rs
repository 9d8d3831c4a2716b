//! Event sources for the hard-disc demo.

use edmd_core::{ParticleId, SourceId};
use edmd_event::{Event, EventKind};
use edmd_sched::{EventSource, SourceError, SourceResult, World};
use tracing::info;

use crate::gas::Gas;

fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

// ── HardDiscs ─────────────────────────────────────────────────────────────────

/// Elastic collisions between equal-mass discs.
pub struct HardDiscs {
    diameter: f64,
}

impl HardDiscs {
    pub fn new(diameter: f64) -> Self {
        Self { diameter }
    }
}

impl EventSource<Gas> for HardDiscs {
    fn name(&self) -> &str {
        "hard-discs"
    }

    fn predict_pair(&self, world: &Gas, id: ParticleId, other: ParticleId) -> SourceResult<Event> {
        let (r, v) = world.separation(id, other);
        let b = dot(r, v);
        if b >= 0.0 {
            return Ok(Event::never(id));
        }
        let (r2, v2) = (dot(r, r), dot(v, v));
        let gap = r2 - self.diameter * self.diameter;
        let disc = b * b - v2 * gap;
        if disc < 0.0 {
            return Ok(Event::never(id));
        }
        // Root of |r + v t| = diameter, in the form that stays accurate at contact.
        let dt = gap / (disc.sqrt() - b);
        Ok(Event::interaction(dt, id, other, SourceId::INVALID))
    }

    fn dispatch(&mut self, world: &mut Gas, event: &Event) -> SourceResult<Vec<ParticleId>> {
        let Some(other) = event.secondary else {
            return Err(SourceError::Dispatch {
                event:  *event,
                reason: "collision without a partner".into(),
            });
        };
        world.sync(event.primary);
        world.sync(other);
        let (r, v) = world.separation(event.primary, other);
        let k = dot(r, v) / dot(r, r);
        world.kick(event.primary, [-k * r[0], -k * r[1]]);
        world.kick(other, [k * r[0], k * r[1]]);
        Ok(Vec::new())
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// System event that logs the state of the gas at fixed time intervals.
pub struct Report {
    interval: f64,
    reports:  u64,
}

impl Report {
    pub fn new(interval: f64) -> Self {
        Self { interval, reports: 0 }
    }
}

impl EventSource<Gas> for Report {
    fn name(&self) -> &str {
        "report"
    }

    fn predict_system(&self, world: &Gas) -> SourceResult<Event> {
        if !(self.interval > 0.0) {
            return Ok(Event::never(ParticleId::INVALID));
        }
        let next = (self.reports + 1) as f64 * self.interval;
        let owner = ParticleId::INVALID;
        Ok(Event::single(EventKind::System, next - world.time(), owner, SourceId::INVALID))
    }

    fn dispatch(&mut self, world: &mut Gas, _event: &Event) -> SourceResult<Vec<ParticleId>> {
        self.reports += 1;
        let n = world.entity_count();
        let kt = world.kinetic_energy() / n as f64;
        let p = (0..n)
            .map(|i| world.velocity(ParticleId(i as u32)))
            .fold([0.0; 2], |p, v| [p[0] + v[0], p[1] + v[1]]);
        info!(time = world.time(), kt, px = p[0], py = p[1], "report");
        Ok(Vec::new())
    }

    fn reinitialise(&mut self, world: &Gas) {
        if self.interval > 0.0 {
            self.reports = (world.time() / self.interval).floor().max(0.0) as u64;
        }
    }
}

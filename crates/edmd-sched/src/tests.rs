//! Unit tests for edmd-sched.

use std::sync::atomic::{AtomicUsize, Ordering};

use edmd_cells::{Boundary, PeriodicBox};
use edmd_core::{
    CellConfig, FelStrategy, NeighbourPolicy, ParticleId, PelStrategy, SchedulerConfig, SimRng,
    SourceId,
};
use edmd_event::{Event, EventKind};

use crate::{
    BoxExit, EntityState, EventSource, NoopObserver, RunOutcome, SchedError, Scheduler,
    SchedulerBuilder, SchedulerObserver, SourceError, SourceResult, Step, World,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

const TOL: f64 = 1e-9;

/// Particles pinned to lattice sites.  Only the clock moves.
#[derive(Clone, Debug)]
struct Sites {
    size:  [f64; 2],
    sites: Vec<[f64; 2]>,
    time:  f64,
    tag:   u32,
}

impl Sites {
    fn square(side: usize, tag: u32) -> Self {
        let l = side as f64;
        let sites = (0..side * side)
            .map(|i| [(i % side) as f64 + 0.5 - 0.5 * l, (i / side) as f64 + 0.5 - 0.5 * l])
            .collect();
        Self { size: [l, l], sites, time: 0.0, tag }
    }
}

impl Boundary<2> for Sites {
    fn size(&self) -> [f64; 2] {
        self.size
    }

    fn wrap(&self, pos: [f64; 2]) -> [f64; 2] {
        PeriodicBox { size: self.size }.wrap(pos)
    }
}

impl World<2> for Sites {
    fn entity_count(&self) -> usize {
        self.sites.len()
    }

    fn position(&self, id: ParticleId) -> [f64; 2] {
        self.sites[id.index()]
    }

    fn stream(&mut self, dt: f64) {
        self.time += dt;
    }

    fn box_exit(&self, _id: ParticleId, _lower: &[f64; 2], _upper: &[f64; 2]) -> Option<BoxExit> {
        None
    }
}

/// One local event per particle at a fixed absolute time.
struct Scripted {
    at:    Vec<f64>,
    fired: Vec<bool>,
}

impl Scripted {
    fn new(at: Vec<f64>) -> Self {
        let fired = vec![false; at.len()];
        Self { at, fired }
    }

    fn exponential(n: usize, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        Self::new((0..n).map(|_| rng.exponential(1.0)).collect())
    }
}

impl EventSource<Sites> for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(&self, world: &Sites, id: ParticleId) -> SourceResult<Event> {
        let i = id.index();
        if self.fired[i] || self.at[i].is_infinite() {
            return Ok(Event::never(id));
        }
        Ok(Event::single(EventKind::Local, self.at[i] - world.time, id, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, event: &Event) -> SourceResult<Vec<ParticleId>> {
        self.fired[event.primary.index()] = true;
        Ok(Vec::new())
    }
}

/// Fires every `period` for every particle, with a per-particle phase.
struct Ticker {
    period: f64,
    phase:  f64,
    ticks:  Vec<u64>,
}

impl Ticker {
    fn new(period: f64, phase: f64, n: usize) -> Self {
        Self { period, phase, ticks: vec![0; n] }
    }
}

impl EventSource<Sites> for Ticker {
    fn name(&self) -> &str {
        "ticker"
    }

    fn predict(&self, world: &Sites, id: ParticleId) -> SourceResult<Event> {
        let next = (self.ticks[id.index()] + 1) as f64 * self.period
            + self.phase
            + 0.0317 * id.0 as f64;
        Ok(Event::single(EventKind::Local, next - world.time, id, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, event: &Event) -> SourceResult<Vec<ParticleId>> {
        self.ticks[event.primary.index()] += 1;
        Ok(Vec::new())
    }
}

/// A system event every `period`.  Each one touches particle 0.
struct Clock {
    period: f64,
    ticks:  u64,
}

impl EventSource<Sites> for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn predict_system(&self, world: &Sites) -> SourceResult<Event> {
        let next = (self.ticks + 1) as f64 * self.period;
        let owner = ParticleId::INVALID;
        Ok(Event::single(EventKind::System, next - world.time, owner, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, _event: &Event) -> SourceResult<Vec<ParticleId>> {
        self.ticks += 1;
        Ok(vec![ParticleId(0)])
    }
}

/// Particle 0 first claims an event at t = 1, then changes its mind to t = 5.
/// Particle 1 has an event at t = 2.
struct Fickle {
    calls: AtomicUsize,
    fired: Vec<bool>,
}

impl Fickle {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0), fired: vec![false; 2] }
    }
}

impl EventSource<Sites> for Fickle {
    fn name(&self) -> &str {
        "fickle"
    }

    fn predict(&self, world: &Sites, id: ParticleId) -> SourceResult<Event> {
        if self.fired[id.index()] {
            return Ok(Event::never(id));
        }
        let at = match id.0 {
            0 if self.calls.fetch_add(1, Ordering::Relaxed) == 0 => 1.0,
            0 => 5.0,
            _ => 2.0,
        };
        Ok(Event::single(EventKind::Local, at - world.time, id, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, event: &Event) -> SourceResult<Vec<ParticleId>> {
        self.fired[event.primary.index()] = true;
        Ok(Vec::new())
    }
}

/// Cannot say anything about particle 0.
struct Broken;

impl EventSource<Sites> for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict(&self, _world: &Sites, id: ParticleId) -> SourceResult<Event> {
        if id.0 == 0 {
            return Err(SourceError::Prediction { id, reason: "no state".into() });
        }
        Ok(Event::single(EventKind::Local, 1.0 + id.0 as f64, id, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, _event: &Event) -> SourceResult<Vec<ParticleId>> {
        Ok(Vec::new())
    }
}

/// Particle 0 is tethered to each of its neighbours; tether `j` snaps at
/// `t = 2 + j`.  Only particle 0 predicts snaps.  Particles 1 and 2 are
/// released at `t = 0.5` and `t = 0.6`, which retires their tethers.
struct Tethers {
    done: Vec<bool>,
}

impl Tethers {
    fn new(n: usize) -> Self {
        Self { done: vec![false; n] }
    }
}

impl EventSource<Sites> for Tethers {
    fn name(&self) -> &str {
        "tethers"
    }

    fn predict(&self, world: &Sites, id: ParticleId) -> SourceResult<Event> {
        if !matches!(id.0, 1 | 2) || self.done[id.index()] {
            return Ok(Event::never(id));
        }
        let at = 0.4 + 0.1 * id.0 as f64;
        Ok(Event::single(EventKind::Local, at - world.time, id, SourceId::INVALID))
    }

    fn predict_pair(
        &self,
        world: &Sites,
        id: ParticleId,
        other: ParticleId,
    ) -> SourceResult<Event> {
        if id.0 != 0 || self.done[other.index()] {
            return Ok(Event::never(id));
        }
        let at = 2.0 + other.0 as f64;
        Ok(Event::interaction(at - world.time, id, other, SourceId::INVALID))
    }

    fn dispatch(&mut self, _world: &mut Sites, event: &Event) -> SourceResult<Vec<ParticleId>> {
        let retired = event.secondary.unwrap_or(event.primary);
        self.done[retired.index()] = true;
        Ok(Vec::new())
    }
}

/// Records every dispatched event with its absolute time.
#[derive(Default)]
struct Recorder {
    events:       Vec<(Event, f64)>,
    recalculated: Vec<ParticleId>,
    rejected:     Vec<Event>,
}

impl SchedulerObserver for Recorder {
    fn on_event(&mut self, event: &Event, system_time: f64) {
        self.events.push((*event, system_time));
    }

    fn on_recalculate(&mut self, id: ParticleId) {
        self.recalculated.push(id);
    }

    fn on_rejection(&mut self, event: &Event) {
        self.rejected.push(*event);
    }
}

fn config(fel: FelStrategy, pel: PelStrategy) -> SchedulerConfig {
    SchedulerConfig { fel, pel, ..SchedulerConfig::default() }
}

fn strategies() -> Vec<SchedulerConfig> {
    let mut out = Vec::new();
    for fel in [FelStrategy::Tree, FelStrategy::Calendar] {
        for pel in [PelStrategy::MinMax2, PelStrategy::MinMax4, PelStrategy::Heap] {
            out.push(config(fel, pel));
        }
    }
    out
}

fn scripted(config: SchedulerConfig, side: usize, source: Scripted) -> Scheduler<2, Sites> {
    SchedulerBuilder::new(config, Sites::square(side, 0))
        .source(source)
        .build()
        .expect("scheduler builds")
}

// ── Hard discs ────────────────────────────────────────────────────────────────

/// Ballistic discs in a periodic box, advanced lazily.
#[derive(Clone, Debug)]
struct Gas {
    size: [f64; 2],
    time: f64,
    pos:  Vec<[f64; 2]>,
    vel:  Vec<[f64; 2]>,
    last: Vec<f64>,
}

impl Gas {
    fn lattice(side: usize, spacing: f64, seed: u64) -> Self {
        let l = side as f64 * spacing;
        let mut rng = SimRng::new(seed);
        let n = side * side;
        let pos = (0..n)
            .map(|i| {
                [
                    ((i % side) as f64 + 0.5) * spacing - 0.5 * l,
                    ((i / side) as f64 + 0.5) * spacing - 0.5 * l,
                ]
            })
            .collect();
        let vel = (0..n).map(|_| [rng.normal(), rng.normal()]).collect();
        Self { size: [l, l], time: 0.0, pos, vel, last: vec![0.0; n] }
    }

    fn sync(&mut self, id: ParticleId) {
        let i = id.index();
        let dt = self.time - self.last[i];
        for d in 0..2 {
            self.pos[i][d] += self.vel[i][d] * dt;
        }
        self.last[i] = self.time;
    }

    /// Minimum-image separation and relative velocity of `a` from `b`.
    fn separation(&self, a: ParticleId, b: ParticleId) -> ([f64; 2], [f64; 2]) {
        let (pa, pb) = (self.position(a), self.position(b));
        let r = self.wrap([pa[0] - pb[0], pa[1] - pb[1]]);
        let (va, vb) = (self.vel[a.index()], self.vel[b.index()]);
        (r, [va[0] - vb[0], va[1] - vb[1]])
    }

    fn kinetic(&self) -> f64 {
        self.vel.iter().map(|v| 0.5 * dot(*v, *v)).sum()
    }

    fn closest_approach(&self) -> f64 {
        let n = self.pos.len();
        let mut best = f64::INFINITY;
        for a in 0..n {
            for b in a + 1..n {
                let (r, _) = self.separation(ParticleId(a as u32), ParticleId(b as u32));
                best = best.min(dot(r, r).sqrt());
            }
        }
        best
    }
}

fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

impl Boundary<2> for Gas {
    fn size(&self) -> [f64; 2] {
        self.size
    }

    fn wrap(&self, pos: [f64; 2]) -> [f64; 2] {
        PeriodicBox { size: self.size }.wrap(pos)
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
        self.pos[i] = self.wrap(self.pos[i]);
    }

    fn rescale_times(&mut self, factor: f64) {
        for i in 0..self.pos.len() {
            self.sync(ParticleId(i as u32));
            self.vel[i] = self.vel[i].map(|v| v / factor);
        }
    }
}

struct HardDiscs {
    diameter: f64,
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
        let dt = gap / (-b + disc.sqrt());
        Ok(Event::interaction(dt, id, other, SourceId::INVALID))
    }

    fn dispatch(&mut self, world: &mut Gas, event: &Event) -> SourceResult<Vec<ParticleId>> {
        let Some(other) = event.secondary else {
            return Err(SourceError::Dispatch { event: *event, reason: "no partner".into() });
        };
        world.sync(event.primary);
        world.sync(other);
        let (r, v) = world.separation(event.primary, other);
        let k = dot(r, v) / dot(r, r);
        let (a, b) = (event.primary.index(), other.index());
        for d in 0..2 {
            world.vel[a][d] -= k * r[d];
            world.vel[b][d] += k * r[d];
        }
        Ok(Vec::new())
    }
}

fn gas(config: SchedulerConfig, seed: u64) -> Scheduler<2, Gas> {
    SchedulerBuilder::new(config, Gas::lattice(8, 2.0, seed))
        .source(HardDiscs { diameter: 1.0 })
        .build()
        .expect("gas scheduler builds")
}

// ── Construction ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod construction {
    use super::*;

    #[test]
    fn every_entity_valid_after_build() {
        let sched = scripted(SchedulerConfig::default(), 5, Scripted::exponential(25, 1));
        for i in 0..25 {
            assert_eq!(sched.state(ParticleId(i)), Some(EntityState::Valid));
        }
        assert_eq!(sched.state(ParticleId(25)), None);
        assert_eq!(sched.system_id(), ParticleId(25));
        assert_eq!(sched.system_time(), 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SchedulerConfig::default();
        config.cells.overlink = 0;
        let err = SchedulerBuilder::new(config, Sites::square(4, 0)).build().err();
        assert!(matches!(err, Some(SchedError::Core(_))));
    }

    #[test]
    fn range_beyond_box_is_rejected() {
        let mut config = SchedulerConfig::default();
        config.cells.interaction_range = 100.0;
        let err = SchedulerBuilder::new(config, Sites::square(4, 0)).build().err();
        assert!(matches!(err, Some(SchedError::Cells(_))));
    }

    #[test]
    fn nan_prediction_is_fatal() {
        let mut at = vec![1.0; 9];
        at[4] = f64::NAN;
        let err = SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(3, 0))
            .source(Scripted::new(at))
            .build()
            .err();
        match err {
            Some(SchedError::NotANumber { event, .. }) => assert_eq!(event.primary, ParticleId(4)),
            other => panic!("expected NotANumber, got {other:?}"),
        }
    }

    #[test]
    fn failed_prediction_means_never() {
        let mut sched = SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(3, 0))
            .source(Broken)
            .build()
            .expect("build");
        assert_eq!(sched.stats().prediction_failures, 1);
        let top = sched.peek().expect("particle 1 has an event");
        assert_eq!(top.primary, ParticleId(1));
    }
}

// ── Dispatch order ────────────────────────────────────────────────────────────

#[cfg(test)]
mod ordering {
    use super::*;

    #[test]
    fn exponential_times_dispatch_in_sorted_order() {
        let n = 100;
        let times = Scripted::exponential(n, 2024).at;
        let mut expected: Vec<(f64, u32)> =
            times.iter().enumerate().map(|(i, &t)| (t, i as u32)).collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for config in strategies() {
            let label = format!("{:?}/{:?}", config.fel, config.pel);
            let mut sched = scripted(config, 10, Scripted::new(times.clone()));
            let mut rec = Recorder::default();
            let outcome = sched.run(n as u64, &mut rec).expect("run");
            assert_eq!(outcome, RunOutcome::Completed);
            assert_eq!(rec.events.len(), n, "{label}");
            for ((event, t), (want_t, want_id)) in rec.events.iter().zip(&expected) {
                assert_eq!(event.primary, ParticleId(*want_id), "{label}");
                assert!((t - want_t).abs() < TOL, "{label}: {t} vs {want_t}");
            }
            assert_eq!(sched.stats().local_events, n as u64);
        }
    }

    #[test]
    fn simultaneous_events_break_ties_by_id() {
        let times = vec![0.5; 16];
        let mut sched = scripted(SchedulerConfig::default(), 4, Scripted::new(times));
        let mut rec = Recorder::default();
        sched.run(16, &mut rec).expect("run");
        let ids: Vec<u32> = rec.events.iter().map(|(e, _)| e.primary.0).collect();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn running_dry_is_reported() {
        let mut sched = scripted(SchedulerConfig::default(), 3, Scripted::new(vec![1.0; 9]));
        let err = sched.run(10, &mut NoopObserver).err();
        assert!(matches!(err, Some(SchedError::OutOfEvents { events: 9, .. })));
    }

    fn tickers(config: SchedulerConfig) -> Scheduler<2, Sites> {
        let n = 9;
        SchedulerBuilder::new(config, Sites::square(3, 0))
            .source(Ticker::new(1.0, 0.0, n))
            .source(Ticker::new(1.37, 0.123, n))
            .source(Ticker::new(1.71, 0.457, n))
            .build()
            .expect("build")
    }

    #[test]
    fn bounded_pels_agree_with_unbounded_on_crowded_lists() {
        let mut reference = tickers(config(FelStrategy::Tree, PelStrategy::Heap));
        let mut want = Recorder::default();
        reference.run(300, &mut want).expect("reference run");
        assert_eq!(reference.stats().recalculations, 0);

        for fel in [FelStrategy::Tree, FelStrategy::Calendar] {
            let mut bounded = tickers(config(fel, PelStrategy::MinMax2));
            let mut got = Recorder::default();
            bounded.run(300, &mut got).expect("bounded run");
            for ((a, ta), (b, tb)) in got.events.iter().zip(&want.events) {
                assert_eq!((a.primary, a.source), (b.primary, b.source), "{fel:?}");
                assert!((ta - tb).abs() < TOL, "{fel:?}: {ta} vs {tb}");
            }
        }
    }

    /// Step until the queue runs dry.  Returns the dispatched
    /// `(primary, secondary, time)` triples and the clock at each
    /// recalculation, before and after.
    fn drain(
        sched: &mut Scheduler<2, Sites>,
    ) -> (Vec<(ParticleId, Option<ParticleId>, f64)>, Vec<(f64, f64)>) {
        let mut dispatched = Vec::new();
        let mut recalcs = Vec::new();
        loop {
            let before = sched.system_time();
            match sched.step(&mut NoopObserver) {
                Ok(Step::Dispatched(e)) => dispatched.push((e.primary, e.secondary, before + e.dt)),
                Ok(Step::Recalculated(id)) => {
                    assert_eq!(id, ParticleId(0));
                    recalcs.push((before, sched.system_time()));
                }
                Ok(Step::Rejected(e)) => panic!("unexpected rejection of {e}"),
                Err(SchedError::OutOfEvents { .. }) => return (dispatched, recalcs),
                Err(err) => panic!("step failed: {err}"),
            }
        }
    }

    fn tethered(config: SchedulerConfig) -> Scheduler<2, Sites> {
        SchedulerBuilder::new(config, Sites::square(3, 0))
            .source(Tethers::new(9))
            .build()
            .expect("build")
    }

    #[test]
    fn evicted_prediction_surfaces_as_recalculation() {
        let mut reference = tethered(config(FelStrategy::Tree, PelStrategy::Heap));
        let (want, recalcs) = drain(&mut reference);
        assert!(recalcs.is_empty());
        assert_eq!(reference.stats().recalculations, 0);
        assert!(reference.fel_stats().stale_discards >= 2);

        // Two releases, then the six tethers that were never released.
        let expected: Vec<u32> = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let order: Vec<u32> = want.iter().map(|(p, s, _)| s.unwrap_or(*p).0).collect();
        assert_eq!(order, expected);

        for fel in [FelStrategy::Tree, FelStrategy::Calendar] {
            let mut bounded = tethered(config(fel, PelStrategy::MinMax2));
            let (got, recalcs) = drain(&mut bounded);

            // Both kept snaps went stale, so the marker for the evicted
            // ones is all that is left in particle 0's list.
            assert_eq!(recalcs.len(), 1, "{fel:?}");
            assert_eq!(bounded.stats().recalculations, 1, "{fel:?}");
            let (before, after) = recalcs[0];
            assert_eq!(before, after, "{fel:?}: recalculation moved the clock");
            assert!((after - 0.6).abs() < TOL, "{fel:?}: recalculated at {after}");

            assert_eq!(got.len(), want.len(), "{fel:?}");
            for ((pa, sa, ta), (pb, sb, tb)) in got.iter().zip(&want) {
                assert_eq!((pa, sa), (pb, sb), "{fel:?}");
                assert!((ta - tb).abs() < TOL, "{fel:?}: {ta} vs {tb}");
            }
        }
    }

    #[test]
    fn system_events_belong_to_the_pseudo_entity() {
        let n = 16;
        let mut sched = SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(4, 0))
            .source(Ticker::new(1.0, 0.05, n))
            .source(Clock { period: 0.25, ticks: 0 })
            .build()
            .expect("build");
        let mut rec = Recorder::default();
        sched.run(200, &mut rec).expect("run");

        let system: Vec<&(Event, f64)> =
            rec.events.iter().filter(|(e, _)| e.kind == EventKind::System).collect();
        assert_eq!(system.len() as u64, sched.stats().system_events);
        assert!(system.iter().all(|(e, _)| e.primary == sched.system_id()));
        for (k, (_, t)) in system.iter().enumerate() {
            assert!((t - 0.25 * (k + 1) as f64).abs() < TOL);
        }
        let expected = (sched.system_time() / 0.25 + TOL).floor() as u64;
        assert_eq!(sched.stats().system_events, expected);
    }
}

// ── Revalidation and anomalies ────────────────────────────────────────────────

#[cfg(test)]
mod revalidation {
    use tracing_test::traced_test;

    use super::*;

    fn fickle(config: SchedulerConfig) -> Scheduler<2, Sites> {
        let mut world = Sites::square(3, 0);
        world.sites.truncate(2);
        SchedulerBuilder::new(config, world).source(Fickle::new()).build().expect("build")
    }

    #[test]
    fn changed_prediction_is_rejected() {
        let mut sched = fickle(SchedulerConfig::default());
        let mut rec = Recorder::default();

        let step = sched.step(&mut rec).expect("step");
        assert!(matches!(step, Step::Rejected(e) if e.primary == ParticleId(0)));
        assert_eq!(sched.system_time(), 0.0);

        sched.run(2, &mut rec).expect("run");
        let order: Vec<(u32, f64)> = rec.events.iter().map(|(e, t)| (e.primary.0, *t)).collect();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].0, 1);
        assert!((order[0].1 - 2.0).abs() < TOL);
        assert_eq!(order[1].0, 0);
        assert!((order[1].1 - 5.0).abs() < TOL);
        assert_eq!(sched.stats().rejections, 1);
        assert_eq!(rec.rejected.len(), 1);
    }

    #[test]
    #[traced_test]
    fn rejection_limit_forces_dispatch() {
        let config = SchedulerConfig { rejection_limit: 0, ..SchedulerConfig::default() };
        let mut sched = fickle(config);
        let step = sched.step(&mut NoopObserver).expect("step");
        assert!(matches!(step, Step::Dispatched(e) if e.primary == ParticleId(0)));
        assert!((sched.system_time() - 5.0).abs() < TOL);
        assert!(logs_contain("rejection limit reached"));
    }

    #[test]
    #[traced_test]
    fn past_event_is_an_anomaly() {
        let mut sched = scripted(SchedulerConfig::default(), 2, Scripted::new(vec![
            -1.0,
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        ]));
        let step = sched.step(&mut NoopObserver).expect("non-strict runs on");
        assert!(matches!(step, Step::Dispatched(_)));
        assert_eq!(sched.stats().anomalies, 1);
        assert_eq!(sched.system_time(), 0.0);
        assert!(logs_contain("event scheduled in the past"));
    }

    #[test]
    fn past_event_is_fatal_when_strict() {
        let config = SchedulerConfig { strict: true, ..SchedulerConfig::default() };
        let mut sched = scripted(config, 2, Scripted::new(vec![-1.0, 3.0, 3.0, 3.0]));
        let err = sched.step(&mut NoopObserver).err();
        assert!(matches!(err, Some(SchedError::Causality { .. })));
    }

    #[test]
    fn rounding_noise_is_clamped() {
        let mut sched = scripted(SchedulerConfig::default(), 2, Scripted::new(vec![
            -1e-12, 3.0, 3.0, 3.0,
        ]));
        sched.step(&mut NoopObserver).expect("step");
        assert_eq!(sched.stats().clamped, 1);
        assert_eq!(sched.stats().anomalies, 0);
        assert_eq!(sched.system_time(), 0.0);
    }
}

// ── Moving particles ──────────────────────────────────────────────────────────

#[cfg(test)]
mod hard_discs {
    use super::*;

    fn check_run(config: SchedulerConfig, seed: u64) {
        let label = format!("{:?}/{:?}/{:?}", config.fel, config.pel, config.neighbour_policy);
        let mut sched = gas(config, seed);
        let energy = sched.world().kinetic();
        let mut rec = Recorder::default();
        sched.run(3_000, &mut rec).expect("run");

        let stats = sched.stats();
        assert!(stats.interactions > 0, "{label}");
        assert!(stats.cell_transitions > 0, "{label}");
        assert_eq!(stats.anomalies, 0, "{label}");
        assert!(rec.events.windows(2).all(|w| w[0].1 <= w[1].1), "{label}: time went back");
        assert!(((sched.world().kinetic() - energy) / energy).abs() < 1e-9, "{label}");
        assert!(sched.world().closest_approach() > 1.0 - 1e-6, "{label}: discs overlap");
    }

    #[test]
    fn every_strategy_conserves_energy_without_overlap() {
        for config in strategies() {
            check_run(config, 11);
        }
    }

    #[test]
    fn pair_only_neighbour_policy() {
        for fel in [FelStrategy::Tree, FelStrategy::Calendar] {
            let config = SchedulerConfig {
                neighbour_policy: NeighbourPolicy::PairOnly,
                ..config(fel, PelStrategy::MinMax4)
            };
            check_run(config, 12);
        }
    }

    #[test]
    fn cells_track_positions() {
        let mut sched = gas(SchedulerConfig::default(), 13);
        sched.run(2_000, &mut NoopObserver).expect("run");
        for i in 0..sched.world().entity_count() {
            let id = ParticleId(i as u32);
            let pos = sched.world().position(id);
            let (lower, upper) = sched.cells().cell_bounds(id, pos, sched.world()).expect("placed");
            for d in 0..2 {
                assert!(pos[d] >= lower[d] - 1e-9 && pos[d] <= upper[d] + 1e-9, "{id} outside");
            }
        }
    }

    #[test]
    fn rescaling_time_scales_the_next_event() {
        let mut sched = gas(SchedulerConfig::default(), 14);
        sched.run(100, &mut NoopObserver).expect("warm up");
        let before = sched.peek().expect("event").dt;
        sched.rescale_times(2.0).expect("rescale");
        let after = sched.peek().expect("event").dt;
        assert!((after - 2.0 * before).abs() < 1e-9 * before.max(1.0));
        sched.run(600, &mut NoopObserver).expect("run on");
        assert!(sched.world().closest_approach() > 1.0 - 1e-6);

        let err = sched.rescale_times(-1.0).err();
        assert!(matches!(err, Some(SchedError::Fel(_))));
    }
}

// ── Halting, checkpoints, replicas ────────────────────────────────────────────

#[cfg(test)]
mod control {
    use super::*;
    use crate::{HaltHandle, ensemble};

    struct HaltAfter {
        handle: HaltHandle,
        at:     u64,
        seen:   u64,
    }

    impl SchedulerObserver for HaltAfter {
        fn on_event(&mut self, _event: &Event, _system_time: f64) {
            self.seen += 1;
            if self.seen == self.at {
                self.handle.halt();
            }
        }
    }

    #[test]
    fn halt_stops_between_events_and_resumes() {
        let handle = HaltHandle::new();
        let mut sched = SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(10, 0))
            .source(Scripted::exponential(100, 5))
            .halt_handle(handle.clone())
            .build()
            .expect("build");
        let mut obs = HaltAfter { handle, at: 40, seen: 0 };

        assert_eq!(sched.run(100, &mut obs).expect("run"), RunOutcome::Halted);
        assert_eq!(sched.stats().events, 40);
        assert!(sched.is_halted());

        sched.resume();
        assert_eq!(sched.run(100, &mut obs).expect("run"), RunOutcome::Completed);
        assert_eq!(sched.stats().events, 100);
    }

    #[test]
    fn restore_resumes_the_same_sequence() {
        let times = Scripted::exponential(100, 6).at;
        let mut whole = scripted(SchedulerConfig::default(), 10, Scripted::new(times.clone()));
        let mut want = Recorder::default();
        whole.run(100, &mut want).expect("run");

        let mut split = scripted(SchedulerConfig::default(), 10, Scripted::new(times));
        let mut got = Recorder::default();
        split.run(50, &mut got).expect("first half");
        let mut checkpoint = split.checkpoint();
        assert_eq!(checkpoint.stats.events, 50);
        checkpoint.config.fel = FelStrategy::Tree;

        split.restore(&checkpoint).expect("restore");
        assert_eq!(split.fel_name(), "tree");
        assert_eq!(split.stats().events, 50);
        split.run(100, &mut got).expect("second half");

        assert_eq!(got.events.len(), want.events.len());
        for ((a, ta), (b, tb)) in got.events.iter().zip(&want.events) {
            assert_eq!(a.primary, b.primary);
            assert!((ta - tb).abs() < TOL);
        }
    }

    #[test]
    fn restore_checks_the_population() {
        let mut sched = scripted(SchedulerConfig::default(), 3, Scripted::new(vec![1.0; 9]));
        let mut checkpoint = sched.checkpoint();
        checkpoint.entity_count = 7;
        let err = sched.restore(&checkpoint).err();
        assert!(matches!(
            err,
            Some(SchedError::EntityCountMismatch { expected: 9, got: 7, what: "checkpoint" })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn checkpoint_state_is_serializable() {
        fn serde_bounds<T: serde::Serialize + serde::de::DeserializeOwned>() {}
        serde_bounds::<crate::Checkpoint>();
        serde_bounds::<crate::SchedulerStats>();
        serde_bounds::<edmd_fel::FelStats>();
    }

    fn replica(tag: u32, seed: u64) -> Scheduler<2, Sites> {
        SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(6, tag))
            .source(Ticker::new(1.0 + 0.1 * seed as f64, 0.0, 36))
            .build()
            .expect("build")
    }

    #[test]
    fn exchange_swaps_worlds_and_rebuilds() {
        let mut replicas = vec![replica(0, 0), replica(1, 1), replica(2, 2)];
        let results = ensemble::run_all(&mut replicas, 50);
        assert!(results.iter().all(|r| matches!(r, Ok(RunOutcome::Completed))));

        ensemble::exchange(&mut replicas, 2, 0).expect("exchange");
        let tags: Vec<u32> = replicas.iter().map(|r| r.world().tag).collect();
        assert_eq!(tags, vec![2, 1, 0]);
        for r in &replicas {
            assert_eq!(r.state(ParticleId(0)), Some(EntityState::Valid));
            assert_eq!(r.stats().events, 50);
        }

        let results = ensemble::run_all(&mut replicas, 100);
        assert!(results.iter().all(|r| matches!(r, Ok(RunOutcome::Completed))));
        assert!(ensemble::exchange(&mut replicas, 0, 3).is_err());
    }

    #[test]
    fn failed_exchange_still_rebuilds_the_other_replica() {
        let wide = SchedulerConfig {
            cells: CellConfig { interaction_range: 1.5, ..CellConfig::default() },
            ..SchedulerConfig::default()
        };
        let roomy = SchedulerBuilder::new(wide, Sites::square(6, 7))
            .source(Clock { period: 1.0, ticks: 0 })
            .build()
            .expect("build");
        let cramped = SchedulerBuilder::new(SchedulerConfig::default(), Sites::square(1, 8))
            .source(Clock { period: 1.0, ticks: 0 })
            .build()
            .expect("build");
        let mut replicas = vec![roomy, cramped];

        // The unit box cannot host a 1.5 interaction range.
        let err = ensemble::exchange(&mut replicas, 0, 1).err();
        assert!(matches!(err, Some(SchedError::Cells(_))));

        let other = &mut replicas[1];
        assert_eq!(other.world().tag, 7);
        for i in 0..36 {
            assert_eq!(other.state(ParticleId(i)), Some(EntityState::Valid));
        }
        assert_eq!(other.system_id(), ParticleId(36));
        other.run(3, &mut NoopObserver).expect("rebuilt replica runs");
        assert_eq!(other.stats().system_events, 3);
    }
}

//! The event loop.
//!
//! # One step
//!
//! ```text
//! top = fel.top()
//!   Recalculate(p)   → regenerate p (or the system events); time stays put
//!   Interaction/Local→ re-predict; if it no longer holds, regenerate the
//!                      participants instead (bounded by rejection_limit)
//!                      else advance the clock, dispatch, regenerate
//!                      participants and whatever the source reports
//!   CellTransition   → advance, move the particle to its new cell, queue
//!                      its next cell exit, handle the new neighbours
//!   System           → advance, dispatch, regenerate affected, re-predict
//!                      the system events
//! ```
//!
//! "Regenerate" means invalidate (clear the PEL and retire every event that
//! names the particle as partner), then ask every source for fresh
//! predictions.  Every entity is invalidated before any is re-predicted, so
//! a pair refreshed together sees each other's new generation.

use edmd_cells::{CellError, CellGeometry, CellList};
use edmd_core::{NeighbourPolicy, ParticleId, SchedulerConfig, SourceId};
use edmd_event::{Event, EventKind};
use edmd_fel::{FelError, FelStats, FutureEventList, build_fel};
use tracing::{debug, info, trace, warn};

use crate::{
    Checkpoint, EventSource, HaltHandle, RunOutcome, SchedError, SchedResult, SchedulerObserver,
    SchedulerStats, SourceResult, World,
};

/// Prediction state of one particle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Not yet predicted.
    Uninitialized,
    /// Every prediction for the particle is queued and current.
    Valid,
    /// Predictions were retired and not yet regenerated.
    Stale,
}

/// What a call to [`Scheduler::step`] did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Step {
    /// The event was executed and the clock moved to its time.
    Dispatched(Event),
    /// The particle's predictions were regenerated.  The clock did not move.
    Recalculated(ParticleId),
    /// The event failed revalidation; its participants were regenerated.
    Rejected(Event),
}

/// Owns the future event list and the cell list, and drives the world
/// through its events in time order.
///
/// Build one with [`SchedulerBuilder`](crate::SchedulerBuilder).
pub struct Scheduler<const D: usize, W: World<D>> {
    config:      SchedulerConfig,
    world:       W,
    sources:     Vec<Box<dyn EventSource<W>>>,
    fel:         Box<dyn FutureEventList>,
    cells:       CellList<D>,
    states:      Vec<EntityState>,
    halt:        HaltHandle,
    system_time: f64,
    stats:       SchedulerStats,
    /// Consecutive rejections since the last dispatch.
    rejections:  usize,
}

impl<const D: usize, W: World<D>> Scheduler<D, W> {
    pub(crate) fn assemble(
        config:  SchedulerConfig,
        world:   W,
        sources: Vec<Box<dyn EventSource<W>>>,
        halt:    HaltHandle,
    ) -> SchedResult<Self> {
        let n = world.entity_count();
        let fel = build_fel(&config, n + 1);
        let cells = Self::empty_cells(&config, &world)?;
        Ok(Self {
            config,
            world,
            sources,
            fel,
            cells,
            states: vec![EntityState::Uninitialized; n],
            halt,
            system_time: 0.0,
            stats: SchedulerStats::default(),
            rejections: 0,
        })
    }

    fn empty_cells(config: &SchedulerConfig, world: &W) -> SchedResult<CellList<D>> {
        let n = world.entity_count();
        if n >= u32::MAX as usize {
            return Err(SchedError::Config(format!(
                "{n} particles do not fit 32-bit particle ids"
            )));
        }
        let geometry = CellGeometry::from_config(world.size(), n, &config.cells)?;
        Ok(CellList::new(geometry, config.cells.shearing, n))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable world access.  Any change to particle state must be followed
    /// by [`reinitialise`](Self::reinitialise).
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn system_time(&self) -> f64 {
        self.system_time
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn fel_stats(&self) -> FelStats {
        self.fel.stats()
    }

    pub fn fel_name(&self) -> &'static str {
        self.fel.name()
    }

    pub fn cells(&self) -> &CellList<D> {
        &self.cells
    }

    pub fn state(&self, id: ParticleId) -> Option<EntityState> {
        self.states.get(id.index()).copied()
    }

    /// Owner id of system-wide events: one past the last particle.
    pub fn system_id(&self) -> ParticleId {
        ParticleId(self.states.len() as u32)
    }

    /// The next event without dispatching it.  Times are relative to now.
    pub fn peek(&mut self) -> Option<Event> {
        self.fel.top()
    }

    // ── Cancellation ──────────────────────────────────────────────────────

    pub fn halt(&self) {
        self.halt.halt();
    }

    pub fn resume(&self) {
        self.halt.resume();
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    /// A handle sharing this scheduler's halt flag.
    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    // ── Prediction ────────────────────────────────────────────────────────

    /// Stamp and queue the outcome of a prediction by source `k` for `id`.
    fn accept(&mut self, result: SourceResult<Event>, k: usize, id: ParticleId) -> SchedResult<()> {
        match result {
            Ok(event) => self.queue(event.with_source(SourceId(k as u16)), id),
            Err(err) => {
                self.stats.prediction_failures += 1;
                let source = self.sources[k].name();
                warn!(source, %id, %err, "prediction failed, treating as never");
                Ok(())
            }
        }
    }

    fn queue(&mut self, mut event: Event, id: ParticleId) -> SchedResult<()> {
        if event.is_never() {
            return Ok(());
        }
        event.primary = id;
        match self.fel.push(event) {
            Ok(()) => Ok(()),
            Err(FelError::NotANumber { event }) => Err(SchedError::NotANumber {
                event,
                system_time: self.system_time,
                events: self.stats.events,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Queue the time at which `id` leaves its current cell.
    fn queue_cell_exit(&mut self, id: ParticleId) -> SchedResult<()> {
        let pos = self.world.position(id);
        let (lower, upper) = self.cells.cell_bounds(id, pos, &self.world)?;
        if let Some(exit) = self.world.box_exit(id, &lower, &upper) {
            let aux = (exit.dim * 2 + usize::from(exit.positive)) as u32;
            let event = Event::single(EventKind::CellTransition, exit.dt, id, SourceId::INVALID)
                .with_aux(aux);
            self.queue(event, id)?;
        }
        Ok(())
    }

    fn queue_pairs(&mut self, id: ParticleId, others: &[ParticleId]) -> SchedResult<()> {
        for &other in others {
            for k in 0..self.sources.len() {
                let result = self.sources[k].predict_pair(&self.world, id, other);
                self.accept(result, k, id)?;
            }
        }
        Ok(())
    }

    /// Ask every source for `id`'s events and queue them.
    fn update_entity(&mut self, id: ParticleId) -> SchedResult<()> {
        for k in 0..self.sources.len() {
            let result = self.sources[k].predict(&self.world, id);
            self.accept(result, k, id)?;
        }
        self.queue_cell_exit(id)?;
        let neighbours = self.cells.neighbours(id);
        self.queue_pairs(id, &neighbours)?;
        self.states[id.index()] = EntityState::Valid;
        Ok(())
    }

    /// Invalidate then re-predict every particle in `ids`.  Ids outside the
    /// population are ignored and duplicates collapse.
    fn refresh(&mut self, ids: &[ParticleId]) -> SchedResult<()> {
        let n = self.states.len();
        let mut ids: Vec<ParticleId> = ids.iter().copied().filter(|id| id.index() < n).collect();
        ids.sort_unstable();
        ids.dedup();
        for &id in &ids {
            self.fel.invalidate(id);
            self.states[id.index()] = EntityState::Stale;
        }
        for &id in &ids {
            self.update_entity(id)?;
        }
        Ok(())
    }

    fn rebuild_system_events(&mut self) -> SchedResult<()> {
        let owner = self.system_id();
        self.fel.invalidate(owner);
        for k in 0..self.sources.len() {
            let result = self.sources[k].predict_system(&self.world).map(|mut e| {
                e.kind = EventKind::System;
                e.secondary = None;
                e
            });
            self.accept(result, k, owner)?;
        }
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Throw away every prediction and cell assignment and rebuild them
    /// from the world.
    ///
    /// Required after anything changes particle state behind the
    /// scheduler's back: a world swap, a restore, edits through
    /// [`world_mut`](Self::world_mut).
    pub fn reinitialise(&mut self) -> SchedResult<()> {
        self.cells = Self::empty_cells(&self.config, &self.world)?;
        let n = self.world.entity_count();
        for i in 0..n {
            let id = ParticleId(i as u32);
            let pos = self.world.position(id);
            self.cells.insert(id, pos, &self.world)?;
        }

        self.fel.init(n + 1);
        self.states = vec![EntityState::Uninitialized; n];
        for source in &mut self.sources {
            source.reinitialise(&self.world);
        }
        for i in 0..n {
            self.update_entity(ParticleId(i as u32))?;
        }
        self.rebuild_system_events()?;
        self.fel.optimise();
        self.rejections = 0;

        let counts = self.cells.geometry().counts;
        info!(
            particles = n,
            sources = self.sources.len(),
            fel = self.fel.name(),
            cells = ?counts,
            lists = self.fel.stats().lists,
            "scheduler initialised"
        );
        Ok(())
    }

    /// Multiply every pending event time by `factor`, e.g. after the world
    /// scaled all velocities by `1 / factor`.
    pub fn rescale_times(&mut self, factor: f64) -> SchedResult<()> {
        self.fel.rescale_times(factor)?;
        self.world.rescale_times(factor);
        Ok(())
    }

    /// Exchange the worlds of two schedulers and rebuild both.  Each keeps
    /// its own clock, sources and statistics.
    ///
    /// Both rebuilds are attempted even if the first fails; the first error
    /// is returned.
    pub fn swap_worlds(a: &mut Self, b: &mut Self) -> SchedResult<()> {
        std::mem::swap(&mut a.world, &mut b.world);
        let first = a.reinitialise();
        let second = b.reinitialise();
        first.and(second)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            system_time:  self.system_time,
            entity_count: self.states.len(),
            stats:        self.stats.clone(),
            config:       self.config.clone(),
        }
    }

    /// Resume from `checkpoint`.  The world must already hold the particle
    /// state saved with it.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> SchedResult<()> {
        let n = self.world.entity_count();
        if checkpoint.entity_count != n {
            return Err(SchedError::EntityCountMismatch {
                expected: n,
                got:      checkpoint.entity_count,
                what:     "checkpoint",
            });
        }
        checkpoint.config.validate()?;
        self.config = checkpoint.config.clone();
        self.fel = build_fel(&self.config, n + 1);
        self.system_time = checkpoint.system_time;
        self.stats = checkpoint.stats.clone();
        self.reinitialise()
    }

    // ── Event loop ────────────────────────────────────────────────────────

    /// Dispatch events until `target_events` have been dispatched in total
    /// or the halt flag is raised.
    pub fn run<O: SchedulerObserver>(
        &mut self,
        target_events: u64,
        observer: &mut O,
    ) -> SchedResult<RunOutcome> {
        info!(from = self.stats.events, to = target_events, "run started");
        while self.stats.events < target_events {
            if self.halt.is_halted() {
                info!(events = self.stats.events, time = self.system_time, "run halted");
                observer.on_halt(&self.stats);
                return Ok(RunOutcome::Halted);
            }
            self.step(observer)?;
        }
        info!(
            events = self.stats.events,
            time = self.system_time,
            rejections = self.stats.rejections,
            anomalies = self.stats.anomalies,
            "run finished"
        );
        observer.on_run_end(&self.stats);
        Ok(RunOutcome::Completed)
    }

    /// Process the earliest event.
    pub fn step<O: SchedulerObserver>(&mut self, observer: &mut O) -> SchedResult<Step> {
        let Some(event) = self.fel.top() else {
            return Err(SchedError::OutOfEvents {
                system_time: self.system_time,
                events:      self.stats.events,
            });
        };
        match event.kind {
            EventKind::Recalculate => self.recalculate(event.primary, observer),
            EventKind::Interaction | EventKind::Local => self.step_source(event, observer),
            EventKind::CellTransition => self.step_cell(event, observer),
            EventKind::System => self.step_system(event, observer),
        }
    }

    fn recalculate<O: SchedulerObserver>(
        &mut self,
        id: ParticleId,
        observer: &mut O,
    ) -> SchedResult<Step> {
        if id == self.system_id() {
            self.rebuild_system_events()?;
        } else {
            self.refresh(&[id])?;
        }
        self.stats.recalculations += 1;
        observer.on_recalculate(id);
        Ok(Step::Recalculated(id))
    }

    /// The time to advance by for `event`, after the causality checks.
    fn check_time(&mut self, event: &Event) -> SchedResult<f64> {
        let dt = event.dt;
        if dt.is_nan() {
            return Err(SchedError::NotANumber {
                event:       *event,
                system_time: self.system_time,
                events:      self.stats.events,
            });
        }
        if dt >= 0.0 {
            return Ok(dt);
        }
        let tolerance = self.config.negative_time_tolerance;
        if dt >= -tolerance {
            self.stats.clamped += 1;
            return Ok(0.0);
        }
        self.stats.anomalies += 1;
        warn!(%event, dt, system_time = self.system_time, "event scheduled in the past");
        if self.config.strict {
            return Err(SchedError::Causality {
                event: *event,
                system_time: self.system_time,
                tolerance,
            });
        }
        Ok(0.0)
    }

    fn advance(&mut self, dt: f64) {
        self.system_time += dt;
        self.fel.stream(dt);
        self.world.stream(dt);
    }

    fn source_index(&self, event: &Event) -> SchedResult<usize> {
        let k = event.source.index();
        if k < self.sources.len() {
            Ok(k)
        } else {
            Err(SchedError::UnknownSource(event.source))
        }
    }

    fn finish<O: SchedulerObserver>(&mut self, event: Event, observer: &mut O) -> Step {
        self.stats.events += 1;
        self.rejections = 0;
        trace!(%event, time = self.system_time, "dispatched");
        observer.on_event(&event, self.system_time);
        Step::Dispatched(event)
    }

    fn step_source<O: SchedulerObserver>(
        &mut self,
        event: Event,
        observer: &mut O,
    ) -> SchedResult<Step> {
        let k = self.source_index(&event)?;
        self.fel.pop();

        let predicted = match event.secondary {
            Some(other) if event.kind == EventKind::Interaction => {
                self.sources[k].predict_pair(&self.world, event.primary, other)
            }
            _ => self.sources[k].predict(&self.world, event.primary),
        };
        let fresh = match predicted {
            Ok(e) => e,
            Err(err) => {
                self.stats.prediction_failures += 1;
                warn!(source = self.sources[k].name(), %event, %err, "revalidation failed");
                Event::never(event.primary)
            }
        };

        let participants: Vec<ParticleId> =
            std::iter::once(event.primary).chain(event.secondary).collect();

        let next_dt = self.fel.top().map_or(f64::INFINITY, |e| e.dt);
        let later = fresh.dt > next_dt + self.config.negative_time_tolerance;
        if fresh.is_never() || (later && self.rejections < self.config.rejection_limit) {
            self.rejections += 1;
            self.stats.rejections += 1;
            debug!(%event, fresh_dt = fresh.dt, next_dt, "event rejected on revalidation");
            observer.on_rejection(&event);
            self.refresh(&participants)?;
            return Ok(Step::Rejected(event));
        }
        if later {
            warn!(
                %event,
                rejections = self.rejections,
                "rejection limit reached, dispatching without revalidation"
            );
        }

        let event = Event { dt: fresh.dt, aux: fresh.aux, ..event };
        let dt = self.check_time(&event)?;
        self.advance(dt);
        let affected = self.sources[k].dispatch(&mut self.world, &event)?;
        match event.kind {
            EventKind::Interaction => self.stats.interactions += 1,
            _ => self.stats.local_events += 1,
        }

        let mut stale = participants;
        stale.extend(affected);
        self.refresh(&stale)?;
        Ok(self.finish(event, observer))
    }

    fn step_cell<O: SchedulerObserver>(
        &mut self,
        event: Event,
        observer: &mut O,
    ) -> SchedResult<Step> {
        self.fel.pop();
        let dt = self.check_time(&event)?;
        self.advance(dt);

        let id = event.primary;
        let dim = (event.aux / 2) as usize;
        let positive = event.aux % 2 == 1;
        let pos = self.world.position(id);
        self.stats.cell_transitions += 1;

        match self.cells.transition(id, dim, positive, pos, &self.world) {
            Ok(moved) => {
                self.world.cell_changed(id);
                self.queue_cell_exit(id)?;
                match self.config.neighbour_policy {
                    NeighbourPolicy::Invalidate => self.refresh(&moved.new_neighbours)?,
                    NeighbourPolicy::PairOnly => self.queue_pairs(id, &moved.new_neighbours)?,
                }
            }
            Err(err @ CellError::NotMember { .. }) => {
                self.stats.anomalies += 1;
                warn!(%id, %err, "cell membership lost, re-binning");
                self.cells.insert(id, pos, &self.world)?;
                self.world.cell_changed(id);
                self.refresh(&[id])?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(self.finish(event, observer))
    }

    fn step_system<O: SchedulerObserver>(
        &mut self,
        event: Event,
        observer: &mut O,
    ) -> SchedResult<Step> {
        let k = self.source_index(&event)?;
        self.fel.pop();
        let dt = self.check_time(&event)?;
        self.advance(dt);
        let affected = self.sources[k].dispatch(&mut self.world, &event)?;
        self.stats.system_events += 1;
        self.refresh(&affected)?;
        self.rebuild_system_events()?;
        Ok(self.finish(event, observer))
    }
}

//! Fluent builder for constructing a [`Scheduler`].

use edmd_core::SchedulerConfig;

use crate::{EventSource, HaltHandle, SchedError, SchedResult, Scheduler, World};

/// Fluent builder for [`Scheduler<D, W>`].
///
/// # Required inputs
///
/// - [`SchedulerConfig`]: FEL and PEL strategy, cell sizing, tolerances
/// - `W: World<D>`: the particle state
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                  |
/// |----------------------|--------------------------|
/// | `.source(s)`         | no sources               |
/// | `.halt_handle(h)`    | a fresh, private flag    |
///
/// Sources are numbered in registration order; that number is the
/// `source` field of every event they produce.
///
/// # Example
///
/// ```rust,ignore
/// let mut sched = SchedulerBuilder::new(config, gas)
///     .source(HardDiscs::new(1.0))
///     .source(Thermostat::new(0.5))
///     .build()?;
/// sched.run(1_000_000, &mut NoopObserver)?;
/// ```
pub struct SchedulerBuilder<const D: usize, W: World<D>> {
    config:  SchedulerConfig,
    world:   W,
    sources: Vec<Box<dyn EventSource<W>>>,
    halt:    Option<HaltHandle>,
}

impl<const D: usize, W: World<D>> SchedulerBuilder<D, W> {
    pub fn new(config: SchedulerConfig, world: W) -> Self {
        Self { config, world, sources: Vec::new(), halt: None }
    }

    /// Register an event source.
    pub fn source(self, source: impl EventSource<W> + 'static) -> Self {
        self.boxed_source(Box::new(source))
    }

    pub fn boxed_source(mut self, source: Box<dyn EventSource<W>>) -> Self {
        self.sources.push(source);
        self
    }

    /// Share an existing halt flag, e.g. one owned by a signal handler.
    pub fn halt_handle(mut self, halt: HaltHandle) -> Self {
        self.halt = Some(halt);
        self
    }

    /// Validate inputs, bin the particles and queue their first events.
    ///
    /// # Errors
    ///
    /// - [`SchedError::Core`] if the configuration fails validation.
    /// - [`SchedError::Config`] if there are too many sources or particles
    ///   for the id types.
    /// - [`SchedError::Cells`] if no cell grid fits the box.
    /// - Any error from the initial predictions, e.g. a NaN time.
    pub fn build(self) -> SchedResult<Scheduler<D, W>> {
        self.config.validate()?;
        if self.sources.len() >= u16::MAX as usize {
            return Err(SchedError::Config(format!(
                "{} event sources do not fit 16-bit source ids",
                self.sources.len()
            )));
        }
        let halt = self.halt.unwrap_or_default();
        let mut scheduler = Scheduler::assemble(self.config, self.world, self.sources, halt)?;
        scheduler.reinitialise()?;
        Ok(scheduler)
    }
}

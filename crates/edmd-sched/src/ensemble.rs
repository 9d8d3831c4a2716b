//! Running several independent schedulers, e.g. the replicas of a
//! parallel-tempering ensemble.
//!
//! Replicas share nothing while running.  They meet only in [`exchange`],
//! which the caller invokes between runs.

use crate::{NoopObserver, RunOutcome, SchedError, SchedResult, Scheduler, World};

/// Run every scheduler until it has dispatched `target_events` events.
///
/// With the `parallel` feature the replicas run on Rayon's thread pool;
/// otherwise one after another.  Results are in replica order.
pub fn run_all<const D: usize, W: World<D>>(
    schedulers: &mut [Scheduler<D, W>],
    target_events: u64,
) -> Vec<SchedResult<RunOutcome>> {
    #[cfg(not(feature = "parallel"))]
    {
        schedulers
            .iter_mut()
            .map(|s| s.run(target_events, &mut NoopObserver))
            .collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        schedulers
            .par_iter_mut()
            .map(|s| s.run(target_events, &mut NoopObserver))
            .collect()
    }
}

/// Swap the worlds of replicas `i` and `j` and rebuild both.
pub fn exchange<const D: usize, W: World<D>>(
    schedulers: &mut [Scheduler<D, W>],
    i: usize,
    j: usize,
) -> SchedResult<()> {
    let len = schedulers.len();
    if i >= len || j >= len {
        return Err(SchedError::Config(format!(
            "cannot exchange replicas {i} and {j} of {len}"
        )));
    }
    if i == j {
        return Ok(());
    }
    let (lo, hi) = (i.min(j), i.max(j));
    let (left, right) = schedulers.split_at_mut(hi);
    Scheduler::swap_worlds(&mut left[lo], &mut right[0])
}

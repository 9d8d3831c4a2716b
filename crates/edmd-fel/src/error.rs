use edmd_core::ParticleId;
use edmd_event::Event;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FelError {
    #[error("predicted time is NaN for {event}")]
    NotANumber { event: Event },

    #[error("{id} is outside the event list (size {size})")]
    UnknownParticle { id: ParticleId, size: usize },

    #[error("time rescale factor must be positive and finite, got {0}")]
    BadRescale(f64),
}

pub type FelResult<T> = Result<T, FelError>;

//! Cell-list error type.

use thiserror::Error;

use edmd_core::{CellId, CoreError, ParticleId};

#[derive(Debug, Error)]
pub enum CellError {
    #[error("cell geometry: {0}")]
    Geometry(String),

    #[error("{id} is not a member of {cell}")]
    NotMember { id: ParticleId, cell: CellId },

    #[error("{id} is outside the cell list (size {size})")]
    UnknownParticle { id: ParticleId, size: usize },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type CellResult<T> = Result<T, CellError>;

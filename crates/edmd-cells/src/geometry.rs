//! Grid sizing.
//!
//! # Automatic sizing
//!
//! Without explicit counts the cell width is the larger of
//!
//! - `interaction_range / overlink`, the smallest width for which the
//!   neighbourhood still covers every interacting pair, and
//! - `(V / N)^(1/D)`, the width at which cells hold one particle on average.
//!
//! The count per dimension is then `floor(L / width)`, raised to at least
//! `2 * overlink + 1` (one full neighbourhood) and at least 3.

use edmd_core::CellConfig;
use tracing::debug;

use crate::{CellError, CellResult};

/// Below this, per-dimension cell counts make "neighbouring" ambiguous.
const MIN_CELLS: usize = 3;

/// Guards `floor(L / width)` against landing one cell too many.
const EMBIGGEN: f64 = 1.0 + 10.0 * f64::EPSILON;

#[derive(Clone, Debug, PartialEq)]
pub struct CellGeometry<const D: usize> {
    /// Primary box edge lengths.
    pub size:     [f64; D],
    pub counts:   [usize; D],
    /// Cell edge lengths, `size / counts`.
    pub width:    [f64; D],
    pub overlink: usize,
    pub range:    f64,
}

impl<const D: usize> CellGeometry<D> {
    /// Size the grid for `entities` particles in a box of edge lengths `size`.
    pub fn from_config(size: [f64; D], entities: usize, config: &CellConfig) -> CellResult<Self> {
        if let Some(d) = size.iter().position(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(CellError::Geometry(format!(
                "box length in dimension {d} must be positive, got {}",
                size[d]
            )));
        }
        if config.overlink == 0 {
            return Err(CellError::Geometry("overlink must be at least 1".into()));
        }
        if !(config.interaction_range.is_finite() && config.interaction_range > 0.0) {
            return Err(CellError::Geometry(format!(
                "interaction range must be positive, got {}",
                config.interaction_range
            )));
        }
        if config.shearing && D < 2 {
            return Err(CellError::Geometry("shearing needs at least two dimensions".into()));
        }

        let counts = match &config.cell_counts {
            Some(explicit) => Self::explicit_counts(explicit)?,
            None => Self::auto_counts(size, entities, config),
        };

        let geometry = Self {
            size,
            counts,
            width: std::array::from_fn(|d| size[d] / counts[d] as f64),
            overlink: config.overlink,
            range: config.interaction_range,
        };

        let supported = geometry.supported_length();
        if supported < geometry.range {
            return Err(CellError::Geometry(format!(
                "cells {counts:?} with overlink {} support interactions up to {supported}, \
                 but the range is {}",
                geometry.overlink, geometry.range
            )));
        }
        debug!(?counts, width = ?geometry.width, supported, "cell grid sized");
        Ok(geometry)
    }

    fn explicit_counts(explicit: &[usize]) -> CellResult<[usize; D]> {
        if explicit.len() != D {
            return Err(CellError::Geometry(format!(
                "{} cell counts given for a {D}-dimensional box",
                explicit.len()
            )));
        }
        if let Some(d) = explicit.iter().position(|&n| n < MIN_CELLS) {
            return Err(CellError::Geometry(format!(
                "at least {MIN_CELLS} cells are needed in dimension {d}, got {}",
                explicit[d]
            )));
        }
        Ok(std::array::from_fn(|d| explicit[d]))
    }

    fn auto_counts(size: [f64; D], entities: usize, config: &CellConfig) -> [usize; D] {
        let min_width = config.interaction_range / config.overlink as f64;
        let volume: f64 = size.iter().product();
        let unit_occupancy = (volume / entities.max(1) as f64).powf(1.0 / D as f64);
        let width = min_width.max(unit_occupancy);
        std::array::from_fn(|d| {
            let fit = (size[d] / (width * EMBIGGEN)).floor() as usize;
            fit.max(2 * config.overlink + 1).max(MIN_CELLS)
        })
    }

    /// Longest interaction distance the neighbourhood is guaranteed to cover.
    pub fn supported_length(&self) -> f64 {
        (0..D)
            .map(|d| {
                if self.counts[d] <= 2 * self.overlink + 1 {
                    // One neighbourhood spans the whole box.
                    self.size[d]
                } else {
                    self.overlink as f64 * self.width[d]
                }
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Cell coordinates of a primary-image position.  Positions outside
    /// the primary box fold back periodically.
    #[inline]
    pub fn coords_of(&self, pos: &[f64; D]) -> [usize; D] {
        std::array::from_fn(|d| {
            let c = ((pos[d] + 0.5 * self.size[d]) / self.width[d]).floor() as i64;
            c.rem_euclid(self.counts[d] as i64) as usize
        })
    }

    /// Centre of a cell in the primary image.
    #[inline]
    pub fn centre(&self, coord: &[usize; D]) -> [f64; D] {
        std::array::from_fn(|d| (coord[d] as f64 + 0.5) * self.width[d] - 0.5 * self.size[d])
    }
}

use std::time::Instant;

use itertools::iproduct;
use rand::RngCore;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::capacity::{trial_rng, LinkSimulator};
use crate::config::{LinkConfig, SweepConfig};
use crate::error::Result;
use crate::geo::linspace;
use crate::io::{BaseStation, Uav};

/// Averaged capacity over a grid of UAV ground positions.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityMap {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Row-major over x: `rates[i * ys.len() + j]` is the rate at `(xs[i], ys[j])`.
    pub rates: Vec<f64>,
}

impl CapacityMap {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rates[i * self.ys.len() + j]
    }

    pub fn min(&self) -> f64 {
        self.rates.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.rates.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.rates.iter().sum::<f64>() / self.rates.len() as f64
    }

    /// `(x, y, rate)` of the best cell.
    pub fn argmax(&self) -> Option<(f64, f64, f64)> {
        let (idx, rate) = self
            .rates
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        let ny = self.ys.len();
        Some((self.xs[idx / ny], self.ys[idx % ny], rate))
    }

    /// `n_levels` evenly spaced iso-rate levels between min and max.
    pub fn contour_levels(&self, n_levels: usize) -> Vec<f64> {
        linspace(self.min(), self.max(), n_levels)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepMetrics {
    pub cells_computed: u32,
    pub elapsed_ms: u64,
}

/// Mean capacity with the UAV at its current position.
pub fn mean_capacity_at(bs: &BaseStation, uav: &Uav, link: LinkConfig, seed: u64) -> Result<f64> {
    let simulator = LinkSimulator::new(bs, uav, bs.endpoint(), uav.endpoint(), bs.n_s(), link)?;
    simulator.estimate_mean_capacity_seeded(seed)
}

/// Moves the UAV over the grid and records the averaged capacity per cell.
///
/// Every cell works on its own copy of the UAV and its own seed derived from
/// `sweep.seed`, so cells run in parallel and the map is reproducible.
pub fn run_sweep(bs: &BaseStation, uav: &Uav, link: LinkConfig, sweep: SweepConfig) -> Result<(CapacityMap, SweepMetrics)> {
    sweep.validate()?;
    let start = Instant::now();

    let xs = linspace(sweep.x_min, sweep.x_max, sweep.n_steps);
    let ys = linspace(sweep.y_min, sweep.y_max, sweep.n_steps);
    let cells: Vec<(usize, usize)> = iproduct!(0..xs.len(), 0..ys.len()).collect();

    let rates = cells
        .par_iter()
        .enumerate()
        .map(|(cell, &(i, j))| -> Result<f64> {
            let placed = uav.with_location(xs[i], ys[j]);
            let cell_seed = trial_rng(sweep.seed, cell).next_u64();
            let rate = mean_capacity_at(bs, &placed, link, cell_seed)?;
            debug!("cell ({:.1}, {:.1}) -> {:.4} bps/Hz", xs[i], ys[j], rate);
            Ok(rate)
        })
        .collect::<Result<Vec<f64>>>()?;

    let metrics = SweepMetrics {
        cells_computed: rates.len() as u32,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "sweep of {} cells done in {} ms ({} trials each)",
        metrics.cells_computed, metrics.elapsed_ms, link.trials
    );

    Ok((CapacityMap { xs, ys, rates }, metrics))
}

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::beamforming::{DigitalCombinerProvider, DigitalPrecoderProvider};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::physics::channel::{ChannelEndpoint, ChannelGenerator};
use crate::physics::csi::{effective_csi, full_csi, CsiReduction};
use crate::physics::link_budget::dbm_to_watts;
use crate::physics::CMatrix;

/// Time-division sharing of the link between both directions.
pub const HALF_DUPLEX_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamMetrics {
    pub signal_w: f64,
    pub interference_w: f64,
    /// bits/s/Hz
    pub capacity: f64,
}

/// Outcome of one trial, bits/s/Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacitySample {
    pub streams: Vec<StreamMetrics>,
    pub total: f64,
}

/// Capacity of a digitally precoded link with co-stream interference,
/// equal power per stream (no water-filling).
#[derive(Debug, Clone, Copy)]
pub struct CapacityEstimator {
    noise_power_w: f64,
}

impl CapacityEstimator {
    pub fn new(noise_power_dbm: f64) -> Self {
        Self { noise_power_w: dbm_to_watts(noise_power_dbm) }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.noise_power_dbm())
    }

    pub fn noise_power_w(&self) -> f64 {
        self.noise_power_w
    }

    /// Per-stream SINR and capacity of the coded channel `B_ur * H_eff * B_b`.
    pub fn coded_capacity(&self, h_coded: &CMatrix) -> Result<CapacitySample> {
        let (rows, cols) = h_coded.shape();
        if rows != cols {
            return Err(LinkError::DimensionMismatch {
                op: "coded channel must be square",
                expected: rows,
                found: cols,
            });
        }

        let streams: Vec<StreamMetrics> = (0..rows)
            .map(|k| {
                let signal_w = h_coded[(k, k)].norm_sqr();
                let interference_w: f64 = (0..cols).filter(|&j| j != k).map(|j| h_coded[(k, j)].norm_sqr()).sum();
                let capacity = (1.0 + signal_w / (self.noise_power_w + interference_w)).log2();
                StreamMetrics { signal_w, interference_w, capacity }
            })
            .collect();
        let total = streams.iter().map(|s| s.capacity).sum();
        Ok(CapacitySample { streams, total })
    }

    /// Applies the digital stage to an effective-CSI reduction and evaluates capacity.
    pub fn estimate<P, C>(&self, effective: &CsiReduction, precoder: &P, combiner: &C) -> Result<CapacitySample>
    where
        P: DigitalPrecoderProvider + ?Sized,
        C: DigitalCombinerProvider + ?Sized,
    {
        let power_w = dbm_to_watts(precoder.tx_power_dbm());
        let num_streams = effective.v.ncols();

        let b_b = precoder.digital_precoder(power_w, num_streams, &effective.v)?;
        let b_ur = combiner.digital_combiner(&effective.u)?;

        let h_eff = &effective.channel;
        if b_ur.ncols() != h_eff.nrows() {
            return Err(LinkError::DimensionMismatch {
                op: "digital combiner x effective channel",
                expected: h_eff.nrows(),
                found: b_ur.ncols(),
            });
        }
        if h_eff.ncols() != b_b.nrows() {
            return Err(LinkError::DimensionMismatch {
                op: "effective channel x digital precoder",
                expected: h_eff.ncols(),
                found: b_b.nrows(),
            });
        }

        self.coded_capacity(&(b_ur * h_eff * b_b))
    }
}

/// Monte-Carlo averager for one BS/UAV placement.
///
/// Each trial: fresh channel, full CSI, effective CSI through the fixed
/// analog beamformers, digital precoding and capacity. The mean over all
/// trials is scaled by [`HALF_DUPLEX_FACTOR`]. Any failing trial fails the
/// whole estimate.
pub struct LinkSimulator<'a, P: ?Sized, C: ?Sized> {
    pub bs: &'a P,
    pub uav: &'a C,
    pub tx: ChannelEndpoint,
    pub rx: ChannelEndpoint,
    pub streams: usize,
    generator: ChannelGenerator,
    estimator: CapacityEstimator,
}

impl<'a, P, C> LinkSimulator<'a, P, C>
where
    P: DigitalPrecoderProvider + Sync + ?Sized,
    C: DigitalCombinerProvider + Sync + ?Sized,
{
    pub fn new(
        bs: &'a P,
        uav: &'a C,
        tx: ChannelEndpoint,
        rx: ChannelEndpoint,
        streams: usize,
        config: LinkConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bs,
            uav,
            tx,
            rx,
            streams,
            generator: ChannelGenerator::new(config),
            estimator: CapacityEstimator::from_config(&config),
        })
    }

    pub fn config(&self) -> &LinkConfig {
        self.generator.config()
    }

    pub fn estimator(&self) -> &CapacityEstimator {
        &self.estimator
    }

    /// One pass of the pipeline.
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CapacitySample> {
        let channel = self.generator.generate(&self.tx, &self.rx, rng)?;
        let full = full_csi(channel.h, self.streams)?;
        let effective = effective_csi(
            &full.channel,
            self.bs.analog_precoder(),
            self.uav.analog_combiner(),
            self.streams,
        )?;
        self.estimator.estimate(&effective, self.bs, self.uav)
    }

    fn checked_total<R: Rng + ?Sized>(&self, trial: usize, rng: &mut R) -> Result<f64> {
        let sample = self.run_trial(rng)?;
        if !sample.total.is_finite() {
            return Err(LinkError::NonFiniteCapacity { trial });
        }
        debug!("trial {} capacity {:.4} bps/Hz", trial, sample.total);
        Ok(sample.total)
    }

    /// Sequential estimate drawing every trial from `rng`.
    pub fn estimate_mean_capacity<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let trials = self.config().trials;
        let mut samples = Vec::with_capacity(trials);
        for trial in 0..trials {
            samples.push(self.checked_total(trial, rng)?);
        }
        Ok(half_duplex_mean(&samples))
    }

    /// Parallel estimate. Trial `i` uses stream `i` of a ChaCha generator
    /// seeded with `seed`, so the result does not depend on scheduling.
    pub fn estimate_mean_capacity_seeded(&self, seed: u64) -> Result<f64> {
        let samples = (0..self.config().trials)
            .into_par_iter()
            .map(|trial| {
                let mut rng = trial_rng(seed, trial);
                self.checked_total(trial, &mut rng)
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(half_duplex_mean(&samples))
    }
}

pub fn trial_rng(seed: u64, trial: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial as u64);
    rng
}

fn half_duplex_mean(samples: &[f64]) -> f64 {
    HALF_DUPLEX_FACTOR * samples.iter().sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_single_stream_shannon() {
        let est = CapacityEstimator::new(-90.0);
        let n = est.noise_power_w();
        let h = CMatrix::from_element(1, 1, Complex64::new(3.0 * n.sqrt(), 0.0));
        let sample = est.coded_capacity(&h).unwrap();
        assert!((sample.total - (1.0f64 + 9.0).log2()).abs() < 1e-12);
        assert_eq!(sample.streams[0].interference_w, 0.0);
    }

    #[test]
    fn test_interference_is_off_diagonal_row_energy() {
        let est = CapacityEstimator::new(-90.0);
        let h = CMatrix::from_row_slice(
            2,
            2,
            &[Complex64::new(1.0, 0.0), Complex64::new(0.0, 2.0), Complex64::new(3.0, 0.0), Complex64::new(0.0, -4.0)],
        );
        let sample = est.coded_capacity(&h).unwrap();
        assert_eq!(sample.streams[0].signal_w, 1.0);
        assert_eq!(sample.streams[0].interference_w, 4.0);
        assert_eq!(sample.streams[1].signal_w, 16.0);
        assert_eq!(sample.streams[1].interference_w, 9.0);
        let expected: f64 = sample.streams.iter().map(|s| s.capacity).sum();
        assert_eq!(sample.total, expected);
    }

    #[test]
    fn test_zero_signal_gives_zero_capacity() {
        let est = CapacityEstimator::new(-90.0);
        let sample = est.coded_capacity(&CMatrix::zeros(3, 3)).unwrap();
        assert_eq!(sample.total, 0.0);
    }

    #[test]
    fn test_non_square_coded_channel_rejected() {
        let est = CapacityEstimator::new(-90.0);
        assert!(est.coded_capacity(&CMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_half_duplex_mean() {
        assert_eq!(half_duplex_mean(&[2.0, 4.0]), 1.5);
    }

    #[test]
    fn test_trial_rngs_are_independent_streams() {
        let mut a = trial_rng(7, 0);
        let mut b = trial_rng(7, 1);
        let mut a2 = trial_rng(7, 0);
        let x: u64 = a.gen_range(0..u64::MAX);
        let y: u64 = b.gen_range(0..u64::MAX);
        assert_ne!(x, y);
        assert_eq!(x, a2.gen_range(0..u64::MAX));
    }
}

//! One realization of the clustered geometric mmWave channel.
//!
//! `H = A_R * diag(g) * A_T^T` with `g_p = sqrt(PL(d_p)) * z_p`, `z_p` complex
//! Gaussian of variance `1/num_paths` so the fading carries unit total power.
//! Every call draws fresh angles, distances and fading from `rng`.

use nalgebra::DVector;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::geo::Position;
use crate::io::AngularStatistics;
use crate::physics::array::{steering_matrix_for, PathAngles};
use crate::physics::link_budget::path_power_gain;
use crate::physics::CMatrix;

/// What the generator needs to know about one end of the link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelEndpoint {
    pub location: Position,
    pub angles: AngularStatistics,
    pub elements: usize,
}

#[derive(Debug, Clone)]
pub struct ChannelRealization {
    /// `(N_r, N_T)`
    pub h: CMatrix,
    /// Receive steering matrix `(N_r, num_paths)`.
    pub a_r: CMatrix,
    /// Transmit steering matrix `(N_T, num_paths)`.
    pub a_t: CMatrix,
    /// Complex per-path gains (diagonal of the path-gain matrix).
    pub path_gains: DVector<Complex64>,
}

impl ChannelRealization {
    pub fn path_gain_matrix(&self) -> CMatrix {
        CMatrix::from_diagonal(&self.path_gains)
    }
}

fn draw_angles<R: Rng + ?Sized>(rng: &mut R, mean: f64, spread: f64, n: usize) -> Vec<f64> {
    (0..n).map(|_| mean + rng.gen_range(-1.0f64..1.0) * spread).collect()
}

fn draw_path_angles<R: Rng + ?Sized>(rng: &mut R, stats: AngularStatistics, n: usize) -> Vec<PathAngles> {
    let theta = draw_angles(rng, stats.mean_elevation_deg, stats.elevation_spread_deg, n);
    let phi = draw_angles(rng, stats.mean_azimuth_deg, stats.azimuth_spread_deg, n);
    theta.into_iter().zip(phi).map(|(t, p)| PathAngles::new(t, p)).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelGenerator {
    config: LinkConfig,
}

impl ChannelGenerator {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        tx: &ChannelEndpoint,
        rx: &ChannelEndpoint,
        rng: &mut R,
    ) -> Result<ChannelRealization> {
        let l = self.config.num_paths;
        let distance = rx.location.distance_to(tx.location);

        let departures = draw_path_angles(rng, tx.angles, l);
        let arrivals = draw_path_angles(rng, rx.angles, l);
        let a_t = steering_matrix_for(&departures, tx.elements)?;
        let a_r = steering_matrix_for(&arrivals, rx.elements)?;

        let ref_loss_db = self.config.free_space_reference_loss_db();
        let path_loss: Vec<f64> = (0..l)
            .map(|_| {
                let d = rng.gen_range(0.0f64..1.0) * distance;
                path_power_gain(ref_loss_db, d, self.config.path_loss_exponent, self.config.min_path_distance_m)
            })
            .collect();

        let sigma = (1.0 / (2.0 * l as f64)).sqrt();
        let re: Vec<f64> = (0..l).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        let im: Vec<f64> = (0..l).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();

        let path_gains = DVector::from_iterator(
            l,
            (0..l).map(|p| Complex64::new(re[p], im[p]) * (sigma * path_loss[p].sqrt())),
        );

        let mut weighted = a_r.clone();
        for (p, g) in path_gains.iter().enumerate() {
            let mut column = weighted.column_mut(p);
            column *= *g;
        }
        let h = weighted * a_t.transpose();

        Ok(ChannelRealization { h, a_r, a_t, path_gains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn endpoints(distance: f64) -> (ChannelEndpoint, ChannelEndpoint) {
        let tx = ChannelEndpoint {
            location: Position::new(0.0, 0.0, 10.0),
            angles: AngularStatistics::new(90.0, 10.0, 0.0, 60.0),
            elements: 64,
        };
        let rx = ChannelEndpoint {
            location: Position::new(distance, 0.0, 10.0),
            angles: AngularStatistics::new(90.0, 10.0, 180.0, 60.0),
            elements: 16,
        };
        (tx, rx)
    }

    #[test]
    fn test_shapes() {
        let (tx, rx) = endpoints(50.0);
        let generator = ChannelGenerator::new(LinkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ch = generator.generate(&tx, &rx, &mut rng).unwrap();
        assert_eq!(ch.h.shape(), (16, 64));
        assert_eq!(ch.a_r.shape(), (16, 10));
        assert_eq!(ch.a_t.shape(), (64, 10));
        assert_eq!(ch.path_gains.len(), 10);
    }

    #[test]
    fn test_matches_factorized_form() {
        let (tx, rx) = endpoints(50.0);
        let generator = ChannelGenerator::new(LinkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let ch = generator.generate(&tx, &rx, &mut rng).unwrap();
        let rebuilt = &ch.a_r * ch.path_gain_matrix() * ch.a_t.transpose();
        assert!((rebuilt - &ch.h).norm() <= 1e-9 * ch.h.norm());
    }

    #[test]
    fn test_fresh_draws_each_call() {
        let (tx, rx) = endpoints(50.0);
        let generator = ChannelGenerator::new(LinkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let a = generator.generate(&tx, &rx, &mut rng).unwrap();
        let b = generator.generate(&tx, &rx, &mut rng).unwrap();
        assert!((a.h - b.h).norm() > 0.0);
    }

    #[test]
    fn test_same_seed_same_channel() {
        let (tx, rx) = endpoints(50.0);
        let generator = ChannelGenerator::new(LinkConfig::default());
        let a = generator.generate(&tx, &rx, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = generator.generate(&tx, &rx, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a.h, b.h);
    }

    #[test]
    fn test_colocated_ends_stay_finite() {
        let (tx, mut rx) = endpoints(0.0);
        rx.location = tx.location;
        let generator = ChannelGenerator::new(LinkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let ch = generator.generate(&tx, &rx, &mut rng).unwrap();
        assert!(ch.h.iter().all(|z| z.re.is_finite() && z.im.is_finite()));
        assert!(ch.h.norm() > 0.0);
    }

    #[test]
    fn test_non_square_receiver_rejected() {
        let (tx, mut rx) = endpoints(50.0);
        rx.elements = 15;
        let generator = ChannelGenerator::new(LinkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(generator.generate(&tx, &rx, &mut rng).is_err());
    }

    #[test]
    fn test_fading_has_unit_average_power() {
        // with pathloss factored out, E[sum |z_p|^2] = 1
        let (tx, rx) = endpoints(1.0);
        let config = LinkConfig { min_path_distance_m: 1.0, ..Default::default() };
        let generator = ChannelGenerator::new(config);
        let pl = path_power_gain(config.free_space_reference_loss_db(), 1.0, config.path_loss_exponent, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let n = 4000;
        let mut acc = 0.0;
        for _ in 0..n {
            let ch = generator.generate(&tx, &rx, &mut rng).unwrap();
            acc += ch.path_gains.iter().map(|g| g.norm_sqr()).sum::<f64>() / pl;
        }
        let mean = acc / n as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean fading power {}", mean);
    }
}

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LinkError, Result};
use crate::physics::link_budget::{free_space_reference_loss_db, noise_power_dbm};

/// Link-level parameters, fixed for the lifetime of a simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub bandwidth_hz: f64,
    pub ref_path_loss_db: f64,
    pub num_paths: usize,
    pub carrier_ghz: f64,
    pub path_loss_exponent: f64,
    /// Monte-Carlo trials per estimate.
    pub trials: usize,
    /// Per-path distances are floored here before the power law is applied.
    pub min_path_distance_m: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bandwidth_hz: 5e8,
            ref_path_loss_db: 61.34,
            num_paths: 10,
            carrier_ghz: 28.0,
            path_loss_exponent: 3.6,
            trials: 100,
            min_path_distance_m: 1.0,
        }
    }
}

impl LinkConfig {
    pub fn noise_power_dbm(&self) -> f64 {
        noise_power_dbm(self.bandwidth_hz)
    }

    /// Reference loss the channel generator applies to every path.
    pub fn free_space_reference_loss_db(&self) -> f64 {
        free_space_reference_loss_db(self.carrier_ghz)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bandwidth_hz > 0.0) {
            return Err(LinkError::InvalidConfig(format!("bandwidth must be positive, got {}", self.bandwidth_hz)));
        }
        if !(self.carrier_ghz > 0.0) {
            return Err(LinkError::InvalidConfig(format!("carrier must be positive, got {} GHz", self.carrier_ghz)));
        }
        if !(self.path_loss_exponent > 0.0) {
            return Err(LinkError::InvalidConfig(format!(
                "path-loss exponent must be positive, got {}",
                self.path_loss_exponent
            )));
        }
        if !(self.min_path_distance_m > 0.0) {
            return Err(LinkError::InvalidConfig(format!(
                "minimum path distance must be positive, got {}",
                self.min_path_distance_m
            )));
        }
        if self.num_paths == 0 {
            return Err(LinkError::InvalidConfig("at least one path is required".into()));
        }
        if self.trials == 0 {
            return Err(LinkError::InvalidConfig("at least one trial is required".into()));
        }

        let fspl = self.free_space_reference_loss_db();
        if (fspl - self.ref_path_loss_db).abs() > 0.5 {
            warn!(
                "ref_path_loss_db = {:.2} dB differs from free-space reference {:.2} dB at {} GHz; using free-space value",
                self.ref_path_loss_db, fspl, self.carrier_ghz
            );
        }
        Ok(())
    }
}

/// Grid of UAV positions evaluated by the spatial sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub n_steps: usize,
    pub n_levels: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            n_steps: 10,
            n_levels: 10,
            x_min: 0.0,
            x_max: 100.0,
            y_min: 0.0,
            y_max: 100.0,
            seed: 0,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(LinkError::InvalidConfig("sweep needs at least one step".into()));
        }
        if self.x_max < self.x_min || self.y_max < self.y_min {
            return Err(LinkError::InvalidConfig("sweep bounds are inverted".into()));
        }
        Ok(())
    }
}

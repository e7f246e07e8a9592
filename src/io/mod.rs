use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beamforming::{
    analog_combiner, analog_precoder, codebook_directions, equal_power_precoder, matched_combiner,
    DigitalCombinerProvider, DigitalPrecoderProvider,
};
use crate::config::{LinkConfig, SweepConfig};
use crate::error::{LinkError, Result};
use crate::geo::Position;
use crate::physics::array::array_side;
use crate::physics::channel::ChannelEndpoint;
use crate::physics::CMatrix;

/// Slow-varying angular statistics of one link end, degrees.
/// Path angles are drawn uniformly within `mean +/- spread`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngularStatistics {
    pub mean_elevation_deg: f64,
    pub elevation_spread_deg: f64,
    pub mean_azimuth_deg: f64,
    pub azimuth_spread_deg: f64,
}

impl AngularStatistics {
    pub fn new(mean_elevation_deg: f64, elevation_spread_deg: f64, mean_azimuth_deg: f64, azimuth_spread_deg: f64) -> Self {
        Self { mean_elevation_deg, elevation_spread_deg, mean_azimuth_deg, azimuth_spread_deg }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStationConfig {
    pub location: Position,
    pub departure: AngularStatistics, // EAoD / AAoD
    pub n_t: usize,                   // perfect square
    pub n_s: usize,                   // spatial streams
    pub n_rf: usize,                  // RF chains
    pub tx_power_dbm: f64,
}

impl Default for BaseStationConfig {
    fn default() -> Self {
        Self {
            location: Position::new(50.0, 50.0, 10.0),
            departure: AngularStatistics::new(90.0, 10.0, 0.0, 60.0),
            n_t: 64,
            n_s: 2,
            n_rf: 4,
            tx_power_dbm: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UavConfig {
    pub location: Position,
    pub arrival: AngularStatistics, // EAoA / AAoA
    pub n_r: usize,
    pub n_rf: usize,
}

impl Default for UavConfig {
    fn default() -> Self {
        Self {
            location: Position::new(0.0, 0.0, 30.0),
            arrival: AngularStatistics::new(90.0, 10.0, 180.0, 60.0),
            n_r: 16,
            n_rf: 4,
        }
    }
}

/// Base station with its fixed analog precoder.
#[derive(Debug, Clone)]
pub struct BaseStation {
    pub config: BaseStationConfig,
    f_b: CMatrix,
}

impl BaseStation {
    pub fn new(config: BaseStationConfig) -> Result<Self> {
        array_side(config.n_t)?;
        if config.n_s == 0 || config.n_rf < config.n_s || config.n_t < config.n_rf {
            return Err(LinkError::InvalidConfig(format!(
                "base station needs 0 < n_s <= n_rf <= n_t, got n_s={} n_rf={} n_t={}",
                config.n_s, config.n_rf, config.n_t
            )));
        }
        let d = config.departure;
        let beams = codebook_directions(d.mean_elevation_deg, d.mean_azimuth_deg, d.azimuth_spread_deg, config.n_rf);
        let f_b = analog_precoder(&beams, config.n_t)?;
        debug!("BS analog precoder {}x{}", f_b.nrows(), f_b.ncols());
        Ok(Self { config, f_b })
    }

    pub fn location(&self) -> Position {
        self.config.location
    }

    pub fn departure(&self) -> AngularStatistics {
        self.config.departure
    }

    pub fn n_t(&self) -> usize {
        self.config.n_t
    }

    pub fn n_s(&self) -> usize {
        self.config.n_s
    }

    pub fn endpoint(&self) -> ChannelEndpoint {
        ChannelEndpoint {
            location: self.config.location,
            angles: self.config.departure,
            elements: self.config.n_t,
        }
    }
}

impl DigitalPrecoderProvider for BaseStation {
    fn tx_power_dbm(&self) -> f64 {
        self.config.tx_power_dbm
    }

    fn analog_precoder(&self) -> &CMatrix {
        &self.f_b
    }

    fn digital_precoder(&self, power_w: f64, num_streams: usize, v: &CMatrix) -> Result<CMatrix> {
        equal_power_precoder(&self.f_b, power_w, num_streams, v)
    }
}

/// Aerial relay with its fixed analog combiner. Its position moves during a sweep.
#[derive(Debug, Clone)]
pub struct Uav {
    pub config: UavConfig,
    f_ur: CMatrix,
}

impl Uav {
    pub fn new(config: UavConfig) -> Result<Self> {
        array_side(config.n_r)?;
        if config.n_rf == 0 || config.n_r < config.n_rf {
            return Err(LinkError::InvalidConfig(format!(
                "UAV needs 0 < n_rf <= n_r, got n_rf={} n_r={}",
                config.n_rf, config.n_r
            )));
        }
        let a = config.arrival;
        let beams = codebook_directions(a.mean_elevation_deg, a.mean_azimuth_deg, a.azimuth_spread_deg, config.n_rf);
        let f_ur = analog_combiner(&beams, config.n_r)?;
        Ok(Self { config, f_ur })
    }

    pub fn location(&self) -> Position {
        self.config.location
    }

    pub fn arrival(&self) -> AngularStatistics {
        self.config.arrival
    }

    pub fn n_r(&self) -> usize {
        self.config.n_r
    }

    pub fn endpoint(&self) -> ChannelEndpoint {
        ChannelEndpoint {
            location: self.config.location,
            angles: self.config.arrival,
            elements: self.config.n_r,
        }
    }

    /// Moves the UAV on the ground plane, altitude unchanged.
    pub fn set_location(&mut self, x: f64, y: f64) {
        self.config.location = self.config.location.with_ground(x, y);
    }

    /// Copy of this UAV placed at `(x, y)`.
    pub fn with_location(&self, x: f64, y: f64) -> Self {
        let mut moved = self.clone();
        moved.set_location(x, y);
        moved
    }
}

impl DigitalCombinerProvider for Uav {
    fn analog_combiner(&self) -> &CMatrix {
        &self.f_ur
    }

    fn digital_combiner(&self, u: &CMatrix) -> Result<CMatrix> {
        if u.nrows() != self.f_ur.nrows() {
            return Err(LinkError::DimensionMismatch {
                op: "digital combiner",
                expected: self.f_ur.nrows(),
                found: u.nrows(),
            });
        }
        Ok(matched_combiner(u))
    }
}

/// Everything needed to run one link study, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub base_station: BaseStationConfig,
    pub uav: UavConfig,
    pub link: LinkConfig,
    pub sweep: SweepConfig,
}

impl Scenario {
    pub fn build(&self) -> Result<(BaseStation, Uav)> {
        self.link.validate()?;
        self.sweep.validate()?;
        Ok((BaseStation::new(self.base_station.clone())?, Uav::new(self.uav.clone())?))
    }
}

pub fn load_scenario_from_json(path: &str) -> anyhow::Result<Scenario> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = std::io::BufReader::new(file);
    let scenario: Scenario =
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse scenario {:?}", path))?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entities_build() {
        let (bs, uav) = Scenario::default().build().unwrap();
        assert_eq!(bs.analog_precoder().shape(), (64, 4));
        assert_eq!(uav.analog_combiner().shape(), (4, 16));
        assert_eq!(bs.n_s(), 2);
    }

    #[test]
    fn test_non_square_bs_rejected() {
        let cfg = BaseStationConfig { n_t: 48, ..Default::default() };
        assert_eq!(BaseStation::new(cfg).unwrap_err(), LinkError::NonSquareArray { elements: 48 });
    }

    #[test]
    fn test_streams_above_rf_chains_rejected() {
        let cfg = BaseStationConfig { n_s: 5, n_rf: 4, ..Default::default() };
        assert!(matches!(BaseStation::new(cfg), Err(LinkError::InvalidConfig(_))));
    }

    #[test]
    fn test_set_location_keeps_altitude() {
        let mut uav = Uav::new(UavConfig::default()).unwrap();
        uav.set_location(12.0, -3.0);
        assert_eq!(uav.location(), Position::new(12.0, -3.0, 30.0));

        let moved = uav.with_location(1.0, 2.0);
        assert_eq!(moved.location(), Position::new(1.0, 2.0, 30.0));
        assert_eq!(uav.location(), Position::new(12.0, -3.0, 30.0));
    }

    #[test]
    fn test_scenario_json_round_trip_with_defaults() {
        let json = r#"{ "base_station": { "n_t": 16, "n_rf": 2 }, "link": { "trials": 5 } }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.base_station.n_t, 16);
        assert_eq!(scenario.base_station.n_s, 2);
        assert_eq!(scenario.link.trials, 5);
        assert_eq!(scenario.uav, UavConfig::default());
        assert!(scenario.build().is_ok());
    }
}

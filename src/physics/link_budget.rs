// Thermal noise floor at 290 K, dBm per Hz
const THERMAL_NOISE_DBM_HZ: f64 = -174.0;

// Free-space loss at 1 m: 20*log10(4*pi/c) + 20*log10(f) with f in GHz
const FSPL_1M_OFFSET_DB: f64 = 32.4;

pub fn db_to_linear(db: f64) -> f64 {
    10.0f64.powf(db / 10.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// dBm to watts (dBW = dBm - 30).
pub fn dbm_to_watts(dbm: f64) -> f64 {
    db_to_linear(dbm - 30.0)
}

/// Noise power over the whole band, in dBm.
pub fn noise_power_dbm(bandwidth_hz: f64) -> f64 {
    THERMAL_NOISE_DBM_HZ + linear_to_db(bandwidth_hz)
}

pub fn free_space_reference_loss_db(carrier_ghz: f64) -> f64 {
    FSPL_1M_OFFSET_DB + 20.0 * carrier_ghz.log10()
}

/// Linear large-scale power gain of one path: 10^(-PL/10) * d^(-n).
///
/// `d` is clamped to `min_distance_m`; the model is only meaningful beyond the
/// reference distance and `0^(-n)` would blow up.
pub fn path_power_gain(ref_loss_db: f64, distance_m: f64, exponent: f64, min_distance_m: f64) -> f64 {
    let d = distance_m.max(min_distance_m);
    db_to_linear(-ref_loss_db) * d.powf(-exponent)
}

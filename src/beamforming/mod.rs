//! Hybrid beamformer interfaces.
//!
//! The capacity pipeline never reaches into BS/UAV state directly: it asks a
//! [`DigitalPrecoderProvider`] and a [`DigitalCombinerProvider`] for the fixed
//! analog stage and for per-trial digital matrices. Antenna indices follow
//! [`crate::physics::array::element_grid`].

use num_complex::Complex64;

use crate::error::{LinkError, Result};
use crate::physics::array::{array_side, steering_vector, PathAngles};
use crate::physics::CMatrix;

/// Transmit side of the link (the BS).
pub trait DigitalPrecoderProvider {
    fn tx_power_dbm(&self) -> f64;

    /// Fixed analog precoder `F_b`, shape `(N_T, N_RF)`.
    fn analog_precoder(&self) -> &CMatrix;

    /// Baseband precoder `B_b`, shape `(N_RF, num_streams)`, for the right
    /// singular vectors `v` of the effective channel.
    fn digital_precoder(&self, power_w: f64, num_streams: usize, v: &CMatrix) -> Result<CMatrix>;
}

/// Receive side of the link (the UAV).
pub trait DigitalCombinerProvider {
    /// Fixed analog combiner `F_ur`, shape `(N_RF, N_r)`.
    fn analog_combiner(&self) -> &CMatrix;

    /// Baseband combiner `B_ur`, shape `(num_streams, N_RF)`.
    fn digital_combiner(&self, u: &CMatrix) -> Result<CMatrix>;
}

/// Beam directions of an `n_rf` codebook: mean elevation, azimuths evenly
/// spread across `mean_azimuth +/- azimuth_spread`.
pub fn codebook_directions(
    mean_elevation_deg: f64,
    mean_azimuth_deg: f64,
    azimuth_spread_deg: f64,
    n_rf: usize,
) -> Vec<PathAngles> {
    (0..n_rf)
        .map(|k| {
            let offset = (2.0 * k as f64 + 1.0) / n_rf as f64 - 1.0;
            PathAngles::new(mean_elevation_deg, mean_azimuth_deg + offset * azimuth_spread_deg)
        })
        .collect()
}

/// Matched analog precoder: column `k` is `conj(a(beam_k)) / sqrt(N)`.
pub fn analog_precoder(beams: &[PathAngles], elements: usize) -> Result<CMatrix> {
    let side = array_side(elements)?;
    let scale = 1.0 / (elements as f64).sqrt();
    let mut f = CMatrix::zeros(elements, beams.len());
    for (k, beam) in beams.iter().enumerate() {
        let a = steering_vector(*beam, side);
        f.set_column(k, &(a.conjugate() * Complex64::from(scale)));
    }
    Ok(f)
}

/// Matched analog combiner: row `k` is `a(beam_k)^T / sqrt(N)`.
///
/// The channel applies receive steering vectors unconjugated, so the matched
/// combiner row conjugates them: `a^H`.
pub fn analog_combiner(beams: &[PathAngles], elements: usize) -> Result<CMatrix> {
    Ok(analog_precoder(beams, elements)?.transpose())
}

/// Equal power per stream: column `k` is `sqrt(P / N_s) * v_k / ||F_b v_k||`,
/// so the power radiated after the analog stage sums to `P`.
pub fn equal_power_precoder(
    f_b: &CMatrix,
    power_w: f64,
    num_streams: usize,
    v: &CMatrix,
) -> Result<CMatrix> {
    if v.ncols() != num_streams {
        return Err(LinkError::DimensionMismatch {
            op: "digital precoder streams",
            expected: num_streams,
            found: v.ncols(),
        });
    }
    if f_b.ncols() != v.nrows() {
        return Err(LinkError::DimensionMismatch {
            op: "digital precoder rows",
            expected: f_b.ncols(),
            found: v.nrows(),
        });
    }

    let per_stream = (power_w / num_streams as f64).sqrt();
    let mut b = v.clone();
    for k in 0..num_streams {
        let radiated = (f_b * v.column(k)).norm();
        // a stream the analog stage cannot radiate gets no power
        let gain = if radiated > 0.0 { per_stream / radiated } else { 0.0 };
        let mut column = b.column_mut(k);
        column *= Complex64::from(gain);
    }
    Ok(b)
}

/// Conjugate-transpose combiner, `U^H`.
pub fn matched_combiner(u: &CMatrix) -> CMatrix {
    u.adjoint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::array::steering_matrix;

    #[test]
    fn test_codebook_spans_spread() {
        let beams = codebook_directions(90.0, 0.0, 60.0, 4);
        let az: Vec<f64> = beams.iter().map(|b| b.azimuth_deg).collect();
        assert_eq!(az, vec![-45.0, -15.0, 15.0, 45.0]);
        assert!(beams.iter().all(|b| b.elevation_deg == 90.0));

        let single = codebook_directions(80.0, 30.0, 60.0, 1);
        assert_eq!(single[0].azimuth_deg, 30.0);
    }

    #[test]
    fn test_analog_columns_unit_norm() {
        let beams = codebook_directions(90.0, 0.0, 60.0, 4);
        let f = analog_precoder(&beams, 64).unwrap();
        assert_eq!(f.shape(), (64, 4));
        for k in 0..4 {
            assert!((f.column(k).norm() - 1.0).abs() < 1e-12);
        }
        let w = analog_combiner(&beams, 16).unwrap();
        assert_eq!(w.shape(), (4, 16));
    }

    #[test]
    fn test_matched_beam_gain_is_sqrt_n() {
        // beam steered exactly at the path: |a^T conj(a)| / sqrt(N) = sqrt(N)
        let beam = PathAngles::new(60.0, 20.0);
        let f = analog_precoder(&[beam], 16).unwrap();
        let a = steering_matrix(&[beam], 4);
        let g = (a.transpose() * &f)[(0, 0)];
        assert!((g.norm() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_power_precoder_radiates_budget() {
        let beams = codebook_directions(90.0, 0.0, 60.0, 4);
        let f_b = analog_precoder(&beams, 64).unwrap();
        let v = CMatrix::identity(4, 2);
        let b = equal_power_precoder(&f_b, 2.0, 2, &v).unwrap();
        let radiated = (&f_b * &b).norm_squared();
        assert!((radiated - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_power_precoder_checks_streams() {
        let f_b = CMatrix::identity(4, 4);
        let v = CMatrix::identity(4, 2);
        let err = equal_power_precoder(&f_b, 1.0, 3, &v).unwrap_err();
        assert!(matches!(err, LinkError::DimensionMismatch { expected: 3, found: 2, .. }));
    }
}

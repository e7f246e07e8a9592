//! SVD-based channel-state reduction.
//!
//! Keeps the `N_s` dominant singular directions of a channel, either the full
//! antenna-domain channel or the one seen through the analog beamformers.

use nalgebra::DVector;

use crate::error::{LinkError, Result};
use crate::physics::CMatrix;

#[derive(Debug, Clone)]
pub struct CsiReduction {
    /// The matrix that was decomposed (`H` or `H_eff`).
    pub channel: CMatrix,
    /// Left singular vectors, first `streams` columns.
    pub u: CMatrix,
    /// Right singular vectors, first `streams` columns.
    pub v: CMatrix,
    /// All singular values, non-increasing.
    pub singular_values: DVector<f64>,
    pub streams: usize,
}

impl CsiReduction {
    pub fn kept_singular_values(&self) -> DVector<f64> {
        self.singular_values.rows(0, self.streams).into_owned()
    }

    /// Share of the channel energy held by the kept streams.
    pub fn power_capture_ratio(&self) -> Result<f64> {
        power_capture_ratio(&self.singular_values, self.streams)
    }
}

/// `sum(s_i^2, i < n) / sum(s_i^2)` for descending singular values `s`.
pub fn power_capture_ratio(singular_values: &DVector<f64>, n: usize) -> Result<f64> {
    let total: f64 = singular_values.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return Err(LinkError::ZeroChannelEnergy);
    }
    let kept: f64 = singular_values.iter().take(n).map(|s| s * s).sum();
    Ok((kept / total).min(1.0))
}

/// Thin SVD of `channel`, truncated to the `streams` strongest directions.
///
/// `streams` larger than `min(rows, cols)` is rejected rather than clipped.
pub fn reduce(channel: CMatrix, streams: usize) -> Result<CsiReduction> {
    let (rows, cols) = channel.shape();
    let rank = rows.min(cols);
    if streams > rank {
        return Err(LinkError::StreamsExceedRank { streams, rank });
    }

    let svd = channel
        .clone()
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or(LinkError::SvdDidNotConverge { rows, cols })?;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(LinkError::SvdDidNotConverge { rows, cols }),
    };

    // Descending order is the contract downstream; enforce it here.
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let singular_values = DVector::from_iterator(order.len(), order.iter().map(|&i| svd.singular_values[i]));
    let u = CMatrix::from_fn(rows, streams, |r, c| u[(r, order[c])]);
    let v = CMatrix::from_fn(cols, streams, |r, c| v_t[(order[c], r)].conj());

    Ok(CsiReduction { channel, u, v, singular_values, streams })
}

/// Full CSI: decomposition of the antenna-domain channel `H`.
pub fn full_csi(h: CMatrix, streams: usize) -> Result<CsiReduction> {
    reduce(h, streams)
}

/// Effective CSI: decomposition of `H_eff = F_ur * H * F_b`.
pub fn effective_csi(h: &CMatrix, f_b: &CMatrix, f_ur: &CMatrix, streams: usize) -> Result<CsiReduction> {
    if f_ur.ncols() != h.nrows() {
        return Err(LinkError::DimensionMismatch {
            op: "analog combiner x channel",
            expected: h.nrows(),
            found: f_ur.ncols(),
        });
    }
    if h.ncols() != f_b.nrows() {
        return Err(LinkError::DimensionMismatch {
            op: "channel x analog precoder",
            expected: h.ncols(),
            found: f_b.nrows(),
        });
    }
    reduce(f_ur * h * f_b, streams)
}

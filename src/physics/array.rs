//! Steering matrices for square uniform planar arrays.
//!
//! Elements sit on a `side x side` grid with half-wavelength spacing. Element
//! `n` has grid coordinates `(nx, ny) = (n % side, n / side)`: `nx` varies
//! fastest. Every analog beamformer in this crate indexes antennas through
//! [`element_grid`], so transmit/receive steering matrices and the analog
//! codebooks always agree. A provider that orders antennas differently will
//! not fail, it will silently steer the wrong way.

use std::f64::consts::PI;

use nalgebra::DVector;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};
use crate::physics::CMatrix;

/// Direction of one path, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathAngles {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

impl PathAngles {
    pub fn new(elevation_deg: f64, azimuth_deg: f64) -> Self {
        Self { elevation_deg, azimuth_deg }
    }

    /// Direction cosines (gamma_x, gamma_y).
    pub fn direction_cosines(&self) -> (f64, f64) {
        let theta = self.elevation_deg.to_radians();
        let phi = self.azimuth_deg.to_radians();
        (theta.sin() * phi.cos(), theta.sin() * phi.sin())
    }
}

/// Side length of the square grid holding `elements` antennas.
pub fn array_side(elements: usize) -> Result<usize> {
    let side = (elements as f64).sqrt().round() as usize;
    if elements == 0 || side * side != elements {
        return Err(LinkError::NonSquareArray { elements });
    }
    Ok(side)
}

/// Grid coordinates of every element in antenna-index order.
pub fn element_grid(side: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..side * side).map(move |n| (n % side, n / side))
}

pub fn steering_vector(angles: PathAngles, side: usize) -> DVector<Complex64> {
    let (gx, gy) = angles.direction_cosines();
    DVector::from_iterator(
        side * side,
        element_grid(side).map(|(nx, ny)| {
            Complex64::from_polar(1.0, -PI * (gx * nx as f64 + gy * ny as f64))
        }),
    )
}

/// `(side^2, paths.len())` matrix, column `p` is the steering vector of path `p`.
pub fn steering_matrix(paths: &[PathAngles], side: usize) -> CMatrix {
    let mut a = CMatrix::zeros(side * side, paths.len());
    for (p, angles) in paths.iter().enumerate() {
        a.set_column(p, &steering_vector(*angles, side));
    }
    a
}

/// Same as [`steering_matrix`] but takes the antenna count, failing on non-square arrays.
pub fn steering_matrix_for(paths: &[PathAngles], elements: usize) -> Result<CMatrix> {
    let side = array_side(elements)?;
    Ok(steering_matrix(paths, side))
}

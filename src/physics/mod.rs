use nalgebra::DMatrix;
use num_complex::Complex64;

pub mod array;
pub mod channel;
pub mod csi;
pub mod link_budget;

/// Dense complex matrix used for channels, steering matrices and beamformers.
pub type CMatrix = DMatrix<Complex64>;

pub mod beamforming;
pub mod capacity;
pub mod config;
pub mod error;
pub mod geo;
pub mod io;
pub mod physics;
pub mod render;
pub mod sweep;

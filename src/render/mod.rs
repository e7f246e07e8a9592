use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::sweep::CapacityMap;

// Low -> high rate
const SHADES: &[u8] = b" .:-=+*#%@";

#[derive(Debug, Serialize)]
struct RateRecord {
    x: f64,
    y: f64,
    rate_bps_hz: f64,
}

/// Writes the map in long format, one `x,y,rate_bps_hz` row per cell.
pub fn write_capacity_csv<W: Write>(map: &CapacityMap, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (i, &x) in map.xs.iter().enumerate() {
        for (j, &y) in map.ys.iter().enumerate() {
            wtr.serialize(RateRecord { x, y, rate_bps_hz: map.get(i, j) })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_capacity_csv(map: &CapacityMap, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_capacity_csv(map, file)
}

/// Band index in `0..n_levels` of `rate` between `min` and `max`.
pub fn level_of(rate: f64, min: f64, max: f64, n_levels: usize) -> usize {
    if n_levels <= 1 || max <= min {
        return 0;
    }
    let t = ((rate - min) / (max - min)).clamp(0.0, 1.0);
    ((t * n_levels as f64) as usize).min(n_levels - 1)
}

/// Text rendering of the map quantized into `n_levels` bands.
/// y grows upwards, x to the right, like the contour plot.
pub fn ascii_heat_map(map: &CapacityMap, n_levels: usize) -> String {
    let n_levels = n_levels.clamp(1, SHADES.len());
    let (min, max) = (map.min(), map.max());
    let mut out = String::new();
    for j in (0..map.ys.len()).rev() {
        for i in 0..map.xs.len() {
            let level = level_of(map.get(i, j), min, max, n_levels);
            // spread the used levels over the whole shade ramp
            let shade = if n_levels == 1 { 0 } else { level * (SHADES.len() - 1) / (n_levels - 1) };
            out.push(SHADES[shade] as char);
        }
        out.push('\n');
    }
    out
}

//! Sine lookup table
//!
//! One period `[0, 2π)` is sampled at `size` evenly spaced points. An input
//! `x` maps to entry `floor(x * size / 2π)`, the nearest sample at or below
//! `x`, so the lookup error is bounded by the sample spacing `2π / size`.
//!
//! Inputs outside one period are rejected rather than wrapped or clamped, and
//! so is an in-range input whose scaled index rounds up to `size`.

use crate::error::{Error, Result};
use ssr_runtime::{Address, Cluster, MemoryTier};
use std::f64::consts::TAU;

/// Default number of samples
pub const DEFAULT_TABLE_SIZE: usize = 1024;

/// Host copy of the table
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    values: Vec<f32>,
}

/// Table resident in cluster memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceTable {
    pub base: Address,
    pub size: usize,
    /// `size / 2π`, the scale applied to an input to get its index
    pub factor: f32,
}

impl LookupTable {
    /// Sample `sin` at `size` points over one period
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidTableSize(size));
        }
        let values = (0..size)
            .map(|i| (i as f64 * TAU / size as f64).sin() as f32)
            .collect();
        Ok(Self { values })
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample spacing, also the worst-case absolute error
    pub fn resolution(&self) -> f64 {
        TAU / self.size() as f64
    }

    /// Index of the sample for `x`
    pub fn index_of(&self, x: f64) -> Result<usize> {
        if !(0.0..TAU).contains(&x) {
            return Err(Error::LookupOutOfRange { value: x, size: self.size() });
        }
        self.index_for_scaled(x * self.size() as f64 / TAU)
            .ok_or(Error::LookupOutOfRange { value: x, size: self.size() })
    }

    /// Index for an input already multiplied by `size / 2π`
    ///
    /// `None` for NaN, negative values and anything at or past `size`.
    pub fn index_for_scaled(&self, scaled: f64) -> Option<usize> {
        scaled_index(scaled, self.size())
    }

    /// Sampled sine of `x`
    pub fn lookup(&self, x: f64) -> Result<f32> {
        Ok(self.values[self.index_of(x)?])
    }

    /// Copy the table into cluster memory
    pub fn upload(&self, cluster: &Cluster, tier: MemoryTier) -> Result<DeviceTable> {
        let base = cluster.upload(tier, &self.values)?;
        Ok(DeviceTable {
            base,
            size: self.size(),
            factor: (self.size() as f64 / TAU) as f32,
        })
    }
}

impl DeviceTable {
    /// Address of entry `index`
    pub fn entry(&self, index: usize) -> Address {
        self.base.element::<f32>(index)
    }

    /// Same rule as [`LookupTable::index_for_scaled`]
    pub fn index_for_scaled(&self, scaled: f64) -> Option<usize> {
        scaled_index(scaled, self.size)
    }

    /// Input that produced `scaled`, for error reports
    pub fn unscale(&self, scaled: f64) -> f64 {
        scaled / self.factor as f64
    }
}

fn scaled_index(scaled: f64, size: usize) -> Option<usize> {
    if scaled.is_nan() || scaled < 0.0 {
        return None;
    }
    let index = scaled.floor() as usize;
    (index < size).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssr_runtime::ClusterConfig;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_quarter_period_index() {
        let table = LookupTable::new(1024).unwrap();
        assert_eq!(table.index_of(FRAC_PI_2).unwrap(), 256);
        let value = table.lookup(FRAC_PI_2).unwrap() as f64;
        assert!((value - 1.0).abs() <= table.resolution());
    }

    #[test]
    fn test_error_bounded_by_resolution() {
        let table = LookupTable::new(256).unwrap();
        for i in 0..1000 {
            let x = i as f64 * TAU / 1000.0;
            let err = (table.lookup(x).unwrap() as f64 - x.sin()).abs();
            assert!(err <= table.resolution(), "x = {x}, err = {err}");
        }
    }

    #[test]
    fn test_rejects_out_of_period() {
        let table = LookupTable::new(1024).unwrap();
        for x in [-0.1, TAU, 2.0 * TAU, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(table.index_of(x), Err(Error::LookupOutOfRange { .. })),
                "x = {x} accepted"
            );
        }
        assert_eq!(table.index_of(0.0).unwrap(), 0);
        assert_eq!(table.index_of(PI).unwrap(), 512);
    }

    #[test]
    fn test_scaled_index_edge() {
        let table = LookupTable::new(8).unwrap();
        assert_eq!(table.index_for_scaled(7.999), Some(7));
        assert_eq!(table.index_for_scaled(8.0), None);
        assert_eq!(table.index_for_scaled(-0.5), None);
        assert_eq!(table.index_for_scaled(f64::NAN), None);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(LookupTable::new(0), Err(Error::InvalidTableSize(0))));
    }

    #[test]
    fn test_upload() {
        let cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let table = LookupTable::new(16).unwrap();
        let device = table.upload(&cluster, MemoryTier::L1).unwrap();
        assert_eq!(device.size, 16);
        assert_eq!(cluster.download::<f32>(device.base, 16).unwrap(), table.values());
    }
}

//! Binned coordinate axis.
//!
//! An `Axis` stores the single leftmost wall in `min` and the upper wall of
//! every bin in `top`; `mid` holds the bin centers used for interpolation.
//! Radial grids, angular grids, the frequency grid, and the random-walk CDF
//! abscissa all share this representation.

use serde::{Deserialize, Serialize};

/// A monotonically increasing set of bins over `[min, top.last()]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Leftmost bin wall
    pub min: f64,
    /// Upper wall of each bin
    pub top: Vec<f64>,
    /// Center of each bin
    pub mid: Vec<f64>,
}

impl Axis {
    /// Create an axis of `nbins` uniform bins spanning `[min, max]`.
    pub fn new(min: f64, max: f64, nbins: usize) -> Self {
        assert!(nbins > 0, "axis needs at least one bin");
        assert!(max > min, "axis must have positive extent");

        let del = (max - min) / nbins as f64;
        let top = (1..=nbins).map(|i| min + i as f64 * del).collect();
        let mid = (0..nbins).map(|i| min + (i as f64 + 0.5) * del).collect();
        Self { min, top, mid }
    }

    /// Create an axis from explicit bin tops; midpoints are the arithmetic
    /// centers of each bin.
    pub fn from_tops(min: f64, top: Vec<f64>) -> Self {
        assert!(!top.is_empty(), "axis needs at least one bin");
        let mut mid = Vec::with_capacity(top.len());
        let mut bottom = min;
        for &t in &top {
            assert!(t > bottom, "axis bin tops must increase");
            mid.push(0.5 * (t + bottom));
            bottom = t;
        }
        Self { min, top, mid }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.top.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Upper wall of the last bin.
    pub fn max(&self) -> f64 {
        *self.top.last().unwrap()
    }

    /// Bin containing `x`, or `None` if `x` lies outside `[min, max)`.
    ///
    /// Values mark bin tops, so a value exactly on a wall belongs to the bin
    /// below the wall.
    pub fn bin(&self, x: f64) -> Option<usize> {
        if x < self.min {
            return None;
        }
        let ind = self.top.partition_point(|&t| t <= x);
        if ind < self.top.len() {
            Some(ind)
        } else {
            None
        }
    }

    /// Bin containing `x`, with underflow folded into the first bin and
    /// overflow into the last. Used by the escape spectrum.
    pub fn bin_clamped(&self, x: f64) -> usize {
        let ind = self.top.partition_point(|&t| t <= x);
        ind.min(self.top.len() - 1)
    }

    /// Lower wall of bin `i`.
    pub fn bottom(&self, i: usize) -> f64 {
        if i == 0 {
            self.min
        } else {
            self.top[i - 1]
        }
    }

    /// Width of bin `i`.
    pub fn delta(&self, i: usize) -> f64 {
        self.top[i] - self.bottom(i)
    }

    /// Width of bin `i` in the cubed coordinate: top³ − bottom³.
    ///
    /// The frequency grid is sampled uniformly in ν³, for which this is the
    /// natural bin measure.
    pub fn delta3(&self, i: usize) -> f64 {
        let b = self.bottom(i);
        self.top[i].powi(3) - b.powi(3)
    }
}

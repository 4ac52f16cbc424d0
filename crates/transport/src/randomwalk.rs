//! First-passage-time table for the random-walk diffusion approximation.
//!
//! A packet deep inside a scattering-dominated region is advanced in one
//! move to the edge of a sphere of comoving radius R. The dwell time comes
//! from the first-passage distribution of a diffusing particle,
//!
//! ```text
//! P(x) = 1 − Σₙ 2(−1)ⁿ⁻¹ exp(−x n²π²/3),   x = Dt/R²,  1 ≤ n ≤ sum_n
//! ```
//!
//! tabulated once at startup on a linear x-axis and inverted by linear
//! interpolation during propagation.

use rayon::prelude::*;
use spacetime::Axis;

#[derive(Debug, Clone)]
pub struct RandomWalkCdf {
    x_axis: Axis,
    /// Cumulative probability at each bin top, normalized to end at 1
    cdf: Vec<f64>,
}

impl RandomWalkCdf {
    pub fn new(max_x: f64, npoints: usize, sum_n: usize) -> Self {
        assert!(max_x > 0.0);
        assert!(npoints > 0);
        assert!(sum_n > 0);

        let x_axis = Axis::new(0.0, max_x, npoints);
        let mut cdf: Vec<f64> = x_axis
            .top
            .par_iter()
            .map(|&x| {
                let mut sum = 0.0;
                for n in 1..=sum_n {
                    let mut term = 2.0 * (-x * (n as f64 * std::f64::consts::PI).powi(2) / 3.0).exp();
                    if n % 2 == 0 {
                        term = -term;
                    }
                    sum += term;
                }
                1.0 - sum
            })
            .collect();

        // the truncated series can dip slightly below its neighbors at tiny
        // x; force the table monotone before normalizing
        let mut running: f64 = 0.0;
        for v in &mut cdf {
            running = running.max(v.max(0.0));
            *v = running;
        }
        let last = *cdf.last().unwrap();
        assert!(last > 0.0);
        for v in &mut cdf {
            *v /= last;
        }

        Self { x_axis, cdf }
    }

    /// Invert the CDF: the x = Dt/R² at which the cumulative probability
    /// equals `u` ∈ [0, 1).
    pub fn invert(&self, u: f64) -> f64 {
        debug_assert!((0.0..=1.0).contains(&u));
        let i = self.cdf.partition_point(|&c| c < u);
        if i >= self.cdf.len() {
            return self.x_axis.max();
        }

        let (x0, c0) = if i == 0 {
            (self.x_axis.min, 0.0)
        } else {
            (self.x_axis.top[i - 1], self.cdf[i - 1])
        };
        let (x1, c1) = (self.x_axis.top[i], self.cdf[i]);

        if c1 <= c0 {
            return x1;
        }
        x0 + (x1 - x0) * (u - c0) / (c1 - c0)
    }

    /// Mean of the tabulated x = Dt/R² (the continuum value is 1/6).
    pub fn mean(&self) -> f64 {
        let mut mean = 0.0;
        let mut prev = 0.0;
        for (i, &c) in self.cdf.iter().enumerate() {
            mean += self.x_axis.mid[i] * (c - prev);
            prev = c;
        }
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RandomWalkCdf {
        RandomWalkCdf::new(2.0, 200, 1000)
    }

    #[test]
    fn cdf_is_monotone_and_normalized() {
        let t = table();
        for w in t.cdf.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!((t.cdf.last().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inversion_round_trips_through_the_table() {
        let t = table();
        for &u in &[0.05, 0.25, 0.5, 0.75, 0.95] {
            let x = t.invert(u);
            assert!(x > 0.0 && x <= 2.0);
            // CDF at the inverted point recovers u
            let i = t.x_axis.bin(x).unwrap_or(t.x_axis.len() - 1);
            let c_hi = t.cdf[i];
            let c_lo = if i == 0 { 0.0 } else { t.cdf[i - 1] };
            assert!(u >= c_lo - 1e-12 && u <= c_hi + 1e-12);
        }
    }

    #[test]
    fn mean_dwell_matches_diffusion_theory() {
        // ⟨Dt/R²⟩ = 1/6 for first passage out of a sphere
        let t = table();
        let mean = t.mean();
        assert!(
            (mean - 1.0 / 6.0).abs() < 0.01,
            "mean dwell {} should be ≈ 1/6",
            mean
        );
    }

    #[test]
    fn small_u_gives_small_dwell() {
        let t = table();
        assert!(t.invert(0.001) < t.invert(0.5));
        assert!(t.invert(0.999) > t.invert(0.5));
    }
}

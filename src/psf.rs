//! Sampling photon angular offsets from a point-spread function.

use std::f64::consts::PI;

use rand::Rng;

use crate::error::SimulationError;

/// Grid resolution used when building the run-wide offset sampler.
pub const PSF_GRID_NODES: usize = 1_000_000;

/// A reusable source of angular-offset draws. Implementations hold no
/// per-call mutable state; repeated draws consume only the caller's RNG.
pub trait DistanceSampler {
    /// Draw `n` independent offsets in one batch.
    fn sample_batch<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f64>;
}

/// Inverse-CDF sampler over a tabulated radial density.
///
/// With an isotropic azimuth, the density of the offset itself is
/// `angle * psf(angle)` (the solid-angle Jacobian). It is tabulated on a
/// uniform grid over `[0, pi]`, cumulated and normalized once; each draw
/// inverts the table with a binary search plus linear interpolation.
#[derive(Clone, Debug)]
pub struct InverseCdfSampler {
    nodes: Vec<f64>,
    cdf: Vec<f64>,
}

impl InverseCdfSampler {
    pub fn from_psf<F>(psf: F, n_nodes: usize) -> Result<Self, SimulationError>
    where
        F: Fn(f64) -> f64,
    {
        assert!(n_nodes >= 2, "the offset grid needs at least two nodes");
        let step = PI / (n_nodes - 1) as f64;
        let nodes: Vec<f64> = (0..n_nodes).map(|i| i as f64 * step).collect();

        let mut cdf = Vec::with_capacity(n_nodes);
        let mut total = 0.0;
        for &angle in &nodes {
            let value = psf(angle);
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::InvalidPsf { angle, value });
            }
            total += angle * value;
            cdf.push(total);
        }
        if total <= 0.0 {
            return Err(SimulationError::EmptyPsf);
        }
        for c in cdf.iter_mut() {
            *c /= total;
        }
        Ok(InverseCdfSampler { nodes, cdf })
    }

    fn invert(&self, u: f64) -> f64 {
        let idx = self.cdf.partition_point(|&c| c < u);
        if idx == 0 {
            return self.nodes[0];
        }
        if idx >= self.nodes.len() {
            return *self.nodes.last().unwrap();
        }
        let (c0, c1) = (self.cdf[idx - 1], self.cdf[idx]);
        let (x0, x1) = (self.nodes[idx - 1], self.nodes[idx]);
        if c1 > c0 {
            x0 + (x1 - x0) * (u - c0) / (c1 - c0)
        } else {
            x1
        }
    }
}

impl DistanceSampler for InverseCdfSampler {
    fn sample_batch<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.invert(rng.gen())).collect()
    }
}

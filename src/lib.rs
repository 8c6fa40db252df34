//! Synthesizes a photon-count map on a HEALPix sky from a population of
//! point sources: positions drawn from a spatial template, per-source fluxes
//! converted to Poisson photon counts through an exposure map, and each
//! photon scattered by the instrument point-spread function before being
//! accumulated into the map.

pub mod coordinates;
pub mod error;
pub mod healpix;
pub mod position;
pub mod psf;

use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, trace};
use ndarray::{Array2, ArrayView2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Poisson;
use rayon::prelude::*;

use crate::{
    coordinates::{RotMatrix, SphCoord, Vec3d},
    healpix::{
        pix::{ang2pix_ring, vec2pix_ring},
        utils::{npix2nside, nside2npix},
    },
    position::{PositionSampler, TemplateSampler},
    psf::{DistanceSampler, InverseCdfSampler, PSF_GRID_NODES},
};

pub use crate::error::SimulationError;

/// One diagnostic entry per (source, energy bin), recorded when requested.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceRecord {
    /// Source colatitude in radians.
    pub pol: f64,
    /// Source azimuth in radians.
    pub az: f64,
    /// The Poisson draw for this (source, bin).
    pub photons: u64,
    /// The Poisson mean: flux * flux_fraction * exposure at the source pixel.
    pub expected: f64,
    /// flux * flux_fraction, before the exposure factor.
    pub flux_in_bin: f64,
}

/// The result of a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationOutput {
    /// Photon counts, shape (energy bins, pixels).
    pub counts: Array2<f64>,
    /// Per-(source, bin) records; empty unless diagnostics were requested.
    pub records: Vec<SourceRecord>,
}

/// Simulates a counts map for `flux.len()` sources placed according to
/// `template`, with photons scattered by `psf`.
///
/// `template` holds per-pixel weights of a RING map and its length fixes the
/// resolution for the whole run. `exposure` has shape (energy bins, pixels)
/// with the template's pixel count; the number of bins comes from
/// `flux_fraction`. `psf` is a non-negative radial density of the angular
/// offset, and `r_roi` optionally caps the source colatitude. The caller
/// owns the RNG; seeding it makes the whole run reproducible.
#[allow(clippy::too_many_arguments)]
pub fn simulate_map<F, R>(
    flux: &[f64],
    template: &[f64],
    exposure: ArrayView2<f64>,
    psf: F,
    flux_fraction: &[f64],
    r_roi: Option<f64>,
    return_diagnostics: bool,
    rng: &mut R,
) -> Result<SimulationOutput, SimulationError>
where
    F: Fn(f64) -> f64,
    R: Rng,
{
    let nside = npix2nside(template.len()).ok_or(SimulationError::BadTemplateLength {
        npix: template.len(),
    })?;
    validate_inputs(flux, &exposure, flux_fraction, nside)?;
    let positions = TemplateSampler::new(template, r_roi)?;
    let distances = InverseCdfSampler::from_psf(psf, PSF_GRID_NODES)?;
    simulate_map_with(
        flux,
        exposure,
        flux_fraction,
        nside,
        &positions,
        &distances,
        return_diagnostics,
        rng,
    )
}

/// [`simulate_map`] with caller-supplied position and distance samplers.
#[allow(clippy::too_many_arguments)]
pub fn simulate_map_with<P, D, R>(
    flux: &[f64],
    exposure: ArrayView2<f64>,
    flux_fraction: &[f64],
    nside: usize,
    positions: &P,
    distances: &D,
    return_diagnostics: bool,
    rng: &mut R,
) -> Result<SimulationOutput, SimulationError>
where
    P: PositionSampler,
    D: DistanceSampler,
    R: Rng,
{
    validate_inputs(flux, &exposure, flux_fraction, nside)?;
    let npix = nside2npix(nside);
    let nebins = flux_fraction.len();
    debug!(
        "simulating {} sources over {} pixels and {} energy bins",
        flux.len(),
        npix,
        nebins
    );

    let mut counts = Array2::zeros((nebins, npix));
    let mut records = Vec::with_capacity(if return_diagnostics {
        flux.len() * nebins
    } else {
        0
    });
    let mut hits = Vec::new();
    for (source, &f) in flux.iter().enumerate() {
        let ptg = positions.sample_position(rng)?;
        hits.clear();
        scatter_source(
            source,
            f,
            ptg,
            &exposure,
            flux_fraction,
            nside,
            distances,
            return_diagnostics,
            rng,
            &mut hits,
            &mut records,
        )?;
        for &(bin, pixel) in &hits {
            counts[(bin, pixel)] += 1.0;
        }
    }
    Ok(SimulationOutput { counts, records })
}

/// [`simulate_map`] parallelized over sources. Each source draws from its
/// own `StdRng` stream derived from `seed` and the source index; partial
/// results are folded into the map in source order afterwards, so the output
/// is reproducible for a fixed seed regardless of worker scheduling.
#[allow(clippy::too_many_arguments)]
pub fn simulate_map_par<F>(
    flux: &[f64],
    template: &[f64],
    exposure: ArrayView2<f64>,
    psf: F,
    flux_fraction: &[f64],
    r_roi: Option<f64>,
    return_diagnostics: bool,
    seed: u64,
) -> Result<SimulationOutput, SimulationError>
where
    F: Fn(f64) -> f64 + Sync,
{
    let nside = npix2nside(template.len()).ok_or(SimulationError::BadTemplateLength {
        npix: template.len(),
    })?;
    validate_inputs(flux, &exposure, flux_fraction, nside)?;
    let positions = TemplateSampler::new(template, r_roi)?;
    let distances = InverseCdfSampler::from_psf(psf, PSF_GRID_NODES)?;
    let npix = nside2npix(nside);
    let nebins = flux_fraction.len();
    debug!(
        "simulating {} sources over {} pixels and {} energy bins ({} workers)",
        flux.len(),
        npix,
        nebins,
        rayon::current_num_threads()
    );

    let per_source: Vec<(Vec<(usize, usize)>, Vec<SourceRecord>)> = flux
        .par_iter()
        .enumerate()
        .map(|(source, &f)| {
            let mut rng =
                StdRng::seed_from_u64(seed ^ (source as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let ptg = positions.sample_position(&mut rng)?;
            let mut hits = Vec::new();
            let mut records = Vec::new();
            scatter_source(
                source,
                f,
                ptg,
                &exposure,
                flux_fraction,
                nside,
                &distances,
                return_diagnostics,
                &mut rng,
                &mut hits,
                &mut records,
            )?;
            Ok((hits, records))
        })
        .collect::<Result<_, SimulationError>>()?;

    let mut counts = Array2::zeros((nebins, npix));
    let mut records = Vec::new();
    for (hits, recs) in per_source {
        for (bin, pixel) in hits {
            counts[(bin, pixel)] += 1.0;
        }
        records.extend(recs);
    }
    Ok(SimulationOutput { counts, records })
}

/// Runs the per-bin, per-photon pipeline for one placed source, pushing a
/// (bin, pixel) entry per detected photon into `hits`.
#[allow(clippy::too_many_arguments)]
fn scatter_source<D, R>(
    source: usize,
    flux: f64,
    ptg: SphCoord<f64>,
    exposure: &ArrayView2<f64>,
    flux_fraction: &[f64],
    nside: usize,
    distances: &D,
    return_diagnostics: bool,
    rng: &mut R,
    hits: &mut Vec<(usize, usize)>,
    records: &mut Vec<SourceRecord>,
) -> Result<(), SimulationError>
where
    D: DistanceSampler,
    R: Rng,
{
    let pixel = ang2pix_ring(nside, ptg);
    // Photons are scattered around the pole in the local frame, then rotated
    // into the true direction as Rz(az + pi/2) * (Rx(pol) * v). The x-then-z
    // order matches the pixelization's polar convention and must not change.
    let rot_x = RotMatrix::about_axis_by_angle(&Vec3d::new(1.0, 0.0, 0.0), ptg.pol);
    let rot_z = RotMatrix::about_axis_by_angle(&Vec3d::new(0.0, 0.0, 1.0), ptg.az + FRAC_PI_2);
    let rot = rot_z * rot_x;

    for (bin, &fraction) in flux_fraction.iter().enumerate() {
        let flux_in_bin = flux * fraction;
        let expected = flux_in_bin * exposure[(bin, pixel)];
        let photons = if expected > 0.0 {
            // The inputs are finite, but their product can still overflow.
            if !expected.is_finite() {
                return Err(SimulationError::BadPoissonMean {
                    source_index: source,
                    bin,
                    mean: expected,
                });
            }
            let poisson = Poisson::new(expected).map_err(|_| SimulationError::BadPoissonMean {
                source_index: source,
                bin,
                mean: expected,
            })?;
            rng.sample(poisson) as u64
        } else {
            0
        };
        trace!(
            "source {} bin {}: expected {}, drew {} photons",
            source,
            bin,
            expected,
            photons
        );
        if return_diagnostics {
            records.push(SourceRecord {
                pol: ptg.pol,
                az: ptg.az,
                photons,
                expected,
                flux_in_bin,
            });
        }

        for offset in distances.sample_batch(rng, photons as usize) {
            let az = rng.gen::<f64>() * TAU;
            let v = rot * Vec3d::from_sph_coord(SphCoord::new(offset, az));
            hits.push((bin, vec2pix_ring(nside, &v)?));
        }
    }
    Ok(())
}

fn validate_inputs(
    flux: &[f64],
    exposure: &ArrayView2<f64>,
    flux_fraction: &[f64],
    nside: usize,
) -> Result<(), SimulationError> {
    let npix = nside2npix(nside);
    if exposure.nrows() != flux_fraction.len() {
        return Err(SimulationError::ExposureBinMismatch {
            got: exposure.nrows(),
            expected: flux_fraction.len(),
        });
    }
    if exposure.ncols() != npix {
        return Err(SimulationError::ExposurePixelMismatch {
            got: exposure.ncols(),
            expected: npix,
        });
    }
    for (index, &value) in flux.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::BadFlux { index, value });
        }
    }
    for (bin, &value) in flux_fraction.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::BadFluxFraction { bin, value });
        }
    }
    for ((bin, pixel), &value) in exposure.indexed_iter() {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::BadExposure { bin, pixel, value });
        }
    }
    Ok(())
}

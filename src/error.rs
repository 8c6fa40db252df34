//! Errors raised while synthesizing a counts map.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("The template has {npix} pixels, which is not 12*nside^2 for any nside")]
    BadTemplateLength { npix: usize },

    #[error("The exposure map has {got} energy bins, but the flux fractions define {expected}")]
    ExposureBinMismatch { got: usize, expected: usize },

    #[error("The exposure map has {got} pixels per bin, but the template has {expected}")]
    ExposurePixelMismatch { got: usize, expected: usize },

    #[error("flux[{index}] is negative or non-finite ({value})")]
    BadFlux { index: usize, value: f64 },

    #[error("template[{pixel}] is negative or non-finite ({value})")]
    BadTemplate { pixel: usize, value: f64 },

    #[error("exposure[{bin}, {pixel}] is negative or non-finite ({value})")]
    BadExposure { bin: usize, pixel: usize, value: f64 },

    #[error("flux_fraction[{bin}] is negative or non-finite ({value})")]
    BadFluxFraction { bin: usize, value: f64 },

    #[error("The PSF density is negative or non-finite at {angle} rad ({value})")]
    InvalidPsf { angle: f64, value: f64 },

    #[error("The PSF density is zero everywhere on [0, pi]; there is nothing to sample")]
    EmptyPsf,

    #[error("The template weights are all zero; no position can be accepted")]
    EmptyTemplate,

    #[error("The expected count for source {source_index} in bin {bin} is not finite ({mean})")]
    BadPoissonMean {
        source_index: usize,
        bin: usize,
        mean: f64,
    },

    #[error("A photon direction could not be pixelized: {reason}")]
    Pixelization { reason: String },

    #[error("The position sampler found no acceptable direction in {attempts} attempts")]
    PositionSamplerExhausted { attempts: usize },
}

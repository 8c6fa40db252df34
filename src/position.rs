//! Drawing source positions from a spatial template.

use std::f64::consts::PI;

use rand::Rng;

use crate::{
    coordinates::SphCoord,
    error::SimulationError,
    healpix::{pix::ang2pix_ring, utils::npix2nside},
};

/// Attempts before a rejection loop is declared exhausted.
const MAX_ATTEMPTS: usize = 100_000;

/// A source of sky positions for the simulation core. The core calls this
/// exactly once per source; retrying is the sampler's own business.
pub trait PositionSampler {
    fn sample_position<R: Rng>(&self, rng: &mut R) -> Result<SphCoord<f64>, SimulationError>;
}

/// Rejection sampler over a per-pixel template: propose directions uniformly
/// on the sphere (or uniformly within the polar cap of radius `r_roi`) and
/// accept with probability `template[pixel] / max(template)`.
pub struct TemplateSampler<'a> {
    template: &'a [f64],
    nside: usize,
    max_weight: f64,
    cos_r_roi: f64,
}

impl<'a> TemplateSampler<'a> {
    /// `r_roi` is the largest accepted polar angle from the north pole;
    /// `None` leaves the whole sphere open.
    pub fn new(template: &'a [f64], r_roi: Option<f64>) -> Result<Self, SimulationError> {
        let nside = npix2nside(template.len()).ok_or(SimulationError::BadTemplateLength {
            npix: template.len(),
        })?;
        let mut max_weight = 0.0_f64;
        for (pixel, &value) in template.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::BadTemplate { pixel, value });
            }
            max_weight = max_weight.max(value);
        }
        if max_weight == 0.0 {
            return Err(SimulationError::EmptyTemplate);
        }
        Ok(TemplateSampler {
            template,
            nside,
            max_weight,
            cos_r_roi: r_roi.map_or(-1.0, |r| r.min(PI).cos()),
        })
    }
}

impl PositionSampler for TemplateSampler<'_> {
    fn sample_position<R: Rng>(&self, rng: &mut R) -> Result<SphCoord<f64>, SimulationError> {
        for _ in 0..MAX_ATTEMPTS {
            // Uniform in solid angle over the allowed cap: z uniform in
            // [cos(r_roi), 1], azimuth uniform in [0, 2*pi).
            let z = 1.0 - rng.gen::<f64>() * (1.0 - self.cos_r_roi);
            let ptg = SphCoord::new(z.acos(), rng.gen::<f64>() * 2.0 * PI);
            let weight = self.template[ang2pix_ring(self.nside, ptg)];
            if rng.gen::<f64>() * self.max_weight < weight {
                return Ok(ptg);
            }
        }
        Err(SimulationError::PositionSamplerExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::healpix::utils::nside2npix;

    use super::*;

    #[test]
    fn all_zero_template_is_rejected() {
        let template = vec![0.0; nside2npix(2)];
        assert!(matches!(
            TemplateSampler::new(&template, None),
            Err(SimulationError::EmptyTemplate)
        ));
    }

    #[test]
    fn bad_template_length_is_rejected() {
        assert!(matches!(
            TemplateSampler::new(&[1.0; 13], None),
            Err(SimulationError::BadTemplateLength { npix: 13 })
        ));
    }

    #[test]
    fn negative_template_weight_is_rejected() {
        let mut template = vec![1.0; nside2npix(1)];
        template[3] = -0.5;
        assert!(matches!(
            TemplateSampler::new(&template, None),
            Err(SimulationError::BadTemplate { pixel: 3, .. })
        ));
    }

    #[test]
    fn single_hot_pixel_gets_every_source() {
        let nside = 2;
        let hot = 17;
        let mut template = vec![0.0; nside2npix(nside)];
        template[hot] = 3.0;
        let sampler = TemplateSampler::new(&template, None).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let ptg = sampler.sample_position(&mut rng).unwrap();
            assert_eq!(ang2pix_ring(nside, ptg), hot);
        }
    }

    #[test]
    fn zero_roi_collapses_to_the_pole() {
        let template = vec![1.0; nside2npix(4)];
        let sampler = TemplateSampler::new(&template, Some(0.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let ptg = sampler.sample_position(&mut rng).unwrap();
            assert_eq!(ptg.pol, 0.0);
        }
    }

    #[test]
    fn roi_bounds_the_polar_angle() {
        let template = vec![1.0; nside2npix(4)];
        let r_roi = 0.3;
        let sampler = TemplateSampler::new(&template, Some(r_roi)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let ptg = sampler.sample_position(&mut rng).unwrap();
            assert!(ptg.pol <= r_roi + 1e-12);
            assert!((0.0..2.0 * PI).contains(&ptg.az));
        }
    }

    #[test]
    fn template_weighted_in_roi_only_sees_roi_pixels() {
        // The ROI keeps samples in the north cap even when the template is
        // hottest in the south.
        let nside = 2;
        let npix = nside2npix(nside);
        let mut template = vec![1.0; npix];
        template[npix - 1] = 100.0;
        let sampler = TemplateSampler::new(&template, Some(0.5)).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let ptg = sampler.sample_position(&mut rng).unwrap();
            assert!(ptg.pol <= 0.5);
        }
    }
}

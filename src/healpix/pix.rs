//! Conversions between RING pixel indices, sky directions and unit vectors.

use std::f64::consts::{FRAC_PI_2, PI};

use num::traits::float::{Float, FloatConst};

use crate::{
    coordinates::{SphCoord, Vec3d},
    error::SimulationError,
    healpix::utils::{isqrt, nside2npix},
};

/// How far a vector's norm may drift from 1 before it is rejected.
const NORM_TOLERANCE: f64 = 1e-6;

/// The RING pixel index containing the direction `ptg`.
pub fn ang2pix_ring(nside: usize, ptg: SphCoord<f64>) -> usize {
    let ns = nside as f64;
    let z = ptg.pol.cos();
    let za = z.abs();
    // azimuth folded into [0, 2*pi), in units of pi/2
    let mut tt = (ptg.az % (2.0 * PI)) / FRAC_PI_2;
    if tt < 0.0 {
        tt += 4.0;
    }

    if za <= 2.0 / 3.0 {
        // equatorial belt
        let temp1 = ns * (0.5 + tt);
        let temp2 = ns * z * 0.75;
        let jp = (temp1 - temp2).floor() as i64; // ascending edge line
        let jm = (temp1 + temp2).floor() as i64; // descending edge line
        let ir = nside as i64 + 1 + jp - jm;
        let kshift = 1 - (ir & 1);
        let nl4 = 4 * nside as i64;
        let ip = ((jp + jm - nside as i64 + kshift + 1) / 2).rem_euclid(nl4);
        let ncap = 2 * nside as i64 * (nside as i64 - 1);
        (ncap + (ir - 1) * nl4 + ip) as usize
    } else {
        // polar caps
        let tp = tt - tt.floor();
        let tmp = ns * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp).floor() as i64;
        let jm = ((1.0 - tp) * tmp).floor() as i64;
        let ir = jp + jm + 1;
        let ip = ((tt * ir as f64).floor() as i64).rem_euclid(4 * ir);
        if z > 0.0 {
            (2 * ir * (ir - 1) + ip) as usize
        } else {
            (nside2npix(nside) as i64 - 2 * ir * (ir + 1) + ip) as usize
        }
    }
}

/// The direction of the center of pixel `ipix`.
pub fn pix2ang_ring<T>(nside: usize, ipix: usize) -> SphCoord<T>
where
    T: Float + FloatConst,
{
    let npix = nside2npix(nside);
    debug_assert!(ipix < npix);
    let ncap = 2 * nside * (nside - 1);
    let fact2 = 4.0 / npix as f64;

    let (z, phi) = if ipix < ncap {
        // north polar cap
        let iring = (1 + isqrt(1 + 2 * ipix)) >> 1;
        let iphi = ipix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * PI / (2.0 * iring as f64))
    } else if ipix < npix - ncap {
        // equatorial belt
        let ip = ipix - ncap;
        let nl4 = 4 * nside;
        let iring = ip / nl4 + nside;
        let iphi = ip % nl4 + 1;
        let fodd = if (iring + nside) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * nside) as f64 - iring as f64;
        let z = z * 2.0 * nside as f64 * fact2;
        (z, (iphi as f64 - fodd) * PI / (2.0 * nside as f64))
    } else {
        // south polar cap
        let ip = npix - ipix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * PI / (2.0 * iring as f64))
    };

    SphCoord::new(T::from(z.acos()).unwrap(), T::from(phi).unwrap())
}

/// The unit vector pointing at the center of pixel `ipix`.
pub fn pix2vec_ring<T>(nside: usize, ipix: usize) -> Vec3d<T>
where
    T: Float + FloatConst,
{
    Vec3d::from_sph_coord(pix2ang_ring(nside, ipix))
}

/// The RING pixel index containing the direction of `v`. The vector must be
/// unit length up to a small tolerance; anything else means an upstream
/// geometry step produced garbage and the run cannot continue.
pub fn vec2pix_ring(nside: usize, v: &Vec3d<f64>) -> Result<usize, SimulationError> {
    let norm = v.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(SimulationError::Pixelization {
            reason: format!(
                "vector ({}, {}, {}) has norm {}, expected 1",
                v.x, v.y, v.z, norm
            ),
        });
    }
    Ok(ang2pix_ring(nside, SphCoord::from_vec3d(*v)))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn every_pixel_round_trips_through_its_center() {
        for nside in [1, 2, 4, 8] {
            for ipix in 0..nside2npix(nside) {
                let ptg = pix2ang_ring::<f64>(nside, ipix);
                assert!(ptg.pol >= 0.0 && ptg.pol <= PI);
                assert_eq!(ang2pix_ring(nside, ptg), ipix, "nside = {}", nside);
            }
        }
    }

    #[test]
    fn every_pixel_round_trips_through_its_vector() {
        for nside in [1, 2, 4, 8] {
            for ipix in 0..nside2npix(nside) {
                let v = pix2vec_ring::<f64>(nside, ipix);
                assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-12);
                assert_eq!(vec2pix_ring(nside, &v).unwrap(), ipix);
            }
        }
    }

    #[test]
    fn poles_map_to_the_cap_corners() {
        for nside in [1, 2, 4] {
            let npix = nside2npix(nside);
            assert_eq!(ang2pix_ring(nside, SphCoord::new(0.0, 0.0)), 0);
            assert_eq!(ang2pix_ring(nside, SphCoord::new(PI, 0.0)), npix - 4);
        }
    }

    #[test]
    fn known_equator_pixels() {
        // Centers checked against the canonical RING layout: the equator
        // ring of an nside=1 map is pixels 4..8 at az 0, pi/2, pi, 3pi/2.
        assert_eq!(ang2pix_ring(1, SphCoord::new(FRAC_PI_2, 0.0)), 4);
        assert_eq!(ang2pix_ring(1, SphCoord::new(FRAC_PI_2, PI)), 6);
        // First pixel of the nside=2 equator ring covers az `[0, pi/4)`.
        assert_eq!(ang2pix_ring(2, SphCoord::new(FRAC_PI_2, 0.1)), 20);
    }

    #[test]
    fn azimuth_is_periodic() {
        for nside in [1, 4] {
            for &pol in &[0.3, 1.2, 2.8] {
                for &az in &[0.0, 1.0, 3.0, 6.0] {
                    assert_eq!(
                        ang2pix_ring(nside, SphCoord::new(pol, az)),
                        ang2pix_ring(nside, SphCoord::new(pol, az + 2.0 * PI)),
                    );
                }
            }
        }
    }

    #[test]
    fn non_unit_vectors_are_rejected() {
        let err = vec2pix_ring(4, &Vec3d::new(0.0, 0.0, 2.0)).unwrap_err();
        assert!(matches!(err, SimulationError::Pixelization { .. }));
        assert!(vec2pix_ring(4, &Vec3d::new(0.0, 0.0, 0.0)).is_err());
    }
}

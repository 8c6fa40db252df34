/// Number of pixels of a RING map with resolution parameter `nside`.
pub fn nside2npix(nside: usize) -> usize {
    12 * nside * nside
}

/// Inverse of [`nside2npix`]; `None` when `npix` is not `12 * nside^2` for
/// any positive `nside`.
pub fn npix2nside(npix: usize) -> Option<usize> {
    if npix == 0 || npix % 12 != 0 {
        return None;
    }
    let nside = isqrt(npix / 12);
    if nside2npix(nside) == npix {
        Some(nside)
    } else {
        None
    }
}

/// Exact integer square root (largest `r` with `r * r <= x`).
pub(crate) fn isqrt(x: usize) -> usize {
    let mut r = (x as f64).sqrt() as usize;
    while (r + 1) * (r + 1) <= x {
        r += 1;
    }
    while r * r > x {
        r -= 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npix_round_trips() {
        // Any positive nside is allowed in the RING scheme, not just powers
        // of two.
        for nside in [1, 2, 3, 4, 8, 16, 64, 1024] {
            assert_eq!(npix2nside(nside2npix(nside)), Some(nside));
        }
    }

    #[test]
    fn invalid_npix_is_rejected() {
        for npix in [0, 1, 11, 13, 24, 47, 49, 12 * 5, 12 * 9 + 1] {
            assert_eq!(npix2nside(npix), None, "npix = {}", npix);
        }
    }

    #[test]
    fn isqrt_is_exact_near_squares() {
        for r in 0..1000usize {
            assert_eq!(isqrt(r * r), r);
            if r > 0 {
                assert_eq!(isqrt(r * r - 1), r - 1);
                assert_eq!(isqrt(r * r + 1), r);
            }
        }
    }
}

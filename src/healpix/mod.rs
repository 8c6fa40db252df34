//! RING-scheme HEALPix pixelization of the sphere.
//!
//! Only the pieces the simulation needs: pixel counts for a resolution
//! parameter and the conversions between pixel index, sky direction and
//! Cartesian unit vector.

pub mod pix;
pub mod utils;

//! Spherical and Cartesian coordinates, plus 3x3 rotation matrices.

use std::ops::{Index, Mul};

use num::traits::float::{Float, FloatConst};

/// A direction on the unit sphere: polar angle `pol` measured from the north
/// pole, azimuth `az` measured from the x-axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphCoord<T>
where
    T: Float,
{
    pub pol: T,
    pub az: T,
}

impl<T> SphCoord<T>
where
    T: Float + FloatConst,
{
    pub fn new(pol: T, az: T) -> Self {
        SphCoord { pol, az }
    }

    pub fn from_xyz(x: T, y: T, z: T) -> Self {
        let r = (x * x + y * y + z * z).sqrt();
        SphCoord {
            pol: (z / r).acos(),
            az: y.atan2(x),
        }
    }

    pub fn from_vec3d(v: Vec3d<T>) -> Self {
        Self::from_xyz(v.x, v.y, v.z)
    }
}

/// A Cartesian 3-vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3d<T>
where
    T: Float,
{
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vec3d<T>
where
    T: Float + FloatConst,
{
    pub fn new(x: T, y: T, z: T) -> Self {
        Vec3d { x, y, z }
    }

    pub fn from_sph_coord(sc: SphCoord<T>) -> Self {
        let (sp, cp) = (sc.pol.sin(), sc.pol.cos());
        let (sa, ca) = (sc.az.sin(), sc.az.cos());
        Vec3d {
            x: sp * ca,
            y: sp * sa,
            z: cp,
        }
    }

    pub fn norm(&self) -> T {
        self.dot(*self).sqrt()
    }

    pub fn dot(&self, rhs: Vec3d<T>) -> T {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn normalized(&self) -> Vec3d<T> {
        let n = self.norm();
        Vec3d {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
        }
    }
}

impl<T> Index<usize> for Vec3d<T>
where
    T: Float,
{
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        match idx {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3d index {} out of range", idx),
        }
    }
}

/// A 3x3 rotation matrix in row-major order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotMatrix<T>
where
    T: Float,
{
    pub elements: [[T; 3]; 3],
}

impl<T> RotMatrix<T>
where
    T: Float + FloatConst,
{
    /// Right-handed rotation by `angle` about `axis` (Rodrigues form).
    pub fn about_axis_by_angle(axis: &Vec3d<T>, angle: T) -> Self {
        let k = axis.normalized();
        let (s, c) = (angle.sin(), angle.cos());
        let one = T::one();
        let kx = [
            [T::zero(), -k.z, k.y],
            [k.z, T::zero(), -k.x],
            [-k.y, k.x, T::zero()],
        ];
        let mut elements = [[T::zero(); 3]; 3];
        let kv = [k.x, k.y, k.z];
        for (i, row) in elements.iter_mut().enumerate() {
            for (j, e) in row.iter_mut().enumerate() {
                let id = if i == j { one } else { T::zero() };
                *e = id * c + kx[i][j] * s + kv[i] * kv[j] * (one - c);
            }
        }
        RotMatrix { elements }
    }
}

impl<T> Mul for RotMatrix<T>
where
    T: Float,
{
    type Output = RotMatrix<T>;

    fn mul(self, rhs: RotMatrix<T>) -> RotMatrix<T> {
        let mut elements = [[T::zero(); 3]; 3];
        for (i, row) in elements.iter_mut().enumerate() {
            for (j, e) in row.iter_mut().enumerate() {
                *e = (0..3).fold(T::zero(), |acc, k| {
                    acc + self.elements[i][k] * rhs.elements[k][j]
                });
            }
        }
        RotMatrix { elements }
    }
}

impl<T> Mul<Vec3d<T>> for &RotMatrix<T>
where
    T: Float,
{
    type Output = Vec3d<T>;

    fn mul(self, v: Vec3d<T>) -> Vec3d<T> {
        let r = &self.elements;
        Vec3d {
            x: r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            y: r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            z: r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        }
    }
}

impl<T> Mul<Vec3d<T>> for RotMatrix<T>
where
    T: Float,
{
    type Output = Vec3d<T>;

    fn mul(self, v: Vec3d<T>) -> Vec3d<T> {
        &self * v
    }
}

//! Image geometry: the mapping between voxel indices and physical space.
use nalgebra::{Matrix3, Vector3};
use ndarray::Array3;

use crate::orientation::{direction_cosines_from_orientation, orientation_from_direction_cosines};

/// Order in which an image lists its index axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisOrder {
    /// Slowest-varying axis first, as stored in a C-order array (`z, y, x`).
    #[default]
    Array,
    /// Fastest-varying axis first, as used by ITK and its descendants (`x, y, z`).
    Itk,
}

impl AxisOrder {
    /// Reorder an array-order triple into this order.
    pub fn reorder_from_array<T: Copy>(self, values: [T; 3]) -> [T; 3] {
        match self {
            AxisOrder::Array => values,
            AxisOrder::Itk => [values[2], values[1], values[0]],
        }
    }
}

/// Spacing, origin and direction of a 3D image, without voxel data.
///
/// Index `i` maps to `origin + direction * diag(spacing) * i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    size: [u64; 3],
    spacing: Vector3<f64>,
    origin: Vector3<f64>,
    direction: Matrix3<f64>,
    order: AxisOrder,
    /// Cached `(direction * diag(spacing))^-1`.
    inverse: Matrix3<f64>,
}

impl ImageGeometry {
    pub fn new(
        size: [u64; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        direction: Matrix3<f64>,
        order: AxisOrder,
    ) -> crate::Result<Self> {
        if let Some(s) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(crate::Error::general(format!(
                "spacing must be positive and finite, got {s}"
            )));
        }
        let spacing = Vector3::from(spacing);
        let inverse = (direction * Matrix3::from_diagonal(&spacing))
            .try_inverse()
            .ok_or_else(|| crate::Error::general("direction matrix is singular"))?;
        Ok(Self {
            size,
            spacing,
            origin: Vector3::from(origin),
            direction,
            order,
            inverse,
        })
    }

    /// Geometry whose direction is given by an orientation code such as `RAS`.
    pub fn from_orientation(
        size: [u64; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        orientation: &str,
        order: AxisOrder,
    ) -> crate::Result<Self> {
        let direction = direction_cosines_from_orientation(orientation)?;
        Self::new(size, spacing, origin, direction, order)
    }

    pub fn size(&self) -> [u64; 3] {
        self.size
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing.into()
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin.into()
    }

    pub fn direction(&self) -> &Matrix3<f64> {
        &self.direction
    }

    pub fn order(&self) -> AxisOrder {
        self.order
    }

    pub fn orientation(&self) -> String {
        orientation_from_direction_cosines(&self.direction)
    }

    pub fn transform_continuous_index_to_physical_point(&self, index: [f64; 3]) -> [f64; 3] {
        let idx = Vector3::from(index);
        (self.origin + self.direction * idx.component_mul(&self.spacing)).into()
    }

    pub fn transform_physical_point_to_continuous_index(&self, point: [f64; 3]) -> [f64; 3] {
        (self.inverse * (Vector3::from(point) - self.origin)).into()
    }

    /// Reorder an index given in array order (`z, y, x`) into this geometry's order.
    pub fn index_from_array_order(&self, index: [f64; 3]) -> [f64; 3] {
        self.order.reorder_from_array(index)
    }

    /// Physical position of the voxel centre furthest from the origin.
    pub fn far_corner(&self) -> [f64; 3] {
        let last = self.size.map(|s| s.saturating_sub(1) as f64);
        self.transform_continuous_index_to_physical_point(last)
    }
}

/// A 3D image: geometry plus voxel data.
///
/// `data` is always held in array order; for [AxisOrder::Itk] geometries
/// the voxel at index `[i, j, k]` is `data[[k, j, i]]`.
#[derive(Debug, Clone)]
pub struct AnatomicalImage<T> {
    pub geometry: ImageGeometry,
    pub data: Array3<T>,
}

impl<T> AnatomicalImage<T> {
    /// Voxel at an index given in the geometry's order.
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [a, b, c] = match self.geometry.order() {
            AxisOrder::Array => index,
            AxisOrder::Itk => [index[2], index[1], index[0]],
        };
        self.data.get([a, b, c])
    }
}

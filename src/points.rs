//! Mapping point sets between index and physical space.
//!
//! Point sets are `(N, 3)` arrays with one point per row.
use indexmap::IndexMap;
use ndarray::Array2;

use crate::image::ImageGeometry;

/// Point arrays keyed by layer name, in the order the layers were read.
pub type PointSets = IndexMap<String, Array2<f64>>;

/// Error unless `points` has exactly 3 columns.
pub fn check_point_shape(points: &Array2<f64>) -> crate::Result<()> {
    if points.ncols() != 3 {
        return Err(crate::Error::PointShape(points.shape().to_vec()));
    }
    Ok(())
}

/// Apply `f` to every row of an `(N, 3)` array.
pub(crate) fn map_points(
    points: &Array2<f64>,
    f: impl Fn([f64; 3]) -> [f64; 3],
) -> crate::Result<Array2<f64>> {
    check_point_shape(points)?;
    let mut out = Array2::zeros(points.raw_dim());
    for (row_in, mut row_out) in points.rows().into_iter().zip(out.rows_mut()) {
        let mapped = f([row_in[0], row_in[1], row_in[2]]);
        for (o, m) in row_out.iter_mut().zip(mapped) {
            *o = m;
        }
    }
    Ok(out)
}

/// Map points in continuous index space (in the geometry's axis order) to physical space.
///
/// The geometry may come from a stub image; no voxel data is needed.
pub fn index_to_physical_space(
    geometry: &ImageGeometry,
    points: &Array2<f64>,
) -> crate::Result<Array2<f64>> {
    map_points(points, |p| {
        geometry.transform_continuous_index_to_physical_point(p)
    })
}

/// Map points in physical space to continuous index space (in the geometry's axis order).
pub fn physical_to_index_space(
    geometry: &ImageGeometry,
    points: &Array2<f64>,
) -> crate::Result<Array2<f64>> {
    map_points(points, |p| {
        geometry.transform_physical_point_to_continuous_index(p)
    })
}

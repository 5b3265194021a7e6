//! Neuroglancer point annotations and their mapping into physical space.
use std::path::Path;

use indexmap::IndexMap;
use ndarray::Array2;
use serde_json::Value;

use crate::{
    acquisition::AcquisitionMetadata,
    image::ImageGeometry,
    points::{PointSets, index_to_physical_space, map_points},
    s3::read_metadata_json,
    zarr::{ZarrImageOptions, zarr_to_stub_image},
};

/// Per-point descriptions keyed by annotation layer name.
pub type Descriptions = IndexMap<String, Vec<Option<String>>>;

/// Points keyed by description, in the order they were annotated.
pub type PointDict = IndexMap<String, [f64; 3]>;

/// Map annotation indices, given in array order (`z, y, x`), into physical space.
pub fn transform_annotation_indices(
    geometry: &ImageGeometry,
    annotations: &PointSets,
) -> crate::Result<PointSets> {
    annotations
        .iter()
        .map(|(name, indices)| {
            let reordered = map_points(indices, |p| geometry.index_from_array_order(p))?;
            Ok((name.clone(), index_to_physical_space(geometry, &reordered)?))
        })
        .collect()
}

/// Positions of `z`, `y` and `x` within a Neuroglancer point, from the state's `dimensions`.
fn spatial_positions(state: &Value) -> crate::Result<[usize; 3]> {
    let Some(dims) = state.get("dimensions").and_then(Value::as_object) else {
        return Ok([2, 1, 0]);
    };
    let find = |name: &str| {
        dims.keys().position(|k| k == name).ok_or_else(|| {
            crate::Error::general(format!("neuroglancer state has no {name:?} dimension"))
        })
    };
    Ok([find("z")?, find("y")?, find("x")?])
}

/// Extract point annotations from a Neuroglancer state.
///
/// Points are returned in array order (`z, y, x`) in the state's voxel coordinates.
/// Only annotation layers named in `layer_names` are read, or all of them if it is `None`.
pub fn neuroglancer_annotation_points(
    state: &Value,
    layer_names: Option<&[&str]>,
) -> crate::Result<(PointSets, Descriptions)> {
    let positions = spatial_positions(state)?;
    let layers = state
        .get("layers")
        .and_then(Value::as_array)
        .ok_or_else(|| crate::Error::general("neuroglancer state has no layers"))?;

    let mut points = PointSets::new();
    let mut descriptions = Descriptions::new();
    for layer in layers {
        if layer.get("type").and_then(Value::as_str) != Some("annotation") {
            continue;
        }
        let name = layer
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| crate::Error::general("annotation layer has no name"))?;
        if let Some(wanted) = layer_names {
            if !wanted.contains(&name) {
                continue;
            }
        }
        let annotations = layer
            .get("annotations")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut flat = Vec::with_capacity(annotations.len() * 3);
        let mut descs = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            if annotation.get("type").and_then(Value::as_str) != Some("point") {
                continue;
            }
            let coords: Vec<f64> = annotation
                .get("point")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    crate::Error::general(format!("point in layer {name:?} has no coordinates"))
                })?
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| {
                        crate::Error::general(format!("non-numeric coordinate in layer {name:?}"))
                    })
                })
                .collect::<crate::Result<_>>()?;
            for pos in positions {
                let c = coords.get(pos).ok_or_else(|| {
                    crate::Error::general(format!(
                        "point in layer {name:?} has {} coordinates",
                        coords.len()
                    ))
                })?;
                flat.push(*c);
            }
            descs.push(
                annotation
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
            );
        }
        let n = descs.len();
        log::debug!("read {n} points from annotation layer {name:?}");
        let arr = Array2::from_shape_vec((n, 3), flat).map_err(crate::Error::wrap)?;
        points.insert(name.to_string(), arr);
        descriptions.insert(name.to_string(), descs);
    }
    Ok((points, descriptions))
}

/// Read point annotations from a Neuroglancer state file.
pub fn get_neuroglancer_annotation_points(
    path: impl AsRef<Path>,
    layer_names: Option<&[&str]>,
) -> crate::Result<(PointSets, Descriptions)> {
    let f = std::fs::File::open(path.as_ref())?;
    let state: Value = serde_json::from_reader(std::io::BufReader::new(f))?;
    neuroglancer_annotation_points(&state, layer_names)
}

/// Key each point of a layer by its description.
///
/// Missing descriptions are numbered from 1 in order of appearance;
/// present ones are trimmed, with carriage returns, newlines and commas removed.
/// Keys keep the order of the points; a repeated key keeps its first position
/// and takes the later point.
pub fn pts_and_descriptions_to_pt_dict(
    points: &Array2<f64>,
    descriptions: &[Option<String>],
) -> crate::Result<PointDict> {
    crate::points::check_point_shape(points)?;
    if points.nrows() != descriptions.len() {
        return Err(crate::Error::general(format!(
            "{} points but {} descriptions",
            points.nrows(),
            descriptions.len()
        )));
    }
    let mut out = PointDict::with_capacity(points.nrows());
    let mut next_unnamed = 1;
    for (row, description) in points.rows().into_iter().zip(descriptions) {
        let key = match description {
            Some(d) => d
                .trim()
                .chars()
                .filter(|c| !matches!(c, '\r' | '\n' | ','))
                .collect(),
            None => {
                let k = next_unnamed.to_string();
                next_unnamed += 1;
                k
            }
        };
        out.insert(key, [row[0], row[1], row[2]]);
    }
    Ok(out)
}

/// [pts_and_descriptions_to_pt_dict] for every layer.
pub fn convert_annotation_pts_to_pt_dicts(
    annotation_points: &PointSets,
    descriptions: &Descriptions,
) -> crate::Result<IndexMap<String, PointDict>> {
    annotation_points
        .iter()
        .map(|(name, pts)| {
            let descs = descriptions.get(name).ok_or_else(|| {
                crate::Error::general(format!("no descriptions for layer {name:?}"))
            })?;
            Ok((name.clone(), pts_and_descriptions_to_pt_dict(pts, descs)?))
        })
        .collect()
}

/// Read acquisition metadata and a Neuroglancer state, and map its point annotations into the
/// physical space of the OME-Zarr image.
pub fn transform_neuroglancer_annotations_to_physical_points(
    zarr_uri: &str,
    acquisition_metadata_uri: &str,
    ng_annotation_path: impl AsRef<Path>,
    options: &ZarrImageOptions,
) -> crate::Result<(PointSets, Descriptions)> {
    let metadata_json = read_metadata_json(acquisition_metadata_uri)?;
    let metadata = AcquisitionMetadata::from_any_value(&metadata_json)?;
    let (stub, _) = zarr_to_stub_image(zarr_uri, &metadata, options)?;
    let (annotations, descriptions) = get_neuroglancer_annotation_points(ng_annotation_path, None)?;
    let physical = transform_annotation_indices(&stub, &annotations)?;
    Ok((physical, descriptions))
}

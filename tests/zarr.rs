mod common;

use common::{assert_close, level_shape, nd_metadata, ome_zarr, zarr_uri};
use ndarray::{Array2, array};
use zarrs_anatomical::{
    Error,
    acquisition::AcquisitionMetadata,
    image::AxisOrder,
    orientation::direction_tuple,
    points::PointSets,
    units::LengthUnit,
    zarr::{self, ZarrImageOptions},
};

fn metadata() -> AcquisitionMetadata {
    AcquisitionMetadata::from_any_value(&nd_metadata()).expect("valid metadata")
}

fn level0() -> ZarrImageOptions {
    ZarrImageOptions::default().with_level(0)
}

#[test]
fn test_open_zarr() {
    let dir = ome_zarr();
    let image = zarr::open_zarr(&zarr_uri(&dir)).expect("open");
    assert_eq!(image.level_count(), 4);
    let names: Vec<_> = image
        .multiscale()
        .axes
        .iter()
        .map(|ax| ax.name.as_str())
        .collect();
    assert_eq!(names, vec!["t", "c", "z", "y", "x"]);
    assert_eq!(image.level_shape(2).unwrap(), vec![1, 1, 1, 2, 2]);
}

#[test]
fn test_zarr_to_array() {
    let dir = ome_zarr();
    let (arr, meta, level) = zarr::zarr_to_array::<f32>(&zarr_uri(&dir), 0).expect("read");
    assert_eq!(arr.shape(), &[1, 1, 4, 6, 8]);
    assert_eq!(level, 0);
    assert_eq!(meta.name.as_deref(), Some("fixture"));
    assert_eq!(arr[[0, 0, 1, 2, 3]], 67.0);
    assert!(arr.iter().any(|v| *v != 0.0));
}

#[test]
fn test_zarr_to_array_wrong_type() {
    let dir = ome_zarr();
    assert!(zarr::zarr_to_array::<u16>(&zarr_uri(&dir), 0).is_err());
}

#[test]
fn test_zarr_to_array_anatomical() {
    let dir = ome_zarr();
    let out = zarr::zarr_to_array_anatomical::<f32>(&zarr_uri(&dir), &metadata(), &level0())
        .expect("anatomical");
    assert_eq!(out.data.shape(), &[4, 6, 8]);
    assert_eq!(out.directions, vec!['S', 'A', 'R']);
    assert_close(&out.spacing, &[2.0, 1.0, 0.5]);
    assert_eq!(out.size, vec![4, 6, 8]);
    assert_eq!(out.data[[1, 2, 3]], 67.0);
}

#[test]
fn test_anatomical_in_micrometers() {
    let dir = ome_zarr();
    let opts = level0().with_scale_unit(LengthUnit::Micrometer);
    let out =
        zarr::zarr_to_array_anatomical::<f32>(&zarr_uri(&dir), &metadata(), &opts).unwrap();
    assert_close(&out.spacing, &[2000.0, 1000.0, 500.0]);
}

#[test]
fn test_array_order_and_itk_images() {
    let dir = ome_zarr();
    let uri = zarr_uri(&dir);

    let arr_img = zarr::zarr_to_array_order_image::<f32>(&uri, &metadata(), &level0()).unwrap();
    assert_eq!(arr_img.geometry.order(), AxisOrder::Array);
    assert_eq!(arr_img.geometry.size(), [4, 6, 8]);
    assert_close(&arr_img.geometry.spacing(), &[2.0, 1.0, 0.5]);
    assert_eq!(arr_img.geometry.orientation(), "SAR");
    assert_eq!(arr_img.get([1, 2, 3]), Some(&67.0));

    let itk_img = zarr::zarr_to_itk_image::<f32>(&uri, &metadata(), &level0()).unwrap();
    assert_eq!(itk_img.geometry.order(), AxisOrder::Itk);
    assert_eq!(itk_img.geometry.size(), [8, 6, 4]);
    assert_close(&itk_img.geometry.spacing(), &[0.5, 1.0, 2.0]);
    assert_close(&itk_img.geometry.origin(), &[0.0, 0.0, 0.0]);
    assert_eq!(itk_img.geometry.orientation(), "RAS");
    assert_eq!(itk_img.get([3, 2, 1]), Some(&67.0));

    // The same voxel lands at the same physical point in both orders.
    let p_arr = arr_img
        .geometry
        .transform_continuous_index_to_physical_point([1.0, 2.0, 3.0]);
    let p_itk = itk_img
        .geometry
        .transform_continuous_index_to_physical_point([3.0, 2.0, 1.0]);
    assert_close(&p_arr, &p_itk);
    assert_close(&p_itk, &[-1.5, -2.0, 2.0]);
}

#[test]
fn test_zarr_to_stub_image() {
    let dir = ome_zarr();
    let (stub, size_ijk) = zarr::zarr_to_stub_image(&zarr_uri(&dir), &metadata(), &level0())
        .expect("stub");
    assert_eq!(size_ijk, [8, 6, 4]);
    assert_close(&stub.spacing(), &[0.5, 1.0, 2.0]);
    assert_close(
        &direction_tuple(stub.direction()),
        &[-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0],
    );
}

#[test]
fn test_stub_default_level() {
    let dir = ome_zarr();
    let (stub, size_ijk) =
        zarr::zarr_to_stub_image(&zarr_uri(&dir), &metadata(), &ZarrImageOptions::default())
            .unwrap();
    let [z, y, x] = level_shape(3);
    assert_eq!(size_ijk, [x, y, z]);
    assert_close(&stub.spacing(), &[4.0, 8.0, 16.0]);
}

#[test]
fn test_origin_override_unsupported() {
    let dir = ome_zarr();
    let opts = level0().with_origin([1.0, 2.0, 3.0]);
    let err = zarr::zarr_to_itk_image::<f32>(&zarr_uri(&dir), &metadata(), &opts).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
    assert!(zarr::zarr_to_stub_image(&zarr_uri(&dir), &metadata(), &opts).is_err());
}

#[test]
fn test_missing_direction() {
    let dir = ome_zarr();
    let md = AcquisitionMetadata::from_any_value(&serde_json::json!({"axes": [
        {"dimension": 0, "name": "Z", "direction": "INFERIOR_SUPERIOR"},
        {"dimension": 1, "name": "Y", "direction": "POSTERIOR_ANTERIOR"},
    ]}))
    .unwrap();
    assert!(zarr::zarr_to_stub_image(&zarr_uri(&dir), &md, &level0()).is_err());
}

#[test]
fn test_missing_level() {
    let dir = ome_zarr();
    let opts = ZarrImageOptions::default().with_level(4);
    assert!(zarr::zarr_to_stub_image(&zarr_uri(&dir), &metadata(), &opts).is_err());
}

#[test]
fn test_scaled_points_to_indices_basic() {
    let dir = ome_zarr();
    let mut scaled = PointSets::new();
    scaled.insert("layer1".to_string(), array![[2.0, 4.0, 6.0], [3.0, 6.0, 9.0]]);
    let indices =
        zarr::scaled_points_to_indices(&scaled, &zarr_uri(&dir), LengthUnit::Millimeter, 0)
            .unwrap();
    let expected = [1.0, 4.0, 12.0, 1.5, 6.0, 18.0];
    assert_close(indices["layer1"].as_slice().unwrap(), &expected);
}

#[test]
fn test_scaled_points_to_indices_multiple_layers() {
    let dir = ome_zarr();
    let mut scaled = PointSets::new();
    scaled.insert("layer1".to_string(), array![[2.0, 1.0, 0.5]]);
    scaled.insert(
        "layer2".to_string(),
        array![[4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
    );
    scaled.insert("layer3".to_string(), Array2::zeros((0, 3)));
    let indices =
        zarr::scaled_points_to_indices(&scaled, &zarr_uri(&dir), LengthUnit::Millimeter, 1)
            .unwrap();
    assert_eq!(
        indices.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["layer1", "layer2", "layer3"]
    );
    assert_eq!(indices["layer2"].shape(), &[2, 3]);
    assert_eq!(indices["layer3"].shape(), &[0, 3]);
    assert_close(indices["layer1"].as_slice().unwrap(), &[0.5, 0.5, 0.5]);
}

#[test]
fn test_scaled_points_to_indices_other_unit() {
    let dir = ome_zarr();
    let mut scaled = PointSets::new();
    scaled.insert("a".to_string(), array![[2000.0, 1500.0, 250.0]]);
    let indices =
        zarr::scaled_points_to_indices(&scaled, &zarr_uri(&dir), LengthUnit::Micrometer, 0)
            .unwrap();
    assert_close(indices["a"].as_slice().unwrap(), &[1.0, 1.5, 0.5]);

    let back =
        zarr::indices_to_scaled_points(&indices, &zarr_uri(&dir), LengthUnit::Micrometer, 0)
            .unwrap();
    assert_close(back["a"].as_slice().unwrap(), &[2000.0, 1500.0, 250.0]);
}

#[test]
fn test_scaled_points_to_indices_empty() {
    let dir = ome_zarr();
    let indices = zarr::scaled_points_to_indices(
        &PointSets::new(),
        &zarr_uri(&dir),
        LengthUnit::Millimeter,
        0,
    )
    .unwrap();
    assert!(indices.is_empty());
}

#[test]
fn test_scaled_points_to_indices_shape_validation() {
    let dir = ome_zarr();
    for bad in [array![[1.0, 2.0]], array![[1.0, 2.0, 3.0, 4.0]]] {
        let mut scaled = PointSets::new();
        scaled.insert("layer1".to_string(), bad);
        let err =
            zarr::scaled_points_to_indices(&scaled, &zarr_uri(&dir), LengthUnit::Millimeter, 0)
                .unwrap_err();
        assert!(matches!(err, Error::PointShape(_)));
        assert!(err.to_string().starts_with("Expected (N, 3) array"));
    }
}

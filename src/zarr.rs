//! Reading OME-Zarr images into arrays, anatomical images and stub geometries.
use ndarray::{Array3, ArrayD, Axis as NdAxis, Ix3, IxDyn};
use zarrs::{
    array::{Array, ElementOwned},
    group::Group,
    storage::{ReadableStorage, ReadableStorageTraits},
};

use crate::{
    acquisition::AcquisitionMetadata,
    image::{AnatomicalImage, AxisOrder, ImageGeometry},
    metadata::Multiscale,
    points::{PointSets, map_points},
    storage::open_store,
    units::LengthUnit,
};

/// How to turn one resolution level of an OME-Zarr into an anatomical image.
#[derive(Debug, Clone, PartialEq)]
pub struct ZarrImageOptions {
    /// Resolution level; 0 is full resolution.
    pub level: usize,
    /// Unit of the output spacing.
    pub scale_unit: LengthUnit,
    /// Origin override. Not yet supported: the origin is always zero.
    pub origin: Option<[f64; 3]>,
}

impl Default for ZarrImageOptions {
    fn default() -> Self {
        Self {
            level: 3,
            scale_unit: LengthUnit::Millimeter,
            origin: None,
        }
    }
}

impl ZarrImageOptions {
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn with_scale_unit(mut self, scale_unit: LengthUnit) -> Self {
        self.scale_unit = scale_unit;
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = Some(origin);
        self
    }

    fn resolve_origin(&self) -> crate::Result<[f64; 3]> {
        match self.origin {
            None => Ok([0.0; 3]),
            Some(_) => Err(crate::Error::Unsupported(
                "Setting origin is not implemented yet".into(),
            )),
        }
    }
}

/// An opened OME-Zarr image group.
pub struct OmeZarr {
    storage: ReadableStorage,
    multiscale: Multiscale,
}

impl std::fmt::Debug for OmeZarr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmeZarr")
            .field("multiscale", &self.multiscale)
            .finish_non_exhaustive()
    }
}

/// Spatial part of one resolution level, in array order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialLayout {
    /// Index of each spatial axis in the full array.
    pub array_axes: Vec<usize>,
    pub names: Vec<String>,
    pub spacing: Vec<f64>,
    pub size: Vec<u64>,
}

impl SpatialLayout {
    fn spacing3(&self) -> [f64; 3] {
        [self.spacing[0], self.spacing[1], self.spacing[2]]
    }

    fn size3(&self) -> [u64; 3] {
        [self.size[0], self.size[1], self.size[2]]
    }
}

impl OmeZarr {
    /// Open the image at the root of a Zarr hierarchy.
    pub fn open(uri: &str) -> crate::Result<Self> {
        Self::from_storage(open_store(uri)?)
    }

    pub fn from_storage(storage: ReadableStorage) -> crate::Result<Self> {
        let group = Group::open(storage.clone(), "/").map_err(crate::Error::wrap)?;
        let multiscale = Multiscale::from_attributes(group.attributes())?;
        Ok(Self {
            storage,
            multiscale,
        })
    }

    pub fn multiscale(&self) -> &Multiscale {
        &self.multiscale
    }

    pub fn level_count(&self) -> usize {
        self.multiscale.datasets.len()
    }

    pub fn open_level(&self, level: usize) -> crate::Result<Array<dyn ReadableStorageTraits>> {
        let dataset = self.multiscale.dataset(level)?;
        let path = format!("/{}", dataset.path.trim_matches('/'));
        log::debug!("opening level {level} at {path}");
        Array::open(self.storage.clone(), &path).map_err(crate::Error::wrap)
    }

    pub fn level_shape(&self, level: usize) -> crate::Result<Vec<u64>> {
        Ok(self.open_level(level)?.shape().to_vec())
    }

    /// Read a whole resolution level.
    pub fn read_level<T: ElementOwned>(&self, level: usize) -> crate::Result<ArrayD<T>> {
        let array = self.open_level(level)?;
        let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();
        let data: Vec<T> = array
            .retrieve_array_subset(&array.subset_all())
            .map_err(crate::Error::wrap)?;
        ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(crate::Error::wrap)
    }

    /// Spatial axes, spacing in `unit` and size of a level.
    pub fn spatial_layout(&self, level: usize, unit: LengthUnit) -> crate::Result<SpatialLayout> {
        let spatial = self.multiscale.spatial_axes();
        if spatial.len() != 3 {
            return Err(crate::Error::general(format!(
                "expected 3 spatial axes, found {}",
                spatial.len()
            )));
        }
        let shape = self.level_shape(level)?;
        if shape.len() != self.multiscale.axes.len() {
            return Err(crate::Error::general(format!(
                "level {level} has {} dimensions but {} axes are declared",
                shape.len(),
                self.multiscale.axes.len()
            )));
        }
        let spacing = self.multiscale.spatial_spacing(level, unit.as_str())?;
        Ok(SpatialLayout {
            array_axes: spatial.iter().map(|(i, _)| *i).collect(),
            names: spatial.iter().map(|(_, ax)| ax.name.clone()).collect(),
            spacing,
            size: spatial.iter().map(|(i, _)| shape[*i]).collect(),
        })
    }

    /// Direction codes of the spatial axes, in array order.
    fn spatial_directions(
        &self,
        layout: &SpatialLayout,
        metadata: &AcquisitionMetadata,
    ) -> crate::Result<Vec<char>> {
        let axis_directions = metadata.axis_directions()?;
        let by_axis = axis_directions.direction_by_axis();
        layout
            .names
            .iter()
            .map(|name| {
                by_axis.get(name.as_str()).copied().ok_or_else(|| {
                    crate::Error::general(format!(
                        "acquisition metadata has no direction for axis {name:?}"
                    ))
                })
            })
            .collect()
    }

    /// Geometry of a level without reading voxel data.
    pub fn geometry(
        &self,
        metadata: &AcquisitionMetadata,
        options: &ZarrImageOptions,
        order: AxisOrder,
    ) -> crate::Result<ImageGeometry> {
        let origin = options.resolve_origin()?;
        let layout = self.spatial_layout(options.level, options.scale_unit)?;
        let directions = self.spatial_directions(&layout, metadata)?;
        let directions = order.reorder_from_array([directions[0], directions[1], directions[2]]);
        let orientation: String = directions.iter().collect();
        log::debug!(
            "level {} geometry: axes {:?}, orientation {orientation}, spacing {:?} {}",
            options.level,
            layout.names,
            layout.spacing,
            options.scale_unit
        );
        ImageGeometry::from_orientation(
            order.reorder_from_array(layout.size3()),
            order.reorder_from_array(layout.spacing3()),
            origin,
            &orientation,
            order,
        )
    }

    /// Read a level, keeping only its spatial axes.
    pub fn read_anatomical<T: ElementOwned>(
        &self,
        metadata: &AcquisitionMetadata,
        options: &ZarrImageOptions,
    ) -> crate::Result<AnatomicalArray<T>> {
        let layout = self.spatial_layout(options.level, options.scale_unit)?;
        let directions = self.spatial_directions(&layout, metadata)?;
        let data = squeeze_to_spatial(self.read_level(options.level)?, &layout.array_axes)?;
        Ok(AnatomicalArray {
            data,
            directions,
            spacing: layout.spacing,
            size: layout.size,
        })
    }

    /// Convert scaled coordinates (array order, in `scale_unit`) to continuous indices at `level`.
    pub fn scaled_points_to_indices(
        &self,
        scaled_points: &PointSets,
        scale_unit: LengthUnit,
        level: usize,
    ) -> crate::Result<PointSets> {
        let spacing = self.multiscale.spatial_spacing(level, scale_unit.as_str())?;
        let spacing = spacing3(&spacing)?;
        scaled_points
            .iter()
            .map(|(name, pts)| {
                let indices =
                    map_points(pts, |p| [p[0] / spacing[0], p[1] / spacing[1], p[2] / spacing[2]])?;
                Ok((name.clone(), indices))
            })
            .collect()
    }

    /// Convert continuous indices (array order) at `level` to scaled coordinates in `scale_unit`.
    pub fn indices_to_scaled_points(
        &self,
        indices: &PointSets,
        scale_unit: LengthUnit,
        level: usize,
    ) -> crate::Result<PointSets> {
        let spacing = self.multiscale.spatial_spacing(level, scale_unit.as_str())?;
        let spacing = spacing3(&spacing)?;
        indices
            .iter()
            .map(|(name, pts)| {
                let scaled =
                    map_points(pts, |p| [p[0] * spacing[0], p[1] * spacing[1], p[2] * spacing[2]])?;
                Ok((name.clone(), scaled))
            })
            .collect()
    }
}

fn spacing3(spacing: &[f64]) -> crate::Result<[f64; 3]> {
    spacing.try_into().map_err(|_| {
        crate::Error::general(format!(
            "expected 3 spatial axes, found {}",
            spacing.len()
        ))
    })
}

/// Drop every non-spatial axis, each of which must have length 1.
fn squeeze_to_spatial<T>(mut data: ArrayD<T>, spatial_axes: &[usize]) -> crate::Result<Array3<T>> {
    for ax in (0..data.ndim()).rev() {
        if spatial_axes.contains(&ax) {
            continue;
        }
        let len = data.len_of(NdAxis(ax));
        if len != 1 {
            return Err(crate::Error::general(format!(
                "cannot drop non-spatial axis {ax} of length {len}"
            )));
        }
        data = data.index_axis_move(NdAxis(ax), 0);
    }
    data.into_dimensionality::<Ix3>().map_err(crate::Error::wrap)
}

/// Spatial voxel data of a level with its per-axis anatomical description, all in array order.
#[derive(Debug, Clone)]
pub struct AnatomicalArray<T> {
    pub data: Array3<T>,
    /// Direction codes, e.g. `['S', 'A', 'R']`.
    pub directions: Vec<char>,
    pub spacing: Vec<f64>,
    pub size: Vec<u64>,
}

/// Open an OME-Zarr image.
pub fn open_zarr(uri: &str) -> crate::Result<OmeZarr> {
    OmeZarr::open(uri)
}

/// Read a whole resolution level along with the image metadata.
pub fn zarr_to_array<T: ElementOwned>(
    uri: &str,
    level: usize,
) -> crate::Result<(ArrayD<T>, Multiscale, usize)> {
    let zarr = OmeZarr::open(uri)?;
    let data = zarr.read_level(level)?;
    Ok((data, zarr.multiscale, level))
}

/// Read the spatial part of a level with its directions, spacing and size.
pub fn zarr_to_array_anatomical<T: ElementOwned>(
    uri: &str,
    metadata: &AcquisitionMetadata,
    options: &ZarrImageOptions,
) -> crate::Result<AnatomicalArray<T>> {
    OmeZarr::open(uri)?.read_anatomical(metadata, options)
}

fn zarr_to_image<T: ElementOwned>(
    uri: &str,
    metadata: &AcquisitionMetadata,
    options: &ZarrImageOptions,
    order: AxisOrder,
) -> crate::Result<AnatomicalImage<T>> {
    options.resolve_origin()?;
    let zarr = OmeZarr::open(uri)?;
    let geometry = zarr.geometry(metadata, options, order)?;
    let anatomical = zarr.read_anatomical(metadata, options)?;
    Ok(AnatomicalImage {
        geometry,
        data: anatomical.data,
    })
}

/// Anatomical image whose index axes follow the array (`z, y, x`).
pub fn zarr_to_array_order_image<T: ElementOwned>(
    uri: &str,
    metadata: &AcquisitionMetadata,
    options: &ZarrImageOptions,
) -> crate::Result<AnatomicalImage<T>> {
    zarr_to_image(uri, metadata, options, AxisOrder::Array)
}

/// Anatomical image whose index axes are reversed relative to the array (`x, y, z`).
pub fn zarr_to_itk_image<T: ElementOwned>(
    uri: &str,
    metadata: &AcquisitionMetadata,
    options: &ZarrImageOptions,
) -> crate::Result<AnatomicalImage<T>> {
    zarr_to_image(uri, metadata, options, AxisOrder::Itk)
}

/// Geometry-only image in ITK axis order, and its size in that order.
pub fn zarr_to_stub_image(
    uri: &str,
    metadata: &AcquisitionMetadata,
    options: &ZarrImageOptions,
) -> crate::Result<(ImageGeometry, [u64; 3])> {
    options.resolve_origin()?;
    let geometry = OmeZarr::open(uri)?.geometry(metadata, options, AxisOrder::Itk)?;
    let size = geometry.size();
    Ok((geometry, size))
}

/// Convert scaled coordinates (array order, in `scale_unit`) into continuous indices at `level`.
pub fn scaled_points_to_indices(
    scaled_points: &PointSets,
    uri: &str,
    scale_unit: LengthUnit,
    level: usize,
) -> crate::Result<PointSets> {
    OmeZarr::open(uri)?.scaled_points_to_indices(scaled_points, scale_unit, level)
}

/// Convert continuous indices (array order) at `level` into scaled coordinates in `scale_unit`.
pub fn indices_to_scaled_points(
    indices: &PointSets,
    uri: &str,
    scale_unit: LengthUnit,
    level: usize,
) -> crate::Result<PointSets> {
    OmeZarr::open(uri)?.indices_to_scaled_points(indices, scale_unit, level)
}

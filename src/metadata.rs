use serde::{Deserialize, Serialize};

/// Names of the axes treated as spatial.
pub const SPATIAL_AXES: [&str; 3] = ["x", "y", "z"];

/// OME-NGFF multiscale image metadata.
///
/// Found under `multiscales` (0.4) or `ome.multiscales` (0.5) in the attributes of an image group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Multiscale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Axes in array order.
    pub axes: Vec<Axis>,
    /// Resolution levels, highest resolution first.
    pub datasets: Vec<Dataset>,
    /// Transformations applied after every dataset's own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
    /// Unstructured attributes.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Axis {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Axis {
    pub fn is_spatial(&self) -> bool {
        SPATIAL_AXES.contains(&self.name.as_str())
    }

    /// Unit of the axis, which must be present.
    pub fn required_unit(&self) -> crate::Result<&str> {
        self.unit
            .as_deref()
            .ok_or_else(|| crate::Error::general(format!("axis {:?} has no unit", self.name)))
    }
}

/// A single resolution level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Path of the array relative to the image group.
    pub path: String,
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CoordinateTransformation {
    Identity,
    Scale { scale: Vec<f64> },
    Translation { translation: Vec<f64> },
}

impl Dataset {
    pub fn scale(&self) -> Option<&[f64]> {
        self.coordinate_transformations.iter().find_map(|t| match t {
            CoordinateTransformation::Scale { scale } => Some(scale.as_slice()),
            _ => None,
        })
    }
}

impl Multiscale {
    /// Read the first multiscale from image group attributes.
    pub fn from_attributes(
        attributes: &serde_json::Map<String, serde_json::Value>,
    ) -> crate::Result<Self> {
        let multiscales = attributes
            .get("ome")
            .and_then(|ome| ome.get("multiscales"))
            .or_else(|| attributes.get("multiscales"))
            .ok_or_else(|| crate::Error::general("no multiscales metadata in group attributes"))?;
        let version = attributes
            .get("ome")
            .and_then(|ome| ome.get("version"))
            .and_then(serde_json::Value::as_str);
        let first = multiscales
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| crate::Error::general("multiscales metadata is empty"))?;
        let mut out = Self::deserialize(first)?;
        if out.version.is_none() {
            out.version = version.map(String::from);
        }
        log::trace!(
            "read multiscale {:?} with {} levels",
            out.name,
            out.datasets.len()
        );
        Ok(out)
    }

    pub fn dataset(&self, level: usize) -> crate::Result<&Dataset> {
        self.datasets.get(level).ok_or_else(|| {
            crate::Error::general(format!(
                "level {level} requested but only {} levels exist",
                self.datasets.len()
            ))
        })
    }

    /// Scale vector of a resolution level, in array order.
    pub fn scale(&self, level: usize) -> crate::Result<&[f64]> {
        let scale = self
            .dataset(level)?
            .scale()
            .ok_or_else(|| crate::Error::general(format!("level {level} has no scale")))?;
        if scale.len() != self.axes.len() {
            return Err(crate::Error::general(format!(
                "level {level} scale has {} entries for {} axes",
                scale.len(),
                self.axes.len()
            )));
        }
        Ok(scale)
    }

    /// Spatial axes and their index in the array, in array order.
    pub fn spatial_axes(&self) -> Vec<(usize, &Axis)> {
        self.axes
            .iter()
            .enumerate()
            .filter(|(_, ax)| ax.is_spatial())
            .collect()
    }

    /// Per-axis spacing of the spatial axes at `level`, converted to `unit`, in array order.
    pub fn spatial_spacing(&self, level: usize, unit: &str) -> crate::Result<Vec<f64>> {
        let scale = self.scale(level)?;
        self.spatial_axes()
            .into_iter()
            .map(|(idx, ax)| Ok(crate::units::unit_conversion(ax.required_unit()?, unit)? * scale[idx]))
            .collect()
    }
}

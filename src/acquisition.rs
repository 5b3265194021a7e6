//! Acquisition metadata describing the axes of a raw imaging session.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Acquisition metadata; only the axis table is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionMetadata {
    pub axes: Vec<AcquisitionAxis>,
    /// Everything else in the document.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A single acquisition axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionAxis {
    /// Array dimension this axis describes.
    pub dimension: Dimension,
    /// Axis name, e.g. `X`.
    pub name: String,
    /// Anatomical direction, e.g. `LEFT_RIGHT`.
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Array dimension index, which some writers store as a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Dimension {
    Index(u64),
    Text(String),
}

impl Dimension {
    pub fn index(&self) -> crate::Result<u64> {
        match self {
            Dimension::Index(i) => Ok(*i),
            Dimension::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| crate::Error::general(format!("invalid axis dimension {s:?}"))),
        }
    }
}

/// Spatial axes of an acquisition, sorted by dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisDirections {
    pub dimensions: Vec<u64>,
    /// Lowercased axis names.
    pub axes: Vec<String>,
    /// Single-letter anatomical direction codes, e.g. `R`.
    pub directions: Vec<char>,
}

impl AxisDirections {
    /// Direction code for each axis name.
    pub fn direction_by_axis(&self) -> BTreeMap<&str, char> {
        self.axes
            .iter()
            .map(String::as_str)
            .zip(self.directions.iter().copied())
            .collect()
    }
}

/// Direction code for a direction name: the first letter of the final `_`-separated token.
///
/// `LEFT_RIGHT` points towards `R`.
pub fn direction_code(direction: &str) -> crate::Result<char> {
    direction
        .rsplit('_')
        .next()
        .and_then(|token| token.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .ok_or_else(|| crate::Error::general(format!("invalid axis direction {direction:?}")))
}

impl AcquisitionMetadata {
    pub fn from_value(value: &serde_json::Value) -> crate::Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Read the acquisition section of a full ("ND") metadata document.
    pub fn from_nd_value(value: &serde_json::Value) -> crate::Result<Self> {
        let acquisition = value
            .get("acquisition")
            .ok_or_else(|| crate::Error::general("metadata has no acquisition section"))?;
        Self::from_value(acquisition)
    }

    /// Accept either an acquisition document or a full metadata document containing one.
    pub fn from_any_value(value: &serde_json::Value) -> crate::Result<Self> {
        if value.get("acquisition").is_some() {
            Self::from_nd_value(value)
        } else {
            Self::from_value(value)
        }
    }

    pub fn axis_directions(&self) -> crate::Result<AxisDirections> {
        let mut by_dimension = BTreeMap::new();
        for axis in &self.axes {
            by_dimension.insert(axis.dimension.index()?, axis);
        }
        let mut out = AxisDirections {
            dimensions: Vec::with_capacity(by_dimension.len()),
            axes: Vec::with_capacity(by_dimension.len()),
            directions: Vec::with_capacity(by_dimension.len()),
        };
        for (dimension, axis) in by_dimension {
            out.dimensions.push(dimension);
            out.axes.push(axis.name.to_lowercase());
            out.directions.push(direction_code(&axis.direction)?);
        }
        Ok(out)
    }
}

/// Extract dimensions, axis names and direction codes from acquisition metadata.
pub fn direction_from_acquisition_metadata(
    metadata: &serde_json::Value,
) -> crate::Result<AxisDirections> {
    AcquisitionMetadata::from_value(metadata)?.axis_directions()
}

/// As [direction_from_acquisition_metadata], for metadata nesting it under `acquisition`.
pub fn direction_from_nd_metadata(nd_metadata: &serde_json::Value) -> crate::Result<AxisDirections> {
    AcquisitionMetadata::from_nd_value(nd_metadata)?.axis_directions()
}

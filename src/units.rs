//! Length units used by OME-Zarr axes and acquisition metadata.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A physical length unit with a known size in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Micrometer,
    #[default]
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,
}

impl LengthUnit {
    /// Size of one of this unit, in meters.
    pub fn to_meter(self) -> f64 {
        match self {
            LengthUnit::Micrometer => 1e-6,
            LengthUnit::Millimeter => 1e-3,
            LengthUnit::Centimeter => 1e-2,
            LengthUnit::Meter => 1.0,
            LengthUnit::Kilometer => 1e3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthUnit::Micrometer => "micrometer",
            LengthUnit::Millimeter => "millimeter",
            LengthUnit::Centimeter => "centimeter",
            LengthUnit::Meter => "meter",
            LengthUnit::Kilometer => "kilometer",
        }
    }

    /// Factor which converts a length in this unit into `other`.
    pub fn factor_to(self, other: LengthUnit) -> f64 {
        if self == other {
            1.0
        } else {
            self.to_meter() / other.to_meter()
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "micrometer" => Ok(LengthUnit::Micrometer),
            "millimeter" => Ok(LengthUnit::Millimeter),
            "centimeter" => Ok(LengthUnit::Centimeter),
            "meter" => Ok(LengthUnit::Meter),
            "kilometer" => Ok(LengthUnit::Kilometer),
            other => Err(crate::Error::UnknownUnit(other.to_string())),
        }
    }
}

/// Size of one `unit` in meters.
pub fn units_to_meter(unit: &str) -> crate::Result<f64> {
    unit.parse::<LengthUnit>().map(LengthUnit::to_meter)
}

/// Multiplicative factor converting lengths in `src` units to `dst` units.
///
/// Identical names always convert with a factor of 1, even if the unit is not recognised.
pub fn unit_conversion(src: &str, dst: &str) -> crate::Result<f64> {
    if src == dst {
        return Ok(1.0);
    }
    Ok(units_to_meter(src)? / units_to_meter(dst)?)
}

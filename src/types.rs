use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Length/height tolerance applied to every geometric comparison.
pub const TOLERANCE: f64 = 0.01;

pub const DEFAULT_COLOR: &str = "#3b82f6";

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

/// Accepts whole-number JSON numbers (`3` or `3.0`) for a quantity field.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
            Ok(Some(v as u32))
        }
        Some(v) => Err(serde::de::Error::custom(format!(
            "invalid quantity {v}, expected a non-negative whole number"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitType {
    pub id: String,
    pub name: String,
    #[serde(alias = "externalL")]
    pub length: f64,
    #[serde(alias = "externalW")]
    pub width: f64,
    #[serde(alias = "externalH")]
    pub height: f64,
    #[serde(default)]
    pub weight: f64,
    /// `None` or `Some(0)` means unlimited.
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
}

impl UnitType {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        length: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            length,
            width,
            height,
            weight: 0.0,
            quantity: None,
            color: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn edges(&self) -> [f64; 3] {
        [self.length, self.width, self.height]
    }

    /// Finite quantity limit, if any.
    pub fn quantity_limit(&self) -> Option<u32> {
        self.quantity.filter(|&q| q > 0)
    }

    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    /// Shortest edge; the lowest height any orientation can have.
    pub fn min_edge(&self) -> f64 {
        self.length.min(self.width).min(self.height)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidUnit {
            name: self.name.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        for (label, v) in [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(invalid(format!("{label} must be a positive number, got {v}")));
            }
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(invalid(format!(
                "weight must be zero or positive, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PalletSpec {
    pub length: f64,
    pub width: f64,
    /// Height of the empty deck; boxes start above it.
    #[serde(alias = "height")]
    pub base_height: f64,
    pub max_height: f64,
    #[serde(default)]
    pub pallet_weight: f64,
}

impl PalletSpec {
    pub fn new(length: f64, width: f64, base_height: f64, max_height: f64) -> Self {
        Self {
            length,
            width,
            base_height,
            max_height,
            pallet_weight: 0.0,
        }
    }

    pub fn with_weight(mut self, pallet_weight: f64) -> Self {
        self.pallet_weight = pallet_weight;
        self
    }

    pub fn footprint_area(&self) -> f64 {
        self.length * self.width
    }

    pub fn usable_height(&self) -> f64 {
        (self.max_height - self.base_height).max(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(Error::InvalidPallet(format!(
                "length must be a positive number, got {}",
                self.length
            )));
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(Error::InvalidPallet(format!(
                "width must be a positive number, got {}",
                self.width
            )));
        }
        if !(self.base_height.is_finite() && self.base_height >= 0.0) {
            return Err(Error::InvalidPallet(format!(
                "base height must be zero or positive, got {}",
                self.base_height
            )));
        }
        if !self.max_height.is_finite() || self.max_height < self.base_height {
            return Err(Error::InvalidPallet(format!(
                "max height {} must not be below base height {}",
                self.max_height, self.base_height
            )));
        }
        if !(self.pallet_weight.is_finite() && self.pallet_weight >= 0.0) {
            return Err(Error::InvalidPallet(format!(
                "pallet weight must be zero or positive, got {}",
                self.pallet_weight
            )));
        }
        Ok(())
    }
}

/// Box centre. `y` is vertical, `x` runs along the pallet length, `z` along its width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dims3 {
    pub l: f64,
    pub w: f64,
    pub h: f64,
}

impl Dims3 {
    pub fn footprint_area(&self) -> f64 {
        self.l * self.w
    }

    pub fn volume(&self) -> f64 {
        self.l * self.w * self.h
    }
}

impl std::fmt::Display for Dims3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.l, self.w, self.h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub unit_id: String,
    pub unit_name: String,
    pub color: String,
    pub position: Point3,
    pub dimensions: Dims3,
    pub rotated: bool,
}

impl Placement {
    pub fn base_height(&self) -> f64 {
        self.position.y - self.dimensions.h / 2.0
    }

    pub fn top_height(&self) -> f64 {
        self.position.y + self.dimensions.h / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PalletLayer {
    pub layer_index: usize,
    /// Thickness: the tallest box in the layer.
    pub height: f64,
    pub base_y: f64,
    pub placements: Vec<Placement>,
    pub area_used: f64,
    pub area_total: f64,
}

impl PalletLayer {
    pub fn fill_percent(&self) -> f64 {
        if self.area_total <= 0.0 {
            return 0.0;
        }
        self.area_used / self.area_total * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub unit_id: String,
    pub unit_name: String,
    pub color: String,
    pub count_placed: u32,
    pub quantity_requested: Option<u32>,
    pub quantity_remaining: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedPalletResult {
    pub layers: Vec<PalletLayer>,
    pub placements: Vec<Placement>,
    pub unit_summaries: Vec<UnitSummary>,
    pub total_units: usize,
    pub total_weight: f64,
    pub pallet_weight: f64,
    pub combined_weight: f64,
    pub total_height: f64,
    pub volume_efficiency: f64,
    pub area_efficiency: f64,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}
